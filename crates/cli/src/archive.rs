//! Packaging extracted files into the downloadable archive.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files directly inside `dir`, sorted by name.
pub fn staged_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Write `files` into a zip under `<subtree>/`, in the given order.
pub fn write_archive<W: Write + Seek>(writer: W, subtree: &str, files: &[PathBuf]) -> Result<W> {
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?;
        let entry = format!("{}/{}", subtree, name);
        let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

        zip.start_file(entry.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", entry))?;
        zip.write_all(&data)?;
        log::debug!("Archived {} ({} bytes)", entry, data.len());
    }

    zip.finish().context("Failed to finish archive")
}

/// Package every file in `staging` into the archive at `output`.
pub fn package_directory(staging: &Path, subtree: &str, output: &Path) -> Result<Vec<String>> {
    let files = staged_files(staging)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let file =
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    write_archive(file, subtree, &files)?;

    Ok(files
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_archive_layout_is_sorted_under_subtree() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b_image_1.png"), b"b").unwrap();
        fs::write(dir.path().join("a_image_2.png"), b"a2").unwrap();
        fs::write(dir.path().join("a_image_1.png"), b"a1").unwrap();

        let files = staged_files(dir.path()).unwrap();
        let bytes = write_archive(Cursor::new(Vec::new()), "images", &files)
            .unwrap()
            .into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        let mut ordered = Vec::new();
        for i in 0..archive.len() {
            ordered.push(archive.by_index(i).unwrap().name().to_string());
        }
        assert_eq!(
            ordered,
            vec!["images/a_image_1.png", "images/a_image_2.png", "images/b_image_1.png"]
        );

        let mut content = String::new();
        archive
            .by_name("images/a_image_2.png")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "a2");
    }

    #[test]
    fn test_package_directory_creates_parent() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(staging.path().join("deck_embedded_excel_1.xlsx"), b"x").unwrap();

        let output = out.path().join("nested").join("pptx_excel_output.zip");
        let names = package_directory(staging.path(), "excel", &output).unwrap();

        assert_eq!(names, vec!["deck_embedded_excel_1.xlsx"]);
        assert!(output.is_file());
    }
}
