//! The ZIP package behind a workbook, held in memory.

use embex_core::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// All entries of an XLSX package in archive order.
///
/// Parts can be replaced or added; saving writes every entry back in its
/// original position.
#[derive(Debug, Clone, Default)]
pub struct XlsxPackage {
    entries: Vec<(String, Vec<u8>)>,
}

impl XlsxPackage {
    /// Load a package from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open workbook: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            entries.push((name, data));
        }

        Ok(Self { entries })
    }

    /// Raw bytes of a part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    /// A part as UTF-8 text, `None` when it does not exist.
    pub fn part_str(&self, name: &str) -> Result<Option<&str>> {
        match self.part(name) {
            Some(data) => std::str::from_utf8(data)
                .map(Some)
                .map_err(|e| Error::XmlError(format!("'{}' is not valid UTF-8: {}", name, e))),
            None => Ok(None),
        }
    }

    /// A part that must exist, as UTF-8 text.
    pub fn required_part_str(&self, name: &str) -> Result<&str> {
        self.part_str(name)?
            .ok_or_else(|| Error::MissingPart(name.to_string()))
    }

    /// Replace a part, or append it when it is new.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    /// Part names in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Serialize the package.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.entries {
            if name.ends_with('/') {
                zip.add_directory(name.as_str(), options)
                    .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
                continue;
            }
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(data)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish workbook: {}", e)))
    }

    /// Serialize the package to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Write the package to `path`, replacing the file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::XlsxBuilder;

    #[test]
    fn test_rejects_non_zip() {
        let result = XlsxPackage::from_reader(Cursor::new(b"BIFF-ish bytes".to_vec()));
        assert!(matches!(result, Err(Error::ZipError(_))));
    }

    #[test]
    fn test_roundtrip_keeps_order_and_replaces_parts() {
        let bytes = XlsxBuilder::new().sheet("Data", "").build();
        let mut package = XlsxPackage::from_reader(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = package.part_names().map(str::to_string).collect();

        package.set_part("xl/worksheets/sheet1.xml", b"<worksheet/>".to_vec());
        package.set_part("docProps/custom.xml", b"<Properties/>".to_vec());

        let reread = XlsxPackage::from_reader(Cursor::new(package.to_bytes().unwrap())).unwrap();
        let reread_names: Vec<&str> = reread.part_names().collect();
        assert_eq!(&reread_names[..names.len()], names.as_slice());
        assert_eq!(reread_names.last(), Some(&"docProps/custom.xml"));
        assert_eq!(
            reread.part("xl/worksheets/sheet1.xml"),
            Some(&b"<worksheet/>"[..])
        );
    }

    #[test]
    fn test_required_part_missing() {
        let package = XlsxPackage::default();
        assert!(matches!(
            package.required_part_str("xl/workbook.xml"),
            Err(Error::MissingPart(_))
        ));
    }
}
