//! The two file-level passes run on every extracted workbook.
//!
//! Both passes edit the file in place. Cleaning leaves the file untouched
//! when it finds nothing to replace, so running it twice is a no-op.

use crate::workbook::Workbook;
use embex_core::Result;
use log::debug;
use serde::Serialize;
use std::path::Path;

/// Header of the column that records the source slide.
pub const LABEL_COLUMN_HEADER: &str = "table_title";

/// Outcome of a cleaning pass over one workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Worksheets visited.
    pub sheets: usize,
    pub cells_replaced: usize,
}

/// Append a `table_title` column holding `label` to every worksheet.
pub fn append_label_column(path: &Path, label: &str) -> Result<()> {
    let mut workbook = Workbook::open(path)?;
    workbook.append_label_column(LABEL_COLUMN_HEADER, label);
    workbook.save(path)?;
    debug!(
        "Labelled {} sheet(s) in {} with '{}'",
        workbook.worksheet_count(),
        path.display(),
        label
    );
    Ok(())
}

/// Replace empty and placeholder cells under non-empty headers with `0`.
pub fn clean_sentinels(path: &Path) -> Result<CleanReport> {
    let mut workbook = Workbook::open(path)?;
    let cells_replaced = workbook.clean_sentinels()?;

    if workbook.is_dirty() {
        workbook.save(path)?;
    } else {
        debug!("Nothing to clean in {}", path.display());
    }

    Ok(CleanReport {
        sheets: workbook.worksheet_count(),
        cells_replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{number_cell, row, text_cell, XlsxBuilder};
    use crate::package::XlsxPackage;
    use crate::worksheet::CellContent;
    use tempfile::TempDir;

    fn content(path: &Path, sheet: &str, reference: &str) -> CellContent {
        Workbook::open(path)
            .unwrap()
            .cell_content(sheet, reference)
            .unwrap()
    }

    #[test]
    fn test_blank_under_empty_header_stays_blank() {
        let dir = TempDir::new().unwrap();
        let path = XlsxBuilder::new()
            .sheet(
                "Sheet1",
                &[
                    row(1, &[text_cell("A1", "A"), text_cell("C1", "C")]),
                    row(2, &[number_cell("A2", "1"), number_cell("C2", "3")]),
                    row(3, &[text_cell("C3", "n/a")]),
                ]
                .concat(),
            )
            .write(dir.path(), "book.xlsx");

        let report = clean_sentinels(&path).unwrap();
        assert_eq!(
            report,
            CleanReport {
                sheets: 1,
                cells_replaced: 2
            }
        );

        assert_eq!(content(&path, "Sheet1", "B2"), CellContent::Empty);
        assert_eq!(content(&path, "Sheet1", "B3"), CellContent::Empty);
        assert_eq!(content(&path, "Sheet1", "A3"), CellContent::Value("0".into()));
        assert_eq!(content(&path, "Sheet1", "C3"), CellContent::Value("0".into()));
        assert_eq!(content(&path, "Sheet1", "A2"), CellContent::Value("1".into()));
    }

    #[test]
    fn test_shared_string_sentinels_across_sheets() {
        let dir = TempDir::new().unwrap();
        let path = XlsxBuilder::new()
            .shared_strings(&["Region", "No Data", "North"])
            .sheet(
                "One",
                &[
                    row(1, &[r#"<c r="A1" t="s"><v>0</v></c>"#.to_string()]),
                    row(2, &[r#"<c r="A2" t="s"><v>1</v></c>"#.to_string()]),
                    row(3, &[r#"<c r="A3" t="s"><v>2</v></c>"#.to_string()]),
                ]
                .concat(),
            )
            .sheet(
                "Two",
                &[
                    row(1, &[text_cell("A1", "Total")]),
                    row(2, &[text_cell("A2", "UNDEFINED")]),
                ]
                .concat(),
            )
            .write(dir.path(), "book.xlsx");

        let report = clean_sentinels(&path).unwrap();
        assert_eq!(report.sheets, 2);
        assert_eq!(report.cells_replaced, 2);
        assert_eq!(content(&path, "One", "A2"), CellContent::Value("0".into()));
        assert_eq!(content(&path, "One", "A3"), CellContent::Text("North".into()));
        assert_eq!(content(&path, "Two", "A2"), CellContent::Value("0".into()));
    }

    #[test]
    fn test_cleaning_twice_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = XlsxBuilder::new()
            .sheet(
                "Data",
                &[
                    row(1, &[text_cell("A1", "A"), text_cell("B1", "B")]),
                    row(2, &[text_cell("A2", " - "), number_cell("B2", "2")]),
                    row(4, &[number_cell("A4", "5")]),
                ]
                .concat(),
            )
            .write(dir.path(), "book.xlsx");

        // A2, A3, B3, B4
        assert_eq!(clean_sentinels(&path).unwrap().cells_replaced, 4);
        let once = std::fs::read(&path).unwrap();

        assert_eq!(clean_sentinels(&path).unwrap().cells_replaced, 0);
        let twice = std::fs::read(&path).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_label_column_then_clean() {
        let dir = TempDir::new().unwrap();
        let path = XlsxBuilder::new()
            .sheet(
                "Data",
                &[
                    row(1, &[text_cell("A1", "Region"), text_cell("B1", "Sales")]),
                    row(2, &[text_cell("A2", "North"), number_cell("B2", "10")]),
                    row(3, &[text_cell("A3", "South"), number_cell("B3", "12")]),
                ]
                .concat(),
            )
            .sheet("Empty", "")
            .write(dir.path(), "book.xlsx");

        append_label_column(&path, "Q1 Results - Regional breakdown").unwrap();

        assert_eq!(
            content(&path, "Data", "C1"),
            CellContent::Text(LABEL_COLUMN_HEADER.into())
        );
        for reference in ["C2", "C3"] {
            assert_eq!(
                content(&path, "Data", reference),
                CellContent::Text("Q1 Results - Regional breakdown".into())
            );
        }
        assert_eq!(content(&path, "Data", "C4"), CellContent::Empty);
        assert_eq!(
            content(&path, "Empty", "B1"),
            CellContent::Text(LABEL_COLUMN_HEADER.into())
        );

        assert_eq!(clean_sentinels(&path).unwrap().cells_replaced, 0);
    }

    #[test]
    fn test_empty_label_cleans_to_zero() {
        let dir = TempDir::new().unwrap();
        let path = XlsxBuilder::new()
            .sheet(
                "Data",
                &[
                    row(1, &[text_cell("A1", "Value")]),
                    row(2, &[number_cell("A2", "1")]),
                ]
                .concat(),
            )
            .write(dir.path(), "book.xlsx");

        append_label_column(&path, "").unwrap();
        assert_eq!(clean_sentinels(&path).unwrap().cells_replaced, 1);
        assert_eq!(content(&path, "Data", "B2"), CellContent::Value("0".into()));
    }

    #[test]
    fn test_untouched_parts_are_copied_through() {
        let dir = TempDir::new().unwrap();
        let path = XlsxBuilder::new()
            .sheet(
                "Data",
                &[row(1, &[text_cell("A1", "A")]), row(2, &[text_cell("A2", "x")])].concat(),
            )
            .write(dir.path(), "book.xlsx");
        let before = XlsxPackage::open(&path).unwrap();

        append_label_column(&path, "Summary").unwrap();

        let after = XlsxPackage::open(&path).unwrap();
        for name in ["xl/workbook.xml", "xl/styles.xml", "[Content_Types].xml"] {
            assert_eq!(before.part(name), after.part(name), "{}", name);
        }
        assert_ne!(
            before.part("xl/worksheets/sheet1.xml"),
            after.part("xl/worksheets/sheet1.xml")
        );
    }

    #[test]
    fn test_not_a_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(append_label_column(&path, "x").is_err());
        assert!(clean_sentinels(&path).is_err());
    }
}
