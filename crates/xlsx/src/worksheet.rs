//! Worksheet parts, parsed just far enough to edit cells.
//!
//! Everything outside `<sheetData>` is kept as raw events and written back
//! unchanged, except for `<dimension>`, which is recomputed.

use crate::reference::{cell_ref, parse_cell_ref};
use crate::styles::CellStyles;
use embex_core::{is_sentinel, local_name, Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;

/// What a cell holds, as far as normalization cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    /// No value at all.
    Empty,
    /// A string value: shared, inline, or a plain `str` cell.
    Text(String),
    /// A formula; never rewritten.
    Formula,
    /// Numbers, booleans, errors and dates.
    Value(String),
}

/// A `<c>` element.
#[derive(Debug, Clone)]
pub struct Cell {
    start: BytesStart<'static>,
    body: Vec<Event<'static>>,
}

impl Cell {
    /// A numeric cell.
    pub fn number(name: &str, reference: &str, style: u32, value: &str) -> Self {
        let mut start = BytesStart::new(name.to_string());
        start.push_attribute(("r", reference));
        if style != 0 {
            start.push_attribute(("s", style.to_string().as_str()));
        }
        let v = qualified_like(name, "v");
        Self {
            start,
            body: vec![
                Event::Start(BytesStart::new(v.clone())),
                Event::Text(BytesText::new(value).into_owned()),
                Event::End(BytesEnd::new(v)),
            ],
        }
    }

    /// An inline string cell.
    pub fn inline_text(name: &str, reference: &str, text: &str) -> Self {
        let mut start = BytesStart::new(name.to_string());
        start.push_attribute(("r", reference));
        start.push_attribute(("t", "inlineStr"));

        let is = qualified_like(name, "is");
        let t = qualified_like(name, "t");
        let mut t_start = BytesStart::new(t.clone());
        if text.trim() != text {
            t_start.push_attribute(("xml:space", "preserve"));
        }
        Self {
            start,
            body: vec![
                Event::Start(BytesStart::new(is.clone())),
                Event::Start(t_start),
                Event::Text(BytesText::new(text).into_owned()),
                Event::End(BytesEnd::new(t)),
                Event::End(BytesEnd::new(is)),
            ],
        }
    }

    fn attr(&self, key: &[u8]) -> Option<String> {
        attr_value(&self.start, key)
    }

    /// Cell format index (`s`), `0` when absent.
    pub fn style(&self) -> u32 {
        self.attr(b"s")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    /// The cell's value kind, resolving shared strings.
    pub fn content(&self, shared_strings: &[String]) -> Result<CellContent> {
        let cell_type = self.attr(b"t");

        let mut has_formula = false;
        let mut value: Option<String> = None;
        let mut inline: Option<String> = None;
        let mut in_v = false;
        let mut in_is = false;
        let mut in_t = false;
        let mut phonetic_depth = 0usize;

        for event in &self.body {
            match event {
                Event::Start(e) => match local_name(e.name().as_ref()) {
                    b"f" => has_formula = true,
                    b"v" => {
                        in_v = true;
                        value.get_or_insert_with(String::new);
                    }
                    b"is" => {
                        in_is = true;
                        inline.get_or_insert_with(String::new);
                    }
                    b"rPh" => phonetic_depth += 1,
                    b"t" if in_is && phonetic_depth == 0 => in_t = true,
                    _ => {}
                },
                Event::Empty(e) => match local_name(e.name().as_ref()) {
                    b"f" => has_formula = true,
                    b"v" => {
                        value.get_or_insert_with(String::new);
                    }
                    b"is" => {
                        inline.get_or_insert_with(String::new);
                    }
                    _ => {}
                },
                Event::Text(e) => {
                    let text = e.unescape()?;
                    if in_v {
                        if let Some(v) = value.as_mut() {
                            v.push_str(&text);
                        }
                    } else if in_t {
                        if let Some(s) = inline.as_mut() {
                            s.push_str(&text);
                        }
                    }
                }
                Event::End(e) => match local_name(e.name().as_ref()) {
                    b"v" => in_v = false,
                    b"is" => in_is = false,
                    b"t" => in_t = false,
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    _ => {}
                },
                _ => {}
            }
        }

        if has_formula {
            return Ok(CellContent::Formula);
        }

        let content = match cell_type.as_deref() {
            Some("inlineStr") => match inline {
                Some(text) => CellContent::Text(text),
                None => CellContent::Empty,
            },
            Some("s") => match value {
                Some(v) => {
                    let index: usize = v.trim().parse().map_err(|_| {
                        Error::WorkbookError(format!("invalid shared string index '{}'", v))
                    })?;
                    let text = shared_strings.get(index).ok_or_else(|| {
                        Error::WorkbookError(format!(
                            "shared string index {} out of range",
                            index
                        ))
                    })?;
                    CellContent::Text(text.clone())
                }
                None => CellContent::Empty,
            },
            Some("str") => match value {
                Some(v) => CellContent::Text(v),
                None => CellContent::Empty,
            },
            _ => match value {
                Some(v) if !v.trim().is_empty() => CellContent::Value(v),
                _ => CellContent::Empty,
            },
        };

        Ok(content)
    }

    fn with_reference(mut self, reference: &str) -> Self {
        let name = String::from_utf8_lossy(self.start.name().as_ref()).into_owned();
        let mut start = BytesStart::new(name);
        start.push_attribute(("r", reference));
        for attr in self.start.attributes().flatten() {
            if attr.key.as_ref() != b"r" {
                start.push_attribute(attr);
            }
        }
        self.start = start.into_owned();
        self
    }
}

/// A `<row>` element and its cells keyed by column.
#[derive(Debug, Clone)]
struct Row {
    start: BytesStart<'static>,
    cells: BTreeMap<u32, Cell>,
}

impl Row {
    fn new(name: &str, row: u32) -> Self {
        let mut start = BytesStart::new(name.to_string());
        start.push_attribute(("r", row.to_string().as_str()));
        Self {
            start,
            cells: BTreeMap::new(),
        }
    }

    /// Drop the `spans` hint once cells are added outside it.
    fn drop_spans(&mut self) {
        if !self
            .start
            .attributes()
            .flatten()
            .any(|a| a.key.as_ref() == b"spans")
        {
            return;
        }
        let name = String::from_utf8_lossy(self.start.name().as_ref()).into_owned();
        let mut start = BytesStart::new(name);
        for attr in self.start.attributes().flatten() {
            if attr.key.as_ref() != b"spans" {
                start.push_attribute(attr);
            }
        }
        self.start = start.into_owned();
    }
}

/// A parsed worksheet part.
#[derive(Debug, Clone)]
pub struct Worksheet {
    head: Vec<Event<'static>>,
    sheet_data: BytesStart<'static>,
    rows: BTreeMap<u32, Row>,
    tail: Vec<Event<'static>>,
}

enum Section {
    Head,
    Data,
    Tail,
}

fn is_named(name: QName, local: &[u8]) -> bool {
    local_name(name.as_ref()) == local
}

/// `x:c` + `v` -> `x:v`; `c` + `v` -> `v`.
fn qualified_like(sibling: &str, local: &str) -> String {
    match sibling.rsplit_once(':') {
        Some((prefix, _)) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

fn attr_value(start: &BytesStart, key: &[u8]) -> Option<String> {
    start
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

impl Worksheet {
    /// Parse a worksheet part.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut section = Section::Head;
        let mut head = Vec::new();
        let mut tail = Vec::new();
        let mut sheet_data: Option<BytesStart<'static>> = None;
        let mut rows: BTreeMap<u32, Row> = BTreeMap::new();

        let mut row: Option<(u32, Row)> = None;
        let mut cell: Option<Cell> = None;
        let mut next_row = 1u32;
        let mut next_col = 1u32;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::XmlError(format!("Error parsing worksheet: {}", e)))?
                .into_owned();
            if let Event::Eof = event {
                break;
            }

            match section {
                Section::Head => match event {
                    Event::Start(e) if is_named(e.name(), b"sheetData") => {
                        sheet_data = Some(e);
                        section = Section::Data;
                    }
                    Event::Empty(e) if is_named(e.name(), b"sheetData") => {
                        sheet_data = Some(e);
                        section = Section::Tail;
                    }
                    other => head.push(other),
                },
                Section::Data => {
                    if let Some(open) = cell.as_mut() {
                        match event {
                            Event::End(ref e) if is_named(e.name(), b"c") => {
                                if let Some(done) = cell.take() {
                                    place_cell(&mut row, done, &mut next_col)?;
                                }
                            }
                            other => open.body.push(other),
                        }
                        continue;
                    }

                    match event {
                        Event::Start(e) if is_named(e.name(), b"row") => {
                            let number = row_number(&e, next_row)?;
                            next_row = following_row(number)?;
                            next_col = 1;
                            row = Some((number, Row { start: e, cells: BTreeMap::new() }));
                        }
                        Event::Empty(e) if is_named(e.name(), b"row") => {
                            let number = row_number(&e, next_row)?;
                            next_row = following_row(number)?;
                            rows.insert(number, Row { start: e, cells: BTreeMap::new() });
                        }
                        Event::End(ref e) if is_named(e.name(), b"row") => {
                            if let Some((number, done)) = row.take() {
                                rows.insert(number, done);
                            }
                        }
                        Event::Start(e) if is_named(e.name(), b"c") => {
                            cell = Some(Cell { start: e, body: Vec::new() });
                        }
                        Event::Empty(e) if is_named(e.name(), b"c") => {
                            place_cell(&mut row, Cell { start: e, body: Vec::new() }, &mut next_col)?;
                        }
                        Event::End(ref e) if is_named(e.name(), b"sheetData") => {
                            section = Section::Tail;
                        }
                        _ => {}
                    }
                }
                Section::Tail => tail.push(event),
            }
        }

        let sheet_data = sheet_data
            .ok_or_else(|| Error::WorkbookError("worksheet has no sheetData".into()))?;

        Ok(Self {
            head,
            sheet_data,
            rows,
            tail,
        })
    }

    /// Highest row number holding a cell, `0` for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.rows
            .iter()
            .rev()
            .find(|(_, row)| !row.cells.is_empty())
            .map(|(number, _)| *number)
            .unwrap_or(0)
    }

    /// Highest column index holding a cell, `0` for an empty sheet.
    pub fn max_column(&self) -> u32 {
        self.rows
            .values()
            .filter_map(|row| row.cells.keys().next_back().copied())
            .max()
            .unwrap_or(0)
    }

    /// The cell at a 1-based position.
    pub fn cell(&self, col: u32, row: u32) -> Option<&Cell> {
        self.rows.get(&row).and_then(|r| r.cells.get(&col))
    }

    /// The cell at an A1 reference.
    pub fn cell_at(&self, reference: &str) -> Option<&Cell> {
        let (col, row) = parse_cell_ref(reference)?;
        self.cell(col, row)
    }

    /// Place a cell, creating its row when needed.
    pub fn set_cell(&mut self, col: u32, row: u32, cell: Cell) {
        let row_name = qualified_like(&self.element_name(), "row");
        let entry = self
            .rows
            .entry(row)
            .or_insert_with(|| Row::new(&row_name, row));
        entry.drop_spans();
        entry.cells.insert(col, cell);
    }

    /// Qualified name for `c`, matching the prefix used by `sheetData`.
    fn element_name(&self) -> String {
        let sheet_data = String::from_utf8_lossy(self.sheet_data.name().as_ref()).into_owned();
        qualified_like(&sheet_data, "c")
    }

    /// Add a column after the last one: `header` in row 1, `value` in every
    /// row from 2 to the last row.
    ///
    /// An empty sheet counts as one column and one row.
    pub fn append_column(&mut self, header: &str, value: &str) -> u32 {
        let col = self.max_column().max(1) + 1;
        let last_row = self.max_row().max(1);
        let name = self.element_name();

        self.set_cell(col, 1, Cell::inline_text(&name, &cell_ref(col, 1), header));
        for row in 2..=last_row {
            self.set_cell(col, row, Cell::inline_text(&name, &cell_ref(col, row), value));
        }

        col
    }

    /// Replace missing and placeholder values under non-empty headers with
    /// an integer zero. Returns the number of cells replaced.
    ///
    /// Row 1 holds the headers; rows 2 through the last row are data rows,
    /// including rows with no XML of their own.
    pub fn clean_sentinels(
        &mut self,
        shared_strings: &[String],
        styles: &mut CellStyles,
    ) -> Result<usize> {
        let last_col = self.max_column();
        let last_row = self.max_row();
        if last_row < 2 {
            return Ok(0);
        }

        let mut header_cols = Vec::new();
        for col in 1..=last_col {
            let content = match self.cell(col, 1) {
                Some(cell) => cell.content(shared_strings)?,
                None => CellContent::Empty,
            };
            let present = match content {
                CellContent::Empty => false,
                CellContent::Text(ref text) => !text.is_empty(),
                _ => true,
            };
            if present {
                header_cols.push(col);
            }
        }

        let mut replacements = Vec::new();
        for row in 2..=last_row {
            for &col in &header_cols {
                let (replace, style) = match self.cell(col, row) {
                    None => (true, 0),
                    Some(cell) => {
                        let replace = match cell.content(shared_strings)? {
                            CellContent::Empty => true,
                            CellContent::Text(text) => is_sentinel(&text),
                            CellContent::Formula | CellContent::Value(_) => false,
                        };
                        (replace, cell.style())
                    }
                };
                if replace {
                    replacements.push((col, row, style));
                }
            }
        }

        let name = self.element_name();
        for &(col, row, style) in &replacements {
            let xf = styles.integer_format(style);
            self.set_cell(col, row, Cell::number(&name, &cell_ref(col, row), xf, "0"));
        }

        Ok(replacements.len())
    }

    /// `A1:<last>` covering every cell, or `A1` for an empty sheet.
    fn dimension(&self) -> String {
        let mut min_col = u32::MAX;
        let mut min_row = u32::MAX;
        let mut max_col = 0;
        let mut max_row = 0;
        for (&number, row) in &self.rows {
            if let (Some(&first), Some(&last)) = (row.cells.keys().next(), row.cells.keys().next_back()) {
                min_row = min_row.min(number);
                max_row = max_row.max(number);
                min_col = min_col.min(first);
                max_col = max_col.max(last);
            }
        }
        if max_row == 0 {
            return "A1".to_string();
        }
        let start = cell_ref(min_col, min_row);
        let end = cell_ref(max_col, max_row);
        if start == end {
            start
        } else {
            format!("{}:{}", start, end)
        }
    }

    /// Serialize the worksheet.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        for event in &self.head {
            match event {
                Event::Empty(e) if is_named(e.name(), b"dimension") => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let mut dimension = BytesStart::new(name);
                    dimension.push_attribute(("ref", self.dimension().as_str()));
                    writer.write_event(Event::Empty(dimension))?;
                }
                other => writer.write_event(other)?,
            }
        }

        if self.rows.is_empty() {
            writer.write_event(Event::Empty(self.sheet_data.borrow()))?;
        } else {
            writer.write_event(Event::Start(self.sheet_data.borrow()))?;
            for row in self.rows.values() {
                if row.cells.is_empty() {
                    writer.write_event(Event::Empty(row.start.borrow()))?;
                    continue;
                }
                writer.write_event(Event::Start(row.start.borrow()))?;
                for cell in row.cells.values() {
                    if cell.body.is_empty() {
                        writer.write_event(Event::Empty(cell.start.borrow()))?;
                        continue;
                    }
                    writer.write_event(Event::Start(cell.start.borrow()))?;
                    for event in &cell.body {
                        writer.write_event(event)?;
                    }
                    writer.write_event(Event::End(cell.start.to_end()))?;
                }
                writer.write_event(Event::End(row.start.to_end()))?;
            }
            writer.write_event(Event::End(self.sheet_data.to_end()))?;
        }

        for event in &self.tail {
            writer.write_event(event)?;
        }

        String::from_utf8(writer.into_inner()).map_err(|e| Error::XmlError(e.to_string()))
    }
}

fn row_number(start: &BytesStart, next_row: u32) -> Result<u32> {
    match attr_value(start, b"r") {
        Some(r) => r
            .trim()
            .parse()
            .ok()
            .filter(|n: &u32| *n > 0)
            .ok_or_else(|| Error::WorkbookError(format!("invalid row number '{}'", r))),
        None => Ok(next_row),
    }
}

/// Row number assumed for a following `<row>` without `r`.
fn following_row(number: u32) -> Result<u32> {
    number
        .checked_add(1)
        .ok_or_else(|| Error::WorkbookError(format!("row number {} out of range", number)))
}

/// Key a finished cell into the open row, filling in `r` when missing.
fn place_cell(row: &mut Option<(u32, Row)>, cell: Cell, next_col: &mut u32) -> Result<()> {
    let Some((number, row)) = row.as_mut() else {
        return Err(Error::WorkbookError("cell outside of a row".into()));
    };

    let (col, cell) = match cell.attr(b"r") {
        Some(reference) => {
            let (col, _) = parse_cell_ref(&reference).ok_or_else(|| {
                Error::WorkbookError(format!("invalid cell reference '{}'", reference))
            })?;
            (col, cell)
        }
        None => {
            let col = *next_col;
            (col, cell.with_reference(&cell_ref(col, *number)))
        }
    };

    *next_col = col + 1;
    row.cells.insert(col, cell);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::MINIMAL_STYLESHEET;

    fn sheet(rows: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetData>{}</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
            rows
        )
    }

    fn content(ws: &Worksheet, reference: &str, shared: &[String]) -> CellContent {
        ws.cell_at(reference)
            .map(|c| c.content(shared).unwrap())
            .unwrap_or(CellContent::Empty)
    }

    #[test]
    fn test_parse_cells_and_content() {
        let shared = vec!["Region".to_string(), "N/A".to_string()];
        let ws = Worksheet::parse(&sheet(
            r#"<row r="1" spans="1:3"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>Sales</t></is></c><c r="C1" t="str"><f>A1&amp;"x"</f><v>Regionx</v></c></row><row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2"><v>42.5</v></c><c r="C2" s="3"/></row>"#,
        ))
        .unwrap();

        assert_eq!(ws.max_row(), 2);
        assert_eq!(ws.max_column(), 3);
        assert_eq!(content(&ws, "A1", &shared), CellContent::Text("Region".into()));
        assert_eq!(content(&ws, "B1", &shared), CellContent::Text("Sales".into()));
        assert_eq!(content(&ws, "C1", &shared), CellContent::Formula);
        assert_eq!(content(&ws, "A2", &shared), CellContent::Text("N/A".into()));
        assert_eq!(content(&ws, "B2", &shared), CellContent::Value("42.5".into()));
        assert_eq!(content(&ws, "C2", &shared), CellContent::Empty);
        assert_eq!(ws.cell_at("C2").unwrap().style(), 3);
    }

    #[test]
    fn test_cells_without_reference_are_positioned_by_count() {
        let ws = Worksheet::parse(&sheet(
            r#"<row><c t="inlineStr"><is><t>a</t></is></c><c><v>1</v></c></row><row><c r="C2"><v>2</v></c><c><v>3</v></c></row>"#,
        ))
        .unwrap();

        assert_eq!(content(&ws, "A1", &[]), CellContent::Text("a".into()));
        assert_eq!(content(&ws, "B1", &[]), CellContent::Value("1".into()));
        assert_eq!(content(&ws, "D2", &[]), CellContent::Value("3".into()));
        assert!(ws.to_xml().unwrap().contains(r#"<c r="B1"><v>1</v></c>"#));
    }

    #[test]
    fn test_bad_shared_string_index_is_an_error() {
        let ws = Worksheet::parse(&sheet(r#"<row r="1"><c r="A1" t="s"><v>9</v></c></row>"#)).unwrap();
        let result = ws.cell_at("A1").unwrap().content(&[]);
        assert!(matches!(result, Err(Error::WorkbookError(_))));
    }

    #[test]
    fn test_row_number_at_u32_limit_is_an_error() {
        let result = Worksheet::parse(&sheet(
            r#"<row r="4294967295"><c r="A4294967295"><v>1</v></c></row>"#,
        ));
        assert!(matches!(result, Err(Error::WorkbookError(_))));

        let result = Worksheet::parse(&sheet(r#"<row r="4294967296"/>"#));
        assert!(matches!(result, Err(Error::WorkbookError(_))));
    }

    #[test]
    fn test_missing_sheet_data_is_an_error() {
        let result = Worksheet::parse(r#"<worksheet><dimension ref="A1"/></worksheet>"#);
        assert!(matches!(result, Err(Error::WorkbookError(_))));
    }

    #[test]
    fn test_append_column() {
        let mut ws = Worksheet::parse(&sheet(
            r#"<row r="1" spans="1:2"><c r="A1" t="inlineStr"><is><t>A</t></is></c><c r="B1" t="inlineStr"><is><t>B</t></is></c></row><row r="3" spans="1:1"><c r="A3"><v>5</v></c></row>"#,
        ))
        .unwrap();

        let col = ws.append_column("table_title", "Q1 Results - Regional breakdown");
        assert_eq!(col, 3);
        assert_eq!(content(&ws, "C1", &[]), CellContent::Text("table_title".into()));
        assert_eq!(
            content(&ws, "C2", &[]),
            CellContent::Text("Q1 Results - Regional breakdown".into())
        );
        assert_eq!(
            content(&ws, "C3", &[]),
            CellContent::Text("Q1 Results - Regional breakdown".into())
        );
        assert!(ws.cell_at("C4").is_none());

        let xml = ws.to_xml().unwrap();
        assert!(xml.contains(r#"<dimension ref="A1:C3"/>"#));
        assert!(xml.contains(r#"<row r="3"><c r="A3"><v>5</v></c>"#));
        assert!(xml.contains(r#"<pageMargins left="0.7""#));
    }

    #[test]
    fn test_append_column_on_empty_sheet() {
        let mut ws = Worksheet::parse(&sheet("")).unwrap();
        assert_eq!(ws.append_column("table_title", "x"), 2);
        assert_eq!(content(&ws, "B1", &[]), CellContent::Text("table_title".into()));
        assert_eq!(ws.max_row(), 1);
    }

    #[test]
    fn test_clean_sentinels() {
        let shared = vec!["Name".to_string(), "no data".to_string()];
        let mut styles = CellStyles::parse(MINIMAL_STYLESHEET).unwrap();
        let mut ws = Worksheet::parse(&sheet(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>C</t></is></c></row><row r="2"><c r="A2" t="inlineStr"><is><t> N/A </t></is></c><c r="C2" t="s"><v>1</v></c><c r="D2" t="inlineStr"><is><t>-</t></is></c></row><row r="4"><c r="A4"><v>7</v></c><c r="C4" t="str"><v>Undefined</v></c></row><row r="5"><c r="A5"><f>SUM(A2:A4)</f></c><c r="C5" t="inlineStr"><is><t>kept</t></is></c></row>"#,
        ))
        .unwrap();

        let replaced = ws.clean_sentinels(&shared, &mut styles).unwrap();

        // A2, C2, A3, C3, C4
        assert_eq!(replaced, 5);
        for reference in ["A2", "C2", "A3", "C3", "C4"] {
            assert_eq!(
                content(&ws, reference, &shared),
                CellContent::Value("0".into()),
                "{}",
                reference
            );
            let xf = ws.cell_at(reference).unwrap().style();
            assert_eq!(styles.num_fmt_id(xf), 1);
        }
        // Under an empty header, and beyond the header width.
        assert!(ws.cell_at("B2").is_none());
        assert_eq!(content(&ws, "D2", &shared), CellContent::Text("-".into()));
        // Real values and formulas stay.
        assert_eq!(content(&ws, "A4", &shared), CellContent::Value("7".into()));
        assert_eq!(content(&ws, "A5", &shared), CellContent::Formula);
        assert_eq!(content(&ws, "C5", &shared), CellContent::Text("kept".into()));
    }

    #[test]
    fn test_clean_sentinels_is_idempotent() {
        let mut styles = CellStyles::parse(MINIMAL_STYLESHEET).unwrap();
        let mut ws = Worksheet::parse(&sheet(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>A</t></is></c><c r="B1" t="inlineStr"><is><t>B</t></is></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>n/a</t></is></c><c r="B2"><v>3</v></c></row><row r="3"><c r="B3" s="0"/></row>"#,
        ))
        .unwrap();

        assert_eq!(ws.clean_sentinels(&[], &mut styles).unwrap(), 3);
        let once = ws.to_xml().unwrap();

        let mut again = Worksheet::parse(&once).unwrap();
        assert_eq!(again.clean_sentinels(&[], &mut styles).unwrap(), 0);
        assert_eq!(again.to_xml().unwrap(), once);
    }

    #[test]
    fn test_clean_sentinels_header_only_sheet() {
        let mut styles = CellStyles::parse(MINIMAL_STYLESHEET).unwrap();
        let mut ws = Worksheet::parse(&sheet(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>A</t></is></c></row>"#,
        ))
        .unwrap();
        assert_eq!(ws.clean_sentinels(&[], &mut styles).unwrap(), 0);
        assert!(!styles.is_modified());
    }

    #[test]
    fn test_prefixed_worksheet() {
        let xml = r#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData><x:row r="1"><x:c r="A1" t="inlineStr"><x:is><x:t>A</x:t></x:is></x:c></x:row></x:sheetData></x:worksheet>"#;
        let mut ws = Worksheet::parse(xml).unwrap();
        ws.append_column("table_title", "");

        let out = ws.to_xml().unwrap();
        assert!(out.contains(r#"<x:c r="B1" t="inlineStr"><x:is><x:t>table_title</x:t></x:is></x:c>"#));
    }
}
