//! A1-style cell references.

/// Column letters for a 1-based column index (`1` -> `A`, `27` -> `AA`).
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push(b'A' + rem);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// `B3` for column 2, row 3.
pub fn cell_ref(col: u32, row: u32) -> String {
    format!("{}{}", column_letters(col), row)
}

/// Parse `B3` (or `$B$3`) into `(col, row)`, both 1-based.
pub fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.trim();
    let split = reference
        .char_indices()
        .find(|(_, c)| c.is_ascii_digit())
        .map(|(i, _)| i)?;
    let (letters, digits) = reference.split_at(split);
    let letters = letters.trim_end_matches('$').trim_start_matches('$');
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }

    let mut col = 0u32;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }

    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((col, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("c12"), Some((3, 12)));
        assert_eq!(parse_cell_ref("$AB$7"), Some((28, 7)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A1B"), None);
    }

    #[test]
    fn test_cell_ref() {
        assert_eq!(cell_ref(2, 3), "B3");
        assert_eq!(cell_ref(28, 100), "AB100");
    }
}
