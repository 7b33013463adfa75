use std::collections::HashSet;

use crate::error::{Error, Result};

/// Parses the comma-delimited keep list sent with activity updates.
/// Blank input means "keep nothing".
pub fn parse_id_list(raw: &str) -> Result<HashSet<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| Error::BadRequest(format!("Invalid attachment id: {}", part)))
        })
        .collect()
}

/// Trimmed text, or `None` when nothing but whitespace was sent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn require_id(value: i64, name: &str) -> Result<i64> {
    if value <= 0 {
        return Err(Error::BadRequest(format!("{} is required", name)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_list_parsing() {
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list(" , ").unwrap().is_empty());
        assert_eq!(parse_id_list("3, 5,3").unwrap(), HashSet::from([3, 5]));
        assert!(matches!(parse_id_list("3,x"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" ok ".into())), Some("ok".into()));
        assert_eq!(non_blank(None), None);
    }
}
