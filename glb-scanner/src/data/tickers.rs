//! Ticker universe loading.

use std::fs;
use std::path::Path;

use glb_common::{Error, Result};

/// Lines starting with this marker are ignored.
pub const COMMENT_MARKER: char = '#';

/// Read the symbols to scan, one per line.
///
/// Blank lines and comment lines are skipped; surrounding whitespace is
/// trimmed. Duplicates and unknown symbols are kept, they surface later as
/// missing data rather than load errors.
pub fn load_tickers(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::Configuration(format!(
            "tickers file not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_tickers_skips_blanks_and_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# NIFTY 500 constituents").unwrap();
        writeln!(file, "RELIANCE.NS").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  TCS.NS  ").unwrap();
        writeln!(file, "   # indented comment").unwrap();
        writeln!(file, "RELIANCE.NS").unwrap();
        writeln!(file, "NOT A SYMBOL").unwrap();

        let tickers = load_tickers(file.path()).unwrap();
        assert_eq!(
            tickers,
            vec!["RELIANCE.NS", "TCS.NS", "RELIANCE.NS", "NOT A SYMBOL"]
        );
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_tickers(&dir.path().join("missing.txt")).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.exit_code(), 2);
    }
}
