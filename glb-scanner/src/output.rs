//! Flat-file outputs: CSV and JSON lines.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use glb_common::Result;

use crate::signal::SignalRecord;

/// Column order of the CSV output.
pub const CSV_HEADER: [&str; 8] = [
    "ticker", "date", "close", "glb", "rs_break", "vol_ok", "signal", "notes",
];

/// Write records as CSV with a header row, in the given order.
pub fn write_csv(path: &Path, records: &[SignalRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        writer.write_record(CSV_HEADER)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one JSON object per line, in the given order.
pub fn write_jsonl(path: &Path, records: &[SignalRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Read records back from a CSV written by [`write_csv`].
pub fn read_csv(path: &Path) -> Result<Vec<SignalRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<SignalRecord>, csv::Error>>()?;
    Ok(records)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records() -> Vec<SignalRecord> {
        let mut hit = SignalRecord::empty("INFY.NS");
        hit.last_date = NaiveDate::from_ymd_opt(2024, 5, 2);
        hit.last_close = Some(1450.25);
        hit.glb = true;
        hit.rs_break = true;
        hit.vol_ok = true;
        hit.signal = true;

        let short = SignalRecord::with_note("NEWIPO.NS", crate::signal::Note::InsufficientData);
        vec![hit, short]
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glb_signals.csv");
        write_csv(&path, &records()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "ticker,date,close,glb,rs_break,vol_ok,signal,notes");
        assert_eq!(lines[1], "INFY.NS,2024-05-02,1450.25,true,true,true,true,");
        assert_eq!(lines[2], "NEWIPO.NS,,,false,false,false,false,insufficient_data");
    }

    #[test]
    fn test_csv_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/glb_signals.csv");
        write_csv(&path, &records()).unwrap();

        assert_eq!(read_csv(&path).unwrap(), records());
    }

    #[test]
    fn test_empty_csv_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&path, &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), CSV_HEADER.join(","));
        assert!(read_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glb_signals.jsonl");
        write_jsonl(&path, &records()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["ticker"], "INFY.NS");
        assert_eq!(first["signal"], true);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second["date"].is_null());
        assert_eq!(second["notes"], "insufficient_data");
    }
}
