//! Report export for scan results.
//!
//! Produces a two-sheet report from the signal records:
//! - **Breakouts**: signal rows only
//! - **All Signals (Grouped)**: every row, signals first, green/red by signal
//!
//! Formats:
//! - XLSX (default; fills, header font, auto filter, column widths)
//! - HTML (fills, header font, column widths)
//! - Markdown (plain tables, padded columns)
//!
//! Every styling step asks the format first (`ReportFormat::supports`).
//! Unsupported styles are skipped with a debug log and the export carries on.

use chrono::Local;
use rust_xlsxwriter::{Format, FormatAlign, FormatPattern, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

use glb_common::{Error, Result};

use crate::output::CSV_HEADER;
use crate::scanner::sort_records;
use crate::signal::SignalRecord;

/// Breakouts sheet title
pub const BREAKOUTS_SHEET: &str = "Breakouts";

/// Full listing sheet title
pub const ALL_SIGNALS_SHEET: &str = "All Signals (Grouped)";

const HEADER_FILL: u32 = 0x1F4E78;
const HEADER_FONT_COLOR: u32 = 0xFFFFFF;
const BREAKOUT_FILL: u32 = 0xD4EFDF;
const SIGNAL_FILL: u32 = 0xD5F5E3;
const NO_SIGNAL_FILL: u32 = 0xFADBD8;

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Excel workbook, one worksheet per sheet
    Xlsx,
    /// HTML tables, one per sheet
    Html,
    /// Markdown tables, one per sheet
    Markdown,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Html => "html",
            Self::Markdown => "md",
        }
    }

    /// Whether this format can express `style`.
    pub fn supports(&self, style: Style) -> bool {
        match self {
            Self::Xlsx => true,
            Self::Html => matches!(
                style,
                Style::HeaderFill | Style::HeaderFont | Style::RowFill | Style::ColumnWidth
            ),
            Self::Markdown => matches!(style, Style::ColumnWidth),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xlsx => write!(f, "xlsx"),
            Self::Html => write!(f, "html"),
            Self::Markdown => write!(f, "markdown"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "html" | "htm" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(Error::Configuration(format!("Unknown report format: {}", s))),
        }
    }
}

/// A formatting step applied to a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Solid header background
    HeaderFill,
    /// White bold centered header text
    HeaderFont,
    /// Per-row background
    RowFill,
    /// Filter drop-downs on the header row
    AutoFilter,
    /// Column width fitted to content
    ColumnWidth,
}

/// Capability check before a styling step. Skipping is never an error.
fn apply_style(format: ReportFormat, style: Style, sheet: &str) -> bool {
    let supported = format.supports(style);
    if !supported {
        debug!(%format, ?style, sheet, "Style not supported by format, skipped");
    }
    supported
}

// ============================================================================
// Sheets
// ============================================================================

struct Sheet<'a> {
    title: &'static str,
    records: Vec<&'a SignalRecord>,
    rows: Vec<[String; 8]>,
    fills: Vec<u32>,
}

impl Sheet<'_> {
    /// Content width of each column plus two, header included.
    fn column_widths(&self) -> [usize; 8] {
        let mut widths = CSV_HEADER.map(str::len);
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        widths.map(|w| w + 2)
    }
}

fn cells(record: &SignalRecord) -> [String; 8] {
    [
        record.ticker.clone(),
        record.last_date.map(|d| d.to_string()).unwrap_or_default(),
        record.last_close.map(|c| c.to_string()).unwrap_or_default(),
        record.glb.to_string(),
        record.rs_break.to_string(),
        record.vol_ok.to_string(),
        record.signal.to_string(),
        record.notes.clone(),
    ]
}

/// Escape text for HTML bodies (report cells and Telegram messages).
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// Signal Report
// ============================================================================

/// Report over one scan's records.
pub struct SignalReport {
    records: Vec<SignalRecord>,
    stamp: String,
}

impl SignalReport {
    /// Records are grouped signals first, then by ticker.
    pub fn new(mut records: Vec<SignalRecord>, stamp: impl Into<String>) -> Self {
        sort_records(&mut records);
        Self {
            records,
            stamp: stamp.into(),
        }
    }

    /// Report stamped with the current local time.
    pub fn now(records: Vec<SignalRecord>) -> Self {
        Self::new(records, Local::now().format("%Y-%m-%d_%H%M").to_string())
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn records(&self) -> &[SignalRecord] {
        &self.records
    }

    /// Tickers with a signal.
    pub fn breakouts(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.signal)
            .map(|r| r.ticker.as_str())
            .collect()
    }

    pub fn has_breakouts(&self) -> bool {
        self.records.iter().any(|r| r.signal)
    }

    /// `<prefix>_<stamp>.<ext>`
    pub fn file_name(&self, prefix: &str, format: ReportFormat) -> String {
        format!("{}_{}.{}", prefix, self.stamp, format.extension())
    }

    fn sheets(&self) -> [Sheet<'_>; 2] {
        let breakouts: Vec<_> = self.records.iter().filter(|r| r.signal).collect();
        [
            Sheet {
                title: BREAKOUTS_SHEET,
                rows: breakouts.iter().map(|r| cells(r)).collect(),
                fills: vec![BREAKOUT_FILL; breakouts.len()],
                records: breakouts,
            },
            Sheet {
                title: ALL_SIGNALS_SHEET,
                records: self.records.iter().collect(),
                rows: self.records.iter().map(cells).collect(),
                fills: self
                    .records
                    .iter()
                    .map(|r| if r.signal { SIGNAL_FILL } else { NO_SIGNAL_FILL })
                    .collect(),
            },
        ]
    }

    /// Render the full report as file contents.
    pub fn render(&self, format: ReportFormat) -> Result<Vec<u8>> {
        let sheets = self.sheets();
        match format {
            ReportFormat::Xlsx => self
                .to_xlsx(&sheets)
                .map_err(|e| Error::Report(e.to_string())),
            ReportFormat::Html => Ok(self.to_html(&sheets).into_bytes()),
            ReportFormat::Markdown => Ok(self.to_markdown(&sheets).into_bytes()),
        }
    }

    /// Write the report into `dir` and return its path.
    pub fn save(&self, dir: &Path, prefix: &str, format: ReportFormat) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name(prefix, format));
        std::fs::write(&path, self.render(format)?)?;
        Ok(path)
    }

    /// Telegram summary (HTML parse mode).
    pub fn telegram_text(&self) -> String {
        let breakouts = self.breakouts();
        if breakouts.is_empty() {
            return format!("<b>GLB Report ({})</b>\nNo breakouts found.", self.stamp);
        }

        let lines: Vec<String> = breakouts
            .iter()
            .map(|t| format!("• {}", escape_html(t)))
            .collect();
        format!("<b>GLB Breakouts ({})</b>\n{}", self.stamp, lines.join("\n"))
    }

    fn to_xlsx(&self, sheets: &[Sheet<'_>]) -> std::result::Result<Vec<u8>, XlsxError> {
        let format = ReportFormat::Xlsx;
        let mut workbook = Workbook::new();

        for sheet in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.title)?;

            let mut header = Format::new();
            if apply_style(format, Style::HeaderFill, sheet.title) {
                header = header
                    .set_background_color(HEADER_FILL)
                    .set_pattern(FormatPattern::Solid);
            }
            if apply_style(format, Style::HeaderFont, sheet.title) {
                header = header
                    .set_font_color(HEADER_FONT_COLOR)
                    .set_bold()
                    .set_align(FormatAlign::Center);
            }
            for (col, name) in CSV_HEADER.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, *name, &header)?;
            }

            let fill_rows = apply_style(format, Style::RowFill, sheet.title);
            for (i, (record, fill)) in sheet.records.iter().zip(&sheet.fills).enumerate() {
                let row = (i + 1) as u32;
                let cell = if fill_rows {
                    Format::new()
                        .set_background_color(*fill)
                        .set_pattern(FormatPattern::Solid)
                } else {
                    Format::new()
                };

                worksheet.write_string_with_format(row, 0, &record.ticker, &cell)?;
                match record.last_date {
                    Some(date) => worksheet.write_string_with_format(row, 1, date.to_string(), &cell)?,
                    None => worksheet.write_blank(row, 1, &cell)?,
                };
                match record.last_close {
                    Some(close) => worksheet.write_number_with_format(row, 2, close, &cell)?,
                    None => worksheet.write_blank(row, 2, &cell)?,
                };
                worksheet.write_boolean_with_format(row, 3, record.glb, &cell)?;
                worksheet.write_boolean_with_format(row, 4, record.rs_break, &cell)?;
                worksheet.write_boolean_with_format(row, 5, record.vol_ok, &cell)?;
                worksheet.write_boolean_with_format(row, 6, record.signal, &cell)?;
                if record.notes.is_empty() {
                    worksheet.write_blank(row, 7, &cell)?;
                } else {
                    worksheet.write_string_with_format(row, 7, &record.notes, &cell)?;
                }
            }

            if apply_style(format, Style::AutoFilter, sheet.title) {
                let last_col = (CSV_HEADER.len() - 1) as u16;
                worksheet.autofilter(0, 0, sheet.records.len() as u32, last_col)?;
            }

            if apply_style(format, Style::ColumnWidth, sheet.title) {
                for (col, width) in sheet.column_widths().into_iter().enumerate() {
                    worksheet.set_column_width(col as u16, width as f64)?;
                }
            }
        }

        workbook.save_to_buffer()
    }

    fn to_html(&self, sheets: &[Sheet<'_>]) -> String {
        let format = ReportFormat::Html;
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(html, "<title>GLB Report {}</title>", escape_html(&self.stamp));
        html.push_str("</head>\n<body>\n");

        for sheet in sheets {
            let _ = writeln!(html, "<h2>{}</h2>", escape_html(sheet.title));
            html.push_str("<table border=\"1\" cellspacing=\"0\">\n");

            if apply_style(format, Style::ColumnWidth, sheet.title) {
                html.push_str("<colgroup>");
                for width in sheet.column_widths() {
                    let _ = write!(html, "<col style=\"width:{}ch\">", width);
                }
                html.push_str("</colgroup>\n");
            }

            // Sheets may be filtered; drop-downs are a spreadsheet feature.
            apply_style(format, Style::AutoFilter, sheet.title);

            let mut header_style = Vec::new();
            if apply_style(format, Style::HeaderFill, sheet.title) {
                header_style.push(format!("background:#{:06X}", HEADER_FILL));
            }
            if apply_style(format, Style::HeaderFont, sheet.title) {
                header_style.push(format!(
                    "color:#{:06X};font-weight:bold;text-align:center",
                    HEADER_FONT_COLOR
                ));
            }
            let header_attr = style_attr(&header_style);

            html.push_str("<thead><tr>");
            for name in CSV_HEADER {
                let _ = write!(html, "<th{}>{}</th>", header_attr, name);
            }
            html.push_str("</tr></thead>\n<tbody>\n");

            let fill_rows = apply_style(format, Style::RowFill, sheet.title);
            for (row, fill) in sheet.rows.iter().zip(&sheet.fills) {
                if fill_rows {
                    let _ = write!(html, "<tr style=\"background:#{:06X}\">", fill);
                } else {
                    html.push_str("<tr>");
                }
                for cell in row {
                    let _ = write!(html, "<td>{}</td>", escape_html(cell));
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</tbody>\n</table>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn to_markdown(&self, sheets: &[Sheet<'_>]) -> String {
        let format = ReportFormat::Markdown;
        let mut md = String::new();

        let _ = writeln!(md, "# GLB Report ({})\n", self.stamp);

        for sheet in sheets {
            let _ = writeln!(md, "## {}\n", sheet.title);

            apply_style(format, Style::HeaderFill, sheet.title);
            apply_style(format, Style::HeaderFont, sheet.title);
            apply_style(format, Style::AutoFilter, sheet.title);
            apply_style(format, Style::RowFill, sheet.title);

            let widths = if apply_style(format, Style::ColumnWidth, sheet.title) {
                sheet.column_widths().map(|w| w - 2)
            } else {
                [0; 8]
            };

            let header = CSV_HEADER.map(String::from);
            md.push_str(&markdown_row(&header, &widths));
            let rule = widths.map(|w| "-".repeat(w.max(3)));
            md.push_str(&markdown_row(&rule, &widths));
            for row in &sheet.rows {
                let escaped = row.clone().map(|c| c.replace('|', "\\|"));
                md.push_str(&markdown_row(&escaped, &widths));
            }
            md.push('\n');
        }

        md
    }
}

fn style_attr(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", parts.join(";"))
    }
}

fn markdown_row(cells: &[String; 8], widths: &[usize; 8]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell, width = width))
        .collect();
    format!("| {} |\n", padded.join(" | "))
}

// ============================================================================
// Tests
// ============================================================================
