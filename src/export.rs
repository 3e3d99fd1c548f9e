// 📤 Document Exporter - spreadsheet exports and patient reports (text or PDF)
// Callers hand over already-resolved rows; nothing here touches the store.

use crate::error::{Result, StoreError};
use crate::persistence::{encode_csv, encode_xlsx};
use crate::record::Record;
use crate::schema::Column;
use log::info;
use printpdf::{BuiltinFont, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

// ============================================================================
// SPREADSHEET EXPORT
// ============================================================================

/// Write rows to `.csv` or `.xlsx`, picked by extension. Returns the row count.
pub fn export_rows(path: &Path, rows: &[Record]) -> Result<usize> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("csv") => encode_csv(BufWriter::new(File::create(path)?), rows)?,
        Some("xlsx") => encode_xlsx(path, rows)?,
        _ => return Err(StoreError::UnsupportedFormat(path.to_path_buf())),
    }

    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

// ============================================================================
// PATIENT REPORTS
// ============================================================================

const RULE: &str = "----------------------------------------";

/// One patient, every column, multi-line fields indented under their label
pub fn render_report(record: &Record) -> String {
    let mut out = String::new();
    out.push_str("Patient Report\n");
    out.push_str(RULE);
    out.push('\n');

    for (name, value) in report_fields(record) {
        let label = format!("{}:", name);
        if value.contains('\n') {
            out.push_str(&label);
            out.push('\n');
            for line in value.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        } else {
            out.push_str(&format!("{:<12} {}\n", label, value));
        }
    }
    out
}

/// Several reports separated by a rule line
pub fn render_reports(records: &[Record]) -> String {
    records
        .iter()
        .map(render_report)
        .collect::<Vec<_>>()
        .join(&format!("\n{}\n\n", "=".repeat(RULE.len())))
}

/// Write reports to `path`: a PDF for `.pdf`, plain text otherwise
pub fn write_reports(path: &Path, records: &[Record]) -> Result<()> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        fs::write(path, render_reports_pdf(records)?)?;
    } else {
        fs::write(path, render_reports(records))?;
    }
    info!("Wrote {} patient reports to {}", records.len(), path.display());
    Ok(())
}

// ============================================================================
// PDF REPORTS
// ============================================================================

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.0;
const WRAP_CHARS: usize = 80;

/// A4 PDF with one page (or more, for long records) per patient. Returns the
/// document bytes.
pub fn render_reports_pdf(records: &[Record]) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("Patient Report", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            layer = new_page(&doc);
        }

        let mut y = TOP;
        layer.use_text("Patient Report", 14.0, Mm(LEFT), Mm(y), &bold);
        y -= LINE_HEIGHT * 2.0;

        for (label, value) in report_fields(record) {
            let lines = wrap_text(&value, WRAP_CHARS);
            for (n, line) in lines.iter().enumerate() {
                if y < BOTTOM {
                    layer = new_page(&doc);
                    y = TOP;
                }
                if n == 0 {
                    layer.use_text(format!("{}:", label), 10.0, Mm(LEFT), Mm(y), &bold);
                }
                layer.use_text(line.as_str(), 10.0, Mm(LEFT + 35.0), Mm(y), &font);
                y -= LINE_HEIGHT;
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(pdf_error)?;
    buf.into_inner().map_err(pdf_error)
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn pdf_error<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Document(e.to_string())
}

/// Label and value pairs shared by the text and PDF layouts; photo status comes last
fn report_fields(record: &Record) -> Vec<(&'static str, String)> {
    let mut fields: Vec<(&'static str, String)> = Column::ALL
        .iter()
        .filter(|c| **c != Column::PhotoPath)
        .map(|c| (c.name(), record.get(*c).to_string()))
        .collect();

    let photo = match record.photo() {
        Some(path) => path.display().to_string(),
        None => "Photo not available".to_string(),
    };
    fields.push(("Photo", photo));
    fields
}

/// Word wrap that keeps explicit line breaks. Always returns at least one line.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
