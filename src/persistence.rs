// 💾 Persistence Adapter - whole-table reads and writes of the backing file
// Backing file is CSV (or an .xlsx workbook) with a header row; every cell is
// text so identifiers, phone numbers and Aadhar numbers keep their exact digits.

use crate::error::{Result, StoreError};
use crate::record::{Record, Table};
use crate::schema::{self, Column};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use log::{debug, info, warn};
use rust_xlsxwriter::Workbook;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Durable home of the patient table.
///
/// Implementations only move whole tables; identity and uniqueness rules live
/// in the record store.
pub trait TableStorage {
    /// Strict read. Fails on a missing, unreadable or malformed file.
    fn read(&self) -> Result<Table>;

    /// Full overwrite of the stored table
    fn save(&mut self, table: &Table) -> Result<()>;

    /// Create an empty table with the Schema header if nothing is stored yet
    fn ensure_initialized(&mut self) -> Result<()>;

    /// Best-effort read: any failure yields an empty table
    fn load(&self) -> Table {
        match self.read() {
            Ok(table) => table,
            Err(e) => {
                warn!("Could not load patient table, starting empty: {}", e);
                Table::new()
            }
        }
    }
}

// ============================================================================
// CSV CODEC
// ============================================================================

/// Decode a CSV table. Missing Schema columns become "", unknown columns are dropped.
pub fn decode_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: Record = result?;
        rows.push(record);
    }

    Ok(Table::from_rows(rows))
}

/// Encode a table with the Schema header, even when there are no rows
pub fn encode_csv<W: Write>(writer: W, rows: &[Record]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(schema::header())?;
    for record in rows {
        wtr.write_record(record.values())?;
    }
    wtr.flush()?;

    Ok(())
}

// ============================================================================
// FILE STORAGE
// ============================================================================

/// Encoding of the backing file, chosen from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingFormat {
    Csv,
    Xlsx,
}

impl BackingFormat {
    /// `.xlsx` is a workbook; anything else is stored as CSV
    pub fn for_path(path: &Path) -> BackingFormat {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx") => BackingFormat::Xlsx,
            _ => BackingFormat::Csv,
        }
    }
}

pub struct FileStorage {
    path: PathBuf,
    format: BackingFormat,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = BackingFormat::for_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> BackingFormat {
        self.format
    }

    fn temp_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("patients");
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        dir.join(format!(".{}-{}.tmp", stem, Uuid::new_v4()))
    }
}

impl TableStorage for FileStorage {
    fn read(&self) -> Result<Table> {
        let table = match self.format {
            BackingFormat::Csv => decode_csv(File::open(&self.path)?)?,
            BackingFormat::Xlsx => read_workbook(&self.path)?,
        };
        debug!("Read {} rows from {}", table.len(), self.path.display());
        Ok(table)
    }

    fn save(&mut self, table: &Table) -> Result<()> {
        // Atomic write: temp sibling, then rename over the backing file
        let tmp_path = self.temp_path();
        if let Err(e) = write_then_rename(self.format, &tmp_path, &self.path, table.rows()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        info!("Saved {} rows to {}", table.len(), self.path.display());
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        info!("Creating empty patient table at {}", self.path.display());
        self.save(&Table::new())
    }
}

fn write_then_rename(
    format: BackingFormat,
    tmp_path: &Path,
    target: &Path,
    rows: &[Record],
) -> Result<()> {
    match format {
        BackingFormat::Csv => {
            let mut writer = BufWriter::new(File::create(tmp_path)?);
            encode_csv(&mut writer, rows)?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        }
        BackingFormat::Xlsx => encode_xlsx(tmp_path, rows)?,
    }
    fs::rename(tmp_path, target)?;
    Ok(())
}

/// Write one "Patients" worksheet with the Schema header. Every cell is a
/// string so identifiers keep their digits; blank values leave the cell empty.
pub fn encode_xlsx(path: &Path, rows: &[Record]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Patients")?;

    for (col, name) in schema::header().iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (i, record) in rows.iter().enumerate() {
        let row = u32::try_from(i + 1)
            .map_err(|_| StoreError::Spreadsheet(format!("too many rows for {}", path.display())))?;
        for (col, value) in record.values().iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(row, col as u16, *value)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

// ============================================================================
// IN-MEMORY STORAGE
// ============================================================================

/// Keeps the encoded CSV bytes in memory. Same codec as the file storage, so
/// reloads normalize exactly like a real file would.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    bytes: Option<Vec<u8>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage preloaded with raw CSV bytes
    pub fn with_contents(contents: impl AsRef<[u8]>) -> Self {
        Self {
            bytes: Some(contents.as_ref().to_vec()),
            fail_writes: false,
        }
    }

    /// Make every subsequent save fail with an IO error
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn contents(&self) -> Option<String> {
        self.bytes
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

impl TableStorage for MemoryStorage {
    fn read(&self) -> Result<Table> {
        match &self.bytes {
            Some(bytes) => decode_csv(bytes.as_slice()),
            None => Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no table stored",
            ))),
        }
    }

    fn save(&mut self, table: &Table) -> Result<()> {
        if self.fail_writes {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage is read-only",
            )));
        }

        let mut buf = Vec::new();
        encode_csv(&mut buf, table.rows())?;
        self.bytes = Some(buf);
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        if self.bytes.is_none() {
            self.save(&Table::new())?;
        }
        Ok(())
    }
}

// ============================================================================
// EXTERNAL SPREADSHEETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    pub fn detect(path: &Path) -> Option<SheetFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SheetFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SheetFormat::Workbook),
            _ => None,
        }
    }
}

/// Read a spreadsheet with any subset of the Schema columns, in any order
pub fn read_external(path: &Path) -> Result<Table> {
    let table = match SheetFormat::detect(path) {
        Some(SheetFormat::Csv) => decode_csv(File::open(path)?)?,
        Some(SheetFormat::Workbook) => read_workbook(path)?,
        None => return Err(StoreError::UnsupportedFormat(path.to_path_buf())),
    };

    info!("Read {} rows from {}", table.len(), path.display());
    Ok(table)
}

/// First worksheet, first row is the header
fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Table::new()),
    };

    let mut rows = range.rows();
    let columns: Vec<Option<Column>> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| Column::from_name(&cell_text(cell)))
            .collect(),
        None => return Ok(Table::new()),
    };

    let mut table = Table::new();
    for row in rows {
        if row.iter().all(|cell| cell_text(cell).trim().is_empty()) {
            continue;
        }

        let record = Record::from_values(
            columns
                .iter()
                .zip(row.iter())
                .filter_map(|(column, cell)| column.map(|c| (c, cell_text(cell)))),
        );
        table.push(record);
    }

    Ok(table)
}

/// Text form of a workbook cell. Whole floats drop their ".0", date cells become ISO dates.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(serial: &str, name: &str) -> Record {
        Record {
            serial_no: serial.to_string(),
            name: name.to_string(),
            email: "p@example.com".to_string(),
            gender: "Male".to_string(),
            age: "40".to_string(),
            phone_no: "0098765432".to_string(),
            aadhar_no: "000123456789".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_writes_header_for_empty_table() {
        let mut buf = Vec::new();
        encode_csv(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.trim_end(), schema::header().join(","));
    }

    #[test]
    fn test_decode_fills_missing_columns_and_drops_unknown() {
        let csv_text = "Name,Extra,SerialNo\nRavi,zzz,4\n";
        let table = decode_csv(csv_text.as_bytes()).unwrap();

        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.serial_no, "4");
        assert_eq!(row.name, "Ravi");
        assert_eq!(row.email, "");
        assert_eq!(row.satisfied, "");
    }

    #[test]
    fn test_identifier_like_text_survives_round_trip() {
        let rows = vec![create_test_record("007", "Leading Zero")];
        let mut buf = Vec::new();
        encode_csv(&mut buf, &rows).unwrap();

        let table = decode_csv(buf.as_slice()).unwrap();
        assert_eq!(table.rows()[0].serial_no, "007");
        assert_eq!(table.rows()[0].phone_no, "0098765432");
        assert_eq!(table.rows()[0].aadhar_no, "000123456789");
    }

    #[test]
    fn test_multiline_text_round_trip() {
        let mut record = create_test_record("1", "Notes");
        record.symptoms = "fever, chills\nheadache \"severe\"".to_string();
        let mut buf = Vec::new();
        encode_csv(&mut buf, &[record.clone()]).unwrap();

        let table = decode_csv(buf.as_slice()).unwrap();
        assert_eq!(table.rows()[0], record);
    }

    #[test]
    fn test_memory_storage_load_is_best_effort() {
        let storage = MemoryStorage::new();
        assert!(storage.read().is_err());
        assert!(storage.load().is_empty());

        let corrupt = MemoryStorage::with_contents(b"SerialNo,Name\n1,\xff\xfe\n");
        assert!(corrupt.read().is_err());
        assert!(corrupt.load().is_empty());
    }

    #[test]
    fn test_memory_storage_write_failure_surfaces() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        let err = storage.save(&Table::new()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_csv_storage_initializes_and_saves_atomically() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("patients.csv");
        let mut storage = FileStorage::new(&path);

        storage.ensure_initialized().unwrap();
        assert!(path.exists());
        assert!(storage.read().unwrap().is_empty());

        let table = Table::from_rows(vec![create_test_record("1", "A")]);
        storage.save(&table).unwrap();
        assert_eq!(storage.read().unwrap(), table);

        for entry in fs::read_dir(path.parent().unwrap()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            assert!(!name.ends_with(".tmp"), "Found leftover tmp file: {}", name);
        }
    }

    #[test]
    fn test_csv_storage_load_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.csv"));
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_xlsx_backing_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("patients.xlsx");
        let mut storage = FileStorage::new(&path);
        assert_eq!(storage.format(), BackingFormat::Xlsx);

        storage.ensure_initialized().unwrap();
        assert!(storage.read().unwrap().is_empty());

        let mut record = create_test_record("007", "Workbook");
        record.symptoms = "fever\nheadache".to_string();
        let table = Table::from_rows(vec![record, create_test_record("8", "Second")]);
        storage.save(&table).unwrap();

        assert_eq!(storage.read().unwrap(), table);
        assert_eq!(
            read_external(&path).unwrap().rows()[0].aadhar_no,
            "000123456789"
        );
    }

    #[test]
    fn test_backing_format_from_extension() {
        assert_eq!(BackingFormat::for_path(Path::new("p.XLSX")), BackingFormat::Xlsx);
        assert_eq!(BackingFormat::for_path(Path::new("p.csv")), BackingFormat::Csv);
        assert_eq!(BackingFormat::for_path(Path::new("patients")), BackingFormat::Csv);
    }

    #[test]
    fn test_read_external_rejects_unknown_extension() {
        let err = read_external(Path::new("patients.txt")).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(SheetFormat::detect(Path::new("a.CSV")), Some(SheetFormat::Csv));
        assert_eq!(SheetFormat::detect(Path::new("a.xlsx")), Some(SheetFormat::Workbook));
        assert_eq!(SheetFormat::detect(Path::new("a")), None);
    }

    #[test]
    fn test_cell_text_conversions() {
        assert_eq!(cell_text(&Data::Float(9876543210.0)), "9876543210");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("Asha".into())), "Asha");
    }
}
