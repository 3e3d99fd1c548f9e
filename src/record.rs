// 🧾 Patient Record - fixed-shape row of the patient table
// All values are held as text, exactly as persisted. Typed accessors parse on demand.

use crate::error::{Result, StoreError};
use crate::schema::{Column, Gender, Satisfaction};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ============================================================================
// RECORD
// ============================================================================

/// One patient. Field renames are the backing file's header names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "SerialNo", default)]
    pub serial_no: String,

    #[serde(rename = "PhotoPath", default)]
    pub photo_path: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Email", default)]
    pub email: String,

    #[serde(rename = "Gender", default)]
    pub gender: String,

    #[serde(rename = "Age", default)]
    pub age: String,

    #[serde(rename = "Address", default)]
    pub address: String,

    #[serde(rename = "PhoneNo", default)]
    pub phone_no: String,

    #[serde(rename = "Occupation", default)]
    pub occupation: String,

    #[serde(rename = "AadharNo", default)]
    pub aadhar_no: String,

    #[serde(rename = "Symptoms", default)]
    pub symptoms: String,

    #[serde(rename = "Treatment", default)]
    pub treatment: String,

    #[serde(rename = "StartDate", default)]
    pub start_date: String,

    #[serde(rename = "EndDate", default)]
    pub end_date: String,

    #[serde(rename = "Satisfied", default)]
    pub satisfied: String,
}

impl Record {
    /// Blank registration form: serial pre-allocated, treatment starting today
    pub fn new_registration(serial: u64) -> Self {
        Record {
            serial_no: serial.to_string(),
            start_date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            ..Default::default()
        }
    }

    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::SerialNo => &self.serial_no,
            Column::PhotoPath => &self.photo_path,
            Column::Name => &self.name,
            Column::Email => &self.email,
            Column::Gender => &self.gender,
            Column::Age => &self.age,
            Column::Address => &self.address,
            Column::PhoneNo => &self.phone_no,
            Column::Occupation => &self.occupation,
            Column::AadharNo => &self.aadhar_no,
            Column::Symptoms => &self.symptoms,
            Column::Treatment => &self.treatment,
            Column::StartDate => &self.start_date,
            Column::EndDate => &self.end_date,
            Column::Satisfied => &self.satisfied,
        }
    }

    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        let value = value.into();
        match column {
            Column::SerialNo => self.serial_no = value,
            Column::PhotoPath => self.photo_path = value,
            Column::Name => self.name = value,
            Column::Email => self.email = value,
            Column::Gender => self.gender = value,
            Column::Age => self.age = value,
            Column::Address => self.address = value,
            Column::PhoneNo => self.phone_no = value,
            Column::Occupation => self.occupation = value,
            Column::AadharNo => self.aadhar_no = value,
            Column::Symptoms => self.symptoms = value,
            Column::Treatment => self.treatment = value,
            Column::StartDate => self.start_date = value,
            Column::EndDate => self.end_date = value,
            Column::Satisfied => self.satisfied = value,
        }
    }

    /// Builder pattern: set one column
    pub fn with(mut self, column: Column, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Values in persisted column order
    pub fn values(&self) -> Vec<&str> {
        Column::ALL.iter().map(|c| self.get(*c)).collect()
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (Column, S)>,
        S: Into<String>,
    {
        let mut record = Record::default();
        for (column, value) in values {
            record.set(column, value);
        }
        record
    }

    // ========================================================================
    // TYPED ACCESSORS
    // ========================================================================

    pub fn serial(&self) -> Option<u64> {
        parse_serial(&self.serial_no)
    }

    pub fn gender(&self) -> Option<Gender> {
        Gender::parse(&self.gender)
    }

    pub fn age_years(&self) -> Option<u32> {
        parse_age(&self.age)
    }

    pub fn start(&self) -> Option<NaiveDate> {
        parse_date(&self.start_date)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        parse_date(&self.end_date)
    }

    pub fn satisfaction(&self) -> Option<Satisfaction> {
        Satisfaction::parse(&self.satisfied)
    }

    /// Treatment length in days when both dates parse
    pub fn duration_days(&self) -> Option<i64> {
        Some((self.end()? - self.start()?).num_days())
    }

    /// Photo path, only if the file exists right now
    pub fn photo(&self) -> Option<&Path> {
        let path = self.photo_path.trim();
        if path.is_empty() {
            return None;
        }
        let path = Path::new(path);
        path.exists().then_some(path)
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Registration rules: required fields present, Age and SerialNo numeric
    pub fn validate(&self) -> Result<()> {
        for column in Column::REQUIRED {
            if self.get(column).trim().is_empty() {
                return Err(StoreError::validation(column.name(), "required field is empty"));
            }
        }

        validate_age(&self.age)?;
        validate_serial(&self.serial_no)?;

        Ok(())
    }

    /// Trimmed copy with the identifier in canonical integer form
    pub fn normalized(&self) -> Record {
        let mut record = Record::default();
        for column in Column::ALL {
            record.set(column, self.get(column).trim());
        }
        if let Some(serial) = record.serial() {
            record.serial_no = serial.to_string();
        }
        record
    }

    /// Every key column blank
    pub fn has_blank_key(&self, key: &[Column]) -> bool {
        key.iter().all(|c| self.get(*c).trim().is_empty())
    }
}

// ============================================================================
// PATCH
// ============================================================================

/// Field overwrites for an existing record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub fields: BTreeMap<Column, String>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: Column, value: impl Into<String>) -> Self {
        self.fields.insert(column, value.into());
        self
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        self.fields.get(&column).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Format checks on the fields being overwritten
    pub fn validate(&self) -> Result<()> {
        if let Some(serial) = self.get(Column::SerialNo) {
            validate_serial(serial)?;
        }
        if let Some(age) = self.get(Column::Age) {
            if !age.trim().is_empty() {
                validate_age(age)?;
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, record: &mut Record) {
        for (column, value) in &self.fields {
            let value = match column {
                Column::SerialNo => parse_serial(value)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| value.trim().to_string()),
                _ => value.clone(),
            };
            record.set(*column, value);
        }
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Ordered rows; insertion order is the row order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Record>) -> Self {
        Table { rows }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    pub fn retain<F: FnMut(&Record) -> bool>(&mut self, f: F) {
        self.rows.retain(f);
    }

    pub fn position(&self, serial: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.serial_no == serial)
    }

    pub fn find(&self, serial: &str) -> Option<&Record> {
        self.rows.iter().find(|r| r.serial_no == serial)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.rows.get_mut(index)
    }

    pub fn contains_serial(&self, serial: &str) -> bool {
        self.position(serial).is_some()
    }

    /// Largest numeric SerialNo; non-numeric identifiers are ignored
    pub fn max_serial(&self) -> Option<u64> {
        self.rows.iter().filter_map(Record::serial).max()
    }

    /// Fails once the largest serial is u64::MAX
    pub fn next_serial(&self) -> Result<u64> {
        match self.max_serial() {
            None => Ok(1),
            Some(max) => max.checked_add(1).ok_or_else(serials_exhausted),
        }
    }
}

pub(crate) fn serials_exhausted() -> StoreError {
    StoreError::validation(
        Column::SerialNo.name(),
        format!("no serial number is left after {}", u64::MAX),
    )
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Table {
            rows: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// VALUE PARSING
// ============================================================================

/// Positive integer identifier. Spreadsheet float artifacts like "12.0" count.
pub fn parse_serial(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<u64>() {
        return Some(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => {
            Some(f as u64)
        }
        _ => None,
    }
}

pub fn parse_age(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

/// ISO dates, plus the timestamp forms spreadsheets produce for date cells
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d);
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }

    None
}

fn validate_age(value: &str) -> Result<()> {
    if parse_age(value).is_none() {
        return Err(StoreError::validation(
            Column::Age.name(),
            format!("'{}' is not a non-negative whole number", value.trim()),
        ));
    }
    Ok(())
}

fn validate_serial(value: &str) -> Result<()> {
    match parse_serial(value) {
        Some(n) if n > 0 => Ok(()),
        _ => Err(StoreError::validation(
            Column::SerialNo.name(),
            format!("'{}' is not a positive whole number", value.trim()),
        )),
    }
}
