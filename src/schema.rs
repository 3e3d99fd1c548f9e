// 📐 Schema - fixed column order and per-column semantic type
// Defines what a patient record is. Everything persisted follows this order.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// COLUMN KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Text-typed positive integer, unique per table
    Identifier,
    /// Filesystem path to an external file
    Path,
    /// Single-line text
    Text,
    /// Free text that may span lines
    MultiLine,
    /// Non-negative whole number, kept as entered
    Integer,
    /// ISO `YYYY-MM-DD`
    Date,
    /// One of a closed set of labels
    Choice,
}

// ============================================================================
// COLUMNS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    SerialNo,
    PhotoPath,
    Name,
    Email,
    Gender,
    Age,
    Address,
    PhoneNo,
    Occupation,
    AadharNo,
    Symptoms,
    Treatment,
    StartDate,
    EndDate,
    Satisfied,
}

impl Column {
    /// Every column, in persisted order
    pub const ALL: [Column; 15] = [
        Column::SerialNo,
        Column::PhotoPath,
        Column::Name,
        Column::Email,
        Column::Gender,
        Column::Age,
        Column::Address,
        Column::PhoneNo,
        Column::Occupation,
        Column::AadharNo,
        Column::Symptoms,
        Column::Treatment,
        Column::StartDate,
        Column::EndDate,
        Column::Satisfied,
    ];

    /// Fields a registration cannot leave blank
    pub const REQUIRED: [Column; 5] = [
        Column::Name,
        Column::Email,
        Column::Gender,
        Column::Age,
        Column::PhoneNo,
    ];

    /// Composite key used to detect duplicate patients
    pub const DUPLICATE_KEY: [Column; 4] = [
        Column::Name,
        Column::Email,
        Column::PhoneNo,
        Column::AadharNo,
    ];

    /// Sort choices offered by the record views
    pub const SORTABLE: [Column; 5] = [
        Column::SerialNo,
        Column::Name,
        Column::Age,
        Column::StartDate,
        Column::EndDate,
    ];

    /// Header text in the backing file
    pub fn name(&self) -> &'static str {
        match self {
            Column::SerialNo => "SerialNo",
            Column::PhotoPath => "PhotoPath",
            Column::Name => "Name",
            Column::Email => "Email",
            Column::Gender => "Gender",
            Column::Age => "Age",
            Column::Address => "Address",
            Column::PhoneNo => "PhoneNo",
            Column::Occupation => "Occupation",
            Column::AadharNo => "AadharNo",
            Column::Symptoms => "Symptoms",
            Column::Treatment => "Treatment",
            Column::StartDate => "StartDate",
            Column::EndDate => "EndDate",
            Column::Satisfied => "Satisfied",
        }
    }

    /// Exact header match; anything else is not a Schema column
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.name() == name.trim())
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::SerialNo => ColumnKind::Identifier,
            Column::PhotoPath => ColumnKind::Path,
            Column::Age => ColumnKind::Integer,
            Column::Symptoms | Column::Treatment => ColumnKind::MultiLine,
            Column::StartDate | Column::EndDate => ColumnKind::Date,
            Column::Gender | Column::Satisfied => ColumnKind::Choice,
            _ => ColumnKind::Text,
        }
    }

    /// Columns compared as numbers when sorting
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind(), ColumnKind::Identifier | ColumnKind::Integer)
    }

    pub fn is_required(&self) -> bool {
        Column::REQUIRED.contains(self)
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Header row, in persisted order
pub fn header() -> Vec<&'static str> {
    Column::ALL.iter().map(|c| c.name()).collect()
}

// ============================================================================
// CHOICE VALUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<Gender> {
        Gender::ALL.iter().copied().find(|g| g.label() == value.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Satisfaction {
    Yes,
    No,
    NotSure,
}

impl Satisfaction {
    pub const ALL: [Satisfaction; 3] = [Satisfaction::Yes, Satisfaction::No, Satisfaction::NotSure];

    pub fn label(&self) -> &'static str {
        match self {
            Satisfaction::Yes => "Yes",
            Satisfaction::No => "No",
            Satisfaction::NotSure => "Not Sure",
        }
    }

    pub fn parse(value: &str) -> Option<Satisfaction> {
        Satisfaction::ALL
            .iter()
            .copied()
            .find(|s| s.label() == value.trim())
    }
}
