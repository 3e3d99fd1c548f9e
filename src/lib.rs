// Patient Records - Core Library
// Exposes all modules for use in the CLI, the terminal UI, and tests

pub mod error;
pub mod schema;         // Column order and semantic types
pub mod record;         // Record, RecordPatch, Table
pub mod persistence;    // CSV / XLSX backing file + spreadsheet import
pub mod store;          // Record Store: single writer, persist-then-reload
pub mod view;           // Search / filter / sort / paginate
pub mod deduplication;  // Duplicate groups over a composite key
pub mod statistics;     // Descriptive summaries
pub mod photos;         // Managed photo directory
pub mod export;         // CSV / XLSX export, text and PDF reports
pub mod backup;         // Verified backups of the backing file
pub mod config;

// Re-export commonly used types
pub use error::{Result, StoreError};
pub use schema::{Column, ColumnKind, Gender, Satisfaction};
pub use record::{Record, RecordPatch, Table};
pub use persistence::{
    encode_xlsx, read_external, BackingFormat, FileStorage, MemoryStorage, SheetFormat,
    TableStorage,
};
pub use store::RecordStore;
pub use view::{
    build_view, matching_rows, SelectionSet, View, ViewQuery,
    DEFAULT_PAGE_SIZE, SHOW_ALL,
};
pub use deduplication::{
    find_groups, DuplicateGroup, DuplicateResolver, DuplicateReview,
};
pub use statistics::{summarize, GenderCounts, Summary};
pub use photos::{PhotoDirectory, PhotoManager};
pub use export::{
    export_rows, render_report, render_reports, render_reports_pdf, write_reports,
};
pub use backup::{create_backup, BackupReport};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
