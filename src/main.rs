// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use patient_records::{
    build_view, create_backup, export_rows, matching_rows, render_reports, summarize,
    write_reports, AppConfig, Column, DuplicateResolver, PhotoDirectory, Record, RecordPatch,
    RecordStore, ViewQuery,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patient-records", version)]
#[command(about = "Patient record keeping backed by a single spreadsheet file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backing data file (overrides config and PATIENTS_DATA_FILE)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the data file if it does not exist
    Init,

    /// Register a new patient
    Add(AddArgs),

    /// Change fields of an existing patient
    Edit {
        serial: String,

        /// COLUMN=VALUE, e.g. --set Age=41 --set "Treatment=Rest"
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        assignments: Vec<(Column, String)>,
    },

    /// Delete patients by serial number
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true, num_args = 1..)]
        serials: Vec<String>,
    },

    /// List patients one page at a time
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long, value_parser = parse_column)]
        sort: Option<Column>,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long)]
        page_size: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show every field of one patient
    Show { serial: String },

    /// List possible duplicate patients
    Dups {
        /// Show each key group separately instead of one list
        #[arg(long)]
        grouped: bool,

        #[arg(long)]
        json: bool,
    },

    /// Summary statistics for all patients, or the given serial numbers
    Stats {
        serials: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Append rows from a .csv or spreadsheet file with fresh serial numbers
    Import { path: PathBuf },

    /// Export matching patients (or the given serials) to .csv or .xlsx
    Export {
        path: PathBuf,

        #[command(flatten)]
        query: QueryArgs,

        #[arg(long = "serial")]
        serials: Vec<String>,
    },

    /// Patient reports, printed as text or written to a file
    Report {
        #[arg(required = true, num_args = 1..)]
        serials: Vec<String>,

        /// Output file; a .pdf path gets a PDF, anything else plain text
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy the data file to a timestamped, verified backup
    Backup {
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Manage patient photos
    Photo {
        #[command(subcommand)]
        action: PhotoAction,
    },

    /// Interactive terminal UI (default)
    Tui,
}

#[derive(Subcommand, Debug)]
enum PhotoAction {
    /// Copy an image into the photo directory and attach it
    Set { serial: String, source: PathBuf },

    /// Delete the patient's photo
    Remove { serial: String },
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    /// Defaults to the next free serial number
    #[arg(long)]
    serial: Option<u64>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    gender: String,
    #[arg(long)]
    age: String,
    #[arg(long)]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    occupation: String,
    #[arg(long, default_value = "")]
    aadhar: String,
    #[arg(long, default_value = "")]
    symptoms: String,
    #[arg(long, default_value = "")]
    treatment: String,
    /// Defaults to today
    #[arg(long)]
    start_date: Option<String>,
    #[arg(long, default_value = "")]
    end_date: String,
    #[arg(long, default_value = "")]
    satisfied: String,
    #[arg(long)]
    photo: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Case-insensitive text to look for
    #[arg(short, long, default_value = "")]
    search: String,

    /// Restrict the search to these columns
    #[arg(long = "in", value_parser = parse_column, value_delimiter = ',')]
    search_in: Vec<Column>,

    /// Male, Female, Other or All
    #[arg(long)]
    gender: Option<String>,
}

impl QueryArgs {
    fn to_query(&self) -> ViewQuery {
        let mut query = ViewQuery::new().search(self.search.clone());
        if !self.search_in.is_empty() {
            query = query.search_in(self.search_in.clone());
        }
        if let Some(gender) = &self.gender {
            query = query.filter(Column::Gender, gender.clone());
        }
        query
    }
}

fn parse_column(s: &str) -> std::result::Result<Column, String> {
    Column::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = Column::ALL.iter().map(|c| c.name()).collect();
        format!("unknown column '{}' (expected one of {})", s, names.join(", "))
    })
}

fn parse_assignment(s: &str) -> std::result::Result<(Column, String), String> {
    let (column, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got '{}'", s))?;
    Ok((parse_column(column)?, value.to_string()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(data_file) = cli.data_file {
        config.data_file = data_file;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Init => run_init(&config),
        Commands::Add(args) => run_add(&config, args),
        Commands::Edit { serial, assignments } => run_edit(&config, &serial, assignments),
        Commands::Delete { serials } => run_delete(&config, &serials),
        Commands::List {
            query,
            sort,
            page,
            page_size,
            json,
        } => run_list(&config, &query, sort, page, page_size, json),
        Commands::Show { serial } => run_show(&config, &serial),
        Commands::Dups { grouped, json } => run_dups(&config, grouped, json),
        Commands::Stats { serials, json } => run_stats(&config, &serials, json),
        Commands::Import { path } => run_import(&config, &path),
        Commands::Export {
            path,
            query,
            serials,
        } => run_export(&config, &path, &query, &serials),
        Commands::Report { serials, output } => run_report(&config, &serials, output),
        Commands::Backup { dest } => run_backup(&config, dest),
        Commands::Photo { action } => run_photo(&config, action),
        Commands::Tui => run_ui_mode(&config),
    }
}

fn open_store(config: &AppConfig) -> RecordStore {
    RecordStore::open(&config.data_file)
}

fn run_init(config: &AppConfig) -> Result<()> {
    let store = open_store(config);
    println!(
        "✓ {} ready ({} patients)",
        config.data_file.display(),
        store.len()
    );
    Ok(())
}

fn run_add(config: &AppConfig, args: AddArgs) -> Result<()> {
    let mut store = open_store(config);
    let serial = match args.serial {
        Some(serial) => serial,
        None => store.next_serial()?,
    };

    let mut record = Record::new_registration(serial)
        .with(Column::Name, args.name)
        .with(Column::Email, args.email)
        .with(Column::Gender, args.gender)
        .with(Column::Age, args.age)
        .with(Column::PhoneNo, args.phone)
        .with(Column::Address, args.address)
        .with(Column::Occupation, args.occupation)
        .with(Column::AadharNo, args.aadhar)
        .with(Column::Symptoms, args.symptoms)
        .with(Column::Treatment, args.treatment)
        .with(Column::EndDate, args.end_date)
        .with(Column::Satisfied, args.satisfied);
    if let Some(start) = args.start_date {
        record.set(Column::StartDate, start);
    }

    let created = store.create(record)?;
    println!("✓ Registered patient {} ({})", created.serial_no, created.name);

    if let Some(source) = args.photo {
        let photos = PhotoDirectory::new(&config.photo_dir);
        let updated = store.set_photo(&created.serial_no, &source, &photos)?;
        println!("✓ Photo stored at {}", updated.photo_path);
    }
    Ok(())
}

fn run_edit(config: &AppConfig, serial: &str, assignments: Vec<(Column, String)>) -> Result<()> {
    let mut store = open_store(config);
    let patch = assignments
        .into_iter()
        .fold(RecordPatch::new(), |patch, (column, value)| patch.set(column, value));

    let updated = store.update(serial, &patch)?;
    println!("✓ Updated patient {}", updated.serial_no);
    Ok(())
}

fn run_delete(config: &AppConfig, serials: &[String]) -> Result<()> {
    let mut store = open_store(config);
    let removed = store.delete(serials)?;
    println!("✓ Deleted {} of {} requested patients", removed, serials.len());
    Ok(())
}

#[derive(Serialize)]
struct ListOutput<'a> {
    page: usize,
    total_pages: usize,
    total_count: usize,
    rows: &'a [Record],
}

fn run_list(
    config: &AppConfig,
    args: &QueryArgs,
    sort: Option<Column>,
    page: usize,
    page_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let store = open_store(config);
    let mut query = args
        .to_query()
        .page(page.saturating_sub(1))
        .page_size(page_size.unwrap_or(config.page_size));
    query.sort_key = sort;

    let view = build_view(store.snapshot(), &query);

    if json {
        let output = ListOutput {
            page: view.page_index + 1,
            total_pages: view.total_pages,
            total_count: view.total_count,
            rows: &view.rows,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_rows(&view.rows);
    println!("\n{}", view.page_label());
    Ok(())
}

fn print_rows(rows: &[Record]) {
    println!(
        "{:>6}  {:<24} {:<7} {:>4}  {:<14} {:<11} {:<11}",
        "Serial", "Name", "Gender", "Age", "Phone", "Start", "End"
    );
    println!("{}", "━".repeat(84));
    for r in rows {
        println!(
            "{:>6}  {:<24} {:<7} {:>4}  {:<14} {:<11} {:<11}",
            r.serial_no,
            truncate(&r.name, 24),
            r.gender,
            r.age,
            r.phone_no,
            r.start_date,
            r.end_date
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn run_show(config: &AppConfig, serial: &str) -> Result<()> {
    let store = open_store(config);
    let record = store
        .find(serial)
        .with_context(|| format!("No patient with serial number {}", serial))?;
    print!("{}", render_reports(std::slice::from_ref(record)));
    Ok(())
}

fn run_dups(config: &AppConfig, grouped: bool, json: bool) -> Result<()> {
    let store = open_store(config);
    let resolver = DuplicateResolver::new();

    if grouped {
        let groups = resolver.find_groups(store.snapshot());
        if json {
            println!("{}", serde_json::to_string_pretty(&groups)?);
            return Ok(());
        }
        if groups.is_empty() {
            println!("✓ No duplicate patients found");
        }
        for (i, group) in groups.iter().enumerate() {
            println!("\n🔍 Group {} ({} patients)", i + 1, group.len());
            print_rows(&group.rows);
        }
        return Ok(());
    }

    let rows = resolver.duplicate_rows(store.snapshot());
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("✓ No duplicate patients found");
    } else {
        println!("🔍 {} possible duplicate patients", rows.len());
        print_rows(&rows);
    }
    Ok(())
}

fn run_stats(config: &AppConfig, serials: &[String], json: bool) -> Result<()> {
    let store = open_store(config);
    let summary = if serials.is_empty() {
        summarize(store.snapshot())
    } else {
        let rows = store.select_rows(serials);
        if rows.is_empty() {
            bail!("None of the given serial numbers exist");
        }
        summarize(&rows)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

fn run_import(config: &AppConfig, path: &std::path::Path) -> Result<()> {
    let mut store = open_store(config);
    let count = store
        .import_file(path)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    // Imported rows are appended, so they are the last `count` rows
    let rows = store.snapshot().rows();
    match (rows.get(rows.len().saturating_sub(count)), rows.last()) {
        (Some(first), Some(last)) if count > 0 => println!(
            "✓ Imported {} patients as serials {}..={}",
            count, first.serial_no, last.serial_no
        ),
        _ => println!("✓ Nothing to import from {}", path.display()),
    }
    Ok(())
}

fn run_export(
    config: &AppConfig,
    path: &std::path::Path,
    args: &QueryArgs,
    serials: &[String],
) -> Result<()> {
    let store = open_store(config);
    let rows: Vec<Record> = if serials.is_empty() {
        matching_rows(store.snapshot(), &args.to_query())
            .into_iter()
            .cloned()
            .collect()
    } else {
        store.select_rows(serials)
    };

    let count = export_rows(path, &rows)
        .with_context(|| format!("Failed to export to {}", path.display()))?;
    println!("✓ Exported {} patients to {}", count, path.display());
    Ok(())
}

fn run_report(config: &AppConfig, serials: &[String], output: Option<PathBuf>) -> Result<()> {
    let store = open_store(config);
    let rows = store.select_rows(serials);
    if rows.is_empty() {
        bail!("None of the given serial numbers exist");
    }

    match output {
        Some(path) => {
            write_reports(&path, &rows)?;
            println!("✓ Wrote {} reports to {}", rows.len(), path.display());
        }
        None => print!("{}", render_reports(&rows)),
    }
    Ok(())
}

fn run_backup(config: &AppConfig, dest: Option<PathBuf>) -> Result<()> {
    let dest = dest.unwrap_or_else(|| config.backup_dir());
    let report = create_backup(&config.data_file, &dest, Local::now().naive_local())?;
    println!("✓ Backup written to {}", report.path.display());
    println!("  sha256 {}", report.sha256);
    Ok(())
}

fn run_photo(config: &AppConfig, action: PhotoAction) -> Result<()> {
    let mut store = open_store(config);
    let photos = PhotoDirectory::new(&config.photo_dir);

    match action {
        PhotoAction::Set { serial, source } => {
            let updated = store.set_photo(&serial, &source, &photos)?;
            println!("✓ Photo stored at {}", updated.photo_path);
        }
        PhotoAction::Remove { serial } => {
            if store.remove_photo(&serial, &photos)? {
                println!("✓ Photo removed for patient {}", serial);
            } else {
                println!("No photo to remove for patient {}", serial);
            }
        }
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    let store = open_store(config);
    let mut app = ui::App::new(store, config.page_size);
    ui::run_ui(&mut app)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the subcommands, see --help");
    std::process::exit(1);
}
