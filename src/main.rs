mod analytics;
mod config;
mod db;
mod documents;
mod error;
mod listing;
mod models;
mod resume;
mod transfer;
mod tui;

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use analytics::{Dashboard, Stats, month_label};
use config::Config;
use db::Database;
use error::TrackerError;
use listing::{ListQuery, SortKey};
use models::{
    ApplicationSource, ApplicationStatus, DocumentSlot, JobApplication, MasterResume,
    NewApplication, NewMasterResume, ResumeCopy, ResumeSection, SectionKind,
};
use resume::Direction;

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications and maintain résumé versions")]
struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize or upgrade the database
    Init,

    /// Record a new application
    Add {
        #[command(flatten)]
        fields: ApplicationFields,
    },

    /// Edit an application (unspecified fields keep their current value)
    Edit {
        /// Application ID
        id: String,

        #[command(flatten)]
        fields: ApplicationFields,
    },

    /// Change an application's status
    Status {
        /// Application ID
        id: String,

        /// Applied, Interview, Offer, Rejected, Pending, Withdrawn
        status: ApplicationStatus,
    },

    /// List applications
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show application details
    Show {
        /// Application ID
        id: String,
    },

    /// Delete an application and its documents
    Delete {
        /// Application ID
        id: String,
    },

    /// Summary counts and recently updated applications
    Dashboard,

    /// Status, source and monthly breakdowns with response rates
    Analytics,

    /// Browse applications interactively
    Browse {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Manage an application's résumé and cover letter
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// Manage master résumés
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// Manage résumé copies
    Copy {
        #[command(subcommand)]
        command: CopyCommands,
    },

    /// Export all applications as JSON
    Export {
        /// Output file (default: job-applications-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import applications from an exported JSON file
    Import {
        file: PathBuf,
    },

    /// Delete all applications, résumés and copies
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the effective configuration
    Config,
}

#[derive(clap::Args)]
struct ApplicationFields {
    /// Company name
    #[arg(short, long)]
    company: Option<String>,

    /// Job title
    #[arg(short, long)]
    title: Option<String>,

    /// Job description
    #[arg(short, long)]
    description: Option<String>,

    /// Application portal URL
    #[arg(short, long)]
    portal: Option<String>,

    /// Application date (YYYY-MM-DD, default today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Applied, Interview, Offer, Rejected, Pending, Withdrawn
    #[arg(short, long)]
    status: Option<ApplicationStatus>,

    /// LinkedIn, Indeed, NUWorks, Company Website, Referral, Friend, Other
    #[arg(long)]
    source: Option<ApplicationSource>,

    /// Free-form notes
    #[arg(short, long)]
    notes: Option<String>,

    /// Résumé to attach (.pdf or .docx)
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Cover letter to attach (.pdf or .docx)
    #[arg(long)]
    cover_letter: Option<PathBuf>,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Search company, title, description and notes
    #[arg(short = 'q', long)]
    search: Option<String>,

    /// Filter by status
    #[arg(short, long)]
    status: Option<ApplicationStatus>,

    /// Filter by source
    #[arg(long)]
    source: Option<ApplicationSource>,

    /// Sort key
    #[arg(long, value_enum)]
    sort: Option<SortKey>,

    /// Sort ascending instead of descending
    #[arg(long)]
    asc: bool,
}

impl FilterArgs {
    fn into_query(self, config: &Config) -> ListQuery {
        ListQuery {
            search: self.search,
            status: self.status,
            source: self.source,
            sort: self.sort.unwrap_or(config.list.default_sort),
            descending: if self.asc { false } else { config.list.descending },
        }
    }
}

#[derive(Subcommand)]
enum DocCommands {
    /// Attach a .pdf or .docx file
    Attach {
        /// Application ID
        id: String,
        #[arg(value_enum)]
        slot: DocumentSlot,
        file: PathBuf,
    },

    /// Remove an attached document
    Detach {
        /// Application ID
        id: String,
        #[arg(value_enum)]
        slot: DocumentSlot,
    },

    /// Open a document in the configured viewer
    View {
        /// Application ID
        id: String,
        #[arg(value_enum)]
        slot: DocumentSlot,
    },

    /// Write a document to disk
    Extract {
        /// Application ID
        id: String,
        #[arg(value_enum)]
        slot: DocumentSlot,

        /// Output path (default: the document's name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Create a master résumé
    New {
        name: String,

        /// Start without the default sections
        #[arg(long)]
        blank: bool,
    },

    /// List master résumés
    List,

    /// Show a master résumé
    Show { id: String },

    /// Rename a master résumé
    Rename { id: String, name: String },

    /// Delete a master résumé and all of its copies
    Delete { id: String },

    /// Create a purpose-specific copy
    Copy {
        /// Master résumé ID
        id: String,

        /// What this copy is for
        #[arg(short, long)]
        purpose: String,

        /// Name for the copy (default: "<master> - Copy")
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Export as plain text
    Export {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Edit sections
    Section {
        /// Master résumé ID
        id: String,
        #[command(subcommand)]
        command: SectionCommands,
    },
}

#[derive(Subcommand)]
enum CopyCommands {
    /// List résumé copies
    List {
        /// Only copies of this master résumé
        #[arg(short, long)]
        master: Option<String>,
    },

    /// Show a résumé copy
    Show { id: String },

    /// Change a copy's name or purpose
    Rename {
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        purpose: Option<String>,
    },

    /// Delete a résumé copy
    Delete { id: String },

    /// Export as plain text
    Export {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Edit sections
    Section {
        /// Résumé copy ID
        id: String,
        #[command(subcommand)]
        command: SectionCommands,
    },
}

#[derive(Subcommand)]
enum SectionCommands {
    /// Append a section
    Add {
        #[arg(short, long)]
        title: String,

        /// Header, Summary, Experience, Education, Skills, Projects, Certifications, Custom
        #[arg(short, long, default_value = "Custom")]
        kind: SectionKind,

        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Remove a section
    Remove { section_id: String },

    /// Move a section up or down
    Move {
        section_id: String,
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Change a section's title or content
    Set {
        section_id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,

        /// Read content from a file
        #[arg(long, conflicts_with = "content")]
        content_file: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("jobtrack=debug")
    } else {
        EnvFilter::try_from_env("JOBTRACK_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = &result {
        let user_error = e
            .downcast_ref::<TrackerError>()
            .is_some_and(TrackerError::is_user_error);
        if !user_error {
            tracing::debug!("Command failed: {:?}", e);
        }
    }
    result
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().or_else(Config::default_path);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let db_path = cli.db.clone().unwrap_or_else(|| config.database_path());

    if let Commands::Config = cli.command {
        match &config_path {
            Some(path) => println!("# {}", path.display()),
            None => println!("# (no config directory)"),
        }
        println!("# database: {}\n", db_path.display());
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    if let Commands::Init = cli.command {
        db.init()?;
        println!("Database initialized at {}", db.path().display());
        return Ok(());
    }
    db.ensure_initialized()?;

    match cli.command {
        Commands::Init | Commands::Config => {}

        Commands::Add { fields } => {
            let new = new_application(fields, &db, &config)?;
            let id = db.add_application(new)?;
            println!("Added application {}", id);
        }

        Commands::Edit { id, fields } => {
            let mut app = require_application(&db, &id)?;
            apply_fields(&mut app, fields, &db, &config)?;
            let updated = db.update_application(&app)?;
            println!("Updated application {}", updated.id);
        }

        Commands::Status { id, status } => {
            let mut app = require_application(&db, &id)?;
            let previous = app.status;
            app.status = status;
            db.update_application(&app)?;
            println!("{} / {}: {} -> {}", app.company_name, app.job_title, previous, status);
        }

        Commands::List { filter } => {
            let query = filter.into_query(&config);
            let apps = query.apply(db.list_applications()?);
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                print_application_table(&apps);
            }
        }

        Commands::Show { id } => print_application(&require_application(&db, &id)?),

        Commands::Delete { id } => {
            db.delete_application(&id)?;
            println!("Deleted application {}", id);
        }

        Commands::Dashboard => {
            let apps = db.list_applications()?;
            print_dashboard(&Dashboard::compute(&apps, 3));
        }

        Commands::Analytics => match Stats::compute(&db.list_applications()?) {
            Some(stats) => print_analytics(&stats),
            None => {
                println!("No data available.");
                println!("Start tracking your job applications to see analytics and insights.");
            }
        },

        Commands::Browse { filter } => {
            tui::run_browse(&db, filter.into_query(&config))?;
        }

        Commands::Doc { command } => run_doc(command, &db, &config)?,
        Commands::Resume { command } => run_resume(command, &db)?,
        Commands::Copy { command } => run_copy(command, &db)?,

        Commands::Export { output } => {
            let apps = db.list_applications()?;
            let json = transfer::export_json(&apps)?;
            let path =
                output.unwrap_or_else(|| PathBuf::from(transfer::export_file_name(Local::now().date_naive())));
            write_file(&path, &json)?;
            println!("Exported {} application(s) to {}", apps.len(), path.display());
        }

        Commands::Import { file } => {
            let apps = transfer::read_export(&file, config.import.max_size_mb)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            let stats = db.import_applications(&apps)?;
            println!(
                "Imported {} application(s): {} new, {} replaced",
                apps.len(),
                stats.inserted,
                stats.replaced
            );
        }

        Commands::Purge { yes } => {
            if !yes {
                println!("This deletes every application, résumé and copy. Re-run with --yes to confirm.");
                return Ok(());
            }
            let stats = db.purge()?;
            println!(
                "Deleted {} application(s), {} résumé(s), {} cop(ies)",
                stats.applications, stats.master_resumes, stats.resume_copies
            );
        }
    }

    Ok(())
}

fn new_application(fields: ApplicationFields, db: &Database, config: &Config) -> Result<NewApplication> {
    let company = fields.company.clone().ok_or_else(|| anyhow!("--company is required"))?;
    let title = fields.title.clone().ok_or_else(|| anyhow!("--title is required"))?;

    let mut app = JobApplication::from_new(
        String::new(),
        NewApplication {
            company_name: company,
            job_title: title,
            job_description: String::new(),
            application_portal: String::new(),
            application_date: Local::now().date_naive(),
            status: ApplicationStatus::Applied,
            source: ApplicationSource::LinkedIn,
            notes: String::new(),
            resume: None,
            cover_letter: None,
        },
        chrono::Utc::now(),
    );
    apply_fields(&mut app, fields, db, config)?;

    Ok(NewApplication {
        company_name: app.company_name,
        job_title: app.job_title,
        job_description: app.job_description,
        application_portal: app.application_portal,
        application_date: app.application_date,
        status: app.status,
        source: app.source,
        notes: app.notes,
        resume: app.resume,
        cover_letter: app.cover_letter,
    })
}

/// Overlays the given flags onto `app`. Documents are loaded before anything
/// is written, so a rejected file leaves the store untouched.
fn apply_fields(
    app: &mut JobApplication,
    fields: ApplicationFields,
    db: &Database,
    config: &Config,
) -> Result<()> {
    if let Some(v) = fields.company {
        app.company_name = v;
    }
    if let Some(v) = fields.title {
        app.job_title = v;
    }
    if let Some(v) = fields.description {
        app.job_description = v;
    }
    if let Some(v) = fields.portal {
        app.application_portal = v;
    }
    if let Some(v) = fields.date {
        app.application_date = v;
    }
    if let Some(v) = fields.status {
        app.status = v;
    }
    if let Some(v) = fields.source {
        app.source = v;
    }
    if let Some(v) = fields.notes {
        app.notes = v;
    }
    for (slot, path) in [
        (DocumentSlot::Resume, fields.resume),
        (DocumentSlot::CoverLetter, fields.cover_letter),
    ] {
        if let Some(path) = path {
            let doc = documents::load_upload(&path, config.upload.max_document_mb, db.next_id())?;
            app.set_document(slot, Some(doc));
        }
    }
    Ok(())
}

fn require_application(db: &Database, id: &str) -> Result<JobApplication> {
    Ok(db
        .get_application(id)?
        .ok_or_else(|| TrackerError::not_found("Application", id))?)
}

fn require_master(db: &Database, id: &str) -> Result<MasterResume> {
    Ok(db
        .get_master_resume(id)?
        .ok_or_else(|| TrackerError::not_found("Master resume", id))?)
}

fn require_copy(db: &Database, id: &str) -> Result<ResumeCopy> {
    Ok(db
        .get_resume_copy(id)?
        .ok_or_else(|| TrackerError::not_found("Resume copy", id))?)
}

fn run_doc(command: DocCommands, db: &Database, config: &Config) -> Result<()> {
    let (id, slot) = match &command {
        DocCommands::Attach { id, slot, .. }
        | DocCommands::Detach { id, slot }
        | DocCommands::View { id, slot }
        | DocCommands::Extract { id, slot, .. } => (id.clone(), *slot),
    };
    let mut app = require_application(db, &id)?;

    match command {
        DocCommands::Attach { file, .. } => {
            let doc = documents::load_upload(&file, config.upload.max_document_mb, db.next_id())?;
            let name = doc.name.clone();
            app.set_document(slot, Some(doc));
            db.update_application(&app)?;
            println!("Attached {} as {} for application {}", name, slot.label(), id);
        }

        DocCommands::Detach { .. } => {
            if app.document(slot).is_none() {
                println!("Application {} has no {}.", id, slot.label());
                return Ok(());
            }
            app.set_document(slot, None);
            db.update_application(&app)?;
            println!("Removed {} from application {}", slot.label(), id);
        }

        DocCommands::View { .. } => {
            let doc = app
                .document(slot)
                .ok_or_else(|| anyhow!("Application {} has no {}", id, slot.label()))?;
            documents::view(doc, config.viewer.for_kind(doc.kind), |path| {
                println!("Opened {}. Press Enter when you are done viewing it.", path.display());
                std::io::stdin().read_line(&mut String::new())?;
                Ok(())
            })?;
        }

        DocCommands::Extract { output, .. } => {
            let doc = app
                .document(slot)
                .ok_or_else(|| anyhow!("Application {} has no {}", id, slot.label()))?;
            let dest = output.unwrap_or_else(|| PathBuf::from(&doc.name));
            let written = documents::extract(doc, &dest)?;
            println!("Wrote {} ({}) to {}", doc.name, documents::format_size(written), dest.display());
        }
    }
    Ok(())
}

fn run_resume(command: ResumeCommands, db: &Database) -> Result<()> {
    match command {
        ResumeCommands::New { name, blank } => {
            let sections = if blank {
                Vec::new()
            } else {
                resume::default_sections(|| db.next_id())
            };
            let id = db.add_master_resume(NewMasterResume {
                name: name.trim().to_string(),
                sections,
            })?;
            println!("Created résumé '{}' ({})", name.trim(), id);
        }

        ResumeCommands::List => {
            let resumes = db.list_master_resumes()?;
            if resumes.is_empty() {
                println!("No résumés found.");
                return Ok(());
            }
            println!("{:<15} {:<30} {:<9} {:<7} {:<16}", "ID", "NAME", "SECTIONS", "COPIES", "UPDATED");
            println!("{}", "-".repeat(81));
            for r in resumes {
                let copies = db.list_resume_copies(Some(&r.id))?.len();
                println!(
                    "{:<15} {:<30} {:<9} {:<7} {:<16}",
                    r.id,
                    truncate(&r.name, 28),
                    r.sections.len(),
                    copies,
                    r.last_updated.format("%Y-%m-%d %H:%M")
                );
            }
        }

        ResumeCommands::Show { id } => {
            let r = require_master(db, &id)?;
            println!("Résumé '{}' ({})", r.name, r.id);
            println!("Updated: {}", r.last_updated.format("%Y-%m-%d %H:%M"));
            print_sections(&r.sections);
            let copies = db.list_resume_copies(Some(&r.id))?;
            if !copies.is_empty() {
                println!("Copies ({}):", copies.len());
                for c in copies {
                    println!("  {} - {} ({})", c.id, c.name, c.purpose);
                }
            }
        }

        ResumeCommands::Rename { id, name } => {
            let mut r = require_master(db, &id)?;
            r.name = name.trim().to_string();
            db.update_master_resume(&r)?;
            println!("Renamed résumé {} to '{}'", id, r.name);
        }

        ResumeCommands::Delete { id } => {
            let copies = db.delete_master_resume(&id)?;
            println!("Deleted résumé {} and {} cop(ies)", id, copies);
        }

        ResumeCommands::Copy { id, purpose, name } => {
            let master = require_master(db, &id)?;
            let name = name.unwrap_or_else(|| format!("{} - Copy", master.name));
            let copy_id = db.create_resume_copy(&id, &purpose, &name)?;
            println!("Created copy '{}' ({}) for: {}", name.trim(), copy_id, purpose.trim());
        }

        ResumeCommands::Export { id, output } => {
            let r = require_master(db, &id)?;
            write_resume_text(&r.name, &r.sections, output)?;
        }

        ResumeCommands::Section { id, command } => {
            let mut r = require_master(db, &id)?;
            let message = edit_sections(&mut r.sections, command, db)?;
            db.update_master_resume(&r)?;
            println!("{}", message);
        }
    }
    Ok(())
}

fn run_copy(command: CopyCommands, db: &Database) -> Result<()> {
    match command {
        CopyCommands::List { master } => {
            let copies = db.list_resume_copies(master.as_deref())?;
            if copies.is_empty() {
                println!("No résumé copies found.");
                return Ok(());
            }
            println!("{:<15} {:<26} {:<26} {:<15}", "ID", "NAME", "PURPOSE", "MASTER");
            println!("{}", "-".repeat(85));
            for c in copies {
                println!(
                    "{:<15} {:<26} {:<26} {:<15}",
                    c.id,
                    truncate(&c.name, 24),
                    truncate(&c.purpose, 24),
                    c.master_resume_id
                );
            }
        }

        CopyCommands::Show { id } => {
            let c = require_copy(db, &id)?;
            println!("Copy '{}' ({})", c.name, c.id);
            println!("Purpose: {}", c.purpose);
            match db.get_master_resume(&c.master_resume_id)? {
                Some(m) => println!("From: {} ({})", m.name, m.id),
                None => println!("From: {} (missing)", c.master_resume_id),
            }
            println!("Updated: {}", c.last_updated.format("%Y-%m-%d %H:%M"));
            print_sections(&c.sections);
        }

        CopyCommands::Rename { id, name, purpose } => {
            let mut c = require_copy(db, &id)?;
            if let Some(name) = name {
                c.name = name.trim().to_string();
            }
            if let Some(purpose) = purpose {
                c.purpose = purpose.trim().to_string();
            }
            db.update_resume_copy(&c)?;
            println!("Updated copy {}: '{}' ({})", id, c.name, c.purpose);
        }

        CopyCommands::Delete { id } => {
            db.delete_resume_copy(&id)?;
            println!("Deleted résumé copy {}", id);
        }

        CopyCommands::Export { id, output } => {
            let c = require_copy(db, &id)?;
            write_resume_text(&c.name, &c.sections, output)?;
        }

        CopyCommands::Section { id, command } => {
            let mut c = require_copy(db, &id)?;
            let message = edit_sections(&mut c.sections, command, db)?;
            db.update_resume_copy(&c)?;
            println!("{}", message);
        }
    }
    Ok(())
}

fn edit_sections(
    sections: &mut Vec<ResumeSection>,
    command: SectionCommands,
    db: &Database,
) -> Result<String> {
    let message = match command {
        SectionCommands::Add { title, kind, content } => {
            let id = db.next_id();
            resume::add_section(sections, id.clone(), &title, kind, &content)?;
            format!("Added section '{}' ({})", title.trim(), id)
        }
        SectionCommands::Remove { section_id } => {
            let removed = resume::remove_section(sections, &section_id)?;
            format!("Removed section '{}'", removed.title)
        }
        SectionCommands::Move { section_id, direction } => {
            resume::move_section(sections, &section_id, direction)?;
            format!("Moved section {} {:?}", section_id, direction)
        }
        SectionCommands::Set {
            section_id,
            title,
            content,
            content_file,
        } => {
            if let Some(title) = title {
                resume::set_title(sections, &section_id, &title)?;
            }
            let content = match content_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => content,
            };
            if let Some(content) = content {
                resume::set_content(sections, &section_id, &content)?;
            }
            format!("Updated section {}", section_id)
        }
    };
    Ok(message)
}

fn write_resume_text(name: &str, sections: &[ResumeSection], output: Option<PathBuf>) -> Result<()> {
    let text = resume::render_text(name, sections);
    let path = output.unwrap_or_else(|| PathBuf::from(resume::export_file_name(name)));
    write_file(&path, &text)?;
    println!("Exported '{}' to {}", name, path.display());
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write to {}", path.display()))
}

fn print_application_table(apps: &[JobApplication]) {
    println!(
        "{:<15} {:<10} {:<11} {:<22} {:<26} {:<15}",
        "ID", "STATUS", "DATE", "COMPANY", "TITLE", "SOURCE"
    );
    println!("{}", "-".repeat(104));
    for app in apps {
        println!(
            "{:<15} {:<10} {:<11} {:<22} {:<26} {:<15}",
            app.id,
            app.status,
            app.application_date,
            truncate(&app.company_name, 20),
            truncate(&app.job_title, 24),
            app.source
        );
    }
}

fn print_application(app: &JobApplication) {
    println!("Application {}", app.id);
    println!("Company: {}", app.company_name);
    println!("Title: {}", app.job_title);
    println!("Status: {}", app.status);
    println!("Source: {}", app.source);
    println!("Applied: {}", app.application_date.format("%b %-d, %Y"));
    if !app.application_portal.is_empty() {
        println!("Portal: {}", app.application_portal);
    }
    for slot in [DocumentSlot::Resume, DocumentSlot::CoverLetter] {
        if let Some(doc) = app.document(slot) {
            println!("Attached {}: {} ({})", slot.label(), doc.name, doc.kind.as_str());
        }
    }
    println!("Updated: {}", app.last_updated.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    if !app.job_description.is_empty() {
        println!("\n--- Description ---\n{}", textwrap::fill(&app.job_description, 80));
    }
    if !app.notes.is_empty() {
        println!("\n--- Notes ---\n{}", textwrap::fill(&app.notes, 80));
    }
}

fn print_sections(sections: &[ResumeSection]) {
    println!();
    for s in sections {
        println!("[{}] {} ({}, {})", s.order, s.title, s.kind.as_str(), s.id);
        for line in s.content.lines() {
            println!("    {}", line);
        }
        println!();
    }
}

fn print_dashboard(dash: &Dashboard) {
    println!("Total applications: {}", dash.total);
    println!("Active:             {}", dash.active);
    println!("Interviews:         {}", dash.interviews);
    println!("Offers:             {}", dash.offers);
    println!("Rejections:         {}", dash.rejections);
    if !dash.recent.is_empty() {
        println!("\nRecently updated:");
        print_application_table(&dash.recent);
    }
}

fn print_analytics(stats: &Stats) {
    println!("Total applications:    {}", stats.total);
    println!("Interview rate:        {}%", stats.interview_rate);
    println!("Offer rate:            {}%", stats.offer_rate);
    println!("Applications per week: {:.1}", stats.apps_per_week);

    println!("\nBy status:");
    for (status, count) in &stats.status_counts {
        println!("  {:<16} {:>4} ({}%)", status.as_str(), count, stats.share_of_total(*count));
    }

    println!("\nBy source:");
    for (source, count) in stats.source_counts.iter().filter(|(_, n)| *n > 0) {
        println!("  {:<16} {:>4} ({}%)", source.as_str(), count, stats.share_of_total(*count));
    }

    println!("\nBy month:");
    for (&(year, month), count) in &stats.monthly_counts {
        println!("  {:<16} {:>4}", month_label(year, month), count);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_with_enum_flags() {
        let cli = Cli::try_parse_from([
            "jobtrack", "add", "-c", "Acme", "-t", "Engineer", "--date", "2024-01-10",
            "--status", "applied", "--source", "company-website",
        ])
        .unwrap();
        let Commands::Add { fields } = cli.command else {
            panic!("expected add");
        };
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(fields.status, Some(ApplicationStatus::Applied));
        assert_eq!(fields.source, Some(ApplicationSource::CompanyWebsite));
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(Cli::try_parse_from(["jobtrack", "status", "1", "ghosted"]).is_err());
    }

    #[test]
    fn add_applies_defaults_and_attachments() {
        let db = db::tests::test_db();
        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("cv.docx");
        std::fs::write(&cv, b"PK fake docx").unwrap();

        let fields = ApplicationFields {
            company: Some("Acme".to_string()),
            title: Some("Engineer".to_string()),
            description: None,
            portal: None,
            date: None,
            status: None,
            source: None,
            notes: None,
            resume: Some(cv),
            cover_letter: None,
        };
        let new = new_application(fields, &db, &Config::default()).unwrap();
        assert_eq!(new.status, ApplicationStatus::Applied);
        assert_eq!(new.source, ApplicationSource::LinkedIn);
        assert_eq!(new.resume.unwrap().kind, models::DocumentKind::Docx);
    }

    #[test]
    fn oversized_attachment_leaves_store_untouched() {
        let db = db::tests::test_db();
        let dir = tempfile::tempdir().unwrap();
        let big = dir.path().join("resume.pdf");
        let file = std::fs::File::create(&big).unwrap();
        file.set_len(12 * 1024 * 1024).unwrap();

        let fields = ApplicationFields {
            company: Some("Acme".to_string()),
            title: Some("Engineer".to_string()),
            description: None,
            portal: None,
            date: None,
            status: None,
            source: None,
            notes: None,
            resume: Some(big),
            cover_letter: None,
        };
        let err = new_application(fields, &db, &Config::default()).unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds 10MB limit");
        assert!(db.list_applications().unwrap().is_empty());
    }

    #[test]
    fn section_edits_flow_through_copies() {
        let db = db::tests::test_db();
        let master = db
            .add_master_resume(NewMasterResume {
                name: "Main".to_string(),
                sections: resume::default_sections(|| db.next_id()),
            })
            .unwrap();
        let copy_id = db.create_resume_copy(&master, "Backend roles", "Main - Backend").unwrap();
        let mut copy = db.get_resume_copy(&copy_id).unwrap().unwrap();

        let add = SectionCommands::Add {
            title: "Projects".to_string(),
            kind: SectionKind::Projects,
            content: "jobtrack".to_string(),
        };
        edit_sections(&mut copy.sections, add, &db).unwrap();
        db.update_resume_copy(&copy).unwrap();

        assert_eq!(db.get_resume_copy(&copy_id).unwrap().unwrap().sections.len(), 6);
        assert_eq!(db.get_master_resume(&master).unwrap().unwrap().sections.len(), 5);
    }

    #[test]
    fn missing_records_are_not_found_errors() {
        let db = db::tests::test_db();
        let errors = [
            require_application(&db, "nope").unwrap_err(),
            require_master(&db, "nope").unwrap_err(),
            require_copy(&db, "nope").unwrap_err(),
        ];
        for err in errors {
            assert!(matches!(
                err.downcast_ref::<TrackerError>(),
                Some(TrackerError::NotFound { .. })
            ));
        }
    }

    #[test]
    fn show_and_status_of_missing_id_fail() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("jobtrack.db");
        let config_path = dir.path().join("config.toml");
        let invoke = |args: &[&str]| {
            let mut argv = vec![
                "jobtrack",
                "--db",
                db_path.to_str().unwrap(),
                "--config",
                config_path.to_str().unwrap(),
            ];
            argv.extend_from_slice(args);
            run(Cli::try_parse_from(argv).unwrap())
        };

        invoke(&["init"]).unwrap();
        let err = invoke(&["show", "nope"]).unwrap_err();
        assert_eq!(err.to_string(), "Application 'nope' not found");
        assert!(invoke(&["status", "nope", "offer"]).is_err());
        assert!(invoke(&["resume", "show", "nope"]).is_err());
        invoke(&["list"]).unwrap();
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Résumé Builder Inc", 9), "Résumé...");
        assert_eq!(truncate("short", 10), "short");
    }
}
