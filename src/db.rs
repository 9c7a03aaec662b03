use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::{Result, TrackerError};
use crate::models::{
    JobApplication, MasterResume, NewApplication, NewMasterResume, ResumeCopy, ResumeSection,
};
use crate::resume;

/// Schema versions, applied in order on top of `PRAGMA user_version`.
const MIGRATIONS: &[(i32, &str)] = &[
    (
        1,
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id TEXT PRIMARY KEY,
            company_name TEXT NOT NULL,
            job_title TEXT NOT NULL,
            job_description TEXT NOT NULL DEFAULT '',
            application_portal TEXT NOT NULL DEFAULT '',
            application_date TEXT NOT NULL,
            status TEXT NOT NULL,
            source TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            resume TEXT,
            cover_letter TEXT,
            last_updated TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_applications_company ON applications(company_name);
        CREATE INDEX IF NOT EXISTS idx_applications_title ON applications(job_title);
        CREATE INDEX IF NOT EXISTS idx_applications_date ON applications(application_date);
        CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
        CREATE INDEX IF NOT EXISTS idx_applications_source ON applications(source);
        CREATE INDEX IF NOT EXISTS idx_applications_updated ON applications(last_updated);
        "#,
    ),
    (
        2,
        r#"
        CREATE TABLE IF NOT EXISTS master_resumes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sections TEXT NOT NULL,
            last_updated TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS resume_copies (
            id TEXT PRIMARY KEY,
            master_resume_id TEXT NOT NULL,
            name TEXT NOT NULL,
            purpose TEXT NOT NULL,
            sections TEXT NOT NULL,
            last_updated TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_master_resumes_name ON master_resumes(name);
        CREATE INDEX IF NOT EXISTS idx_master_resumes_updated ON master_resumes(last_updated);
        CREATE INDEX IF NOT EXISTS idx_resume_copies_name ON resume_copies(name);
        CREATE INDEX IF NOT EXISTS idx_resume_copies_purpose ON resume_copies(purpose);
        CREATE INDEX IF NOT EXISTS idx_resume_copies_master ON resume_copies(master_resume_id);
        CREATE INDEX IF NOT EXISTS idx_resume_copies_updated ON resume_copies(last_updated);
        "#,
    ),
];

pub const SCHEMA_VERSION: i32 = 2;

const APPLICATION_COLUMNS: &str = "id, company_name, job_title, job_description, application_portal,
     application_date, status, source, notes, resume, cover_letter, last_updated";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Applications,
    MasterResumes,
    ResumeCopies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Published to subscribers after a mutation commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub collection: Collection,
    pub id: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub inserted: usize,
    pub replaced: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    pub applications: usize,
    pub master_resumes: usize,
    pub resume_copies: usize,
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
    last_id: Cell<i64>,
    subscribers: RefCell<Vec<Sender<StoreChange>>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self::with_connection(conn, path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_connection(conn, PathBuf::from(":memory:")))
    }

    fn with_connection(conn: Connection, path: PathBuf) -> Self {
        Self {
            conn,
            path,
            last_id: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            proj_dirs.data_dir().join("jobtrack.db")
        } else {
            PathBuf::from("jobtrack.db")
        }
    }

    pub fn schema_version(&self) -> Result<i32> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Applies every schema version newer than the stored one.
    pub fn init(&self) -> Result<()> {
        let current = self.schema_version()?;
        for (version, sql) in MIGRATIONS {
            if *version <= current {
                continue;
            }
            tracing::info!("Applying schema version {}", version);
            let tx = self.conn.unchecked_transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
        }
        Ok(())
    }

    /// Fails on a fresh file; upgrades an older schema in place.
    pub fn ensure_initialized(&self) -> Result<()> {
        match self.schema_version()? {
            0 => Err(TrackerError::NotInitialized),
            v if v < SCHEMA_VERSION => self.init(),
            _ => Ok(()),
        }
    }

    // --- Identity and change feed ---

    /// Timestamp-derived identity, strictly increasing for this handle.
    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let id = now.max(self.last_id.get() + 1);
        self.last_id.set(id);
        id.to_string()
    }

    pub fn subscribe(&self) -> Receiver<StoreChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    fn publish(&self, collection: Collection, id: &str, kind: ChangeKind) {
        let change = StoreChange {
            collection,
            id: id.to_string(),
            kind,
        };
        self.subscribers
            .borrow_mut()
            .retain(|tx| tx.send(change.clone()).is_ok());
    }

    // --- Application operations ---

    pub fn add_application(&self, new: NewApplication) -> Result<String> {
        validate_application(&new.company_name, &new.job_title)?;
        let app = JobApplication::from_new(self.next_id(), new, Utc::now());
        self.insert_application(&app, false)?;
        tracing::info!("Added application {} ({} / {})", app.id, app.company_name, app.job_title);
        self.publish(Collection::Applications, &app.id, ChangeKind::Created);
        Ok(app.id)
    }

    /// Replaces the whole record; `last_updated` never moves backwards.
    pub fn update_application(&self, app: &JobApplication) -> Result<JobApplication> {
        validate_application(&app.company_name, &app.job_title)?;
        let previous: Option<DateTime<Utc>> = self
            .conn
            .query_row(
                "SELECT last_updated FROM applications WHERE id = ?1",
                [&app.id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(previous) = previous else {
            return Err(TrackerError::not_found("Application", &app.id));
        };

        let mut updated = app.clone();
        updated.last_updated = Utc::now().max(previous);
        self.insert_application(&updated, true)?;
        tracing::info!("Updated application {}", updated.id);
        self.publish(Collection::Applications, &updated.id, ChangeKind::Updated);
        Ok(updated)
    }

    pub fn delete_application(&self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM applications WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(TrackerError::not_found("Application", id));
        }
        tracing::info!("Deleted application {}", id);
        self.publish(Collection::Applications, id, ChangeKind::Deleted);
        Ok(())
    }

    pub fn get_application(&self, id: &str) -> Result<Option<JobApplication>> {
        tracing::debug!("Looking up application {}", id);
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], Self::row_to_application)
            .optional()?)
    }

    /// Whole collection, newest application date first.
    pub fn list_applications(&self) -> Result<Vec<JobApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications
             ORDER BY application_date DESC, last_updated DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_application)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn insert_application(&self, app: &JobApplication, replace: bool) -> Result<()> {
        let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
        let sql = format!(
            "{verb} INTO applications ({APPLICATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        );
        self.conn.execute(
            &sql,
            params![
                app.id,
                app.company_name,
                app.job_title,
                app.job_description,
                app.application_portal,
                app.application_date,
                app.status,
                app.source,
                app.notes,
                to_json_opt(&app.resume)?,
                to_json_opt(&app.cover_letter)?,
                app.last_updated,
            ],
        )?;
        Ok(())
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<JobApplication> {
        Ok(JobApplication {
            id: row.get(0)?,
            company_name: row.get(1)?,
            job_title: row.get(2)?,
            job_description: row.get(3)?,
            application_portal: row.get(4)?,
            application_date: row.get(5)?,
            status: row.get(6)?,
            source: row.get(7)?,
            notes: row.get(8)?,
            resume: json_column_opt(row, 9)?,
            cover_letter: json_column_opt(row, 10)?,
            last_updated: row.get(11)?,
        })
    }

    /// Inserts exported records under their own ids, replacing any that exist.
    pub fn import_applications(&self, apps: &[JobApplication]) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let mut changes = Vec::with_capacity(apps.len());
        let tx = self.conn.unchecked_transaction()?;
        for app in apps {
            validate_application(&app.company_name, &app.job_title)?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM applications WHERE id = ?1)",
                [&app.id],
                |row| row.get(0),
            )?;
            self.insert_application(app, true)?;
            if exists {
                stats.replaced += 1;
                changes.push((app.id.as_str(), ChangeKind::Updated));
            } else {
                stats.inserted += 1;
                changes.push((app.id.as_str(), ChangeKind::Created));
            }
        }
        tx.commit()?;
        tracing::info!(
            "Imported applications: {} inserted, {} replaced",
            stats.inserted,
            stats.replaced
        );
        for (id, kind) in changes {
            self.publish(Collection::Applications, id, kind);
        }
        Ok(stats)
    }

    // --- Master resume operations ---

    pub fn add_master_resume(&self, new: NewMasterResume) -> Result<String> {
        validate_name(&new.name)?;
        let resume = MasterResume {
            id: self.next_id(),
            name: new.name,
            sections: resume::normalized(new.sections),
            last_updated: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO master_resumes (id, name, sections, last_updated) VALUES (?1, ?2, ?3, ?4)",
            params![resume.id, resume.name, to_json(&resume.sections)?, resume.last_updated],
        )?;
        tracing::info!("Added master resume {} ({})", resume.id, resume.name);
        self.publish(Collection::MasterResumes, &resume.id, ChangeKind::Created);
        Ok(resume.id)
    }

    pub fn update_master_resume(&self, resume: &MasterResume) -> Result<MasterResume> {
        validate_name(&resume.name)?;
        let previous = self.stamp_of("master_resumes", &resume.id)?;
        let Some(previous) = previous else {
            return Err(TrackerError::not_found("Master resume", &resume.id));
        };
        let mut updated = resume.clone();
        updated.sections = resume::normalized(updated.sections);
        updated.last_updated = Utc::now().max(previous);
        self.conn.execute(
            "UPDATE master_resumes SET name = ?2, sections = ?3, last_updated = ?4 WHERE id = ?1",
            params![updated.id, updated.name, to_json(&updated.sections)?, updated.last_updated],
        )?;
        tracing::info!("Updated master resume {}", updated.id);
        self.publish(Collection::MasterResumes, &updated.id, ChangeKind::Updated);
        Ok(updated)
    }

    /// Removes the master and every copy made from it, in one transaction.
    /// Returns the number of copies removed.
    pub fn delete_master_resume(&self, id: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let copy_ids: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM resume_copies WHERE master_resume_id = ?1")?;
            let rows = stmt.query_map([id], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.execute("DELETE FROM resume_copies WHERE master_resume_id = ?1", [id])?;
        let removed = tx.execute("DELETE FROM master_resumes WHERE id = ?1", [id])?;
        if removed == 0 {
            // dropping the transaction rolls the copy deletion back
            return Err(TrackerError::not_found("Master resume", id));
        }
        tx.commit()?;

        tracing::info!("Deleted master resume {} and {} copies", id, copy_ids.len());
        for copy_id in &copy_ids {
            self.publish(Collection::ResumeCopies, copy_id, ChangeKind::Deleted);
        }
        self.publish(Collection::MasterResumes, id, ChangeKind::Deleted);
        Ok(copy_ids.len())
    }

    pub fn get_master_resume(&self, id: &str) -> Result<Option<MasterResume>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, sections, last_updated FROM master_resumes WHERE id = ?1",
                [id],
                Self::row_to_master,
            )
            .optional()?)
    }

    pub fn list_master_resumes(&self) -> Result<Vec<MasterResume>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, sections, last_updated FROM master_resumes ORDER BY name",
        )?;
        let rows = stmt.query_map([], Self::row_to_master)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn row_to_master(row: &rusqlite::Row) -> rusqlite::Result<MasterResume> {
        Ok(MasterResume {
            id: row.get(0)?,
            name: row.get(1)?,
            sections: json_column(row, 2)?,
            last_updated: row.get(3)?,
        })
    }

    // --- Resume copy operations ---

    pub fn create_resume_copy(&self, master_id: &str, purpose: &str, name: &str) -> Result<String> {
        validate_name(name)?;
        validate_purpose(purpose)?;
        let master = self
            .get_master_resume(master_id)?
            .ok_or_else(|| TrackerError::not_found("Master resume", master_id))?;

        let copy = ResumeCopy {
            id: self.next_id(),
            master_resume_id: master.id,
            name: name.trim().to_string(),
            purpose: purpose.trim().to_string(),
            sections: resume::clone_sections(&master.sections, || self.next_id()),
            last_updated: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO resume_copies (id, master_resume_id, name, purpose, sections, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                copy.id,
                copy.master_resume_id,
                copy.name,
                copy.purpose,
                to_json(&copy.sections)?,
                copy.last_updated,
            ],
        )?;
        tracing::info!("Created resume copy {} from master {}", copy.id, master_id);
        self.publish(Collection::ResumeCopies, &copy.id, ChangeKind::Created);
        Ok(copy.id)
    }

    pub fn update_resume_copy(&self, copy: &ResumeCopy) -> Result<ResumeCopy> {
        validate_name(&copy.name)?;
        validate_purpose(&copy.purpose)?;
        let Some(previous) = self.stamp_of("resume_copies", &copy.id)? else {
            return Err(TrackerError::not_found("Resume copy", &copy.id));
        };
        let mut updated = copy.clone();
        updated.sections = resume::normalized(updated.sections);
        updated.last_updated = Utc::now().max(previous);
        self.conn.execute(
            "UPDATE resume_copies
             SET master_resume_id = ?2, name = ?3, purpose = ?4, sections = ?5, last_updated = ?6
             WHERE id = ?1",
            params![
                updated.id,
                updated.master_resume_id,
                updated.name,
                updated.purpose,
                to_json(&updated.sections)?,
                updated.last_updated,
            ],
        )?;
        tracing::info!("Updated resume copy {}", updated.id);
        self.publish(Collection::ResumeCopies, &updated.id, ChangeKind::Updated);
        Ok(updated)
    }

    pub fn delete_resume_copy(&self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM resume_copies WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(TrackerError::not_found("Resume copy", id));
        }
        tracing::info!("Deleted resume copy {}", id);
        self.publish(Collection::ResumeCopies, id, ChangeKind::Deleted);
        Ok(())
    }

    pub fn get_resume_copy(&self, id: &str) -> Result<Option<ResumeCopy>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, master_resume_id, name, purpose, sections, last_updated
                 FROM resume_copies WHERE id = ?1",
                [id],
                Self::row_to_copy,
            )
            .optional()?)
    }

    pub fn list_resume_copies(&self, master_id: Option<&str>) -> Result<Vec<ResumeCopy>> {
        let mut sql = String::from(
            "SELECT id, master_resume_id, name, purpose, sections, last_updated FROM resume_copies",
        );
        if master_id.is_some() {
            sql.push_str(" WHERE master_resume_id = ?1");
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = if let Some(m) = master_id {
            stmt.query_map([m], Self::row_to_copy)?
        } else {
            stmt.query_map([], Self::row_to_copy)?
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn row_to_copy(row: &rusqlite::Row) -> rusqlite::Result<ResumeCopy> {
        Ok(ResumeCopy {
            id: row.get(0)?,
            master_resume_id: row.get(1)?,
            name: row.get(2)?,
            purpose: row.get(3)?,
            sections: json_column::<Vec<ResumeSection>>(row, 4)?,
            last_updated: row.get(5)?,
        })
    }

    fn stamp_of(&self, table: &str, id: &str) -> Result<Option<DateTime<Utc>>> {
        let sql = format!("SELECT last_updated FROM {table} WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], |row| row.get(0))
            .optional()?)
    }

    // --- Maintenance ---

    /// Deletes every record. Subscribers get a `Deleted` change per record.
    pub fn purge(&self) -> Result<PurgeStats> {
        let tables = [
            (Collection::ResumeCopies, "resume_copies"),
            (Collection::MasterResumes, "master_resumes"),
            (Collection::Applications, "applications"),
        ];
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = Vec::new();
        for (collection, table) in tables {
            let ids: Vec<String> = {
                let mut stmt = tx.prepare(&format!("SELECT id FROM {table}"))?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.execute(&format!("DELETE FROM {table}"), [])?;
            removed.push((collection, ids));
        }
        tx.commit()?;

        let count = |wanted: Collection| {
            removed
                .iter()
                .find(|(c, _)| *c == wanted)
                .map_or(0, |(_, ids)| ids.len())
        };
        let stats = PurgeStats {
            applications: count(Collection::Applications),
            master_resumes: count(Collection::MasterResumes),
            resume_copies: count(Collection::ResumeCopies),
        };
        tracing::info!("Purged all data: {:?}", stats);
        for (collection, ids) in &removed {
            for id in ids {
                self.publish(*collection, id, ChangeKind::Deleted);
            }
        }
        Ok(stats)
    }
}

fn validate_application(company: &str, title: &str) -> Result<()> {
    if company.trim().is_empty() {
        return Err(TrackerError::Validation("Company name is required".to_string()));
    }
    if title.trim().is_empty() {
        return Err(TrackerError::Validation("Job title is required".to_string()));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TrackerError::Validation("Name is required".to_string()));
    }
    Ok(())
}

fn validate_purpose(purpose: &str) -> Result<()> {
    if purpose.trim().is_empty() {
        return Err(TrackerError::Validation("Purpose is required".to_string()));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_json_opt<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value.as_ref().map(to_json).transpose()
}

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_column_opt<T: DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
