// src/database.rs
//! Database connection management, migrations and repositories.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::models::{
    ApplicationStatus, Document, JobApplication, JobLog, MasterTemplate, Profile,
};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and run migrations.
    pub async fn new(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        info!(
            "Database connection established: {}",
            database_path.display()
        );

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// In-memory database for tests. A single connection keeps every
    /// query on the same memory store.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'Collected',
                url TEXT,
                office_location TEXT,
                country TEXT,
                job_mode TEXT NOT NULL DEFAULT 'On-site',
                last_update TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL REFERENCES job_applications(id) ON DELETE CASCADE,
                note TEXT NOT NULL,
                status_change_from TEXT,
                status_change_to TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL REFERENCES job_applications(id) ON DELETE CASCADE,
                doc_type TEXT NOT NULL,
                file_path TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS master_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                template_type TEXT NOT NULL DEFAULT 'database',
                file_path TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT,
                linkedin TEXT,
                github TEXT,
                skills TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS form_drafts (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status ON job_applications(status);")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_logs_job_id ON job_logs(job_id);")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_job_id ON documents(job_id);")
            .execute(&self.pool)
            .await?;

        info!("Database migrations completed");
        Ok(())
    }
}

// ===== Job applications =====

pub struct NewJob {
    pub company: String,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub office_location: Option<String>,
    pub country: Option<String>,
    pub job_mode: String,
}

pub struct JobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, job: NewJob) -> Result<JobApplication> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO job_applications
                (company, title, description, status, url, office_location, country, job_mode, last_update)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.company)
        .bind(&job.title)
        .bind(&job.description)
        .bind(ApplicationStatus::Collected.as_str())
        .bind(&job.url)
        .bind(&job.office_location)
        .bind(&job.country)
        .bind(&job.job_mode)
        .bind(now)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            "Created job application {} ({} at {})",
            id, job.title, job.company
        );
        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Job {} vanished after insert", id))
    }

    pub async fn get(&self, id: i64) -> Result<Option<JobApplication>> {
        let job = sqlx::query_as::<_, JobApplication>(
            r#"
            SELECT id, company, title, description, status, url,
                   office_location, country, job_mode, last_update
            FROM job_applications WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(job)
    }

    /// All applications, most recently touched first.
    pub async fn list(&self) -> Result<Vec<JobApplication>> {
        let jobs = sqlx::query_as::<_, JobApplication>(
            r#"
            SELECT id, company, title, description, status, url,
                   office_location, country, job_mode, last_update
            FROM job_applications
            ORDER BY last_update DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(jobs)
    }

    pub async fn update_status(&self, id: i64, status: ApplicationStatus) -> Result<bool> {
        let result =
            sqlx::query("UPDATE job_applications SET status = ?, last_update = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(Utc::now())
                .bind(id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite scraped fields, keeping existing values where the
    /// scrape came back empty.
    pub async fn apply_scraped(
        &self,
        id: i64,
        title: Option<&str>,
        company: Option<&str>,
        description: Option<&str>,
        url: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE job_applications SET
                title = COALESCE(?, title),
                company = COALESCE(?, company),
                description = COALESCE(?, description),
                url = ?,
                last_update = ?
            WHERE id = ?
            "#,
        )
        .bind(title.filter(|s| !s.is_empty()))
        .bind(company.filter(|s| !s.is_empty()))
        .bind(description.filter(|s| !s.is_empty()))
        .bind(url)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        // SQLite foreign keys are off by default per connection; delete
        // children explicitly.
        sqlx::query("DELETE FROM job_logs WHERE job_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        sqlx::query("DELETE FROM documents WHERE job_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM job_applications WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted job application {}", id);
        }
        Ok(deleted)
    }

    pub async fn add_log(
        &self,
        job_id: i64,
        note: &str,
        status_change: Option<(ApplicationStatus, ApplicationStatus)>,
    ) -> Result<JobLog> {
        let now = Utc::now();
        let (from, to) = match status_change {
            Some((from, to)) => (Some(from.as_str()), Some(to.as_str())),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            INSERT INTO job_logs (job_id, note, status_change_from, status_change_to, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(note)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(JobLog {
            id: result.last_insert_rowid(),
            job_id,
            note: note.to_string(),
            status_change_from: from.map(String::from),
            status_change_to: to.map(String::from),
            created_at: now,
        })
    }

    /// Logs for one application, newest first.
    pub async fn logs(&self, job_id: i64) -> Result<Vec<JobLog>> {
        let logs = sqlx::query_as::<_, JobLog>(
            r#"
            SELECT id, job_id, note, status_change_from, status_change_to, created_at
            FROM job_logs WHERE job_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(self.pool)
        .await?;
        Ok(logs)
    }

    pub async fn count_all(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM job_applications")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_with_status(&self, status: ApplicationStatus) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM job_applications WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM job_applications WHERE status NOT IN ('Completed', 'Rejected')",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_updated_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM job_applications WHERE last_update >= ?")
                .bind(since)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Display-ready dashboard stats, keyed the way the dashboard
    /// addresses its `stat-<key>` elements.
    pub async fn dashboard_stats(&self) -> Result<Vec<(String, String)>> {
        let week_ago = Utc::now() - Duration::days(7);
        Ok(vec![
            ("total_jobs".into(), self.count_all().await?.to_string()),
            (
                "active_applications".into(),
                self.count_active().await?.to_string(),
            ),
            (
                "offers".into(),
                self.count_with_status(ApplicationStatus::Offer)
                    .await?
                    .to_string(),
            ),
            (
                "this_week".into(),
                self.count_updated_since(week_ago).await?.to_string(),
            ),
        ])
    }
}

// ===== Documents =====

pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, job_id: i64, doc_type: &str, file_path: &str) -> Result<Document> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO documents (job_id, doc_type, file_path, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(job_id)
        .bind(doc_type)
        .bind(file_path)
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(Document {
            id: result.last_insert_rowid(),
            job_id,
            doc_type: doc_type.to_string(),
            file_path: file_path.to_string(),
            created_at: now,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>> {
        let doc = sqlx::query_as::<_, Document>(
            "SELECT id, job_id, doc_type, file_path, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(doc)
    }

    pub async fn for_job(&self, job_id: i64) -> Result<Vec<Document>> {
        let docs = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, job_id, doc_type, file_path, created_at
            FROM documents WHERE job_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(self.pool)
        .await?;
        Ok(docs)
    }
}

// ===== Master templates =====

pub struct TemplateRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TemplateRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<MasterTemplate>> {
        let template = sqlx::query_as::<_, MasterTemplate>(
            r#"
            SELECT id, name, content, template_type, file_path, created_at, updated_at
            FROM master_templates WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(template)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<MasterTemplate>> {
        let template = sqlx::query_as::<_, MasterTemplate>(
            r#"
            SELECT id, name, content, template_type, file_path, created_at, updated_at
            FROM master_templates WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(template)
    }

    pub async fn list(&self) -> Result<Vec<MasterTemplate>> {
        let templates = sqlx::query_as::<_, MasterTemplate>(
            r#"
            SELECT id, name, content, template_type, file_path, created_at, updated_at
            FROM master_templates ORDER BY name ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;
        Ok(templates)
    }

    /// Insert or update by name; returns the stored row.
    pub async fn upsert(
        &self,
        name: &str,
        content: &str,
        template_type: &str,
        file_path: Option<&str>,
    ) -> Result<MasterTemplate> {
        let now = Utc::now();
        match self.find_by_name(name).await? {
            Some(existing) => {
                sqlx::query(
                    r#"
                    UPDATE master_templates
                    SET content = ?, template_type = ?, file_path = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(content)
                .bind(template_type)
                .bind(file_path)
                .bind(now)
                .bind(existing.id)
                .execute(self.pool)
                .await?;
                self.get(existing.id)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("Template {} vanished after update", name))
            }
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO master_templates
                        (name, content, template_type, file_path, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(name)
                .bind(content)
                .bind(template_type)
                .bind(file_path)
                .bind(now)
                .bind(now)
                .execute(self.pool)
                .await?;
                self.get(result.last_insert_rowid())
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("Template {} vanished after insert", name))
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM master_templates WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ===== Profile =====

pub struct ProfileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, name, email, phone, linkedin, github, skills FROM profile ORDER BY id LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn upsert(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        linkedin: Option<&str>,
        github: Option<&str>,
        skills: Option<&str>,
    ) -> Result<Profile> {
        match self.get().await? {
            Some(existing) => {
                sqlx::query(
                    r#"
                    UPDATE profile
                    SET name = ?, email = ?, phone = ?, linkedin = ?, github = ?, skills = ?
                    WHERE id = ?
                    "#,
                )
                .bind(name)
                .bind(email)
                .bind(phone)
                .bind(linkedin)
                .bind(github)
                .bind(skills)
                .bind(existing.id)
                .execute(self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO profile (name, email, phone, linkedin, github, skills)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(name)
                .bind(email)
                .bind(phone)
                .bind(linkedin)
                .bind(github)
                .bind(skills)
                .execute(self.pool)
                .await?;
            }
        }
        self.get()
            .await?
            .ok_or_else(|| anyhow::anyhow!("Profile vanished after upsert"))
    }
}

// ===== Form drafts (autosave) =====

/// Namespace prefix for autosave keys. Callers address drafts by their
/// own key; the prefix keeps the slot namespace exclusive.
pub const DRAFT_KEY_PREFIX: &str = "autosave_";

pub struct DraftRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DraftRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", DRAFT_KEY_PREFIX, key)
    }

    pub async fn save(&self, key: &str, payload: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO form_drafts (key, payload, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
        )
        .bind(Self::storage_key(key))
        .bind(payload)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn load(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM form_drafts WHERE key = ?")
                .bind(Self::storage_key(key))
                .fetch_optional(self.pool)
                .await?;
        Ok(row.map(|(payload,)| payload))
    }

    pub async fn remove(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM form_drafts WHERE key = ?")
            .bind(Self::storage_key(key))
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(company: &str, title: &str) -> NewJob {
        NewJob {
            company: company.into(),
            title: title.into(),
            description: None,
            url: None,
            office_location: None,
            country: None,
            job_mode: "On-site".into(),
        }
    }

    #[tokio::test]
    async fn test_job_crud_round_trip() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool());

        let job = repo.create(new_job("Acme", "Engineer")).await.unwrap();
        assert_eq!(job.status, "Collected");

        assert!(repo
            .update_status(job.id, ApplicationStatus::Applied)
            .await
            .unwrap());
        let updated = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(updated.status, "Applied");

        assert!(repo.delete(job.id).await.unwrap());
        assert!(repo.get(job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_scraped_keeps_existing_on_empty() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool());
        let job = repo.create(new_job("Acme", "Engineer")).await.unwrap();

        repo.apply_scraped(
            job.id,
            Some("Senior Engineer"),
            Some(""),
            None,
            "https://x.test",
        )
        .await
        .unwrap();
        let updated = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Senior Engineer");
        assert_eq!(updated.company, "Acme");
        assert_eq!(updated.url.as_deref(), Some("https://x.test"));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_logs_and_documents() {
        let db = Database::in_memory().await.unwrap();
        let jobs = JobRepository::new(db.pool());
        let docs = DocumentRepository::new(db.pool());

        let job = jobs.create(new_job("Acme", "Engineer")).await.unwrap();
        jobs.add_log(job.id, "applied via referral", None)
            .await
            .unwrap();
        docs.create(job.id, "CV", "documents/a.pdf").await.unwrap();

        jobs.delete(job.id).await.unwrap();
        assert!(jobs.logs(job.id).await.unwrap().is_empty());
        assert!(docs.for_job(job.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_stats_keys() {
        let db = Database::in_memory().await.unwrap();
        let repo = JobRepository::new(db.pool());
        repo.create(new_job("Acme", "Engineer")).await.unwrap();
        let job = repo.create(new_job("Globex", "Analyst")).await.unwrap();
        repo.update_status(job.id, ApplicationStatus::Offer)
            .await
            .unwrap();

        let stats = repo.dashboard_stats().await.unwrap();
        let lookup: std::collections::HashMap<_, _> = stats.into_iter().collect();
        assert_eq!(lookup["total_jobs"], "2");
        assert_eq!(lookup["active_applications"], "2");
        assert_eq!(lookup["offers"], "1");
        assert_eq!(lookup["this_week"], "2");
    }

    #[tokio::test]
    async fn test_template_upsert_updates_in_place() {
        let db = Database::in_memory().await.unwrap();
        let repo = TemplateRepository::new(db.pool());

        let first = repo
            .upsert("letter", "\\documentclass{article}", "database", None)
            .await
            .unwrap();
        let second = repo
            .upsert("letter", "\\documentclass{letter}", "database", None)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "\\documentclass{letter}");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_draft_store_round_trip() {
        let db = Database::in_memory().await.unwrap();
        let repo = DraftRepository::new(db.pool());

        repo.save("new-job", r#"{"company":"Acme"}"#).await.unwrap();
        assert_eq!(
            repo.load("new-job").await.unwrap().as_deref(),
            Some(r#"{"company":"Acme"}"#)
        );
        assert!(repo.remove("new-job").await.unwrap());
        assert!(repo.load("new-job").await.unwrap().is_none());
    }
}
