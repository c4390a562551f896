// src/models.rs
//! Domain types shared between the repositories and the web layer.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a job application, from first collection to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "Collected")]
    Collected,
    #[serde(rename = "Applied")]
    Applied,
    #[serde(rename = "Process")]
    Process,
    #[serde(rename = "Waiting Decision")]
    WaitingDecision,
    #[serde(rename = "Offer")]
    Offer,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Rejected")]
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Collected,
        ApplicationStatus::Applied,
        ApplicationStatus::Process,
        ApplicationStatus::WaitingDecision,
        ApplicationStatus::Offer,
        ApplicationStatus::Completed,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Collected => "Collected",
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Process => "Process",
            ApplicationStatus::WaitingDecision => "Waiting Decision",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Completed => "Completed",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| anyhow::anyhow!("Invalid status: {}", value))
    }

    /// Statuses that still need attention on the dashboard.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::Rejected
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobMode {
    #[serde(rename = "Remote")]
    Remote,
    #[serde(rename = "Hybrid")]
    Hybrid,
    #[serde(rename = "On-site")]
    OnSite,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Remote => "Remote",
            JobMode::Hybrid => "Hybrid",
            JobMode::OnSite => "On-site",
        }
    }

    /// Unknown values fall back to on-site rather than failing the row.
    pub fn parse_lossy(value: &str) -> Self {
        match value {
            "Remote" => JobMode::Remote,
            "Hybrid" => JobMode::Hybrid,
            _ => JobMode::OnSite,
        }
    }
}

/// Kind of generated document attached to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "CV")]
    Cv,
    #[serde(rename = "Cover Letter")]
    CoverLetter,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Cv => "CV",
            DocumentKind::CoverLetter => "Cover Letter",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "CV" => Ok(DocumentKind::Cv),
            "Cover Letter" => Ok(DocumentKind::CoverLetter),
            other => anyhow::bail!("Invalid document type: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobApplication {
    pub id: i64,
    pub company: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub url: Option<String>,
    pub office_location: Option<String>,
    pub country: Option<String>,
    pub job_mode: String,
    pub last_update: DateTime<Utc>,
}

impl JobApplication {
    pub fn status_enum(&self) -> Result<ApplicationStatus> {
        ApplicationStatus::parse(&self.status)
    }

    pub fn job_mode_enum(&self) -> JobMode {
        JobMode::parse_lossy(&self.job_mode)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobLog {
    pub id: i64,
    pub job_id: i64,
    pub note: String,
    pub status_change_from: Option<String>,
    pub status_change_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
    pub job_id: i64,
    pub doc_type: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// Master LaTeX template. `database` templates keep their content in the
/// row; `file` templates keep a `.tex` file on disk next to its sections.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MasterTemplate {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub template_type: String,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TEMPLATE_TYPE_DATABASE: &str = "database";
pub const TEMPLATE_TYPE_FILE: &str = "file";

impl MasterTemplate {
    fn checked_file_path(&self) -> Result<&str> {
        let path = self
            .file_path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("File template '{}' has no file path", self.name))?;
        // Traversal guard: stored paths must not climb out of the
        // configured templates directory.
        if std::path::Path::new(path)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            anyhow::bail!("Invalid template file path: {}", path);
        }
        Ok(path)
    }

    /// Resolve the template body, reading the backing file for file-type
    /// templates.
    pub async fn load_content(&self) -> Result<String> {
        if self.template_type == TEMPLATE_TYPE_FILE {
            let path = self.checked_file_path()?;
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read template file {}: {}", path, e))?;
            if content.trim().is_empty() {
                anyhow::bail!("Template file is empty: {}", path);
            }
            Ok(content)
        } else {
            Ok(self.content.clone())
        }
    }
}

/// Single-row user profile used for document replacements and matching.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub skills: Option<String>,
}

impl Profile {
    /// Comma-separated skills as a trimmed list.
    pub fn skills_list(&self) -> Vec<String> {
        self.skills
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
