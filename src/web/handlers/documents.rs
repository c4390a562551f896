// src/web/handlers/documents.rs
//! PDF generation and download for one job application.

use rocket::serde::json::Json;
use rocket::State;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::database::{Database, DocumentRepository, JobRepository, ProfileRepository, TemplateRepository};
use crate::latex::{apply_replacements, sanitize_filename, LatexCompiler};
use crate::models::{DocumentKind, Profile, TEMPLATE_TYPE_FILE};
use crate::web::guards::OperationGate;
use crate::web::types::{GeneratePdfRequest, PdfResponse};

use super::{bad_request, conflict, not_found, server_error, ApiResult};

fn replacements(profile: &Profile, company: &str, title: &str) -> HashMap<&'static str, String> {
    HashMap::from([
        ("NAME", profile.name.clone()),
        ("EMAIL", profile.email.clone()),
        ("PHONE", profile.phone.clone().unwrap_or_default()),
        ("LINKEDIN", profile.linkedin.clone().unwrap_or_default()),
        ("GITHUB", profile.github.clone().unwrap_or_default()),
        ("COMPANY", company.to_string()),
        ("JOB_TITLE", title.to_string()),
    ])
}

pub async fn generate_pdf_handler(
    job_id: i64,
    request: Json<GeneratePdfRequest>,
    db: &State<Database>,
    config: &State<AppConfig>,
    gate: &State<OperationGate>,
) -> ApiResult<PdfResponse> {
    let request = request.into_inner();
    let kind = DocumentKind::parse(&request.doc_type)
        .map_err(|_| bad_request(format!("Invalid document type: {}", request.doc_type)))?;

    let _permit = gate
        .try_begin(&format!("generate:{}", job_id))
        .ok_or_else(|| conflict("A document for this job is already being generated"))?;

    let job = JobRepository::new(db.pool())
        .get(job_id)
        .await
        .map_err(|e| {
            error!("Failed to load job {}: {}", job_id, e);
            server_error("Failed to load the job application")
        })?
        .ok_or_else(|| not_found("Job application not found"))?;

    let profile = ProfileRepository::new(db.pool())
        .get()
        .await
        .map_err(|e| {
            error!("Failed to load profile: {}", e);
            server_error("Failed to load the user profile")
        })?
        .ok_or_else(|| bad_request("Please set up your user profile first"))?;

    // Template body comes either from a stored master template or from
    // inline content supplied by the editor.
    let (content, template_dir) = match request.template_id {
        Some(template_id) => {
            let template = TemplateRepository::new(db.pool())
                .get(template_id)
                .await
                .map_err(|e| {
                    error!("Failed to load template {}: {}", template_id, e);
                    server_error("Failed to load the template")
                })?
                .ok_or_else(|| not_found("Template not found"))?;
            let dir = if template.template_type == TEMPLATE_TYPE_FILE {
                template
                    .file_path
                    .as_deref()
                    .and_then(|p| Path::new(p).parent())
                    .map(Path::to_path_buf)
            } else {
                Some(config.templates_path.clone())
            };
            let content = template.load_content().await.map_err(|e| {
                error!("Failed to resolve template {}: {}", template_id, e);
                server_error(e.to_string())
            })?;
            (content, dir)
        }
        None => {
            let content = request
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| bad_request("No template content provided"))?;
            (content, Some(config.templates_path.clone()))
        }
    };

    let content = apply_replacements(&content, &replacements(&profile, &job.company, &job.title));

    let filename = sanitize_filename(&format!(
        "{}_{}_{}_{}",
        job.company,
        job.title,
        kind.as_str(),
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));

    let compiler = LatexCompiler::new(config.documents_path.clone(), config.latex.timeout_seconds);
    let pdf_path = compiler
        .compile(&content, &filename, template_dir.as_deref())
        .await
        .map_err(|e| {
            error!("PDF generation failed for job {}: {}", job_id, e);
            server_error(e.to_string())
        })?;

    DocumentRepository::new(db.pool())
        .create(job_id, kind.as_str(), &pdf_path.display().to_string())
        .await
        .map_err(|e| {
            error!("Failed to record document for job {}: {}", job_id, e);
            server_error("Failed to record the generated document")
        })?;

    let data = tokio::fs::read(&pdf_path).await.map_err(|e| {
        error!("Failed to read generated PDF {}: {}", pdf_path.display(), e);
        server_error("Failed to read the generated PDF")
    })?;

    info!("Generated {} for job {} ({} bytes)", kind.as_str(), job_id, data.len());
    Ok(PdfResponse::with_filename(data, format!("{}.pdf", filename)))
}

pub async fn download_document_handler(
    job_id: i64,
    doc_id: i64,
    db: &State<Database>,
) -> ApiResult<PdfResponse> {
    let document = DocumentRepository::new(db.pool())
        .get(doc_id)
        .await
        .map_err(|e| {
            error!("Failed to load document {}: {}", doc_id, e);
            server_error("Failed to load the document")
        })?
        .filter(|doc| doc.job_id == job_id)
        .ok_or_else(|| not_found("Document not found"))?;

    let data = tokio::fs::read(&document.file_path).await.map_err(|e| {
        error!(
            "Document file missing: {} ({})",
            document.file_path, e
        );
        not_found("The document file is no longer available")
    })?;

    let filename = Path::new(&document.file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("document_{}.pdf", doc_id));
    Ok(PdfResponse::with_filename(data, filename))
}
