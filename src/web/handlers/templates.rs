// src/web/handlers/templates.rs

use rocket::serde::json::Json;
use rocket::serde::Serialize;
use rocket::State;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::database::{Database, TemplateRepository};
use crate::forms::{validate_form, FormData, Rule};
use crate::latex::{sanitize_filename, validate_latex_content};
use crate::models::{MasterTemplate, TEMPLATE_TYPE_DATABASE, TEMPLATE_TYPE_FILE};
use crate::web::types::{Envelope, SaveTemplateRequest};

use super::{bad_request, server_error, validation_failed, validators, ApiResult};

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<MasterTemplate>,
}

pub async fn list_templates_handler(
    db: &State<Database>,
) -> ApiResult<Json<TemplateListResponse>> {
    let templates = TemplateRepository::new(db.pool())
        .list()
        .await
        .map_err(|e| {
            error!("Failed to list templates: {}", e);
            server_error("Failed to load templates")
        })?;
    Ok(Json(TemplateListResponse {
        success: true,
        templates,
    }))
}

fn save_template_rules() -> Vec<(&'static str, Vec<Rule>)> {
    vec![
        ("name", vec![Rule::Required, Rule::MaxLen(100)]),
        ("content", vec![Rule::Required]),
    ]
}

pub async fn save_template_handler(
    request: Json<SaveTemplateRequest>,
    db: &State<Database>,
    config: &State<AppConfig>,
) -> ApiResult<Json<Envelope>> {
    let request = request.into_inner();
    let data = FormData::from_pairs([
        ("name", request.name.clone().unwrap_or_default()),
        ("content", request.content.clone().unwrap_or_default()),
    ]);
    let report = validate_form(&data, &save_template_rules(), validators());
    if !report.valid {
        return Err(validation_failed(report));
    }

    let name = request.name.unwrap_or_default().trim().to_string();
    let content = request.content.unwrap_or_default();
    if !validate_latex_content(&content) {
        return Err(bad_request(
            "Template must be a complete LaTeX document (\\documentclass through \\end{document})",
        ));
    }

    let template_type = match request.template_type.as_deref() {
        None | Some(TEMPLATE_TYPE_DATABASE) => TEMPLATE_TYPE_DATABASE,
        Some(TEMPLATE_TYPE_FILE) => TEMPLATE_TYPE_FILE,
        Some(other) => {
            return Err(bad_request(format!("Invalid template type: {}", other)));
        }
    };

    let repo = TemplateRepository::new(db.pool());
    let template = if template_type == TEMPLATE_TYPE_FILE {
        // The file is written before the row exists; a failed write must
        // not leave a listed template whose load always errors.
        let file_path = config
            .templates_path
            .join(format!("{}.tex", sanitize_filename(&name)));
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create templates directory: {}", e);
                server_error("Failed to write the template file")
            })?;
        }
        tokio::fs::write(&file_path, &content).await.map_err(|e| {
            error!("Failed to write template file for {}: {}", name, e);
            server_error("Failed to write the template file")
        })?;
        repo.upsert(
            &name,
            "",
            TEMPLATE_TYPE_FILE,
            Some(&file_path.display().to_string()),
        )
        .await
        .map_err(|e| {
            error!("Failed to save template {}: {}", name, e);
            server_error("Failed to save the template")
        })?
    } else {
        repo.upsert(&name, &content, TEMPLATE_TYPE_DATABASE, None)
            .await
            .map_err(|e| {
                error!("Failed to save template {}: {}", name, e);
                server_error("Failed to save the template")
            })?
    };

    info!("Saved {} template '{}'", template.template_type, template.name);
    Ok(Json(Envelope::success("Template saved")))
}
