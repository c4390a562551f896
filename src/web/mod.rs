// src/web/mod.rs

pub mod guards;
pub mod handlers;
pub mod types;

pub use guards::{CsrfToken, OperationGate, CSRF_COOKIE, CSRF_HEADER};
pub use types::*;

use crate::config::AppConfig;
use crate::database::Database;
use crate::scrape::JobScraper;
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Cookie, Header, SameSite, Status};
use rocket::serde::json::Json;
use rocket::{catchers, delete, get, options, post, routes, Build, Request, Response, State};
use tracing::{error, info};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// Routes

#[post("/job", data = "<request>")]
pub async fn create_job(
    request: Json<NewJobRequest>,
    _csrf: CsrfToken,
    db: &State<Database>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::jobs::create_job_handler(request, db).await
}

#[get("/job/<id>")]
pub async fn job_detail(
    id: i64,
    db: &State<Database>,
) -> handlers::ApiResult<Json<handlers::jobs::JobDetailResponse>> {
    handlers::jobs::job_detail_handler(id, db).await
}

#[delete("/job/<id>")]
pub async fn delete_job(
    id: i64,
    _csrf: CsrfToken,
    db: &State<Database>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::jobs::delete_job_handler(id, db).await
}

#[post("/job/<id>/status", data = "<request>")]
pub async fn update_status(
    id: i64,
    request: Json<UpdateStatusRequest>,
    _csrf: CsrfToken,
    db: &State<Database>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::jobs::update_status_handler(id, request, db).await
}

#[post("/job/<id>/log", data = "<request>")]
pub async fn quick_log(
    id: i64,
    request: Json<QuickLogRequest>,
    _csrf: CsrfToken,
    db: &State<Database>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::jobs::quick_log_handler(id, request, db).await
}

#[post("/job/scrape", data = "<request>")]
pub async fn scrape_job(
    request: Json<ScrapeRequest>,
    _csrf: CsrfToken,
    db: &State<Database>,
    scraper: &State<JobScraper>,
    gate: &State<OperationGate>,
) -> handlers::ApiResult<Json<ScrapeResultResponse>> {
    handlers::scrape::scrape_handler(request, db, scraper, gate).await
}

#[post("/job/<id>/generate-pdf", data = "<request>")]
pub async fn generate_pdf(
    id: i64,
    request: Json<GeneratePdfRequest>,
    _csrf: CsrfToken,
    db: &State<Database>,
    config: &State<AppConfig>,
    gate: &State<OperationGate>,
) -> handlers::ApiResult<PdfResponse> {
    handlers::documents::generate_pdf_handler(id, request, db, config, gate).await
}

#[get("/job/<id>/download/<doc_id>")]
pub async fn download_document(
    id: i64,
    doc_id: i64,
    db: &State<Database>,
) -> handlers::ApiResult<PdfResponse> {
    handlers::documents::download_document_handler(id, doc_id, db).await
}

#[get("/api/dashboard/stats")]
pub async fn dashboard_stats(db: &State<Database>) -> handlers::ApiResult<Json<StatsResponse>> {
    handlers::stats::dashboard_stats_handler(db).await
}

#[get("/templates")]
pub async fn list_templates(
    db: &State<Database>,
) -> handlers::ApiResult<Json<handlers::templates::TemplateListResponse>> {
    handlers::templates::list_templates_handler(db).await
}

#[post("/templates", data = "<request>")]
pub async fn save_template(
    request: Json<SaveTemplateRequest>,
    _csrf: CsrfToken,
    db: &State<Database>,
    config: &State<AppConfig>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::templates::save_template_handler(request, db, config).await
}

#[get("/user")]
pub async fn get_profile(
    db: &State<Database>,
) -> handlers::ApiResult<Json<handlers::profile::ProfileResponse>> {
    handlers::profile::get_profile_handler(db).await
}

#[post("/user", data = "<request>")]
pub async fn save_profile(
    request: Json<ProfileRequest>,
    _csrf: CsrfToken,
    db: &State<Database>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::profile::save_profile_handler(request, db).await
}

#[post("/api/drafts/<key>", data = "<data>")]
pub async fn save_draft(
    key: &str,
    data: Json<crate::forms::FormData>,
    _csrf: CsrfToken,
    db: &State<Database>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::drafts::save_draft_handler(key, data, db).await
}

#[get("/api/drafts/<key>")]
pub async fn load_draft(
    key: &str,
    db: &State<Database>,
) -> handlers::ApiResult<Json<handlers::drafts::DraftResponse>> {
    handlers::drafts::load_draft_handler(key, db).await
}

#[delete("/api/drafts/<key>")]
pub async fn delete_draft(
    key: &str,
    _csrf: CsrfToken,
    db: &State<Database>,
) -> handlers::ApiResult<Json<Envelope>> {
    handlers::drafts::delete_draft_handler(key, db).await
}

/// Issue the CSRF token pair: the value goes out both as a cookie and in
/// the body so the client can echo it back in the request header.
#[get("/api/csrf")]
pub async fn csrf_token(cookies: &rocket::http::CookieJar<'_>) -> Json<CsrfResponse> {
    let token = uuid::Uuid::new_v4().to_string();
    cookies.add(
        Cookie::build((CSRF_COOKIE, token.clone()))
            .path("/")
            .same_site(SameSite::Strict)
            .build(),
    );
    Json(CsrfResponse {
        success: true,
        token,
    })
}

#[get("/health")]
pub async fn health(db: &State<Database>) -> Json<Envelope> {
    match db.health_check().await {
        Ok(()) => Json(Envelope::success("ok")),
        Err(e) => {
            error!("Health check failed: {}", e);
            Json(Envelope::error("Database unavailable"))
        }
    }
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers

#[rocket::catch(400)]
pub fn bad_request_catcher() -> Json<Envelope> {
    Json(Envelope::error("Invalid request format"))
}

#[rocket::catch(403)]
pub fn forbidden_catcher() -> Json<Envelope> {
    Json(Envelope::error("CSRF token missing or mismatched"))
}

#[rocket::catch(404)]
pub fn not_found_catcher() -> Json<Envelope> {
    Json(Envelope::error("Resource not found"))
}

#[rocket::catch(422)]
pub fn unprocessable_catcher() -> Json<Envelope> {
    Json(Envelope::error("Request body could not be parsed"))
}

#[rocket::catch(500)]
pub fn internal_error_catcher() -> Json<Envelope> {
    Json(Envelope::error("Internal server error"))
}

/// Assemble the Rocket instance. Split from [`start_web_server`] so
/// tests can drive it with a local client.
pub fn build_rocket(config: AppConfig, db: Database) -> Result<rocket::Rocket<Build>> {
    let scraper = JobScraper::new(&config.scrape)?;

    Ok(rocket::build()
        .attach(Cors)
        .manage(config)
        .manage(db)
        .manage(scraper)
        .manage(OperationGate::new())
        .register(
            "/",
            catchers![
                bad_request_catcher,
                forbidden_catcher,
                not_found_catcher,
                unprocessable_catcher,
                internal_error_catcher,
            ],
        )
        .mount(
            "/",
            routes![
                create_job,
                job_detail,
                delete_job,
                update_status,
                quick_log,
                scrape_job,
                generate_pdf,
                download_document,
                dashboard_stats,
                list_templates,
                save_template,
                get_profile,
                save_profile,
                save_draft,
                load_draft,
                delete_draft,
                csrf_token,
                health,
                options,
            ],
        ))
}

pub async fn start_web_server(config: AppConfig) -> Result<()> {
    config.ensure_directories().await?;

    let db = match Database::new(&config.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e);
        }
    };

    info!("Starting job tracker API server");
    info!("Database: {}", config.database_path.display());

    let _rocket = build_rocket(config, db)?.launch().await?;
    Ok(())
}
