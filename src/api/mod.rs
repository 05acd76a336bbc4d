use axum::{
    routing::{get, post},
    Router,
    Json,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, IntoResponse, Response},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{CorsLayer, Any};
use validator::Validate;

use crate::config::AppConfig;
use crate::document::Document;
use crate::pipeline::{Submission, SubmissionError, SubmissionPipeline};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<SubmissionPipeline>,
}

#[derive(Debug, Clone, Copy)]
pub struct ApiLimits {
    pub max_upload_bytes: usize,
    pub max_concurrent_submissions: usize,
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 20 * 1024 * 1024,
            max_concurrent_submissions: 1,
        }
    }
}

impl From<&AppConfig> for ApiLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            max_concurrent_submissions: config.max_concurrent_submissions,
        }
    }
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

/// Multipart fields of the upload form.
#[derive(Debug, Default, Validate)]
struct SubmitForm {
    #[validate(length(max = 255))]
    filename: Option<String>,
    #[validate(length(max = 20000))]
    questions: String,
    bytes: Option<Vec<u8>>,
}

impl SubmitForm {
    fn into_submission(self) -> Submission {
        let document = match (self.filename, self.bytes) {
            (Some(filename), Some(bytes)) => Some(Document::new(filename, bytes)),
            _ => None,
        };
        Submission {
            document,
            questions: self.questions,
        }
    }
}

const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>PDF Q&amp;A Chatbot</title></head>
<body>
  <h1>PDF Q&amp;A Chatbot</h1>
  <form action="/submit" method="post" enctype="multipart/form-data">
    <p><label>Upload a PDF file<br><input type="file" name="document" accept=".pdf,application/pdf"></label></p>
    <h3>Enter your questions (one per line):</h3>
    <p><textarea name="questions" rows="8" cols="80"></textarea></p>
    <p><button type="submit">Submit</button></p>
  </form>
</body>
</html>
"#;

/// Create and configure the API router
pub fn create_api(pipeline: Arc<SubmissionPipeline>, limits: ApiLimits) -> Router {
    let state = AppState { pipeline };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(form_page))
        .route(
            "/submit",
            post(submit_handler).layer(ConcurrencyLimitLayer::new(limits.max_concurrent_submissions)),
        )
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(limits.max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

async fn form_page() -> Html<&'static str> {
    Html(FORM_PAGE)
}

async fn health_check() -> Response {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string()
    }).into_response()
}

async fn submit_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return status_page(StatusCode::BAD_REQUEST, &e),
    };
    if let Err(e) = form.validate() {
        return status_page(StatusCode::BAD_REQUEST, &format!("Invalid form: {}", e));
    }

    match state.pipeline.submit(form.into_submission()).await {
        Ok(report) => {
            log::info!("[{}] submission complete, notification: {}", report.id, report.notification);
            status_page(StatusCode::OK, report.status())
        }
        Err(SubmissionError::Validation(e)) => status_page(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e) => status_page(StatusCode::UNPROCESSABLE_ENTITY, &format!("Error: {}", e)),
    }
}

async fn read_form(mut multipart: Multipart) -> Result<SubmitForm, String> {
    let mut form = SubmitForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed upload: {}", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("document") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Malformed upload: {}", e))?;
                // browsers send an empty, unnamed part when no file was picked
                if !filename.is_empty() || !bytes.is_empty() {
                    form.filename = Some(filename);
                    form.bytes = Some(bytes.to_vec());
                }
            }
            Some("questions") => {
                form.questions = field
                    .text()
                    .await
                    .map_err(|e| format!("Malformed upload: {}", e))?;
            }
            _ => {}
        }
    }

    Ok(form)
}

fn status_page(code: StatusCode, status: &str) -> Response {
    let kind = if code.is_success() { "success" } else { "error" };
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>PDF Q&amp;A Chatbot</title></head>\n<body>\n  <p class=\"{}\">{}</p>\n  <p><a href=\"/\">Back</a></p>\n</body>\n</html>\n",
        kind,
        escape_html(status)
    );
    (code, Html(body)).into_response()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
