//! HTTP handlers for the pdfgen API

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use latex_engine::{BundleSubmission, UploadedFile, MAX_BUNDLE_ASSETS};
use serde_json::Value;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfgen-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Toolchain readiness, 503 when no compiler can be resolved
pub async fn pdf_health(State(state): State<Arc<AppState>>) -> Response {
    let report = state.engine.health().await;
    let status = if report.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

/// List available template names
pub async fn list_templates(State(state): State<Arc<AppState>>) -> Json<TemplateListResponse> {
    let templates = state.engine.renderer().list();
    Json(TemplateListResponse {
        success: true,
        count: templates.len(),
        templates,
    })
}

/// Render JSON data with a template and return the PDF
pub async fn compile(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CompileQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let Json(data) = body?;

    let template = query
        .template
        .unwrap_or_else(|| state.default_template.clone());
    let compiled = state.engine.compile_data("compile", &template, &data).await?;

    Ok(pdf_response(compiled.pdf, "document.pdf"))
}

/// Render a proposal document
pub async fn proposal(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(data) = body?;
    if !data.is_object() {
        return Err(ApiError::Validation(
            "Proposal data must be a JSON object".to_string(),
        ));
    }

    let compiled = state.engine.compile_data("proposal", "proposal", &data).await?;
    Ok(pdf_response(compiled.pdf, "proposal.pdf"))
}

/// Compile a customer header without storing it
pub async fn preview_customer_header(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(data) = body?;
    let compiled = state.store.preview(&data).await?;
    Ok(pdf_response(compiled.pdf, "customer-header.pdf"))
}

/// Compile and store a customer header
pub async fn create_customer_header(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredArtifactResponse>), ApiError> {
    let Json(data) = body?;
    let artifact = state.store.create(&data).await?;
    Ok((StatusCode::CREATED, Json(artifact.into())))
}

pub async fn list_customer_headers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CustomerHeaderListResponse>, ApiError> {
    let records = state.store.list().await?;
    Ok(Json(CustomerHeaderListResponse {
        success: true,
        count: records.len(),
        records,
    }))
}

pub async fn get_customer_header(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CustomerHeaderRecord>, ApiError> {
    Ok(Json(state.store.get(&id).await?))
}

/// Stored PDF of a customer header
pub async fn get_customer_header_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let pdf = state.store.pdf(&id).await?;
    Ok(pdf_response(pdf, &format!("customer-header-{}.pdf", id)))
}

/// Recompile a customer header with new data
pub async fn update_customer_header(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<StoredArtifactResponse>, ApiError> {
    let Json(data) = body?;
    let artifact = state.store.update(&id, &data).await?;
    Ok(Json(artifact.into()))
}

/// Compile one uploaded `.tex` file (multipart field `file`)
pub async fn compile_file(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart?;
    let mut main = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if main.is_some() {
            return Err(ApiError::Validation(
                "Only one 'file' field is allowed".to_string(),
            ));
        }
        main = Some(read_upload(field, "main.tex").await?);
    }

    let main = main.ok_or_else(|| ApiError::Validation("Missing 'file' field".to_string()))?;
    let compiled = state.engine.compile_source("compile-file", main.content).await?;

    Ok(pdf_response(compiled.pdf, "document.pdf"))
}

/// Compile a main document with auxiliary assets.
///
/// Fields: exactly one `main`, and up to [`MAX_BUNDLE_ASSETS`] `assets`.
pub async fn compile_bundle(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart?;
    let mut main = None;
    let mut assets = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("main") => {
                if main.is_some() {
                    return Err(ApiError::Validation(
                        "Only one 'main' field is allowed".to_string(),
                    ));
                }
                main = Some(read_upload(field, "main.tex").await?);
            }
            Some("assets") => {
                // Stop reading as soon as the limit is crossed
                if assets.len() == MAX_BUNDLE_ASSETS {
                    return Err(ApiError::Validation(format!(
                        "Too many assets (maximum {})",
                        MAX_BUNDLE_ASSETS
                    )));
                }
                let fallback = format!("asset-{}", assets.len());
                assets.push(read_upload(field, &fallback).await?);
            }
            _ => {}
        }
    }

    let bundle = BundleSubmission::new(main, assets)?;
    let compiled = state.engine.compile_bundle("compile-bundle", &bundle).await?;

    Ok(pdf_response(compiled.pdf, "document.pdf"))
}

async fn read_upload(field: Field<'_>, fallback_name: &str) -> Result<UploadedFile, ApiError> {
    let filename = field
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback_name)
        .to_string();
    let content = field.bytes().await?;
    Ok(UploadedFile::new(filename, content.to_vec()))
}

fn pdf_response(pdf: Vec<u8>, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    )
        .into_response()
}
