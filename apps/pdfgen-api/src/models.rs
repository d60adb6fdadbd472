//! Data models for the pdfgen API

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Customer header row, without the PDF blob
#[derive(Debug, Clone, FromRow)]
pub struct DbCustomerHeader {
    pub id: String,
    pub data_json: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted customer header as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerHeaderRecord {
    pub id: String,
    /// The data as submitted, before escaping
    pub data: serde_json::Value,
    /// Where the stored PDF can be fetched
    pub pdf_ref: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerHeaderRecord {
    pub fn pdf_ref_for(id: &str) -> String {
        format!("/customer-headers/{}/pdf", id)
    }
}

impl TryFrom<DbCustomerHeader> for CustomerHeaderRecord {
    type Error = serde_json::Error;

    fn try_from(row: DbCustomerHeader) -> Result<Self, Self::Error> {
        Ok(Self {
            data: serde_json::from_str(&row.data_json)?,
            pdf_ref: Self::pdf_ref_for(&row.id),
            id: row.id,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A record together with the PDF compiled for it
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub record: CustomerHeaderRecord,
    pub pdf: Vec<u8>,
}

/// Response for create/update: the record plus the PDF
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifactResponse {
    pub success: bool,
    pub record: CustomerHeaderRecord,
    pub pdf_base64: String,
}

impl From<StoredArtifact> for StoredArtifactResponse {
    fn from(artifact: StoredArtifact) -> Self {
        Self {
            success: true,
            pdf_base64: BASE64.encode(&artifact.pdf),
            record: artifact.record,
        }
    }
}

/// Response for the record listing
#[derive(Debug, Clone, Serialize)]
pub struct CustomerHeaderListResponse {
    pub success: bool,
    pub records: Vec<CustomerHeaderRecord>,
    pub count: usize,
}

/// Query parameters of POST /compile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompileQuery {
    /// Template to render with, defaults to the configured one
    pub template: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Template list response
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<String>,
    pub count: usize,
}
