//! Application state for the pdfgen API

use std::sync::Arc;

use anyhow::Result;
use latex_engine::LatexEngine;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::{Args, BodyLimits};
use crate::store::ArtifactStore;

pub struct AppState {
    pub engine: Arc<LatexEngine>,
    pub store: ArtifactStore,
    /// Template used by POST /compile without `?template=`
    pub default_template: String,
    pub limits: BodyLimits,
}

impl AppState {
    pub async fn new(args: &Args) -> Result<Self> {
        let engine = Arc::new(LatexEngine::new(args.engine_config())?);

        let db_url = args.database_url();
        tracing::info!("Connecting to database: {}", db_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        ArtifactStore::run_migrations(&pool).await?;

        Ok(Self::from_parts(
            engine,
            pool,
            args.default_template.clone(),
            args.body_limits(),
        ))
    }

    pub fn from_parts(
        engine: Arc<LatexEngine>,
        db: SqlitePool,
        default_template: String,
        limits: BodyLimits,
    ) -> Self {
        Self {
            store: ArtifactStore::new(db, engine.clone()),
            engine,
            default_template,
            limits,
        }
    }
}
