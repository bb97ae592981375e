pub mod config;
pub mod entries;
pub mod opportunities;
pub mod phases;

use serde::Deserialize;

use crate::error::AppError;

/// Run a store call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> kaizen_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(result)
}

/// `?filename=` on raw-body uploads.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}
