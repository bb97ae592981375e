use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/config: the loaded project config, webhook URL redacted.
pub async fn get_config(State(app): State<AppState>) -> Json<serde_json::Value> {
    let config = &app.config;
    Json(serde_json::json!({
        "version": config.version,
        "flagship_category": config.flagship_category,
        "max_save_retries": config.max_save_retries,
        "notifications": {
            "enabled": config.notifications.enabled,
            "webhook_configured": config.notifications.webhook_url.is_some(),
            "subject_prefix": config.notifications.subject_prefix,
        },
        "server": { "port": config.server.port },
    }))
}
