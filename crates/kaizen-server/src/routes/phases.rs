use axum::body::Bytes;
use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use kaizen_core::phase::{
    ClosureDocument, ControlPhase, ControlUpdate, DefineDocument, DefinePhase, DefinePhaseUpdate,
    ImprovementPhase, ImprovementUpdate, MeasureAnalysisPhase, NewMeasureAnalysis, NewSsvTool,
    ProjectClosure, ProjectClosureUpdate, SsvTools,
};
use kaizen_core::service::{ControlSubmission, ImprovementSubmission};
use kaizen_core::SubStatus;

use super::{blocking, UploadQuery};
use crate::error::AppError;
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

/// A phase submission plus its completion flag. Only `"Pending"` keeps the
/// phase open; anything else, or no flag, completes it.
#[derive(Debug, Deserialize)]
pub struct Submission<T> {
    #[serde(flatten)]
    pub body: T,
    #[serde(default)]
    pub sub_status: Option<String>,
}

impl<T> Submission<T> {
    fn sub_status(&self) -> SubStatus {
        self.sub_status
            .as_deref()
            .map(SubStatus::parse)
            .unwrap_or(SubStatus::Completed)
    }
}

#[derive(Debug, Deserialize)]
pub struct Rows<T> {
    pub rows: Vec<T>,
}

// ---------------------------------------------------------------------------
// Define
// ---------------------------------------------------------------------------

/// PUT /api/opportunities/{id}/define
pub async fn submit_define(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DefinePhase>,
) -> Result<Json<DefinePhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.submit_define(id, body)).await?;
    Ok(Json(phase))
}

/// PATCH /api/opportunities/{id}/define
pub async fn update_define(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DefinePhaseUpdate>,
) -> Result<Json<DefinePhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.update_define(id, body)).await?;
    Ok(Json(phase))
}

pub async fn get_define(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DefinePhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.define_phase(id)).await?;
    Ok(Json(phase))
}

/// POST /api/opportunities/{id}/define/documents/{kind}?filename=…
pub async fn upload_define_document(
    State(app): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<DefinePhase>, AppError> {
    let document: DefineDocument = kind.parse()?;
    let service = app.service.clone();
    let phase = blocking(move || {
        service.upload_define_document(id, document, &body, &upload.filename)
    })
    .await?;
    Ok(Json(phase))
}

// ---------------------------------------------------------------------------
// SSV tools
// ---------------------------------------------------------------------------

/// POST /api/opportunities/{id}/ssv-tools: appends rows.
pub async fn submit_ssv_tools(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Rows<NewSsvTool>>,
) -> Result<Json<SsvTools>, AppError> {
    let service = app.service.clone();
    let tools = blocking(move || service.submit_ssv_tools(id, body.rows)).await?;
    Ok(Json(tools))
}

pub async fn get_ssv_tools(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SsvTools>, AppError> {
    let service = app.service.clone();
    let tools = blocking(move || service.ssv_tools(id)).await?;
    Ok(Json(tools))
}

pub async fn upload_ssv_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<SsvTools>, AppError> {
    let service = app.service.clone();
    let tools =
        blocking(move || service.upload_ssv_document(id, &body, &upload.filename)).await?;
    Ok(Json(tools))
}

// ---------------------------------------------------------------------------
// Measure & analyze
// ---------------------------------------------------------------------------

/// PUT /api/opportunities/{id}/measure-analysis
pub async fn submit_measure_analysis(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Submission<Rows<NewMeasureAnalysis>>>,
) -> Result<Json<MeasureAnalysisPhase>, AppError> {
    let sub_status = body.sub_status();
    let service = app.service.clone();
    let phase =
        blocking(move || service.submit_measure_analysis(id, body.body.rows, sub_status)).await?;
    Ok(Json(phase))
}

pub async fn get_measure_analysis(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MeasureAnalysisPhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.measure_analysis(id)).await?;
    Ok(Json(phase))
}

pub async fn upload_measure_analysis_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<MeasureAnalysisPhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || {
        service.upload_measure_analysis_document(id, &body, &upload.filename)
    })
    .await?;
    Ok(Json(phase))
}

// ---------------------------------------------------------------------------
// Improvement
// ---------------------------------------------------------------------------

/// PUT /api/opportunities/{id}/improvement
pub async fn submit_improvement(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Submission<ImprovementSubmission>>,
) -> Result<Json<ImprovementPhase>, AppError> {
    let sub_status = body.sub_status();
    let service = app.service.clone();
    let phase = blocking(move || service.submit_improvement(id, body.body, sub_status)).await?;
    Ok(Json(phase))
}

pub async fn update_improvement(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ImprovementUpdate>,
) -> Result<Json<ImprovementPhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.update_improvement(id, body)).await?;
    Ok(Json(phase))
}

pub async fn get_improvement(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImprovementPhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.improvement(id)).await?;
    Ok(Json(phase))
}

pub async fn upload_improvement_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ImprovementPhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || {
        service.upload_improvement_document(id, &body, &upload.filename)
    })
    .await?;
    Ok(Json(phase))
}

// ---------------------------------------------------------------------------
// Control
// ---------------------------------------------------------------------------

/// PUT /api/opportunities/{id}/control
pub async fn submit_control(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Submission<ControlSubmission>>,
) -> Result<Json<ControlPhase>, AppError> {
    let sub_status = body.sub_status();
    let service = app.service.clone();
    let phase = blocking(move || service.submit_control(id, body.body, sub_status)).await?;
    Ok(Json(phase))
}

pub async fn update_control(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ControlUpdate>,
) -> Result<Json<ControlPhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.update_control(id, body)).await?;
    Ok(Json(phase))
}

pub async fn get_control(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ControlPhase>, AppError> {
    let service = app.service.clone();
    let phase = blocking(move || service.control(id)).await?;
    Ok(Json(phase))
}

pub async fn upload_control_document(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ControlPhase>, AppError> {
    let service = app.service.clone();
    let phase =
        blocking(move || service.upload_control_document(id, &body, &upload.filename)).await?;
    Ok(Json(phase))
}

// ---------------------------------------------------------------------------
// Closure
// ---------------------------------------------------------------------------

/// POST /api/opportunities/{id}/closure: starts the approval chain.
pub async fn create_closure(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ProjectClosure>,
) -> Result<Json<ProjectClosure>, AppError> {
    let service = app.service.clone();
    let closure = blocking(move || service.create_closure(id, body)).await?;
    Ok(Json(closure))
}

pub async fn update_closure(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ProjectClosureUpdate>,
) -> Result<Json<ProjectClosure>, AppError> {
    let service = app.service.clone();
    let closure = blocking(move || service.update_closure(id, body)).await?;
    Ok(Json(closure))
}

pub async fn get_closure(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectClosure>, AppError> {
    let service = app.service.clone();
    let closure = blocking(move || service.closure(id)).await?;
    Ok(Json(closure))
}

/// POST /api/opportunities/{id}/closure/documents/{kind}?filename=…
pub async fn upload_closure_document(
    State(app): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<ProjectClosure>, AppError> {
    let document: ClosureDocument = kind.parse()?;
    let service = app.service.clone();
    let closure = blocking(move || {
        service.upload_closure_document(id, document, &body, &upload.filename)
    })
    .await?;
    Ok(Json(closure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sub_status_completes() {
        let body: Submission<Rows<NewSsvTool>> =
            serde_json::from_value(serde_json::json!({ "rows": [] })).unwrap();
        assert_eq!(body.sub_status(), SubStatus::Completed);
    }

    #[test]
    fn pending_sub_status_is_case_insensitive() {
        let body: Submission<Rows<NewSsvTool>> = serde_json::from_value(serde_json::json!({
            "rows": [{ "suspected_source": "die wear", "type_of_ssv": "Red X" }],
            "sub_status": "PENDING",
        }))
        .unwrap();
        assert_eq!(body.sub_status(), SubStatus::Pending);
        assert_eq!(body.body.rows.len(), 1);
    }
}
