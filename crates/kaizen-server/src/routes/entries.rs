//! Embedded-list endpoints. The list-agnostic handlers are generic over the
//! entry type and instantiated per route in `build_router`.

use axum::extract::State;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kaizen_core::collection::Patch;
use kaizen_core::entries::{
    ActionPlan, MonthlySavings, MonthlySavingsUpdate, NewActionPlan, NewMonthlySavings,
    NewSchedule, NewTeamMember, Schedule, TeamMember, TeamMemberUpdate,
};
use kaizen_core::opportunity::Embedded;
use kaizen_core::phase::{ControlRow, ImprovementRow, MeasureAnalysisRow, SsvToolRow};
use kaizen_core::KaizenError;

use super::blocking;
use crate::actor::Actor;
use crate::error::AppError;
use crate::extract::{Json, Path};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Generic
// ---------------------------------------------------------------------------

pub async fn list<T>(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<T>>, AppError>
where
    T: Embedded + Serialize + Send + 'static,
{
    let service = app.service.clone();
    let items = blocking(move || service.entries::<T>(id)).await?;
    Ok(Json(items))
}

pub async fn get_one<T>(
    State(app): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<T>, AppError>
where
    T: Embedded + Serialize + Send + 'static,
{
    let service = app.service.clone();
    let item = blocking(move || service.entry::<T>(id, entry_id)).await?;
    Ok(Json(item))
}

pub async fn update<T, P>(
    State(app): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<P>,
) -> Result<Json<T>, AppError>
where
    T: Embedded + Serialize + Send + 'static,
    P: Patch<T> + Clone + DeserializeOwned + Send + 'static,
{
    let service = app.service.clone();
    let item = blocking(move || service.update_entry::<T, P>(id, entry_id, patch)).await?;
    Ok(Json(item))
}

pub async fn remove<T>(
    State(app): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<T>, AppError>
where
    T: Embedded + Serialize + Send + 'static,
{
    let service = app.service.clone();
    let item = blocking(move || service.remove_entry::<T>(id, entry_id)).await?;
    Ok(Json(item))
}

// ---------------------------------------------------------------------------
// Typed additions
// ---------------------------------------------------------------------------

pub async fn add_action_plan(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewActionPlan>,
) -> Result<(StatusCode, Json<ActionPlan>), AppError> {
    let service = app.service.clone();
    let item = blocking(move || service.add_action_plan(id, body)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn add_schedule(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewSchedule>,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let service = app.service.clone();
    let item = blocking(move || service.add_schedule(id, body)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn add_team_member(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewTeamMember>,
) -> Result<(StatusCode, Json<TeamMember>), AppError> {
    let service = app.service.clone();
    let item = blocking(move || service.add_team_member(id, body)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_team_member(
    State(app): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<TeamMemberUpdate>,
) -> Result<Json<TeamMember>, AppError> {
    let service = app.service.clone();
    let item = blocking(move || service.update_team_member(id, entry_id, body)).await?;
    Ok(Json(item))
}

// ---------------------------------------------------------------------------
// Monthly savings
// ---------------------------------------------------------------------------

pub async fn add_monthly_savings(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewMonthlySavings>,
) -> Result<(StatusCode, Json<MonthlySavings>), AppError> {
    let service = app.service.clone();
    let item = blocking(move || service.add_monthly_savings(id, body)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_monthly_savings(
    State(app): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MonthlySavingsUpdate>,
) -> Result<Json<MonthlySavings>, AppError> {
    let service = app.service.clone();
    let item = blocking(move || service.update_monthly_savings(id, entry_id, body)).await?;
    Ok(Json(item))
}

pub async fn remove_monthly_savings(
    State(app): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MonthlySavings>, AppError> {
    let service = app.service.clone();
    let item = blocking(move || service.remove_monthly_savings(id, entry_id)).await?;
    Ok(Json(item))
}

#[derive(Debug, Default, Deserialize)]
pub struct SavingsApprovalBody {
    #[serde(default)]
    pub actual: Option<String>,
}

pub async fn approve_monthly_savings(
    State(app): State<AppState>,
    Actor(actor): Actor,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<SavingsApprovalBody>,
) -> Result<Json<MonthlySavings>, AppError> {
    let service = app.service.clone();
    let item =
        blocking(move || service.approve_monthly_savings(id, entry_id, &actor, body.actual))
            .await?;
    Ok(Json(item))
}

// ---------------------------------------------------------------------------
// Lookup by entry id
// ---------------------------------------------------------------------------

async fn locate<T>(app: AppState, entry_id: Uuid) -> Result<serde_json::Value, AppError>
where
    T: Embedded + Serialize + Send + 'static,
{
    let service = app.service.clone();
    let (opp, entry) = blocking(move || service.locate_entry::<T>(entry_id)).await?;
    Ok(serde_json::json!({
        "id": opp.id,
        "opportunity_id": opp.opportunity_id,
        "collection": T::COLLECTION,
        "entry": entry,
    }))
}

/// GET /api/entries/{collection}/{entry_id}: find the opportunity owning
/// an entry.
pub async fn locate_entry(
    State(app): State<AppState>,
    Path((collection, entry_id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let found = match collection.as_str() {
        "action-plans" => locate::<ActionPlan>(app, entry_id).await?,
        "schedules" => locate::<Schedule>(app, entry_id).await?,
        "team-members" => locate::<TeamMember>(app, entry_id).await?,
        "monthly-savings" => locate::<MonthlySavings>(app, entry_id).await?,
        "ssv-tools" => locate::<SsvToolRow>(app, entry_id).await?,
        "measure-analysis" => locate::<MeasureAnalysisRow>(app, entry_id).await?,
        "improvement" => locate::<ImprovementRow>(app, entry_id).await?,
        "control" => locate::<ControlRow>(app, entry_id).await?,
        other => {
            return Err(KaizenError::Validation(format!("unknown collection '{other}'")).into())
        }
    };
    Ok(Json(found))
}
