use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use kaizen_core::opportunity::{NewOpportunity, OpportunityUpdate};
use kaizen_core::query::{OpportunityFilter, Page};
use kaizen_core::{KaizenError, Opportunity, Role, Status};

use super::{blocking, UploadQuery};
use crate::actor::Actor;
use crate::error::AppError;
use crate::extract::{Json, Path, Query};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub plant: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub year: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub created_by: Option<String>,
    pub project_leader: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Result<OpportunityFilter, KaizenError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<Status>)
            .transpose()?;
        Ok(OpportunityFilter {
            plant: self.plant.clone(),
            category: self.category.clone(),
            status,
            year: self.year.clone(),
            company: self.company.clone(),
            department: self.department.clone(),
            created_by: self.created_by.clone(),
            project_leader: self.project_leader.clone(),
            text: self.q.clone(),
        })
    }
}

/// GET /api/opportunities: filtered, paginated, newest first.
pub async fn list_opportunities(
    State(app): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Page<Opportunity>>, AppError> {
    let filter = params.filter()?;
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let service = app.service.clone();
    let result = blocking(move || {
        if filter.is_empty() {
            service.list(page, page_size)
        } else {
            service.query(&filter, page, page_size)
        }
    })
    .await?;
    Ok(Json(result))
}

/// GET /api/opportunities/export: every match, unpaginated.
pub async fn export_opportunities(
    State(app): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Opportunity>>, AppError> {
    let filter = params.filter()?;
    let service = app.service.clone();
    let result = blocking(move || service.export(&filter)).await?;
    Ok(Json(result))
}

/// POST /api/opportunities: create on behalf of the acting employee.
pub async fn create_opportunity(
    State(app): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<NewOpportunity>,
) -> Result<(StatusCode, Json<Opportunity>), AppError> {
    let service = app.service.clone();
    let created = blocking(move || service.create(body, &actor)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub code: String,
}

/// GET /api/opportunities/by-code?code=P1/BB/2025-2026/001
pub async fn get_by_code(
    State(app): State<AppState>,
    Query(params): Query<CodeQuery>,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.get_by_code(&params.code)).await?;
    Ok(Json(opp))
}

/// GET /api/opportunities/{id}
pub async fn get_opportunity(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.get(id)).await?;
    Ok(Json(opp))
}

/// PATCH /api/opportunities/{id}
pub async fn update_opportunity(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<OpportunityUpdate>,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.update(id, body)).await?;
    Ok(Json(opp))
}

/// DELETE /api/opportunities/{id}: administrators only.
pub async fn delete_opportunity(
    State(app): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service = app.service.clone();
    let removed = blocking(move || service.delete(id, &actor)).await?;
    Ok(Json(serde_json::json!({
        "deleted": true,
        "id": removed.id,
        "opportunity_id": removed.opportunity_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LeaderBody {
    pub employee_id: String,
}

/// POST /api/opportunities/{id}/leader
pub async fn assign_leader(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LeaderBody>,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.assign_leader(id, body.employee_id.trim())).await?;
    Ok(Json(opp))
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub role: Role,
}

/// POST /api/opportunities/{id}/approve: grant the next closure approval.
pub async fn approve(
    State(app): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.approve(id, &actor, body.role)).await?;
    Ok(Json(opp))
}

/// POST /api/opportunities/{id}/revoke
pub async fn revoke(
    State(app): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.revoke(id, &actor)).await?;
    Ok(Json(opp))
}

/// POST /api/opportunities/{id}/expire
pub async fn expire(
    State(app): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.expire(id, &actor)).await?;
    Ok(Json(opp))
}

/// POST /api/opportunities/{id}/files?filename=…: raw body upload.
pub async fn attach_file(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<Opportunity>), AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.attach_file(id, &body, &upload.filename)).await?;
    Ok((StatusCode::CREATED, Json(opp)))
}

/// PUT /api/opportunities/{id}/a3-file?filename=…
pub async fn set_a3_file(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Query(upload): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<Opportunity>, AppError> {
    let service = app.service.clone();
    let opp = blocking(move || service.set_a3_file(id, &body, &upload.filename)).await?;
    Ok(Json(opp))
}
