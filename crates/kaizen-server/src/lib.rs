pub mod actor;
pub mod error;
pub mod extract;
pub mod notify;
pub mod routes;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kaizen_core::entries::{
    ActionPlan, ActionPlanUpdate, MonthlySavings, Schedule, ScheduleUpdate, TeamMember,
};
use kaizen_core::phase::{
    ControlRow, ControlRowUpdate, ImprovementRow, ImprovementRowUpdate, MeasureAnalysisRow,
    MeasureAnalysisUpdate, SsvToolRow, SsvToolUpdate,
};
use routes::{entries, opportunities, phases};

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Opportunities
        .route(
            "/api/opportunities",
            get(opportunities::list_opportunities).post(opportunities::create_opportunity),
        )
        .route(
            "/api/opportunities/export",
            get(opportunities::export_opportunities),
        )
        .route("/api/opportunities/by-code", get(opportunities::get_by_code))
        .route(
            "/api/opportunities/{id}",
            get(opportunities::get_opportunity)
                .patch(opportunities::update_opportunity)
                .delete(opportunities::delete_opportunity),
        )
        .route(
            "/api/opportunities/{id}/leader",
            post(opportunities::assign_leader),
        )
        .route("/api/opportunities/{id}/approve", post(opportunities::approve))
        .route("/api/opportunities/{id}/revoke", post(opportunities::revoke))
        .route("/api/opportunities/{id}/expire", post(opportunities::expire))
        .route("/api/opportunities/{id}/files", post(opportunities::attach_file))
        .route("/api/opportunities/{id}/a3-file", put(opportunities::set_a3_file))
        // Action plans
        .route(
            "/api/opportunities/{id}/action-plans",
            get(entries::list::<ActionPlan>).post(entries::add_action_plan),
        )
        .route(
            "/api/opportunities/{id}/action-plans/{entry_id}",
            get(entries::get_one::<ActionPlan>)
                .patch(entries::update::<ActionPlan, ActionPlanUpdate>)
                .delete(entries::remove::<ActionPlan>),
        )
        // Schedules
        .route(
            "/api/opportunities/{id}/schedules",
            get(entries::list::<Schedule>).post(entries::add_schedule),
        )
        .route(
            "/api/opportunities/{id}/schedules/{entry_id}",
            get(entries::get_one::<Schedule>)
                .patch(entries::update::<Schedule, ScheduleUpdate>)
                .delete(entries::remove::<Schedule>),
        )
        // Team members
        .route(
            "/api/opportunities/{id}/team-members",
            get(entries::list::<TeamMember>).post(entries::add_team_member),
        )
        .route(
            "/api/opportunities/{id}/team-members/{entry_id}",
            get(entries::get_one::<TeamMember>)
                .patch(entries::update_team_member)
                .delete(entries::remove::<TeamMember>),
        )
        // Monthly savings
        .route(
            "/api/opportunities/{id}/monthly-savings",
            get(entries::list::<MonthlySavings>)
                .post(entries::add_monthly_savings),
        )
        .route(
            "/api/opportunities/{id}/monthly-savings/{entry_id}",
            get(entries::get_one::<MonthlySavings>)
                .patch(entries::update_monthly_savings)
                .delete(entries::remove_monthly_savings),
        )
        .route(
            "/api/opportunities/{id}/monthly-savings/{entry_id}/approve",
            post(entries::approve_monthly_savings),
        )
        // Define
        .route(
            "/api/opportunities/{id}/define",
            get(phases::get_define)
                .put(phases::submit_define)
                .patch(phases::update_define),
        )
        .route(
            "/api/opportunities/{id}/define/documents/{kind}",
            post(phases::upload_define_document),
        )
        // SSV tools
        .route(
            "/api/opportunities/{id}/ssv-tools",
            get(phases::get_ssv_tools).post(phases::submit_ssv_tools),
        )
        .route(
            "/api/opportunities/{id}/ssv-tools/document",
            post(phases::upload_ssv_document),
        )
        .route(
            "/api/opportunities/{id}/ssv-tools/rows",
            get(entries::list::<SsvToolRow>),
        )
        .route(
            "/api/opportunities/{id}/ssv-tools/rows/{entry_id}",
            get(entries::get_one::<SsvToolRow>)
                .patch(entries::update::<SsvToolRow, SsvToolUpdate>)
                .delete(entries::remove::<SsvToolRow>),
        )
        // Measure & analyze
        .route(
            "/api/opportunities/{id}/measure-analysis",
            get(phases::get_measure_analysis).put(phases::submit_measure_analysis),
        )
        .route(
            "/api/opportunities/{id}/measure-analysis/document",
            post(phases::upload_measure_analysis_document),
        )
        .route(
            "/api/opportunities/{id}/measure-analysis/rows",
            get(entries::list::<MeasureAnalysisRow>),
        )
        .route(
            "/api/opportunities/{id}/measure-analysis/rows/{entry_id}",
            get(entries::get_one::<MeasureAnalysisRow>)
                .patch(entries::update::<MeasureAnalysisRow, MeasureAnalysisUpdate>)
                .delete(entries::remove::<MeasureAnalysisRow>),
        )
        // Improvement
        .route(
            "/api/opportunities/{id}/improvement",
            get(phases::get_improvement)
                .put(phases::submit_improvement)
                .patch(phases::update_improvement),
        )
        .route(
            "/api/opportunities/{id}/improvement/document",
            post(phases::upload_improvement_document),
        )
        .route(
            "/api/opportunities/{id}/improvement/rows",
            get(entries::list::<ImprovementRow>),
        )
        .route(
            "/api/opportunities/{id}/improvement/rows/{entry_id}",
            get(entries::get_one::<ImprovementRow>)
                .patch(entries::update::<ImprovementRow, ImprovementRowUpdate>)
                .delete(entries::remove::<ImprovementRow>),
        )
        // Control
        .route(
            "/api/opportunities/{id}/control",
            get(phases::get_control)
                .put(phases::submit_control)
                .patch(phases::update_control),
        )
        .route(
            "/api/opportunities/{id}/control/document",
            post(phases::upload_control_document),
        )
        .route(
            "/api/opportunities/{id}/control/rows",
            get(entries::list::<ControlRow>),
        )
        .route(
            "/api/opportunities/{id}/control/rows/{entry_id}",
            get(entries::get_one::<ControlRow>)
                .patch(entries::update::<ControlRow, ControlRowUpdate>)
                .delete(entries::remove::<ControlRow>),
        )
        // Closure
        .route(
            "/api/opportunities/{id}/closure",
            get(phases::get_closure)
                .post(phases::create_closure)
                .patch(phases::update_closure),
        )
        .route(
            "/api/opportunities/{id}/closure/documents/{kind}",
            post(phases::upload_closure_document),
        )
        // Lookup
        .route(
            "/api/entries/{collection}/{entry_id}",
            get(entries::locate_entry),
        )
        // Config
        .route("/api/config", get(routes::config::get_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the API server on `0.0.0.0:{port}`.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the API server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(state::AppState::open(root)?);

    tracing::info!("CI opportunity API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
