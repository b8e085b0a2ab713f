//! Report endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use usof_common::AppResult;
use usof_core::{CreateReportInput, ResolveReportInput};
use usof_db::{
    entities::report::{self, ReportStatus},
    repositories::ReportStats,
};

use crate::{
    extractors::{AdminUser, AuthUser},
    middleware::AppState,
    response::no_content,
};

use super::Pagination;

#[derive(Serialize)]
struct ReportResponse {
    report: report::Model,
}

#[derive(Serialize)]
struct ReportsResponse {
    reports: Vec<report::Model>,
}

/// Listing filters for the admin view.
#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<ReportStatus>,
    #[serde(default = "super::default_limit")]
    limit: u64,
    #[serde(default)]
    offset: u64,
}

/// List reports, optionally by status. Admin only.
async fn list_reports(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ReportsResponse>> {
    let reports = state
        .report_service
        .list(query.status, query.limit.min(super::MAX_LIMIT), query.offset)
        .await?;
    Ok(Json(ReportsResponse { reports }))
}

/// File a report against a post or a comment.
async fn create_report(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateReportInput>,
) -> AppResult<impl IntoResponse> {
    let report = state.report_service.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(ReportResponse { report })))
}

#[derive(Serialize)]
struct StatsResponse {
    stats: ReportStats,
}

/// Report counts by status. Admin only.
async fn report_stats(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<StatsResponse>> {
    let stats = state.report_service.stats().await?;
    Ok(Json(StatsResponse { stats }))
}

/// Reports filed by the authenticated user.
async fn my_reports(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<ReportsResponse>> {
    let reports = state
        .report_service
        .list_own(&actor, page.limit(), page.offset)
        .await?;
    Ok(Json(ReportsResponse { reports }))
}

/// Get a report. Admins and the reporter only.
async fn get_report(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReportResponse>> {
    let report = state.report_service.get(&actor, &id).await?;
    Ok(Json(ReportResponse { report }))
}

/// Withdraw or delete a report.
async fn delete_report(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.report_service.delete(&actor, &id).await?;
    Ok(no_content())
}

/// Resolve a pending report. Admin only.
async fn process_report(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ResolveReportInput>,
) -> AppResult<Json<ReportResponse>> {
    let report = state.report_service.resolve(&admin, &id, input).await?;
    Ok(Json(ReportResponse { report }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route("/my", get(my_reports))
        .route("/stats", get(report_stats))
        .route("/{id}", get(get_report).delete(delete_report))
        .route("/{id}/process", post(process_report))
}
