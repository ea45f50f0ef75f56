use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::auth::AuthenticatedSession;
use crate::quickbooks::{employees, EmployeeQuery};
use crate::utils::logging::*;
use crate::utils::AppResult;
use crate::AppState;

/// GET /api/v1/employees?active=&limit=
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthenticatedSession>,
    Query(query): Query<EmployeeQuery>,
) -> AppResult<Json<Value>> {
    let start_time = Instant::now();
    log_request_received("/api/v1/employees", "GET");

    let list = state
        .flow
        .with_access_token(&session.session_id, |session| {
            let quickbooks = &state.quickbooks;
            let query = &query;
            async move { employees::list_employees(quickbooks, &session, query).await }
        })
        .await?;

    log_request_processed("/api/v1/employees", 200, start_time.elapsed().as_millis() as u64);

    Ok(Json(json!({
        "status": "success",
        "count": list.len(),
        "employees": list
    })))
}

/// GET /api/v1/employees/:id
pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthenticatedSession>,
    Path(employee_id): Path<String>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/employees/:id", "GET");

    employees::validate_employee_id(&employee_id)?;

    let employee = state
        .flow
        .with_access_token(&session.session_id, |session| {
            let quickbooks = &state.quickbooks;
            let employee_id = employee_id.as_str();
            async move { employees::get_employee(quickbooks, &session, employee_id).await }
        })
        .await?;

    Ok(Json(json!({
        "status": "success",
        "employee": employee
    })))
}

/// POST /api/v1/employees
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthenticatedSession>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Json<Value>)> {
    log_request_received("/api/v1/employees", "POST");

    employees::validate_new_employee(&body)?;

    let employee = state
        .flow
        .with_access_token(&session.session_id, |session| {
            let quickbooks = &state.quickbooks;
            let body = &body;
            async move { employees::create_employee(quickbooks, &session, body).await }
        })
        .await?;

    log_info(&format!(
        "➕ Empregado criado: {}",
        employee.get("Id").and_then(Value::as_str).unwrap_or("?")
    ));

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Employee created",
            "employee": employee
        })),
    ))
}

/// PUT /api/v1/employees/:id (full update, exige `Id` e `SyncToken` no corpo)
pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthenticatedSession>,
    Path(employee_id): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/employees/:id", "PUT");

    employees::prepare_full_update(&employee_id, &body)?;

    let employee = state
        .flow
        .with_access_token(&session.session_id, |session| {
            let quickbooks = &state.quickbooks;
            let employee_id = employee_id.as_str();
            let body = &body;
            async move { employees::update_employee(quickbooks, &session, employee_id, body).await }
        })
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Employee updated",
        "employee": employee
    })))
}

/// DELETE /api/v1/employees/:id (o QuickBooks só desativa)
pub async fn deactivate_employee(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthenticatedSession>,
    Path(employee_id): Path<String>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/employees/:id", "DELETE");

    let employee = set_active(&state, &session, &employee_id, false).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Employee deactivated",
        "employee": employee
    })))
}

/// POST /api/v1/employees/:id/activate
pub async fn activate_employee(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthenticatedSession>,
    Path(employee_id): Path<String>,
) -> AppResult<Json<Value>> {
    log_request_received("/api/v1/employees/:id/activate", "POST");

    let employee = set_active(&state, &session, &employee_id, true).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Employee activated",
        "employee": employee
    })))
}

async fn set_active(
    state: &AppState,
    session: &AuthenticatedSession,
    employee_id: &str,
    active: bool,
) -> AppResult<Value> {
    employees::validate_employee_id(employee_id)?;

    log_info(&format!(
        "{} Empregado {}",
        if active { "✅ Ativando" } else { "🗑️ Desativando" },
        employee_id
    ));

    state
        .flow
        .with_access_token(&session.session_id, |session| {
            let quickbooks = &state.quickbooks;
            async move { employees::set_employee_active(quickbooks, &session, employee_id, active).await }
        })
        .await
}
