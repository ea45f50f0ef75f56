//! Employee: consulta, leitura, criação, update completo e (des)ativação
//!
//! O QuickBooks não apaga empregados: "deletar" é gravar `Active = false`.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthenticatedSession;
use crate::utils::{AppError, AppResult};
use super::QuickBooksClient;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Filtros de `GET /employees`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EmployeeQuery {
    pub active: Option<bool>,
    pub limit: Option<u32>,
}

impl EmployeeQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn to_query(&self) -> String {
        let mut query = String::from("SELECT * FROM Employee");
        if let Some(active) = self.active {
            query.push_str(&format!(" WHERE Active = {}", active));
        }
        query.push_str(&format!(" MAXRESULTS {}", self.limit()));
        query
    }
}

/// Ids do QuickBooks são numéricos; qualquer outra coisa nem sai daqui
pub fn validate_employee_id(id: &str) -> AppResult<&str> {
    if id.is_empty() || id.len() > 20 || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::ValidationError(format!("Invalid employee id: {}", id)));
    }
    Ok(id)
}

/// Criação exige `GivenName` e `FamilyName`; o resto segue como veio
pub fn validate_new_employee(body: &Value) -> AppResult<()> {
    let object = body
        .as_object()
        .ok_or_else(|| AppError::ValidationError("Employee body must be a JSON object".to_string()))?;

    for field in ["GivenName", "FamilyName"] {
        let present = object
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|value| !value.trim().is_empty());
        if !present {
            return Err(AppError::ValidationError(format!("Missing {}", field)));
        }
    }
    Ok(())
}

/// Corpo de um full update: `Id` igual ao da rota, `SyncToken` presente,
/// `V4IDPseudonym` (read-only) removido e `sparse = false`
pub fn prepare_full_update(id: &str, body: &Value) -> AppResult<Value> {
    let id = validate_employee_id(id)?;
    let mut object = body
        .as_object()
        .cloned()
        .ok_or_else(|| AppError::ValidationError("Employee body must be a JSON object".to_string()))?;

    if object.get("Id").and_then(Value::as_str) != Some(id) {
        return Err(AppError::ValidationError(
            "Employee Id in body does not match the path".to_string(),
        ));
    }
    if object.get("SyncToken").and_then(Value::as_str).is_none() {
        return Err(AppError::ValidationError("Missing SyncToken".to_string()));
    }

    object.remove("V4IDPseudonym");
    object.insert("sparse".to_string(), Value::Bool(false));
    Ok(Value::Object(object))
}

/// Sparse update que só troca `Active`, com o `SyncToken` lido agora
pub fn activation_update(employee: &Value, active: bool) -> AppResult<Value> {
    Ok(json!({
        "Id": required_str(employee, "Id")?,
        "SyncToken": required_str(employee, "SyncToken")?,
        "Active": active,
        "sparse": true
    }))
}

fn required_str<'a>(employee: &'a Value, name: &str) -> AppResult<&'a str> {
    employee
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::InternalError(format!("QuickBooks Employee without {}", name)))
}

fn employee_from(body: Value) -> AppResult<Value> {
    body.get("Employee")
        .cloned()
        .ok_or_else(|| AppError::InternalError("QuickBooks response without Employee".to_string()))
}

pub async fn list_employees(
    client: &QuickBooksClient,
    session: &AuthenticatedSession,
    query: &EmployeeQuery,
) -> AppResult<Vec<Value>> {
    let body = client.query(session, &query.to_query()).await?;

    Ok(body
        .get("QueryResponse")
        .and_then(|response| response.get("Employee"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

pub async fn get_employee(
    client: &QuickBooksClient,
    session: &AuthenticatedSession,
    id: &str,
) -> AppResult<Value> {
    let id = validate_employee_id(id)?;
    let body = client.read(session, "Employee", id).await?;

    employee_from(body)
}

pub async fn create_employee(
    client: &QuickBooksClient,
    session: &AuthenticatedSession,
    body: &Value,
) -> AppResult<Value> {
    validate_new_employee(body)?;
    let created = client.write(session, "Employee", body).await?;

    employee_from(created)
}

pub async fn update_employee(
    client: &QuickBooksClient,
    session: &AuthenticatedSession,
    id: &str,
    body: &Value,
) -> AppResult<Value> {
    let update = prepare_full_update(id, body)?;
    let updated = client.write(session, "Employee", &update).await?;

    employee_from(updated)
}

/// Lê o empregado (para o `SyncToken` atual) e grava `Active`
pub async fn set_employee_active(
    client: &QuickBooksClient,
    session: &AuthenticatedSession,
    id: &str,
    active: bool,
) -> AppResult<Value> {
    let current = get_employee(client, session, id).await?;
    let update = activation_update(&current, active)?;
    let updated = client.write(session, "Employee", &update).await?;

    employee_from(updated)
}
