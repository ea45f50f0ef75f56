//! Cliente da API de contabilidade do QuickBooks Online (v3)
//!
//! `query` (SQL-like), `read` de uma entidade por id e `write` (create e
//! update usam o mesmo `POST /company/{realm}/{entity}`). O corpo das entidades
//! fica como `serde_json::Value`.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use crate::auth::AuthenticatedSession;
use crate::config::QuickBooksSettings;
use crate::utils::logging::*;
use crate::utils::{truncate_safe, AppError, AppResult};

#[derive(Clone)]
pub struct QuickBooksClient {
    http_client: Client,
    base_url: String,
    minor_version: Option<u32>,
}

impl QuickBooksClient {
    pub fn new(http_client: Client, settings: &QuickBooksSettings) -> Self {
        Self {
            http_client,
            base_url: settings.api_base_url(),
            minor_version: settings.minor_version,
        }
    }

    fn company_url(&self, realm_id: &str, path: &str) -> String {
        format!("{}/company/{}/{}", self.base_url, realm_id, path)
    }

    /// `GET /company/{realm}/query?query=...`
    pub async fn query(&self, session: &AuthenticatedSession, query: &str) -> AppResult<Value> {
        log_info(&format!("📋 [QuickBooks] Query: {}", query));

        let url = self.company_url(&session.realm_id, "query");
        self.get(&url, &session.access_token, &[("query", query.to_string())]).await
    }

    /// `GET /company/{realm}/{entity}/{id}`
    pub async fn read(&self, session: &AuthenticatedSession, entity: &str, id: &str) -> AppResult<Value> {
        log_info(&format!("👤 [QuickBooks] Lendo {} {}", entity, id));

        let url = self.company_url(&session.realm_id, &format!("{}/{}", entity.to_lowercase(), id));
        self.get(&url, &session.access_token, &[]).await
    }

    /// `POST /company/{realm}/{entity}` com a entidade em JSON
    pub async fn write(&self, session: &AuthenticatedSession, entity: &str, body: &Value) -> AppResult<Value> {
        log_info(&format!("✏️ [QuickBooks] Gravando {}", entity));

        let url = self.company_url(&session.realm_id, &entity.to_lowercase());
        self.post(&url, &session.access_token, body).await
    }

    async fn get(&self, url: &str, access_token: &str, params: &[(&str, String)]) -> AppResult<Value> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.extend(self.minor_version_param());

        let request = self.http_client
            .get(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(&query);

        self.execute(url, request).await
    }

    async fn post(&self, url: &str, access_token: &str, body: &Value) -> AppResult<Value> {
        let request = self.http_client
            .post(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(&self.minor_version_param())
            .json(body);

        self.execute(url, request).await
    }

    fn minor_version_param(&self) -> Vec<(&'static str, String)> {
        self.minor_version
            .map(|minor_version| ("minorversion", minor_version.to_string()))
            .into_iter()
            .collect()
    }

    /// Qualquer status diferente de 200 vira `QuickBooksApi` com o Fault parseado
    async fn execute(&self, url: &str, request: RequestBuilder) -> AppResult<Value> {
        let response = request.send().await.map_err(|e| {
            log_quickbooks_api_error(url, None, &e.to_string());
            AppError::HttpError(e)
        })?;

        let status = response.status();

        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            log_quickbooks_api_error(url, Some(status.as_u16()), truncate_safe(&error_text, 300));

            return Err(AppError::QuickBooksApi {
                status: status.as_u16(),
                fault: parse_fault(&error_text),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Converte um corpo `{"Fault": {...}}` em `{type, errors: [{message, detail, code}], time}`
///
/// Corpos que não são Fault viram `{"message": <texto>}`.
pub fn parse_fault(body: &str) -> Value {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return json!({ "message": body }),
    };

    let Some(fault) = parsed.get("Fault") else {
        return json!({ "message": body });
    };

    let errors: Vec<Value> = fault
        .get("Error")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|err| {
                    json!({
                        "message": err.get("Message").and_then(Value::as_str).unwrap_or_default(),
                        "detail": err.get("Detail").and_then(Value::as_str).unwrap_or_default(),
                        "code": err.get("code").and_then(Value::as_str).unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "type": fault.get("type").and_then(Value::as_str).unwrap_or("Unknown"),
        "errors": errors,
        "time": parsed.get("time").cloned().unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionId;
    use crate::config::settings::tests::test_settings;
    use crate::utils::build_http_client;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> QuickBooksClient {
        let settings = test_settings(&server.base_url());
        QuickBooksClient::new(build_http_client(&settings.quickbooks).unwrap(), &settings.quickbooks)
    }

    fn session() -> AuthenticatedSession {
        AuthenticatedSession {
            session_id: SessionId::generate(),
            access_token: "access-1".to_string(),
            realm_id: "4620816365".to_string(),
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(3600),
        }
    }

    #[tokio::test]
    async fn test_query_sends_bearer_and_minor_version() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET)
                .path("/v3/company/4620816365/query")
                .header("Authorization", "Bearer access-1")
                .query_param("query", "SELECT * FROM Employee MAXRESULTS 10")
                .query_param("minorversion", "75");
            then.status(200).json_body(json!({
                "QueryResponse": { "Employee": [{ "Id": "55" }] }
            }));
        }).await;

        let body = client_for(&server)
            .query(&session(), "SELECT * FROM Employee MAXRESULTS 10")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body["QueryResponse"]["Employee"][0]["Id"], "55");
    }

    #[tokio::test]
    async fn test_read_entity_path() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET).path("/v3/company/4620816365/employee/55");
            then.status(200).json_body(json!({ "Employee": { "Id": "55" } }));
        }).await;

        let body = client_for(&server).read(&session(), "Employee", "55").await.unwrap();

        mock.assert_async().await;
        assert_eq!(body["Employee"]["Id"], "55");
    }

    #[tokio::test]
    async fn test_fault_is_carried_in_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/v3/company/4620816365/employee/999");
            then.status(400).json_body(json!({
                "Fault": {
                    "Error": [{
                        "Message": "Object Not Found",
                        "Detail": "Object Not Found : Something you're trying to use has been made inactive or is not found",
                        "code": "610"
                    }],
                    "type": "ValidationFault"
                },
                "time": "2024-03-01T10:00:00.000-08:00"
            }));
        }).await;

        let err = client_for(&server).read(&session(), "Employee", "999").await.unwrap_err();

        match err {
            AppError::QuickBooksApi { status, fault } => {
                assert_eq!(status, 400);
                assert_eq!(fault["type"], "ValidationFault");
                assert_eq!(fault["errors"][0]["code"], "610");
                assert_eq!(fault["errors"][0]["message"], "Object Not Found");
            }
            other => panic!("erro inesperado: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_posts_entity_as_json() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(POST)
                .path("/v3/company/4620816365/employee")
                .header("Authorization", "Bearer access-1")
                .header("Content-Type", "application/json")
                .query_param("minorversion", "75")
                .json_body(json!({ "GivenName": "Emily", "FamilyName": "Platt" }));
            then.status(200).json_body(json!({ "Employee": { "Id": "71", "SyncToken": "0" } }));
        }).await;

        let body = client_for(&server)
            .write(&session(), "Employee", &json!({ "GivenName": "Emily", "FamilyName": "Platt" }))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body["Employee"]["Id"], "71");
    }

    #[tokio::test]
    async fn test_write_stale_sync_token_fault() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/v3/company/4620816365/employee");
            then.status(400).json_body(json!({
                "Fault": {
                    "Error": [{
                        "Message": "Stale Object Error",
                        "Detail": "Stale Object Error : You and root were working on this at the same time.",
                        "code": "5010"
                    }],
                    "type": "ValidationFault"
                }
            }));
        }).await;

        let err = client_for(&server)
            .write(&session(), "Employee", &json!({ "Id": "55", "SyncToken": "0" }))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::QuickBooksApi { status: 400, ref fault } if fault["errors"][0]["code"] == "5010"
        ));
    }

    #[test]
    fn test_parse_fault_falls_back_to_message() {
        assert_eq!(parse_fault("Unauthorized"), json!({ "message": "Unauthorized" }));
        assert_eq!(parse_fault(r#"{"other":1}"#), json!({ "message": r#"{"other":1}"# }));
    }

    #[test]
    fn test_parse_fault_without_errors() {
        let fault = parse_fault(r#"{"Fault":{"type":"AuthenticationFault"}}"#);
        assert_eq!(fault["type"], "AuthenticationFault");
        assert_eq!(fault["errors"], json!([]));
        assert_eq!(fault["time"], Value::Null);
    }
}
