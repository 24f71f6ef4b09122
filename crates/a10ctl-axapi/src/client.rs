//! aXAPI v2.1 implementation of the device seams.
//!
//! # Design
//! - Every call targets `<base>/services/rest/V2.1/` and selects the remote
//!   operation through the `method` query parameter.
//! - Failure envelopes are classified once in `check_failure` so callers only
//!   ever see `ApiError` variants.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::{Connector, LbApi};
use crate::error::{ApiError, ApiResult};
use crate::model::{Credentials, ServerRecord, ServerUpdate, StatBag};

const REST_PATH: &str = "services/rest/V2.1/";

/// Device code for "No such Server" and similar lookups.
const CODE_NOT_FOUND: i64 = 67_174_402;
/// Device code for an expired or unknown session id.
const CODE_INVALID_SESSION: i64 = 1009;
/// Device code for rejected credentials.
const CODE_BAD_CREDENTIALS: i64 = 520_486_915;

/// Opens aXAPI sessions using a shared HTTP client.
#[derive(Clone)]
pub struct AxapiConnector {
    http: Client,
}

impl AxapiConnector {
    /// Wrap a configured HTTP client.
    #[must_use]
    pub const fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Connector for AxapiConnector {
    async fn connect(&self, host: &str, credentials: &Credentials) -> ApiResult<Box<dyn LbApi>> {
        let endpoint = endpoint_for(host)?;
        let session = AxapiSession::authenticate(self.http.clone(), endpoint, credentials).await?;
        Ok(Box::new(session))
    }
}

/// An authenticated aXAPI session.
pub struct AxapiSession {
    http: Client,
    endpoint: Url,
    session_id: String,
}

impl AxapiSession {
    /// Authenticate against `endpoint` and keep the issued session id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` when the device refuses the credentials and a
    /// transport error when the device cannot be reached.
    pub async fn authenticate(
        http: Client,
        endpoint: Url,
        credentials: &Credentials,
    ) -> ApiResult<Self> {
        const METHOD: &str = "authenticate";
        tracing::debug!(endpoint = %endpoint, username = credentials.username(), "authenticating");

        let response = http
            .post(endpoint.clone())
            .query(&[("format", "json"), ("method", METHOD)])
            .json(&json!({
                "username": credentials.username(),
                "password": credentials.password(),
            }))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                method: METHOD,
                source,
            })?;

        let body = read_success(METHOD, response).await?;
        let value = decode_envelope(METHOD, &body)?;
        let session_id = value
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Auth {
                message: "authentication response carried no session_id".to_string(),
            })?
            .to_string();

        Ok(Self {
            http,
            endpoint,
            session_id,
        })
    }

    async fn get(&self, method: &'static str) -> ApiResult<Vec<u8>> {
        tracing::debug!(method, "aXAPI GET");
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&self.query(method))
            .send()
            .await
            .map_err(|source| ApiError::Transport { method, source })?;
        read_success(method, response).await
    }

    async fn post(&self, method: &'static str, body: &Value) -> ApiResult<Value> {
        tracing::debug!(method, "aXAPI POST");
        let response = self
            .http
            .post(self.endpoint.clone())
            .query(&self.query(method))
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { method, source })?;
        let bytes = read_success(method, response).await?;
        decode_envelope(method, &bytes)
    }

    fn query(&self, method: &'static str) -> [(&'static str, &str); 3] {
        [
            ("session_id", self.session_id.as_str()),
            ("format", "json"),
            ("method", method),
        ]
    }
}

#[async_trait]
impl LbApi for AxapiSession {
    async fn activate_partition(&self, name: &str) -> ApiResult<()> {
        self.post("system.partition.active", &json!({ "name": name }))
            .await
            .map(|_| ())
    }

    async fn list_servers(&self) -> ApiResult<Vec<ServerRecord>> {
        const METHOD: &str = "slb.server.getAll";
        let bytes = self.get(METHOD).await?;
        let value = decode_envelope(METHOD, &bytes)?;
        take_field(METHOD, value, "server_list")
    }

    async fn get_server(&self, name: &str) -> ApiResult<ServerRecord> {
        const METHOD: &str = "slb.server.search";
        let value = self.post(METHOD, &json!({ "name": name })).await?;
        take_field(METHOD, value, "server")
    }

    async fn update_server(&self, update: &ServerUpdate) -> ApiResult<Value> {
        self.post("slb.server.update", &json!({ "server": update }))
            .await
    }

    async fn server_stats(&self, name: &str) -> ApiResult<StatBag> {
        const METHOD: &str = "slb.server.fetchStatistics";
        let value = self.post(METHOD, &json!({ "name": name })).await?;
        take_field(METHOD, value, "server_stat")
    }

    async fn backup_configuration(&self) -> ApiResult<Vec<u8>> {
        let bytes = self.get("system.backup").await?;
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            check_failure(&value)?;
        }
        Ok(bytes)
    }

    async fn logoff(&self) -> ApiResult<()> {
        self.post("session.close", &json!({})).await.map(|_| ())
    }
}

/// Resolve the aXAPI endpoint for a host name, address, or explicit URL.
///
/// # Errors
///
/// Returns `ApiError::Endpoint` when the host cannot form a valid URL.
pub fn endpoint_for(host: &str) -> ApiResult<Url> {
    let trimmed = host.trim().trim_end_matches('/');
    let base = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!("{trimmed}/")
    } else {
        format!("https://{trimmed}/")
    };
    Url::parse(&base)
        .and_then(|base| base.join(REST_PATH))
        .map_err(|source| ApiError::Endpoint {
            input: host.to_string(),
            source,
        })
}

async fn read_success(method: &'static str, response: Response) -> ApiResult<Vec<u8>> {
    let status = response.status();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::Auth {
            message: if message.trim().is_empty() {
                format!("{method} returned HTTP {status}")
            } else {
                message.trim().to_string()
            },
        });
    }
    if !status.is_success() {
        return Err(ApiError::Http {
            method,
            status: status.as_u16(),
        });
    }
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|source| ApiError::Transport { method, source })
}

fn decode_envelope(method: &'static str, bytes: &[u8]) -> ApiResult<Value> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|source| ApiError::Decode { method, source })?;
    check_failure(&value)?;
    Ok(value)
}

fn take_field<T: DeserializeOwned>(method: &'static str, mut value: Value, key: &str) -> ApiResult<T> {
    let field = value.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    serde_json::from_value(field).map_err(|source| ApiError::Decode { method, source })
}

fn check_failure(value: &Value) -> ApiResult<()> {
    let Some(response) = value.get("response") else {
        return Ok(());
    };
    let failed = response
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| status.eq_ignore_ascii_case("fail"));
    if !failed {
        return Ok(());
    }

    let err = response.get("err");
    let code = err
        .and_then(|err| err.get("code"))
        .and_then(Value::as_i64)
        .unwrap_or_default();
    let message = err
        .and_then(|err| err.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or("unknown device error")
        .to_string();
    Err(classify_failure(code, message))
}

fn classify_failure(code: i64, message: String) -> ApiError {
    match code {
        CODE_NOT_FOUND => ApiError::NotFound { code, message },
        CODE_INVALID_SESSION | CODE_BAD_CREDENTIALS => ApiError::Auth { message },
        _ if message.contains("No such") => ApiError::NotFound { code, message },
        _ => ApiError::Device { code, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;

    use crate::model::AdmissionStatus;

    const PATH: &str = "/services/rest/V2.1/";

    fn mock_authenticate(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "authenticate")
                .json_body(json!({"username": "admin", "password": "secret"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"session_id": "sess-1"}));
        })
    }

    async fn connect(server: &MockServer) -> Result<Box<dyn LbApi>> {
        AxapiConnector::new(Client::new())
            .connect(&server.base_url(), &Credentials::new("admin", "secret"))
            .await
            .map_err(|err| anyhow!("connect failed: {err}"))
    }

    #[test]
    fn endpoint_for_defaults_to_https() -> Result<()> {
        assert_eq!(
            endpoint_for("lb1.example.com")?.as_str(),
            "https://lb1.example.com/services/rest/V2.1/"
        );
        assert_eq!(
            endpoint_for("http://127.0.0.1:8080/")?.as_str(),
            "http://127.0.0.1:8080/services/rest/V2.1/"
        );
        Ok(())
    }

    #[test]
    fn endpoint_for_rejects_garbage() {
        let err = endpoint_for("http://[::1").expect_err("invalid host should fail");
        assert!(matches!(err, ApiError::Endpoint { .. }));
    }

    #[test]
    fn classify_failure_maps_known_codes() {
        assert!(classify_failure(CODE_NOT_FOUND, "No such Server".into()).is_not_found());
        assert!(classify_failure(CODE_INVALID_SESSION, "Invalid session".into()).is_connection());
        assert!(classify_failure(42, "No such partition".into()).is_not_found());
        assert!(matches!(
            classify_failure(42, "busy".into()),
            ApiError::Device { code: 42, .. }
        ));
    }

    #[tokio::test]
    async fn connect_authenticates_and_lists_servers() -> Result<()> {
        let server = MockServer::start_async().await;
        let auth = mock_authenticate(&server);
        let list = server.mock(|when, then| {
            when.method(GET)
                .path(PATH)
                .query_param("method", "slb.server.getAll")
                .query_param("session_id", "sess-1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "server_list": [
                        {"name": "b", "host": "10.0.0.2", "status": 1, "port_list": [{"port_num": 80}]},
                        {"name": "a", "host": "10.0.0.1", "status": 0, "port_list": []}
                    ]
                }));
        });

        let api = connect(&server).await?;
        let servers = api.list_servers().await?;

        auth.assert();
        list.assert();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "b");
        assert_eq!(servers[1].admission(), Some(AdmissionStatus::Disabled));
        Ok(())
    }

    #[tokio::test]
    async fn connect_surfaces_rejected_credentials() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(PATH).query_param("method", "authenticate");
            then.status(200).json_body(json!({
                "response": {"status": "fail", "err": {"code": CODE_BAD_CREDENTIALS, "msg": "Invalid username or password"}}
            }));
        });

        let Err(err) = AxapiConnector::new(Client::new())
            .connect(&server.base_url(), &Credentials::new("admin", "wrong"))
            .await
        else {
            panic!("authentication should fail");
        };
        assert!(matches!(err, ApiError::Auth { ref message } if message.contains("Invalid username")));
    }

    #[tokio::test]
    async fn get_server_classifies_missing_server() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_authenticate(&server);
        server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "slb.server.search")
                .json_body(json!({"name": "ghost"}));
            then.status(200).json_body(json!({
                "response": {"status": "fail", "err": {"code": CODE_NOT_FOUND, "msg": "No such Server"}}
            }));
        });

        let api = connect(&server).await?;
        let err = api
            .get_server("ghost")
            .await
            .expect_err("missing server should fail");
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn update_server_wraps_payload() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_authenticate(&server);
        let update = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "slb.server.update")
                .json_body(json!({"server": {"name": "web-1", "host": "10.0.0.5", "status": 1}}));
            then.status(200)
                .json_body(json!({"response": {"status": "OK"}}));
        });

        let api = connect(&server).await?;
        let result = api
            .update_server(&ServerUpdate {
                name: "web-1".into(),
                host: "10.0.0.5".into(),
                status: AdmissionStatus::Enabled,
            })
            .await?;

        update.assert();
        assert_eq!(result, json!({"response": {"status": "OK"}}));
        Ok(())
    }

    #[tokio::test]
    async fn server_stats_and_backup_decode_payloads() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_authenticate(&server);
        server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "slb.server.fetchStatistics");
            then.status(200).json_body(json!({
                "server_stat": {"cur_conns": 7, "port_stat_list": [{"port_num": 80}]}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path(PATH).query_param("method", "system.backup");
            then.status(200)
                .header("content-type", "application/octet-stream")
                .body("hostname lb1\n");
        });

        let api = connect(&server).await?;
        let stats = api.server_stats("web-1").await?;
        assert_eq!(stats.get("cur_conns"), Some(&json!(7)));
        assert_eq!(stats.scalars().count(), 1);

        let backup = api.backup_configuration().await?;
        assert_eq!(backup, b"hostname lb1\n".to_vec());
        Ok(())
    }

    #[tokio::test]
    async fn http_errors_are_classified() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_authenticate(&server);
        server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "system.partition.active");
            then.status(403).body("forbidden");
        });
        server.mock(|when, then| {
            when.method(GET).path(PATH).query_param("method", "slb.server.getAll");
            then.status(500);
        });

        let api = connect(&server).await?;
        let partition = api
            .activate_partition("p1")
            .await
            .expect_err("forbidden should fail");
        assert!(partition.is_connection());

        let list = api.list_servers().await.expect_err("500 should fail");
        assert!(matches!(list, ApiError::Http { status: 500, .. }));
        Ok(())
    }

    #[tokio::test]
    async fn logoff_closes_session() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_authenticate(&server);
        let close = server.mock(|when, then| {
            when.method(POST)
                .path(PATH)
                .query_param("method", "session.close")
                .query_param("session_id", "sess-1");
            then.status(200)
                .json_body(json!({"response": {"status": "OK"}}));
        });

        let api = connect(&server).await?;
        api.logoff().await?;
        close.assert();
        Ok(())
    }
}
