use crate::models::ProgressData;
use crate::storage::{KeyValueStore, TOKEN_KEY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_API_URL: &str = "http://localhost:54321";

const SAVE_PROGRESS_RPC: &str = "/rest/v1/rpc/save_deposition_progress";
const LOAD_PROGRESS_RPC: &str = "/rest/v1/rpc/get_deposition_progress_optimized";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl EnvConfig {
    /// Reads `window.ENV`. Upper-case keys win over lower-case ones.
    pub fn new() -> Self {
        let read = |keys: [&str; 2]| -> Option<String> {
            let env = web_sys::window()?.get("ENV")?;
            if env.is_undefined() || !env.is_object() {
                return None;
            }
            keys.iter().find_map(|k| {
                js_sys::Reflect::get(&env, &(*k).into())
                    .ok()
                    .and_then(|v| v.as_string())
            })
        };

        Self {
            api_url: read(["API_URL", "api_url"]).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: read(["API_KEY", "api_key"]),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Clone, Debug)]
pub(crate) struct SaveProgressRequest<'a> {
    pub p_deposition_id: &'a str,
    pub p_progress_data: &'a ProgressData,
}

#[derive(Serialize, Clone, Debug)]
pub(crate) struct LoadProgressRequest<'a> {
    pub p_deposition_id: &'a str,
}

/// Remote home of a deposition's progress blob. Writes are last-write-wins;
/// callers may have several saves in flight at once.
#[async_trait(?Send)]
pub trait ProgressStore {
    async fn save_progress(&self, deposition_id: &str, progress: &ProgressData) -> ApiResult<()>;

    /// `Ok(None)` when nothing has been saved for this deposition yet.
    async fn load_progress(&self, deposition_id: &str) -> ApiResult<Option<ProgressData>>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            api_key: None,
            token: None,
        }
    }

    pub fn from_env(env: EnvConfig) -> Self {
        Self {
            base_url: env.api_url,
            api_key: env.api_key,
            token: None,
        }
    }

    pub fn load_from_storage(kv: &impl KeyValueStore) -> Self {
        let mut client = Self::from_env(EnvConfig::new());
        client.token = kv.get_item(TOKEN_KEY).filter(|t| !t.trim().is_empty());
        client
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn with_auth_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }
        // A user session token takes precedence over the anonymous key.
        if let Some(bearer) = self.token.as_ref().or(self.api_key.as_ref()) {
            req = req.header("Authorization", format!("Bearer {bearer}"));
        }
        req
    }

    async fn rpc(&self, path: &str, body: &impl Serialize) -> ApiResult<reqwest::Response> {
        let client = reqwest::Client::new();
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let req = self.with_auth_headers(client.post(url)).json(body);

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            Ok(res)
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "RPC failed"))
        }
    }

    /// The RPC returns a row set; progress lives in the first row.
    pub(crate) fn parse_progress_rows(data: serde_json::Value) -> ApiResult<Option<ProgressData>> {
        let row = match &data {
            serde_json::Value::Array(rows) => rows.first(),
            serde_json::Value::Object(_) => Some(&data),
            _ => None,
        };

        let Some(progress) = row
            .and_then(|r| r.get("progress_data"))
            .filter(|p| !p.is_null())
        else {
            return Ok(None);
        };

        serde_json::from_value(progress.clone())
            .map(Some)
            .map_err(ApiError::parse)
    }
}

#[async_trait(?Send)]
impl ProgressStore for ApiClient {
    async fn save_progress(&self, deposition_id: &str, progress: &ProgressData) -> ApiResult<()> {
        self.rpc(
            SAVE_PROGRESS_RPC,
            &SaveProgressRequest {
                p_deposition_id: deposition_id,
                p_progress_data: progress,
            },
        )
        .await?;
        Ok(())
    }

    async fn load_progress(&self, deposition_id: &str) -> ApiResult<Option<ProgressData>> {
        let res = self
            .rpc(
                LOAD_PROGRESS_RPC,
                &LoadProgressRequest {
                    p_deposition_id: deposition_id,
                },
            )
            .await?;
        let text = res.text().await.map_err(ApiError::network)?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let data: serde_json::Value = serde_json::from_str(&text).map_err(ApiError::parse)?;
        Self::parse_progress_rows(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outline, TimerState};

    #[test]
    fn test_api_client_new() {
        let client = ApiClient::new("http://localhost:54321".to_string());
        assert_eq!(client.base_url, "http://localhost:54321");
        assert!(client.token.is_none());
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_api_client_set_token() {
        let mut client = ApiClient::new(DEFAULT_API_URL.to_string());
        client.set_token("jwt".to_string());
        assert!(client.is_authenticated());
    }

    #[test]
    fn test_from_env_carries_key() {
        let client = ApiClient::from_env(EnvConfig {
            api_url: "https://x.supabase.co".to_string(),
            api_key: Some("anon".to_string()),
        });
        assert_eq!(client.base_url, "https://x.supabase.co");
        assert_eq!(client.api_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_save_request_contract() {
        let progress = ProgressData {
            sections: Outline::default(),
            exhibits: vec![],
            timer: TimerState {
                elapsed_time: 61,
                is_running: true,
            },
            last_updated: Some("2024-05-01T10:00:00.000Z".to_string()),
            version: Some("1.0".to_string()),
        };
        let v = serde_json::to_value(SaveProgressRequest {
            p_deposition_id: "dep-1",
            p_progress_data: &progress,
        })
        .expect("should serialize");
        assert_eq!(v["p_deposition_id"], "dep-1");
        assert_eq!(v["p_progress_data"]["timer"]["elapsedTime"], 61);
        assert_eq!(v["p_progress_data"]["version"], "1.0");
        assert!(v["p_progress_data"]["sections"].is_array());
    }

    #[test]
    fn test_parse_progress_rows() {
        let rows = serde_json::json!([
            { "progress_data": {
                "sections": [{ "id": "s1", "title": "I. A", "questions": [] }],
                "timer": { "elapsedTime": 5, "isRunning": false }
            } },
            { "progress_data": { "sections": [] } }
        ]);
        let p = ApiClient::parse_progress_rows(rows)
            .expect("should parse")
            .expect("first row has progress");
        assert_eq!(p.sections.sections[0].id, "s1");
        assert_eq!(p.timer.elapsed_time, 5);
        assert!(p.exhibits.is_empty());
    }

    #[test]
    fn test_parse_progress_rows_empty_shapes() {
        for data in [
            serde_json::json!([]),
            serde_json::json!(null),
            serde_json::json!([{ "progress_data": null }]),
            serde_json::json!([{ "other": 1 }]),
        ] {
            assert!(ApiClient::parse_progress_rows(data).expect("empty is ok").is_none());
        }
    }

    #[test]
    fn test_parse_progress_rows_bad_shape_is_parse_error() {
        let err = ApiClient::parse_progress_rows(serde_json::json!([{ "progress_data": { "sections": 3 } }]))
            .expect_err("should fail");
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }
}
