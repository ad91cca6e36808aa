use crate::constants::auth::API_KEY_HEADER;
use crate::errors::ClientError;
use crate::services::logger::Logger;
use crate::services::transport::{HttpRequest, HttpResponse, HttpTransport};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Optional pagination parameters shared by the listing operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Serialize)]
struct PageParams<'a> {
    #[serde(rename = "pageSize", skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
    #[serde(rename = "pageToken", skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

impl PageQuery {
    pub fn new(page_size: Option<u32>, page_token: Option<&str>) -> Self {
        Self {
            page_size,
            page_token: page_token.map(|s| s.to_string()),
        }
    }

    /// Encoded query string without the leading `?`; empty when nothing is set.
    /// A zero page size and an empty token count as unset.
    pub fn to_query_string(&self) -> String {
        let params = PageParams {
            page_size: self.page_size.filter(|n| *n > 0),
            page_token: self.page_token.as_deref().filter(|t| !t.is_empty()),
        };
        serde_urlencoded::to_string(&params).unwrap_or_default()
    }

    fn apply(&self, path: String) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query)
        }
    }
}

/// Body of a session-creation request.
///
/// Only `source` and `instruction` are always sent. The backend reads a
/// missing flag as `false`, so optional fields are added only when they carry
/// information: a non-empty branch, or a flag explicitly set to `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSession {
    source: String,
    instruction: String,
    branch: Option<String>,
    require_plan_approval: bool,
    auto_pr: bool,
}

impl CreateSession {
    pub fn new(source: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            instruction: instruction.into(),
            branch: None,
            require_plan_approval: false,
            auto_pr: false,
        }
    }

    pub fn branch(mut self, branch: Option<impl Into<String>>) -> Self {
        self.branch = branch.map(Into::into);
        self
    }

    pub fn require_plan_approval(mut self, enabled: bool) -> Self {
        self.require_plan_approval = enabled;
        self
    }

    pub fn auto_pr(mut self, enabled: bool) -> Self {
        self.auto_pr = enabled;
        self
    }

    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("source".to_string(), Value::String(self.source.clone()));
        body.insert(
            "instruction".to_string(),
            Value::String(self.instruction.clone()),
        );
        if let Some(branch) = self.branch.as_deref().filter(|b| !b.is_empty()) {
            body.insert("branch".to_string(), Value::String(branch.to_string()));
        }
        if self.require_plan_approval {
            body.insert("requirePlanApproval".to_string(), Value::Bool(true));
        }
        if self.auto_pr {
            body.insert("autoPr".to_string(), Value::Bool(true));
        }
        Value::Object(body)
    }
}

/// Joins with exactly one slash, whatever either side brings.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Maps a raw response onto the client's result contract.
pub fn normalize_response(response: HttpResponse) -> Result<Value, ClientError> {
    if !response.is_success() {
        return Err(ClientError::Backend {
            status: response.status,
            body: response.body,
        });
    }
    if response.status == 204 || response.body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&response.body).map_err(|err| {
        ClientError::transport(format!(
            "malformed response body (HTTP {}): {}",
            response.status, err
        ))
    })
}

/// Typed client for the Jules REST API. One method call is one HTTP request;
/// nothing is retried and nothing is cached.
#[derive(Clone)]
pub struct JulesClient {
    logger: Logger,
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl JulesClient {
    pub fn new(
        logger: Logger,
        transport: Arc<dyn HttpTransport>,
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            logger: logger.child("client"),
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|_| {
            ClientError::configuration("API key contains characters not allowed in a header")
        })?;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let url = join_url(&self.base_url, path);
        self.logger
            .debug(&format!("{} {}", method, path.trim_start_matches('/')), None);

        let mut request =
            HttpRequest::new(method.clone(), url, self.timeout).with_headers(self.build_headers()?);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let response = self.transport.send(request).await.map_err(|err| {
            self.logger.error(
                &format!("{} {} failed", method, path),
                Some(&serde_json::json!({ "error": err.to_string() })),
            );
            err
        })?;

        normalize_response(response).map_err(|err| {
            if let ClientError::Backend { status, body } = &err {
                self.logger.warn(
                    &format!("{} {} returned HTTP {}", method, path, status),
                    Some(&Value::String(body.clone())),
                );
            }
            err
        })
    }

    pub async fn list_sources(&self) -> Result<Value, ClientError> {
        self.request(Method::GET, "sources", None).await
    }

    /// `source_name` is the full resource name, e.g. `sources/github/owner/repo`.
    pub async fn get_source(&self, source_name: &str) -> Result<Value, ClientError> {
        self.request(Method::GET, source_name, None).await
    }

    pub async fn list_sessions(&self, page: &PageQuery) -> Result<Value, ClientError> {
        self.request(Method::GET, &page.apply("sessions".to_string()), None)
            .await
    }

    pub async fn create_session(&self, session: &CreateSession) -> Result<Value, ClientError> {
        self.request(Method::POST, "sessions", Some(session.to_body()))
            .await
    }

    pub async fn get_session(&self, session_name: &str) -> Result<Value, ClientError> {
        self.request(Method::GET, session_name, None).await
    }

    pub async fn delete_session(&self, session_name: &str) -> Result<Value, ClientError> {
        self.request(Method::DELETE, session_name, None).await
    }

    pub async fn approve_plan(&self, session_name: &str) -> Result<Value, ClientError> {
        self.request(
            Method::POST,
            &format!("{}:approvePlan", session_name),
            Some(Value::Object(Map::new())),
        )
        .await
    }

    pub async fn send_message(
        &self,
        session_name: &str,
        prompt: &str,
    ) -> Result<Value, ClientError> {
        self.request(
            Method::POST,
            &format!("{}:sendMessage", session_name),
            Some(serde_json::json!({ "prompt": prompt })),
        )
        .await
    }

    pub async fn list_activities(
        &self,
        session_name: &str,
        page: &PageQuery,
    ) -> Result<Value, ClientError> {
        let path = page.apply(format!("{}/activities", session_name));
        self.request(Method::GET, &path, None).await
    }

    /// `activity_name` looks like `sessions/12345/activities/67890`.
    pub async fn get_activity(&self, activity_name: &str) -> Result<Value, ClientError> {
        self.request(Method::GET, activity_name, None).await
    }
}
