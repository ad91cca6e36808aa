#![allow(dead_code)]

use async_trait::async_trait;
use jules_mcp::app::App;
use jules_mcp::config::Config;
use jules_mcp::errors::ClientError;
use jules_mcp::services::credentials::CredentialSource;
use jules_mcp::services::jules_client::JulesClient;
use jules_mcp::services::logger::{LogLevel, Logger};
use jules_mcp::services::transport::{HttpRequest, HttpResponse, HttpTransport};
use reqwest::Method;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://jules.test/v1alpha";
pub const API_KEY: &str = "test-key";

pub fn url(path: &str) -> String {
    format!("{}/{}", BASE_URL, path)
}

pub fn logger() -> Logger {
    Logger::with_level("test", LogLevel::Error)
}

pub fn config() -> Config {
    Config {
        base_url: BASE_URL.to_string(),
        timeout_ms: 2_000,
        ..Config::default()
    }
}

#[derive(Clone)]
enum Reply {
    Respond(HttpResponse),
    Fail(ClientError),
}

#[derive(Clone)]
struct Route {
    reply: Reply,
    delay: Duration,
}

/// Records every request and answers from a table keyed by method and full
/// URL. Unknown routes fail as transport errors.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn route(&self, method: Method, url: &str, reply: Reply, delay: Duration) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, url.to_string()), Route { reply, delay });
    }

    pub fn respond(&self, method: Method, url: &str, status: u16, body: &str) {
        self.route(
            method,
            url,
            Reply::Respond(HttpResponse::new(status, body)),
            Duration::ZERO,
        );
    }

    pub fn respond_after(&self, delay: Duration, method: Method, url: &str, status: u16, body: &str) {
        self.route(
            method,
            url,
            Reply::Respond(HttpResponse::new(status, body)),
            delay,
        );
    }

    pub fn fail(&self, method: Method, url: &str, error: ClientError) {
        self.route(method, url, Reply::Fail(error), Duration::ZERO);
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> HttpRequest {
        self.calls().pop().expect("at least one request")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        self.calls.lock().unwrap().push(request.clone());
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method.clone(), request.url.clone()))
            .cloned();
        let Some(route) = route else {
            return Err(ClientError::transport(format!(
                "no route for {} {}",
                request.method, request.url
            )));
        };
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        match route.reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
        }
    }
}

/// Returns a fixed value and counts how often it was asked.
pub struct CountingCredentials {
    value: Option<String>,
    calls: AtomicUsize,
}

impl CountingCredentials {
    pub fn key(value: &str) -> Arc<Self> {
        Arc::new(Self {
            value: Some(value.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            value: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for CountingCredentials {
    async fn resolve(&self) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.value
            .clone()
            .ok_or_else(|| ClientError::configuration("secret store unavailable"))
    }
}

pub fn client(transport: Arc<ScriptedTransport>) -> JulesClient {
    JulesClient::new(
        logger(),
        transport,
        BASE_URL,
        API_KEY,
        Duration::from_secs(2),
    )
}

pub fn app(transport: Arc<ScriptedTransport>, credentials: Arc<dyn CredentialSource>) -> App {
    App::with_parts(logger(), config(), transport, credentials).expect("app wiring")
}
