use crate::config::Config;
use crate::errors::{ClientError, ToolError};
use crate::managers::operations::Operation;
use crate::services::credentials::CredentialSource;
use crate::services::jules_client::JulesClient;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolHandler;
use crate::services::transport::HttpTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Builds a fresh [`JulesClient`] for every invocation from a freshly resolved
/// credential. Holds no per-call state, so concurrent calls never interact.
#[derive(Clone)]
pub struct ToolBridge {
    logger: Logger,
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialSource>,
    base_url: String,
    timeout: Duration,
}

impl ToolBridge {
    pub fn new(
        logger: Logger,
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            logger: logger.child("bridge"),
            transport,
            credentials,
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
        }
    }

    pub async fn client(&self) -> Result<JulesClient, ClientError> {
        let api_key = self.credentials.resolve().await?;
        if api_key.trim().is_empty() {
            self.logger.error("JULES_API_KEY not found", None);
            return Err(ClientError::configuration(
                "Jules API key not found. Configure Secret Manager or set JULES_API_KEY.",
            ));
        }
        Ok(JulesClient::new(
            self.logger.clone(),
            self.transport.clone(),
            &self.base_url,
            api_key.trim(),
            self.timeout,
        ))
    }

    pub async fn invoke(&self, operation: Operation, args: Value) -> Result<Value, ToolError> {
        let client = self.client().await?;
        operation.dispatch(&client, args).await
    }

    /// One handler per operation, keyed by tool name.
    pub fn handlers(self: &Arc<Self>) -> Vec<(String, Arc<dyn ToolHandler>)> {
        Operation::ALL
            .into_iter()
            .map(|operation| {
                let handler: Arc<dyn ToolHandler> = Arc::new(BackendTool {
                    operation,
                    bridge: self.clone(),
                });
                (operation.tool_name().to_string(), handler)
            })
            .collect()
    }
}

pub struct BackendTool {
    operation: Operation,
    bridge: Arc<ToolBridge>,
}

#[async_trait]
impl ToolHandler for BackendTool {
    async fn handle(&self, args: Value) -> Result<Value, ToolError> {
        self.bridge.invoke(self.operation, args).await
    }
}
