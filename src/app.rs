use crate::config::Config;
use crate::errors::ToolError;
use crate::managers::bridge::ToolBridge;
use crate::mcp::catalog::tool_catalog;
use crate::services::credentials::{self, CredentialSource};
use crate::services::logger::Logger;
use crate::services::tool_executor::{ToolExecutor, ToolHandler};
use crate::services::transport::{HttpTransport, ReqwestTransport};
use std::collections::HashMap;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: Config,
    pub tool_executor: Arc<ToolExecutor>,
}

impl App {
    /// Every catalog entry must be backed by a handler, and vice versa.
    fn validate_tool_wiring(
        handlers: &HashMap<String, Arc<dyn ToolHandler>>,
    ) -> Result<(), ToolError> {
        let mut missing: Vec<String> = tool_catalog()
            .iter()
            .filter(|tool| !handlers.contains_key(&tool.name))
            .map(|tool| tool.name.clone())
            .collect();
        let mut uncatalogued: Vec<String> = handlers
            .keys()
            .filter(|name| !tool_catalog().iter().any(|tool| &tool.name == *name))
            .cloned()
            .collect();
        if missing.is_empty() && uncatalogued.is_empty() {
            return Ok(());
        }
        missing.sort();
        uncatalogued.sort();
        Err(ToolError::internal("Tool wiring is incomplete")
            .with_hint("Every tool in tool_catalog.json needs exactly one handler.")
            .with_details(serde_json::json!({
                "missing_tools": missing,
                "uncatalogued_handlers": uncatalogued,
            })))
    }

    /// Production wiring: reqwest transport and the credential source the
    /// configuration describes.
    pub fn initialize(config: Config) -> Result<Self, ToolError> {
        let logger = Logger::with_level("jules-mcp", config.log_level);
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new().map_err(ToolError::from)?);
        let credentials = credentials::from_config(&config, &logger, transport.clone());
        Self::with_parts(logger, config, transport, credentials)
    }

    pub fn with_parts(
        logger: Logger,
        config: Config,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, ToolError> {
        let bridge = Arc::new(ToolBridge::new(
            logger.clone(),
            &config,
            transport,
            credentials,
        ));
        let handlers: HashMap<String, Arc<dyn ToolHandler>> =
            bridge.handlers().into_iter().collect();

        Self::validate_tool_wiring(&handlers)?;

        let tool_executor = Arc::new(ToolExecutor::new(logger.clone(), handlers));
        logger.info(
            "initialized",
            Some(&serde_json::json!({
                "base_url": config.base_url,
                "timeout_ms": config.timeout_ms,
                "tools": tool_executor.tool_names().len(),
            })),
        );

        Ok(Self {
            logger,
            config,
            tool_executor,
        })
    }
}

