use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ToolError;
use crate::mcp::catalog::validate_tool_args;
use crate::services::logger::Logger;
use crate::utils::suggest::suggest;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, args: Value) -> Result<Value, ToolError>;
}

/// Result of a successful call: the handler's value untouched, plus call
/// metadata kept apart from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub result: Value,
    pub meta: Value,
}

/// Static name → handler registry. Cloning is cheap; clones share handlers.
#[derive(Clone)]
pub struct ToolExecutor {
    logger: Logger,
    handlers: Arc<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolExecutor {
    pub fn new(logger: Logger, handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self {
            logger: logger.child("executor"),
            handlers: Arc::new(handlers),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    fn unknown_tool(&self, tool: &str) -> ToolError {
        let suggestions = suggest(tool, self.tool_names().as_slice(), 3);
        let hint = if suggestions.is_empty() {
            "Call tools/list to see the available tools".to_string()
        } else {
            format!("Did you mean: {}", suggestions.join(", "))
        };
        ToolError::not_found(format!("Unknown tool: {}", tool)).with_hint(hint)
    }

    pub async fn execute(&self, tool: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();
        let handler = self
            .handlers
            .get(tool)
            .cloned()
            .ok_or_else(|| self.unknown_tool(tool))?;

        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };
        validate_tool_args(tool, &args)?;

        let trace_id = uuid::Uuid::new_v4().to_string();
        self.logger
            .debug(tool, Some(&serde_json::json!({ "trace_id": trace_id })));

        match handler.handle(args).await {
            Ok(result) => Ok(ToolOutput {
                result,
                meta: serde_json::json!({
                    "tool": tool,
                    "trace_id": trace_id,
                    "duration_ms": started.elapsed().as_millis() as u64,
                }),
            }),
            Err(err) => {
                self.logger.warn(
                    &format!("{} failed", tool),
                    Some(&serde_json::json!({
                        "trace_id": trace_id,
                        "kind": err.kind,
                        "code": err.code,
                    })),
                );
                Err(err)
            }
        }
    }
}
