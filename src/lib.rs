//! MCP server exposing the Jules coding-automation API as agent tools.
//!
//! [`services::jules_client::JulesClient`] maps each backend operation onto
//! one HTTP request; [`managers::bridge::ToolBridge`] registers every client
//! operation as an independently callable tool and resolves a credential per
//! call; [`mcp::server::McpServer`] speaks JSON-RPC over stdio.

pub mod app;
pub mod config;
pub mod constants;
pub mod errors;
pub mod managers;
pub mod mcp;
pub mod services;
pub mod utils;
