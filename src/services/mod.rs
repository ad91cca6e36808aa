pub mod credentials;
pub mod jules_client;
pub mod logger;
pub mod tool_executor;
pub mod transport;
