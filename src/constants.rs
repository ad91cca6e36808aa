pub mod network {
    pub const DEFAULT_BASE_URL: &str = "https://jules.googleapis.com/v1alpha";
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const USER_AGENT: &str = concat!("jules-mcp/", env!("CARGO_PKG_VERSION"));
}

pub mod auth {
    pub const API_KEY_HEADER: &str = "x-goog-api-key";
    pub const DEFAULT_SECRET_NAME: &str = "JULES_API_KEY";
}

pub mod gcp {
    pub const METADATA_TOKEN_URL: &str =
        "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
    pub const METADATA_FLAVOR_HEADER: &str = "metadata-flavor";
    pub const SECRET_MANAGER_BASE_URL: &str = "https://secretmanager.googleapis.com/v1";
}

pub mod server {
    pub const PROTOCOL_VERSION: &str = "2025-06-18";
    pub const NAME: &str = "jules";
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
