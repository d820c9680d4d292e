//! Remote storage provider configuration.

use serde::{Deserialize, Serialize};

/// Credentials and endpoints for the Microsoft Graph drive adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Azure AD tenant ID.
    pub tenant_id: String,
    /// Application (client) ID.
    pub client_id: String,
    /// Client secret for the credentials grant.
    pub client_secret: String,
    /// Principal name of the storage account whose drive is mirrored
    /// (e.g. `storage@contoso.onmicrosoft.com`).
    pub storage_user: String,
    /// Base URL of the Graph API.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
    /// Base URL of the login/token endpoint.
    #[serde(default = "default_login_base_url")]
    pub login_base_url: String,
    /// Per-request timeout in seconds for all gateway calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_login_base_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
