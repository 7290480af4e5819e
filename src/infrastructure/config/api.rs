//! Market data API configuration.

use serde::Deserialize;

/// Gamma API pagination settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Upper bound on pages fetched per refresh.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Also fetch closed events so resolved markets stay visible.
    #[serde(default)]
    pub include_closed: bool,
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".into()
}

const fn default_page_size() -> usize {
    100
}

const fn default_max_pages() -> usize {
    50
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gamma_url: default_gamma_url(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            include_closed: false,
        }
    }
}
