use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://web-production-2d737.up.railway.app";
pub const DEFAULT_CAPTURE_API_URL: &str = "https://gestorproyectoapi-production.up.railway.app";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the backends live and how to talk to them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base of every relative endpoint.
    pub api_url: String,
    /// Backend that receives recognition submissions with photos.
    pub capture_api_url: String,
    /// Base of the activity scheduling endpoints.
    pub activities_url: String,
    pub leaders_url: String,
    pub timeout: Duration,
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_API_URL, DEFAULT_CAPTURE_API_URL)
    }
}

impl Config {
    /// Derives the activity and leader endpoints from `api_url`.
    pub fn new(api_url: &str, capture_api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Config {
            activities_url: api_url.clone(),
            leaders_url: format!("{}/lideres_grupo", api_url),
            capture_api_url: capture_api_url.trim_end_matches('/').to_string(),
            api_url,
            timeout: DEFAULT_TIMEOUT,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
