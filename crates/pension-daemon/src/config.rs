//! Process configuration read from the environment at startup.

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scheme_registry_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let scheme_registry_url = std::env::var("SCHEME_REGISTRY_URL").ok();
        Self {
            port,
            scheme_registry_url,
        }
    }
}
