use std::env;
use std::time::Duration;

pub const DEFAULT_DWD_OPENDATA_URL: &str = "https://opendata.dwd.de/";
pub const DEFAULT_DWD_URL: &str = "https://www.dwd.de/";
pub const DEFAULT_PEGELONLINE_URL: &str = "https://www.pegelonline.wsv.de/webservices/rest-api/v2/";

#[derive(Debug, Clone)]
pub struct Config {
    pub dwd_opendata_url: String,
    pub dwd_url: String,
    pub pegelonline_url: String,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            dwd_opendata_url: env::var("DWD_OPENDATA_URL")
                .unwrap_or_else(|_| DEFAULT_DWD_OPENDATA_URL.to_string()),
            dwd_url: env::var("DWD_URL").unwrap_or_else(|_| DEFAULT_DWD_URL.to_string()),
            pegelonline_url: env::var("PEGELONLINE_URL")
                .unwrap_or_else(|_| DEFAULT_PEGELONLINE_URL.to_string()),
            request_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dwd_opendata_url: DEFAULT_DWD_OPENDATA_URL.to_string(),
            dwd_url: DEFAULT_DWD_URL.to_string(),
            pegelonline_url: DEFAULT_PEGELONLINE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}
