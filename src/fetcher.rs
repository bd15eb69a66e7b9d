use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::Config;
use crate::fetch_error::FetchError;

/// Upstream data providers, one HTTP client each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// opendata.dwd.de (MOSMIX forecasts, 10-minute climate data)
    DwdOpendata,
    /// www.dwd.de (MOSMIX station catalog)
    Dwd,
    /// PEGELONLINE REST API v2
    Pegelonline,
}

/// Blocking-free "fetch bytes for endpoint X" capability against one base URL.
///
/// The fetcher never inspects payloads; any non-success status is fatal.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `endpoint` (relative to the base URL) and return the raw body
    #[instrument(skip(self, query), fields(base_url = %self.base_url))]
    pub async fn fetch(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);

        debug!("Sending HTTP request to {url}");
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;

        let status = response.status();
        debug!("Received HTTP response with status: {status}");

        if status.is_success() {
            let bytes = response.bytes().await?;
            debug!("Retrieved {} bytes from {url}", bytes.len());
            Ok(bytes.to_vec())
        } else if status.as_u16() == 404 {
            Err(FetchError::NotFound(url))
        } else if status.is_server_error() {
            Err(FetchError::ServerError {
                url,
                status: status.as_u16(),
            })
        } else {
            Err(FetchError::Status {
                url,
                status: status.as_u16(),
            })
        }
    }
}

/// One reusable client per provider base URL
#[derive(Clone)]
pub struct ProviderClients {
    dwd_opendata: HttpFetcher,
    dwd: HttpFetcher,
    pegelonline: HttpFetcher,
}

impl ProviderClients {
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let timeout = config.request_timeout();
        Ok(Self {
            dwd_opendata: HttpFetcher::new(config.dwd_opendata_url.clone(), timeout)?,
            dwd: HttpFetcher::new(config.dwd_url.clone(), timeout)?,
            pegelonline: HttpFetcher::new(config.pegelonline_url.clone(), timeout)?,
        })
    }

    pub fn get(&self, provider: Provider) -> &HttpFetcher {
        match provider {
            Provider::DwdOpendata => &self.dwd_opendata,
            Provider::Dwd => &self.dwd,
            Provider::Pegelonline => &self.pegelonline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_clients_route_by_provider() {
        let config = Config {
            dwd_opendata_url: "http://opendata.test/".to_string(),
            dwd_url: "http://dwd.test/".to_string(),
            pegelonline_url: "http://pegel.test/".to_string(),
            request_timeout_secs: 5,
        };

        let clients = ProviderClients::from_config(&config).unwrap();
        assert_eq!(
            clients.get(Provider::DwdOpendata).base_url(),
            "http://opendata.test/"
        );
        assert_eq!(clients.get(Provider::Dwd).base_url(), "http://dwd.test/");
        assert_eq!(
            clients.get(Provider::Pegelonline).base_url(),
            "http://pegel.test/"
        );
    }
}
