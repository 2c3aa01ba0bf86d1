use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

use super::{HolidayError, HolidaySource};

const CLIENT_USER_AGENT: &str = concat!("business-dates/", env!("CARGO_PKG_VERSION"));

/// Fetches the holiday list with a single `GET` against a JSON endpoint.
#[derive(Debug, Clone)]
pub struct HttpHolidaySource {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpHolidaySource {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(url: &str, timeout: Duration) -> Result<Self, HolidayError> {
        let url = Url::parse(url)
            .map_err(|err| HolidayError::Unknown(format!("invalid holiday URL '{url}': {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| HolidayError::Unknown(format!("build HTTP client: {err}")))?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, err: reqwest::Error) -> HolidayError {
        let url = err
            .url()
            .map(Url::to_string)
            .unwrap_or_else(|| self.url.to_string());
        if err.is_timeout() {
            return HolidayError::Timeout { url };
        }
        if let Some(status) = err.status() {
            return HolidayError::Network {
                status: Some(status.as_u16()),
                url,
                message: format!("HTTP {status}"),
            };
        }
        if err.is_connect() || err.is_request() {
            return HolidayError::Network {
                status: None,
                url,
                message: format!("could not reach holiday service: {err}"),
            };
        }
        if err.is_decode() {
            return HolidayError::Parse(format!("response body is not JSON: {err}"));
        }
        HolidayError::Unknown(err.to_string())
    }
}

impl HolidaySource for HttpHolidaySource {
    async fn fetch(&self) -> Result<Value, HolidayError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| self.classify(err))?;
        response
            .json::<Value>()
            .await
            .map_err(|err| self.classify(err))
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
