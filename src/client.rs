use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::feeds::GlobalEvent;
use crate::location::Coordinates;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const USER_AGENT: &str = concat!("gaia/", env!("CARGO_PKG_VERSION"));

/// Backend simulation modes that change what kind of events are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scenario {
    #[default]
    AiPanic,
    MarsColony,
}

impl Scenario {
    pub const ALL: [Scenario; 2] = [Scenario::AiPanic, Scenario::MarsColony];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::AiPanic => "ai_panic",
            Scenario::MarsColony => "mars_colony",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scenario::AiPanic => "⚠ AI PANIC (CRISIS)",
            Scenario::MarsColony => "🚀 MARS COLONY (HOPE)",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown scenario {:?} (expected one of: ai_panic, mars_colony)",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub text: String,
    pub lat: f64,
    pub lng: f64,
    pub lang: String,
}

impl BroadcastRequest {
    pub fn new(text: impl Into<String>, at: Coordinates, lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lat: at.lat,
            lng: at.lng,
            lang: lang.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioAck {
    pub success: bool,
    pub current_scenario: String,
}

fn http_client(timeout: Duration, user_agent: &str) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(ApiError::Build)
}

/// Thin wrapper over the GAIA REST endpoints.
#[derive(Debug, Clone)]
pub struct GaiaClient {
    base_url: String,
    client: reqwest::Client,
}

impl GaiaClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }

        let client = http_client(config.timeout(), USER_AGENT)?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `host:port` of the backend, for display.
    pub fn node(&self) -> &str {
        self.base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.base_url)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_events(&self) -> Result<Vec<GlobalEvent>, ApiError> {
        let url = self.url("/api/events");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        let events: Vec<GlobalEvent> = Self::decode(url, response).await?;
        tracing::debug!(count = events.len(), "fetched events");
        Ok(events)
    }

    /// Submit a message for analysis. The backend echoes the event it created,
    /// which is returned when it parses.
    pub async fn broadcast(
        &self,
        request: &BroadcastRequest,
    ) -> Result<Option<GlobalEvent>, ApiError> {
        let url = self.url("/api/broadcast");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        let body = response.bytes().await.map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })?;
        let echoed = serde_json::from_slice::<GlobalEvent>(&body).ok();
        tracing::info!(
            lat = request.lat,
            lng = request.lng,
            lang = %request.lang,
            sentiment = echoed.as_ref().map(|e| e.sentiment.as_str()).unwrap_or("?"),
            "broadcast accepted"
        );
        Ok(echoed)
    }

    pub async fn set_scenario(&self, scenario: Scenario) -> Result<ScenarioAck, ApiError> {
        let url = self.url(&format!(
            "/api/scenario/{}",
            urlencoding::encode(scenario.as_str())
        ));
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        let ack: ScenarioAck = Self::decode(url, response).await?;
        tracing::info!(scenario = %scenario, current = %ack.current_scenario, success = ack.success, "scenario switched");
        Ok(ack)
    }

    async fn decode<T: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }
        response
            .json::<T>()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_names() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.as_str().parse::<Scenario>().unwrap(), scenario);
        }
        assert_eq!(Scenario::default(), Scenario::AiPanic);
        assert!("zombie_outbreak".parse::<Scenario>().is_err());
        assert!("AI_PANIC".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_broadcast_request_body() {
        let request = BroadcastRequest::new("hello world", Coordinates::new(1.5, -2.25), "en");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"text": "hello world", "lat": 1.5, "lng": -2.25, "lang": "en"})
        );
    }

    #[test]
    fn test_client_base_url() {
        let config = ApiConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..ApiConfig::default()
        };
        let client = GaiaClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.node(), "localhost:8000");
        assert_eq!(client.url("/api/events"), "http://localhost:8000/api/events");

        let bad = ApiConfig {
            base_url: "ftp://example.com".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            GaiaClient::new(&bad),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_http_client_build_error_is_reported() {
        let err = http_client(Duration::from_secs(1), "gaia\n").unwrap_err();
        assert!(matches!(err, ApiError::Build(_)));
        assert!(err.to_string().starts_with("failed to build HTTP client"));

        assert!(http_client(Duration::from_secs(1), USER_AGENT).is_ok());
    }
}
