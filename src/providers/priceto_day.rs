use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use crate::core::config::PricetoDayProviderConfig;
use crate::core::rate::{RateProvider, RateResult};

/// Latest USD price quoted in IRR.
pub const LATEST_IRR_USD_PATH: &str = "/v1/latest/irr/usd";

// PricetoDayProvider implementation for RateProvider
pub struct PricetoDayProvider {
    base_url: String,
    client: reqwest::Client,
}

impl PricetoDayProvider {
    pub fn new(config: &PricetoDayProviderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("rateproxy/", env!("CARGO_PKG_VERSION")));

        if config.accept_invalid_certs {
            warn!(
                base_url = %config.base_url,
                "TLS certificate verification is DISABLED for upstream rate requests"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(PricetoDayProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn request_rates(&self) -> Result<Map<String, Value>> {
        let url = format!("{}{}", self.base_url, LATEST_IRR_USD_PATH);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request error for URL: {url}"))?;

        debug!(response = ?response, "Received priceto.day response");

        let status = response.status();
        if !status.is_success() {
            bail!("Upstream responded with status {status}");
        }

        let response_text = response
            .text()
            .await
            .context("Failed to get response text")?;

        match serde_json::from_str::<Map<String, Value>>(&response_text) {
            Ok(body) => Ok(body),
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse rates response"
                );
                Err(e).context("Failed to parse rates response")
            }
        }
    }
}

#[async_trait]
impl RateProvider for PricetoDayProvider {
    #[instrument(name = "PricetoDayFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_rates(&self) -> RateResult {
        match self.request_rates().await {
            Ok(body) => RateResult::Success(body),
            Err(e) => {
                warn!("Upstream rate request failed: {e:#}");
                RateResult::failure()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(LATEST_IRR_USD_PATH))
            .respond_with(response)
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider_for(base_url: &str) -> PricetoDayProvider {
        PricetoDayProvider::new(&PricetoDayProviderConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn to_json(result: &RateResult) -> Value {
        serde_json::to_value(result).unwrap()
    }

    #[tokio::test]
    async fn test_success_body_passes_through() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(r#"{"usd":58000}"#))
                .await;
        let provider = provider_for(&mock_server.uri());

        let result = provider.fetch_rates().await;

        assert!(result.is_success());
        assert_eq!(to_json(&result), json!({"usd": 58000}));
    }

    #[tokio::test]
    async fn test_nested_body_is_not_reshaped() {
        let body = json!({
            "price": 595000.5,
            "symbol": "USD",
            "change": {"percent": -0.12, "direction": "down"},
            "history": [1, 2, 3]
        });
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_json(body.clone())).await;
        let provider = provider_for(&format!("{}/", mock_server.uri()));

        let result = provider.fetch_rates().await;

        assert_eq!(to_json(&result), body);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_failure() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(500).set_body_string("boom")).await;
        let provider = provider_for(&mock_server.uri());

        let result = provider.fetch_rates().await;

        assert_eq!(
            to_json(&result),
            json!({"success": false, "message": "API request failed"})
        );
    }

    #[tokio::test]
    async fn test_client_error_maps_to_failure() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(404).set_body_json(json!({"usd": 1})))
                .await;
        let provider = provider_for(&mock_server.uri());

        assert_eq!(provider.fetch_rates().await, RateResult::failure());
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_failure() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string("not json")).await;
        let provider = provider_for(&mock_server.uri());

        assert_eq!(provider.fetch_rates().await, RateResult::failure());
    }

    #[tokio::test]
    async fn test_non_object_body_maps_to_failure() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string("[1, 2]")).await;
        let provider = provider_for(&mock_server.uri());

        assert_eq!(provider.fetch_rates().await, RateResult::failure());
    }

    #[tokio::test]
    async fn test_connection_error_maps_to_failure() {
        // Nothing listens on the discard port
        let provider = provider_for("http://127.0.0.1:9");

        assert_eq!(provider.fetch_rates().await, RateResult::failure());
    }

    #[tokio::test]
    async fn test_timeout_maps_to_failure() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"usd":58000}"#)
                .set_delay(Duration::from_secs(3)),
        )
        .await;
        let provider = PricetoDayProvider::new(&PricetoDayProviderConfig {
            base_url: mock_server.uri(),
            timeout_secs: Some(1),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(provider.fetch_rates().await, RateResult::failure());
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn build_with_logs(config: &PricetoDayProviderConfig) -> (Result<PricetoDayProvider>, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let provider =
            tracing::subscriber::with_default(subscriber, || PricetoDayProvider::new(config));
        (provider, logs.contents())
    }

    #[test]
    fn test_accept_invalid_certs_warns() {
        let (provider, logs) = build_with_logs(&PricetoDayProviderConfig {
            accept_invalid_certs: true,
            ..Default::default()
        });

        assert!(provider.is_ok());
        assert!(logs.contains("WARN"), "logs: {logs}");
        assert!(
            logs.contains("TLS certificate verification is DISABLED"),
            "logs: {logs}"
        );
        assert!(logs.contains("https://api.priceto.day"), "logs: {logs}");
    }

    #[test]
    fn test_certificate_verification_on_by_default() {
        let (provider, logs) = build_with_logs(&PricetoDayProviderConfig::default());

        assert!(provider.is_ok());
        assert!(!logs.contains("certificate"), "logs: {logs}");
    }
}
