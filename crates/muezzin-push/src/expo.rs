//! HTTP push gateway backend (Expo-compatible push API)

use crate::error::{PushError, Result};
use crate::message::{PushMessage, Sound};
use crate::response::{classify_response, DeliveryOutcome};
use crate::PushGateway;
use async_trait::async_trait;
use muezzin_core::GatewayConfig;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Wire envelope for one message
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sound: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<&'a str>,
    data: &'a Map<String, Value>,
    priority: &'static str,
    #[serde(rename = "_contentAvailable", skip_serializing_if = "std::ops::Not::not")]
    content_available: bool,
}

/// Gateway client posting JSON envelopes over HTTPS
pub struct ExpoGateway {
    url: String,
    access_token: Option<String>,
    default_sound: String,
    adhan_sound: String,
    adhan_channel_id: String,
    client: reqwest::Client,
}

impl ExpoGateway {
    /// Create a gateway client with the configured request timeout
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Self::with_client(config, client)
    }

    /// Create with a custom HTTP client (useful for testing)
    pub fn with_client(config: &GatewayConfig, client: reqwest::Client) -> Result<Self> {
        reqwest::Url::parse(&config.url)
            .map_err(|e| PushError::config(format!("Invalid gateway URL '{}': {}", config.url, e)))?;

        Ok(Self {
            url: config.url.clone(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            default_sound: config.default_sound.clone(),
            adhan_sound: config.adhan_sound.clone(),
            adhan_channel_id: config.adhan_channel_id.clone(),
            client,
        })
    }

    fn envelope<'a>(&'a self, message: &'a PushMessage) -> Envelope<'a> {
        let (sound, channel_id) = match message.sound {
            Sound::Default => (Some(self.default_sound.as_str()), None),
            Sound::Adhan => (
                Some(self.adhan_sound.as_str()),
                Some(self.adhan_channel_id.as_str()),
            ),
            Sound::Silent => (None, None),
        };

        Envelope {
            to: &message.to,
            title: message.title.as_deref(),
            body: message.body.as_deref(),
            sound,
            channel_id,
            data: &message.data,
            priority: "high",
            content_available: message.content_available,
        }
    }

    /// POST a payload and classify the reply into `expected` outcomes
    async fn post<T: Serialize + ?Sized>(&self, payload: &T, expected: usize) -> Vec<DeliveryOutcome> {
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "gateway request timed out".to_string()
                } else {
                    format!("gateway request failed: {}", e)
                };
                warn!("{}", reason);
                return vec![DeliveryOutcome::transient(reason); expected];
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read gateway response: {}", e);
                return vec![DeliveryOutcome::transient(format!("unreadable response: {}", e)); expected];
            }
        };

        debug!(status = status.as_u16(), "Gateway responded");
        classify_response(status.as_u16(), &body, expected)
    }
}

#[async_trait]
impl PushGateway for ExpoGateway {
    async fn send(&self, message: &PushMessage) -> DeliveryOutcome {
        let envelope = self.envelope(message);
        self.post(&envelope, 1)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| DeliveryOutcome::transient("missing ticket"))
    }

    async fn send_batch(&self, messages: &[PushMessage]) -> Vec<DeliveryOutcome> {
        if messages.is_empty() {
            return Vec::new();
        }
        let envelopes: Vec<Envelope<'_>> = messages.iter().map(|m| self.envelope(m)).collect();
        debug!(count = envelopes.len(), "Posting batch to gateway");
        self.post(&envelopes, messages.len()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway() -> ExpoGateway {
        ExpoGateway::new(&GatewayConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = GatewayConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ExpoGateway::new(&config),
            Err(PushError::ConfigError(_))
        ));
    }

    #[test]
    fn test_default_envelope() {
        let gateway = gateway();
        let message = PushMessage::notification("ExponentPushToken[abc]", "It's time for Asr", "body")
            .with_data("stage", "at_time");

        let value = serde_json::to_value(gateway.envelope(&message)).unwrap();
        assert_eq!(
            value,
            json!({
                "to": "ExponentPushToken[abc]",
                "title": "It's time for Asr",
                "body": "body",
                "sound": "default",
                "data": {"stage": "at_time"},
                "priority": "high"
            })
        );
    }

    #[test]
    fn test_adhan_envelope_overrides_sound_and_channel() {
        let gateway = gateway();
        let message = PushMessage::notification("tok", "t", "b").with_adhan(true);

        let value = serde_json::to_value(gateway.envelope(&message)).unwrap();
        assert_eq!(value["sound"], "adhan.wav");
        assert_eq!(value["channelId"], "adhan");
    }

    #[test]
    fn test_silent_envelope() {
        let gateway = gateway();
        let message = PushMessage::data_only("tok").with_data("type", "BLOCKER_ACTIVATE");

        let value = serde_json::to_value(gateway.envelope(&message)).unwrap();
        assert_eq!(value["_contentAvailable"], true);
        assert!(value.get("title").is_none());
        assert!(value.get("sound").is_none());
        assert_eq!(value["data"]["type"], "BLOCKER_ACTIVATE");
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transient() {
        let config = GatewayConfig {
            url: "http://127.0.0.1:9/push".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        let gateway = ExpoGateway::new(&config).unwrap();
        let messages = vec![
            PushMessage::notification("a", "t", "b"),
            PushMessage::notification("b", "t", "b"),
        ];

        let outcomes = gateway.send_batch(&messages).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, DeliveryOutcome::TransientFailure { .. })));
        assert!(gateway.send_batch(&[]).await.is_empty());
    }
}
