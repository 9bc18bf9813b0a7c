/// Push notification gateway client
///
/// Forwards `{to, title, body, data}` to an Expo-compatible gateway.
use crate::{
    config::PushConfig,
    error::{OxbowError, OxbowResult},
    metrics,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One notification addressed to a device token
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    data: Option<GatewayTicket>,
}

#[derive(Debug, Deserialize)]
struct GatewayTicket {
    status: Option<String>,
    message: Option<String>,
}

/// Push gateway client
#[derive(Clone, Debug)]
pub struct PushClient {
    http_client: reqwest::Client,
    gateway_url: String,
}

impl PushClient {
    pub fn new(config: &PushConfig) -> OxbowResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("oxbow-server/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| OxbowError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            gateway_url: config.gateway_url.clone(),
        })
    }

    /// Send one notification; `kind` labels the metric
    pub async fn send(&self, message: &PushMessage, kind: &str) -> OxbowResult<()> {
        let result = self.deliver(message).await;
        metrics::record_push_notification(kind, result.is_ok());

        match &result {
            Ok(()) => debug!(kind = %kind, "Push notification sent"),
            Err(e) => warn!(kind = %kind, error = %e, "Push notification failed"),
        }
        result
    }

    async fn deliver(&self, message: &PushMessage) -> OxbowResult<()> {
        let response = self
            .http_client
            .post(&self.gateway_url)
            .header("accept", "application/json")
            .json(message)
            .send()
            .await
            .map_err(|e| OxbowError::Upstream(format!("Push gateway unreachable: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OxbowError::Upstream(format!("Failed to read push gateway response: {}", e)))?;

        if !status.is_success() {
            return Err(OxbowError::Upstream(format!(
                "Push gateway returned HTTP {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        // A 200 can still carry a per-message error ticket
        if let Ok(GatewayResponse {
            data: Some(ticket),
        }) = serde_json::from_str::<GatewayResponse>(&text)
        {
            if ticket.status.as_deref() == Some("error") {
                return Err(OxbowError::Upstream(format!(
                    "Push gateway rejected message: {}",
                    ticket.message.unwrap_or_else(|| "unknown error".to_string())
                )));
            }
        }

        Ok(())
    }
}
