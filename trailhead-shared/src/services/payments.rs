/// Hosted checkout through an external payment provider
///
/// The provider is asked for a checkout *preference*: the item being sold
/// plus the URLs to send the buyer back to. Its JSON answer (which carries
/// the hosted checkout link) is passed through to the client untouched.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payment provider rejected the request ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

/// A line item of a checkout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// Where the provider sends the buyer afterwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
}

/// Body of a checkout preference request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub back_urls: BackUrls,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_preference(&self, request: &CheckoutRequest) -> Result<Value, PaymentError>;
}

/// Provider reached over HTTP with a bearer access token
#[derive(Debug, Clone)]
pub struct HttpPaymentProvider {
    client: Client,
    base_url: String,
    access_token: String,
}

impl HttpPaymentProvider {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self, PaymentError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn preferences_url(&self) -> String {
        format!("{}/checkout/preferences", self.base_url)
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn create_preference(&self, request: &CheckoutRequest) -> Result<Value, PaymentError> {
        let response = self
            .client
            .post(self.preferences_url())
            .bearer_auth(&self.access_token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Payment provider rejected checkout preference");
            return Err(PaymentError::Rejected { status, body });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = CheckoutRequest {
            items: vec![CheckoutItem {
                id: "tour-1".to_string(),
                title: "The Forest Hiker".to_string(),
                quantity: 1,
                unit_price: 397.0,
            }],
            back_urls: BackUrls {
                success: "http://localhost:3000/my-tours?tour=tour-1".to_string(),
                failure: "http://localhost:3000/tour/the-forest-hiker".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "items": [{
                    "id": "tour-1",
                    "title": "The Forest Hiker",
                    "quantity": 1,
                    "unit_price": 397.0
                }],
                "back_urls": {
                    "success": "http://localhost:3000/my-tours?tour=tour-1",
                    "failure": "http://localhost:3000/tour/the-forest-hiker"
                }
            })
        );
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let provider = HttpPaymentProvider::new("https://payments.example.com/", "token").unwrap();
        assert_eq!(
            provider.preferences_url(),
            "https://payments.example.com/checkout/preferences"
        );
    }
}
