use crate::error::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

const SERVICE: &str = "sms";

#[derive(Debug, Serialize)]
struct SmsPayload<'a> {
    sms: String,
    who: &'a str,
}

pub fn login_code_message(code: &str) -> String {
    format!("کد ورود شما به سیستم استخدام: {}", code)
}

/// Posts one-time codes to the n8n SMS workflow. Only the HTTP status of the
/// webhook is inspected.
#[derive(Clone)]
pub struct SmsService {
    client: Client,
    webhook_url: String,
}

impl SmsService {
    pub fn new(webhook_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create SMS HTTP client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url,
        })
    }

    pub async fn send_code(&self, phone: &str, code: &str) -> Result<()> {
        let payload = SmsPayload {
            sms: login_code_message(code),
            who: phone,
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(phone, error = %e, "SMS webhook request failed");
                Error::external(SERVICE, format!("SMS webhook request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(phone, %status, %body, "SMS webhook returned an error status");
            return Err(Error::external(
                SERVICE,
                format!("SMS webhook returned {}", status),
            ));
        }

        info!(phone, "Login code dispatched");
        Ok(())
    }
}
