//! Receipt email delivery via the Resend API.
//!
//! Delivery is best-effort: reconciliation never fails because an email
//! could not be sent. Callers spawn sends as background tasks.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::invoice::InvoiceData;

/// Retry delays in seconds (exponential backoff: 1s, 4s, 16s)
const RETRY_DELAYS: &[u64] = &[1, 4, 16];

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    Sent,
    /// Email delivery switched off (`EMAIL_ENABLED=false`).
    Disabled,
    /// No API key configured; the send was logged and skipped.
    NoApiKey,
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
    html: String,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from_email: String,
    enabled: bool,
    http_client: Client,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from_email: String, enabled: bool) -> Self {
        Self {
            api_key,
            from_email,
            enabled,
            http_client: Client::new(),
        }
    }

    /// Send a payment receipt for a settled purchase.
    pub async fn send_receipt(&self, invoice: &InvoiceData<'_>) -> Result<EmailSendResult> {
        if !self.enabled {
            tracing::debug!(
                order_id = %invoice.purchase.order_id,
                "Email delivery disabled, skipping receipt"
            );
            return Ok(EmailSendResult::Disabled);
        }

        let Some(ref api_key) = self.api_key else {
            tracing::debug!(
                user_id = %invoice.user.id,
                order_id = %invoice.purchase.order_id,
                "No Resend API key configured, skipping receipt email"
            );
            return Ok(EmailSendResult::NoApiKey);
        };

        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![&invoice.user.email],
            subject: invoice.subject(),
            text: invoice.render_text(),
            html: invoice.render_html(),
        };

        self.send_with_retry(api_key, &request).await
    }

    /// Send a request to the Resend API with exponential backoff.
    ///
    /// Retries on transient errors (network issues, 5xx, 429 rate limit);
    /// fails immediately on other 4xx responses.
    async fn send_with_retry(
        &self,
        api_key: &str,
        request: &ResendEmailRequest<'_>,
    ) -> Result<EmailSendResult> {
        let mut last_error: Option<AppError> = None;

        for (attempt, delay_secs) in std::iter::once(&0u64).chain(RETRY_DELAYS).enumerate() {
            if *delay_secs > 0 {
                tracing::warn!(attempt, delay_secs, "Retrying receipt email after transient failure");
                tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
            }

            let response = self
                .http_client
                .post(RESEND_API_URL)
                .bearer_auth(api_key)
                .json(request)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let _body: ResendEmailResponse = resp.json().await.map_err(|e| {
                        AppError::Internal(format!("Failed to parse Resend response: {}", e))
                    })?;
                    return Ok(EmailSendResult::Sent);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let err = AppError::Internal(format!("Resend API error {}: {}", status, body));
                    // Retry 5xx and 429 only.
                    if status.is_server_error() || status.as_u16() == 429 {
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_error = Some(AppError::Internal(format!("Resend request failed: {}", e)));
                    continue;
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Internal("Receipt email send failed".to_string())))
    }
}
