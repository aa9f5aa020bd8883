use serde_json::json;

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";
const SENDER: &str = "駒場祭フリマ <onboarding@resend.dev>";

/// Best-effort admin email notifications via Resend. A missing API key
/// disables sending; failures are logged and swallowed so a notification
/// can never fail the request that triggered it.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    api_key: Option<String>,
    to: String,
}

impl Notifier {
    pub fn new(api_key: Option<String>, to: String) -> Self {
        if api_key.is_none() {
            tracing::info!("RESEND_API_KEY not set, email notifications disabled");
        }
        Self {
            client: reqwest::Client::new(),
            api_key,
            to,
        }
    }

    /// Send a plain-text email to the admin address. Returns whether the
    /// send succeeded.
    pub async fn send(&self, subject: &str, text: &str) -> bool {
        let Some(api_key) = &self.api_key else {
            return false;
        };

        let body = json!({
            "from": SENDER,
            "to": self.to,
            "subject": subject,
            "text": text,
        });

        match self
            .client
            .post(RESEND_EMAILS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Notification email sent: {}", subject);
                true
            }
            Ok(response) => {
                tracing::error!(
                    "Notification email rejected: status={}",
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::error!("Notification email failed: {}", e);
                false
            }
        }
    }
}
