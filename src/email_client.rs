use std::time::Duration;

use reqwest::{header, Client, ClientBuilder, Url};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::configuration::EmailSettings;
use crate::domain::Contact;

pub struct EmailClient {
    http_client: Client,
    url: Url,
    sender: Contact,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest<'a> {
    sender: &'a Contact,
    to: Vec<&'a Contact>,
    subject: &'a str,
    text_content: &'a str,
}

impl EmailClient {
    pub fn new(config: EmailSettings) -> anyhow::Result<Self> {
        let url = Url::parse(&config.endpoint).map_err(|e| anyhow::anyhow!(e.to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "api-key",
            config
                .api_key
                .expose_secret()
                .parse()
                .map_err(|e| anyhow::anyhow!("Failed to parse api_key: {e}"))?,
        );
        headers.insert(
            header::ACCEPT,
            "application/json"
                .parse()
                .map_err(|e| anyhow::anyhow!("Failed to parse accept header: {e}"))?,
        );

        let http_client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_millis))
            .build()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        Ok(Self {
            http_client,
            url,
            sender: config.sender,
        })
    }

    pub async fn send_email(
        &self,
        recipient: &Contact,
        subject: &str,
        text_content: &str,
    ) -> anyhow::Result<()> {
        let url = self
            .url
            .join("/v3/smtp/email")
            .map_err(|e| anyhow::anyhow!(e))?;
        let body = SendEmailRequest {
            sender: &self.sender,
            to: vec![recipient],
            subject,
            text_content,
        };

        let _ = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send an email to {}. {e}", recipient.email))?
            .error_for_status()
            .map_err(|e| {
                anyhow::anyhow!("Error while sending an email to {}. {e}", recipient.email)
            })?;
        Ok(())
    }
}
