use anyhow::{Context, Result};
use domain::webhook::{HmacWebhookValidator, SIGNATURE_HEADER};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

pub struct ApiClient {
    client: Client,
    base_url: String,
    webhook_secret: Option<String>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String, webhook_secret: Option<String>) -> Self {
        Self {
            client,
            base_url,
            webhook_secret,
        }
    }

    pub async fn health(&self) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .error_for_status()
            .context("Health check failed")?;

        Ok(response.json().await?)
    }

    pub async fn submit_job(&self, stream_id: &str, prompt: &str) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .json(&json!({
                "stream_id": stream_id,
                "input": { "prompt": prompt },
            }))
            .send()
            .await?;

        if response.status() != StatusCode::ACCEPTED {
            anyhow::bail!("Job submission failed with status {}", response.status());
        }

        Ok(response.json().await?)
    }

    /// Play the worker's part: post a status callback for `job_id`, signed when
    /// a webhook secret is configured.
    pub async fn send_callback(
        &self,
        job_id: &str,
        stream_id: &str,
        status: &str,
        outputs: &[&str],
        error: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        let body = json!({
            "id": job_id,
            "stream_id": stream_id,
            "status": status,
            "outputs": outputs,
            "error": error,
        })
        .to_string();

        let mut request = self
            .client
            .post(format!("{}/webhooks/cog", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(signature) = self.signature_for(&body)? {
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        Ok((status, response.json().await?))
    }

    fn signature_for(&self, body: &str) -> Result<Option<String>> {
        let Some(secret) = &self.webhook_secret else {
            return Ok(None);
        };
        let signature = HmacWebhookValidator::new(secret.clone())
            .sign(body.as_bytes())
            .map_err(|e| anyhow::anyhow!("Could not sign callback: {e}"))?;
        Ok(Some(signature))
    }

    /// Open an SSE stream with a malformed id and return the raw answer.
    pub async fn open_invalid_stream(&self) -> Result<(StatusCode, Value)> {
        let response = self
            .client
            .get(format!("{}/sse?stream=not-a-valid-id", self.base_url))
            .send()
            .await?;

        let status = response.status();
        Ok((status, response.json().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::webhook::WebhookValidator;

    fn client(secret: Option<&str>) -> ApiClient {
        ApiClient::new(
            Client::new(),
            "http://localhost:4000".to_string(),
            secret.map(String::from),
        )
    }

    #[test]
    fn test_callback_signature_is_accepted_by_server_validator() {
        let body = r#"{"id":"x","status":"succeeded"}"#;
        let signature = client(Some("secret")).signature_for(body).unwrap().unwrap();

        let validator = HmacWebhookValidator::new("secret".to_string());
        assert!(validator
            .validate(Some(&signature), body.as_bytes())
            .unwrap());
    }

    #[test]
    fn test_callback_is_unsigned_without_secret() {
        assert!(client(None).signature_for("{}").unwrap().is_none());
    }
}
