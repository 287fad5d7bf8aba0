use super::{LlmClient, LlmResponse};
use crate::errors::EvalError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions client. Works against any endpoint
/// exposing `{api_url}/chat/completions`, and against Azure OpenAI
/// deployments.
pub struct OpenAIClient {
    pub model: String,
    pub api_url: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub azure: Option<AzureDeployment>,
    pub client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct AzureDeployment {
    pub deployment: String,
    pub api_version: String,
}

impl OpenAIClient {
    pub fn new(
        model: String,
        api_url: Option<String>,
        api_key: String,
        temperature: f32,
        max_tokens: u32,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            model,
            api_url: api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            temperature,
            max_tokens,
            azure: None,
            client,
        })
    }

    /// Targets `{endpoint}/openai/deployments/{deployment}` with an `api-key` header.
    pub fn with_azure(mut self, azure: AzureDeployment) -> Self {
        self.azure = Some(azure);
        self
    }

    fn request(&self) -> reqwest::RequestBuilder {
        match &self.azure {
            Some(az) => self
                .client
                .post(format!(
                    "{}/openai/deployments/{}/chat/completions",
                    self.api_url, az.deployment
                ))
                .query(&[("api-version", az.api_version.as_str())])
                .header("api-key", &self.api_key),
            None => self
                .client
                .post(format!("{}/chat/completions", self.api_url))
                .bearer_auth(&self.api_key),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let resp = self
            .request()
            .json(&body)
            .send()
            .await
            .map_err(EvalError::from)?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EvalError::TransientCall {
                message: format!("chat API error: {}", error_text),
                status: Some(status.as_u16()),
            }
            .into());
        }

        let json: serde_json::Value = resp.json().await.map_err(EvalError::from)?;

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("chat API response missing content"))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: self.provider_name().to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        if self.azure.is_some() {
            "azure"
        } else {
            "openai"
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(url: String) -> OpenAIClient {
        OpenAIClient::new("gpt-x".into(), Some(url), "sk-test".into(), 0.0, 64, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn reads_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-x", "max_tokens": 64})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "SELECT 1"}}]
            })))
            .mount(&server)
            .await;

        let resp = client(format!("{}/", server.uri())).complete("q").await.unwrap();
        assert_eq!(resp.text, "SELECT 1");
        assert_eq!(resp.provider, "openai");
    }

    #[tokio::test]
    async fn azure_uses_deployment_path_and_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/prod-4o/chat/completions"))
            .and(query_param("api-version", "2024-06-01"))
            .and(header("api-key", "sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"answer\": \"yes\"}"}}]
            })))
            .mount(&server)
            .await;

        let c = client(server.uri()).with_azure(AzureDeployment {
            deployment: "prod-4o".into(),
            api_version: "2024-06-01".into(),
        });
        let resp = c.complete("judge this").await.unwrap();
        assert_eq!(resp.text, r#"{"answer": "yes"}"#);
        assert_eq!(resp.provider, "azure");
    }

    #[tokio::test]
    async fn http_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client(server.uri()).complete("q").await.unwrap_err();
        let eval = err.downcast_ref::<EvalError>().unwrap();
        assert!(matches!(eval, EvalError::TransientCall { status: Some(429), .. }), "{:?}", eval);
    }
}
