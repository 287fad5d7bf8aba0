use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
    fn model(&self) -> &str;
}

pub mod fake;
pub mod openai;

use crate::config::{LlmSpec, ProviderKind};
use crate::errors::ConfigError;
use std::sync::Arc;
use std::time::Duration;

/// Builds the client for one provider entry. API keys come from the environment.
pub fn build_client(spec: &LlmSpec, request_timeout: Duration) -> Result<Arc<dyn LlmClient>, ConfigError> {
    match spec.provider {
        ProviderKind::Fake => Ok(Arc::new(fake::FakeClient::replying(
            spec.model.clone(),
            spec.responses.iter().cloned(),
        ))),
        ProviderKind::Openai | ProviderKind::Azure => {
            let default_env = match spec.provider {
                ProviderKind::Azure => "AZURE_OPENAI_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            let key_env = spec.api_key_env.as_deref().or(Some(default_env));
            let api_key = crate::config::resolve_api_key(key_env)?.unwrap_or_default();
            let mut client = openai::OpenAIClient::new(
                spec.model.clone(),
                spec.api_url.clone(),
                api_key,
                spec.temperature,
                spec.max_tokens,
                request_timeout,
            )
            .map_err(|e| ConfigError(format!("failed to build HTTP client: {}", e)))?;
            if spec.provider == ProviderKind::Azure {
                let api_version = spec
                    .api_version
                    .clone()
                    .ok_or_else(|| ConfigError("azure provider needs api_version".into()))?;
                client = client.with_azure(openai::AzureDeployment {
                    deployment: spec.deployment.clone().unwrap_or_else(|| spec.model.clone()),
                    api_version,
                });
            }
            Ok(Arc::new(client))
        }
    }
}
