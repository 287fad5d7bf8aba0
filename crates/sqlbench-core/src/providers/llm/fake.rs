use super::{LlmClient, LlmResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted client for offline runs and tests.
///
/// Replies cycle through `script`; an `Err` entry fails that call. With an
/// empty script the prompt is echoed back.
pub struct FakeClient {
    model: String,
    script: Vec<Result<String, String>>,
    cursor: AtomicUsize,
    latency: Option<Duration>,
}

impl FakeClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Vec::new(),
            cursor: AtomicUsize::new(0),
            latency: None,
        }
    }

    pub fn replying<I, S>(model: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut c = Self::new(model);
        c.script = replies.into_iter().map(|r| Ok(r.into())).collect();
        c
    }

    pub fn failing(model: impl Into<String>, message: impl Into<String>) -> Self {
        let mut c = Self::new(model);
        c.script = vec![Err(message.into())];
        c
    }

    pub fn scripted(model: impl Into<String>, script: Vec<Result<String, String>>) -> Self {
        let mut c = Self::new(model);
        c.script = script;
        c
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse> {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.latency {
            tokio::time::sleep(d).await;
        }

        let text = if self.script.is_empty() {
            prompt.to_string()
        } else {
            match &self.script[n % self.script.len()] {
                Ok(reply) => reply.clone(),
                Err(msg) => anyhow::bail!("{}", msg),
            }
        };

        Ok(LlmResponse {
            text,
            provider: "fake".to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_cycles_and_fails_on_err_entries() {
        let c = FakeClient::scripted(
            "m",
            vec![Ok("one".into()), Err("boom".into())],
        );
        assert_eq!(c.complete("p").await.unwrap().text, "one");
        assert!(c.complete("p").await.is_err());
        assert_eq!(c.complete("p").await.unwrap().text, "one");
        assert_eq!(c.calls(), 3);
    }

    #[tokio::test]
    async fn empty_script_echoes_prompt() {
        let c = FakeClient::new("m");
        assert_eq!(c.complete("select 1").await.unwrap().text, "select 1");
    }
}
