use async_trait::async_trait;
use anyhow::Result;
use crate::config::OpenAISettings;
use crate::providers::traits::{CompletionRequest, CompletionService};
use async_openai::{
    types::CreateCompletionRequestArgs,
    Client,
    config::OpenAIConfig,
};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Legacy text-completions endpoint: a prompt in, ranked text candidates out.
#[derive(Clone)]
pub struct OpenAICompletionService {
    client: Client<OpenAIConfig>,
}

/// Gives up after the first attempt, so a rate-limited call fails instead of being resent.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

impl OpenAICompletionService {
    pub fn new(settings: &OpenAISettings, timeout: Duration) -> Result<Self> {
        let config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone())
            .with_api_base(settings.api_url.clone());
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let client = Client::with_config(config)
            .with_http_client(http_client)
            .with_backoff(single_attempt());

        Ok(Self { client })
    }
}

#[async_trait]
impl CompletionService for OpenAICompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        let body = CreateCompletionRequestArgs::default()
            .model(&request.model)
            .prompt(request.prompt.as_str())
            .max_tokens(request.max_tokens)
            .build()?;

        let response = self.client.completions().create(body).await?;

        let mut choices = response.choices;
        choices.sort_by_key(|choice| choice.index);
        Ok(choices.into_iter().map(|choice| choice.text).collect())
    }
}
