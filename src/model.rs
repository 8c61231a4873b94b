#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Text-completion capability used by the grader, and its OpenAI-compatible
//! implementation.

use std::future::Future;

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};

use crate::{config::OpenAiEnv, constants::GRADING_TEMPERATURE};

/// Sampling parameters sent with every completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    /// Model identifier
    pub model:       String,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionParams {
    /// Zero-temperature parameters for `model`.
    pub fn deterministic(model: impl Into<String>) -> Self {
        Self {
            model:       model.into(),
            temperature: GRADING_TEMPERATURE,
        }
    }
}

/// Errors raised while talking to the model service. Malformed replies are
/// not errors; they come back as text.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// The request could not be built or the service rejected it.
    #[error("Completion request to model `{model}` failed")]
    Request {
        /// Model identifier
        model:  String,
        /// Error reported by the OpenAI client
        #[source]
        source: OpenAIError,
    },
    /// Any other failure, e.g. from a custom service implementation.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A stateless prompt-in, text-out completion service.
///
/// One call is one attempt; implementations do not retry.
pub trait ModelService {
    /// Sends `prompt` with `params` and returns the raw reply text.
    fn complete(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// `ModelService` backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiModel {
    /// Configured API client
    client: OpenAIClient<OpenAIConfig>,
}

impl OpenAiModel {
    /// Creates a client for the endpoint and key in `env`.
    pub fn new(env: &OpenAiEnv) -> Self {
        let client = OpenAIClient::with_config(
            OpenAIConfig::new()
                .with_api_base(env.api_base())
                .with_api_key(env.api_key()),
        );
        Self { client }
    }
}

impl ModelService for OpenAiModel {
    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<String, ModelError> {
        let request_failed = |source: OpenAIError| ModelError::Request {
            model: params.model.clone(),
            source,
        };

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(request_failed)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&params.model)
            .temperature(params.temperature)
            .messages(messages)
            .build()
            .map_err(request_failed)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(request_failed)?;

        match response.choices.first().and_then(|c| c.message.content.clone()) {
            Some(content) => Ok(content),
            None => {
                tracing::warn!("Model `{}` returned no message content", params.model);
                Ok(String::new())
            }
        }
    }
}
