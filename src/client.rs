use crate::labeler::{ImageLabeler, LabelError};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),
    #[error("No response content from model")]
    NoContent,
    #[error("Max retries exceeded after {0} attempts")]
    MaxRetries(usize),
}

const INTERPRET_SYSTEM_PROMPT: &str = r#"You are a file management command interpreter. Translate the user's request into exactly one command from this fixed vocabulary, nothing else:

[LIST FILES] <directory>
[MOVE FILE] <source file> <destination directory>
[ORGANIZE FILES] <directory>
[CATEGORIZE FILES] <directory>
[CATEGORIZE BY NAME CONTEXT] <directory>
[CATEGORIZE BY CONTENT CONTEXT] <directory>
[CATEGORIZE IMAGES BY CONTEXT] <directory>
[ORGANIZE IMAGES BY CONTEXT] <directory>
[CATEGORIZE FOLDERS BY PATTERN] <directory> <pattern>
[ORGANIZE FOLDERS BY PATTERN] <directory> <pattern>
[CATEGORIZE FOLDERS BY SIZE] <directory>
[ORGANIZE FOLDERS BY SIZE] <directory> [small threshold] [large threshold]
[COUNT PREVIOUS FILES]

Rules:
- Respond with the bracket tag first, then the arguments, on a single line
- Use the exact bracket text shown above, uppercase
- Directory nicknames like "downloads" or "desktop" may be passed through as-is
- If the request maps to no command, reply with a short plain-text sentence instead"#;

const LABEL_SYSTEM_PROMPT: &str = "You label photographs. Reply with one or two lowercase words describing the main subject of the image. No punctuation, no sentences.";

/// Wrapper around async-openai with custom base URL support and retry.
/// One instance serves both duties of the model layer: interpreting free
/// text into a bracket command, and labeling images for categorization.
#[derive(Clone)]
pub struct ModelClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_retries: usize,
}

impl ModelClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, max_retries: usize) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            max_retries,
        }
    }

    async fn send(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<String, ClientError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(ClientError::NoContent)
    }

    /// Send with automatic retry and exponential backoff (1s, 2s, 4s, ...).
    async fn send_with_retry(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<String, ClientError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.send(messages.clone()).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!("Succeeded on attempt {}", attempt);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!("Attempt {}/{} failed: {}", attempt, self.max_retries, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(1 << (attempt - 1));
                        debug!("Retrying in {:?}...", delay);
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ClientError::MaxRetries(self.max_retries)))
    }

    /// Translate free user text into one bracket-command line.
    pub async fn interpret(&self, user_text: &str) -> Result<String, ClientError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(INTERPRET_SYSTEM_PROMPT)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text)
                .build()?
                .into(),
        ];

        self.send_with_retry(messages).await
    }

    async fn label_request(&self, data_url: String) -> Result<String, ClientError> {
        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(data_url)
                    .detail(ImageDetail::Low)
                    .build()?,
            )
            .build()?;
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text("Label this image.")
            .build()?;

        let parts: Vec<ChatCompletionRequestUserMessageContentPart> =
            vec![text_part.into(), image_part.into()];
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(LABEL_SYSTEM_PROMPT)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(parts)
                .build()?
                .into(),
        ];

        self.send_with_retry(messages).await
    }
}

#[async_trait]
impl ImageLabeler for ModelClient {
    async fn label_image(&mut self, path: &Path) -> Result<String, LabelError> {
        let bytes = tokio::fs::read(path).await?;
        let data_url = format!("data:{};base64,{}", mime_for(path), BASE64.encode(bytes));
        self.label_request(data_url)
            .await
            .map(|label| label.trim().to_string())
            .map_err(|e| LabelError::Model(e.to_string()))
    }

    // The HTTP API is stateless per request, so the default no-op `reset`
    // stands. Local inference backends with KV caches must override it.
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}
