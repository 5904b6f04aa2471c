pub mod openai;

use async_trait::async_trait;
use futures::Stream;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;

use super::LlmConfig;
use crate::models::chat::ChatMessage;
use self::openai::OpenAIChatClient;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Ordered stream of completion fragments. Each `Ok` item is one text delta;
/// an `Err` item terminates the stream.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, BoxError>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a streaming completion for the given conversation. The message
    /// order is forwarded to the provider unchanged.
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<CompletionStream, BoxError>;

    fn get_model(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, BoxError> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
