//! Backend service boundary
//!
//! Every call returns a [`Reply`] that has already been decoded from the HTTP
//! response, so controllers never look at status lines, headers or raw bodies.

pub mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::credentials::Authorization;
use crate::error::{ClientError, ClientResult, GatewayError};
use crate::files::SelectedFile;
use crate::state::ChatMessage;

/// Decoded outcome of a request that reached the server
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// 2xx with a body of the expected shape
    Success(T),
    /// Non-2xx; `message` is whatever the body had to say
    Failure { status: u16, message: Option<String> },
    /// 2xx but no usable body
    Unparseable { status: u16 },
}

impl<T> Reply<T> {
    /// Turns a decoded reply into a controller result, synthesizing a message
    /// from the status code when the server didn't send one.
    pub fn into_result(self, fallback: impl FnOnce(u16) -> String) -> ClientResult<T> {
        match self {
            Reply::Success(body) => Ok(body),
            Reply::Failure { status, message } => Err(ClientError::Status {
                status,
                message: message.unwrap_or_else(|| fallback(status)),
            }),
            Reply::Unparseable { status } => Err(ClientError::Unparseable { status }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReceipt {
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatRequest {
    pub user_message: String,
    pub conversation_id: Option<String>,
    pub message_history_array: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatResponse {
    pub message_history_array: Vec<ChatMessage>,
    pub conversation_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub message_history_array: Vec<ChatMessage>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_files(&self, auth: &Authorization) -> Result<Reply<FileList>, GatewayError>;

    async fn upload_file(
        &self,
        auth: &Authorization,
        file: &SelectedFile,
    ) -> Result<Reply<()>, GatewayError>;

    async fn delete_file(
        &self,
        auth: &Authorization,
        name: &str,
    ) -> Result<Reply<DeleteReceipt>, GatewayError>;

    async fn send_chat(
        &self,
        auth: &Authorization,
        request: &SendChatRequest,
    ) -> Result<Reply<SendChatResponse>, GatewayError>;

    async fn fetch_conversation(
        &self,
        auth: &Authorization,
        conversation_id: &str,
    ) -> Result<Reply<ConversationResponse>, GatewayError>;
}
