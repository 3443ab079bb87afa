use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{
    ConversationResponse, DeleteReceipt, FileList, Gateway, Reply, SendChatRequest,
    SendChatResponse,
};
use crate::credentials::Authorization;
use crate::error::GatewayError;
use crate::files::SelectedFile;
use crate::state::display_text;

/// Characters escaped when a file name or conversation id becomes a path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteFileRequest<'a> {
    file_name: &'a str,
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("samurai/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, auth: &Authorization) -> RequestBuilder {
        tracing::debug!(%method, path, "dispatching request");
        let builder = self.client.request(method, self.url(path));
        match auth.header_value() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }
}

fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Data endpoints report errors as plain body text.
async fn data_failure<T>(response: Response) -> Reply<T> {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    Reply::Failure {
        status,
        message: non_empty(text),
    }
}

async fn decode_data<T: DeserializeOwned>(response: Response) -> Result<Reply<T>, GatewayError> {
    if !response.status().is_success() {
        return Ok(data_failure(response).await);
    }

    let status = response.status().as_u16();
    let bytes = response.bytes().await?;
    Ok(match serde_json::from_slice::<T>(&bytes) {
        Ok(body) => Reply::Success(body),
        Err(e) => {
            tracing::warn!(status, error = %e, "response body did not match the expected shape");
            Reply::Unparseable { status }
        }
    })
}

/// Chat endpoints only parse bodies that declare themselves JSON, and carry
/// errors in an `error` field.
async fn decode_chat<T: DeserializeOwned>(response: Response) -> Result<Reply<T>, GatewayError> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let body: Option<Value> = if is_json {
        response.json::<Value>().await.ok()
    } else {
        None
    };

    if status.is_success() {
        return Ok(match body.map(serde_json::from_value::<T>) {
            Some(Ok(parsed)) => Reply::Success(parsed),
            Some(Err(e)) => {
                tracing::warn!(status = status.as_u16(), error = %e, "chat response had an unexpected shape");
                Reply::Unparseable { status: status.as_u16() }
            }
            None => Reply::Unparseable { status: status.as_u16() },
        });
    }

    let message = body
        .as_ref()
        .and_then(|b| b.get("error"))
        .filter(|v| !v.is_null())
        .map(display_text)
        .and_then(non_empty);

    Ok(Reply::Failure {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_files(&self, auth: &Authorization) -> Result<Reply<FileList>, GatewayError> {
        let response = self
            .request(Method::GET, "/data/user-data-files-list", auth)
            .send()
            .await?;

        decode_data(response).await
    }

    async fn upload_file(
        &self,
        auth: &Authorization,
        file: &SelectedFile,
    ) -> Result<Reply<()>, GatewayError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        let response = self
            .request(Method::POST, "/data/receive-user-data", auth)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(data_failure(response).await);
        }

        // The body is not trusted for anything; the caller re-lists.
        Ok(Reply::Success(()))
    }

    async fn delete_file(
        &self,
        auth: &Authorization,
        name: &str,
    ) -> Result<Reply<DeleteReceipt>, GatewayError> {
        let path = format!("/data/user-data/{}", path_segment(name));
        let response = self
            .request(Method::DELETE, &path, auth)
            .json(&DeleteFileRequest { file_name: name })
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(data_failure(response).await);
        }

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = match serde_json::from_slice::<Value>(&bytes) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(status, error = %e, "delete response was not JSON");
                return Ok(Reply::Unparseable { status });
            }
        };

        let message = body
            .get("message")
            .filter(|v| !v.is_null())
            .map(display_text)
            .and_then(non_empty);

        Ok(Reply::Success(DeleteReceipt { message }))
    }

    async fn send_chat(
        &self,
        auth: &Authorization,
        request: &SendChatRequest,
    ) -> Result<Reply<SendChatResponse>, GatewayError> {
        let response = self
            .request(Method::POST, "/chat/langflow", auth)
            .json(request)
            .send()
            .await?;

        decode_chat(response).await
    }

    async fn fetch_conversation(
        &self,
        auth: &Authorization,
        conversation_id: &str,
    ) -> Result<Reply<ConversationResponse>, GatewayError> {
        let path = format!("/chat/conversation/{}", path_segment(conversation_id));
        let response = self
            .request(Method::GET, &path, auth)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        decode_chat(response).await
    }
}
