//! Gateway whose replies are released by the test, for interleaving checks

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

use crate::credentials::Authorization;
use crate::error::GatewayError;
use crate::files::SelectedFile;
use crate::gateway::{
    ConversationResponse, DeleteReceipt, FileList, Gateway, Reply, SendChatRequest,
    SendChatResponse,
};

type Pending<T> = Mutex<VecDeque<oneshot::Receiver<Reply<T>>>>;

#[derive(Default)]
pub struct ScriptedGateway {
    lists: Pending<FileList>,
    uploads: Pending<()>,
    deletes: Pending<DeleteReceipt>,
    sends: Pending<SendChatResponse>,
    fetches: Pending<ConversationResponse>,
}

fn script<T>(queue: &Pending<T>) -> oneshot::Sender<Reply<T>> {
    let (tx, rx) = oneshot::channel();
    queue.lock().unwrap().push_back(rx);
    tx
}

async fn wait<T>(queue: &Pending<T>) -> Result<Reply<T>, GatewayError> {
    let next = queue.lock().unwrap().pop_front();
    match next {
        Some(rx) => rx
            .await
            .map_err(|_| GatewayError::Transport("script dropped".to_string())),
        None => Err(GatewayError::Transport("unscripted call".to_string())),
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_list(&self) -> oneshot::Sender<Reply<FileList>> {
        script(&self.lists)
    }

    pub fn script_upload(&self) -> oneshot::Sender<Reply<()>> {
        script(&self.uploads)
    }

    pub fn script_delete(&self) -> oneshot::Sender<Reply<DeleteReceipt>> {
        script(&self.deletes)
    }

    pub fn script_send(&self) -> oneshot::Sender<Reply<SendChatResponse>> {
        script(&self.sends)
    }

    pub fn script_fetch(&self) -> oneshot::Sender<Reply<ConversationResponse>> {
        script(&self.fetches)
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn list_files(&self, _auth: &Authorization) -> Result<Reply<FileList>, GatewayError> {
        wait(&self.lists).await
    }

    async fn upload_file(
        &self,
        _auth: &Authorization,
        _file: &SelectedFile,
    ) -> Result<Reply<()>, GatewayError> {
        wait(&self.uploads).await
    }

    async fn delete_file(
        &self,
        _auth: &Authorization,
        _name: &str,
    ) -> Result<Reply<DeleteReceipt>, GatewayError> {
        wait(&self.deletes).await
    }

    async fn send_chat(
        &self,
        _auth: &Authorization,
        _request: &SendChatRequest,
    ) -> Result<Reply<SendChatResponse>, GatewayError> {
        wait(&self.sends).await
    }

    async fn fetch_conversation(
        &self,
        _auth: &Authorization,
        _conversation_id: &str,
    ) -> Result<Reply<ConversationResponse>, GatewayError> {
        wait(&self.fetches).await
    }
}
