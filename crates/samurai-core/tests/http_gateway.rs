use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use samurai_core::credentials::{Authorization, Credential};
use samurai_core::gateway::{
    ConversationResponse, DeleteReceipt, FileList, Gateway, HttpGateway, Reply, SendChatRequest,
};
use samurai_core::{
    AuthPolicy, ChatMessage, ClientContext, ClientError, ConversationController,
    FileRegistryController, SelectedFile, SessionCredentials,
};
use samurai_core::{Alerts, Applied};

fn gateway(server: &MockServer) -> HttpGateway {
    HttpGateway::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn signed_in() -> Authorization {
    Authorization::bearer(&Credential::new("tok-123"))
}

fn context(server: &MockServer, creds: SessionCredentials, policy: AuthPolicy) -> ClientContext {
    ClientContext::new(
        Arc::new(gateway(server)),
        Arc::new(creds),
        policy,
        Alerts::silent(),
    )
}

#[tokio::test]
async fn test_list_files_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/user-data-files-list"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": ["a.csv", "b.csv"] })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = gateway(&server).list_files(&signed_in()).await.unwrap();
    assert_eq!(
        reply,
        Reply::Success(FileList {
            files: vec!["a.csv".to_string(), "b.csv".to_string()]
        })
    );
}

#[tokio::test]
async fn test_list_files_failure_uses_body_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/user-data-files-list"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let reply = gateway(&server).list_files(&signed_in()).await.unwrap();
    assert_eq!(
        reply,
        Reply::Failure {
            status: 401,
            message: Some("Unauthorized".to_string())
        }
    );
}

#[tokio::test]
async fn test_list_files_missing_array_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/user-data-files-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let reply = gateway(&server).list_files(&signed_in()).await.unwrap();
    assert_eq!(reply, Reply::Success(FileList::default()));
}

#[tokio::test]
async fn test_list_files_null_array_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/user-data-files-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": null })))
        .mount(&server)
        .await;

    let reply = gateway(&server).list_files(&signed_in()).await.unwrap();
    assert_eq!(reply, Reply::Success(FileList::default()));
}

#[tokio::test]
async fn test_anonymous_request_has_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/user-data-files-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .mount(&server)
        .await;

    gateway(&server)
        .list_files(&Authorization::anonymous())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_upload_posts_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/data/receive-user-data"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"sales.csv\""))
        .and(body_string_contains("id,total"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let file = SelectedFile::new("sales.csv", b"id,total\n1,20\n".to_vec());
    let reply = gateway(&server).upload_file(&signed_in(), &file).await.unwrap();
    assert_eq!(reply, Reply::Success(()));
}

#[tokio::test]
async fn test_delete_escapes_name_and_sends_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/data/user-data/sales%202024.csv"))
        .and(body_json(json!({ "fileName": "sales 2024.csv" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Removed." })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = gateway(&server)
        .delete_file(&signed_in(), "sales 2024.csv")
        .await
        .unwrap();
    assert_eq!(
        reply,
        Reply::Success(DeleteReceipt {
            message: Some("Removed.".to_string())
        })
    );
}

#[tokio::test]
async fn test_delete_without_json_body_is_unparseable() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/data/user-data/a.csv"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/data/user-data/b.csv"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>proxy page</html>", "text/html"),
        )
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let empty = gateway.delete_file(&signed_in(), "a.csv").await.unwrap();
    assert_eq!(empty, Reply::Unparseable { status: 204 });

    let html = gateway.delete_file(&signed_in(), "b.csv").await.unwrap();
    assert_eq!(html, Reply::Unparseable { status: 200 });
}

#[tokio::test]
async fn test_delete_json_without_message_has_no_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/data/user-data/a.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let reply = gateway(&server).delete_file(&signed_in(), "a.csv").await.unwrap();
    assert_eq!(reply, Reply::Success(DeleteReceipt { message: None }));
}

#[tokio::test]
async fn test_delete_with_html_body_keeps_registry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/user-data-files-list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "files": ["a.csv", "b.csv"] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/data/user-data/a.csv"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>proxy page</html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let files = FileRegistryController::new(context(
        &server,
        SessionCredentials::with_token("tok-123"),
        AuthPolicy::ServerSide,
    ));
    files.refresh_file_list().await.unwrap();

    let err = files.delete_file("a.csv").await.unwrap_err();
    assert!(matches!(err, ClientError::Unparseable { status: 200 }));
    assert_eq!(files.files(), vec!["a.csv".to_string(), "b.csv".to_string()]);
    assert_eq!(files.status(), "Delete failed.");
}

#[tokio::test]
async fn test_send_chat_posts_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/langflow"))
        .and(body_json(json!({
            "userMessage": "hi",
            "conversationId": null,
            "messageHistoryArray": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messageHistoryArray": [
                { "role": "user", "content": "hi" },
                { "id": 7, "role": "assistant", "content": "hello", "model": "x" }
            ],
            "conversationId": "c-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = SendChatRequest {
        user_message: "hi".to_string(),
        conversation_id: None,
        message_history_array: vec![],
    };
    let reply = gateway(&server).send_chat(&signed_in(), &request).await.unwrap();

    let Reply::Success(body) = reply else {
        panic!("expected success, got {:?}", reply);
    };
    assert_eq!(body.conversation_id, "c-1");
    assert_eq!(body.message_history_array.len(), 2);
    assert_eq!(body.message_history_array[1].id, Some(7));
    assert_eq!(body.message_history_array[1].extra.get("model"), Some(&json!("x")));
}

#[tokio::test]
async fn test_chat_failure_reads_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/langflow"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({ "error": "Flow timed out" })))
        .mount(&server)
        .await;

    let request = SendChatRequest {
        user_message: "hi".to_string(),
        conversation_id: Some("c-1".to_string()),
        message_history_array: vec![],
    };
    let reply = gateway(&server).send_chat(&signed_in(), &request).await.unwrap();
    assert_eq!(
        reply,
        Reply::Failure {
            status: 502,
            message: Some("Flow timed out".to_string())
        }
    );
}

#[tokio::test]
async fn test_chat_success_without_json_is_unparseable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat/conversation/c-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let reply = gateway(&server)
        .fetch_conversation(&signed_in(), "c-1")
        .await
        .unwrap();
    assert_eq!(reply, Reply::Unparseable { status: 200 });
}

#[tokio::test]
async fn test_fetch_conversation_decodes_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chat/conversation/c%2F9"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messageHistoryArray": [{ "role": "assistant", "content": { "rows": 3 } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = gateway(&server)
        .fetch_conversation(&signed_in(), "c/9")
        .await
        .unwrap();
    let Reply::Success(ConversationResponse { message_history_array }) = reply else {
        panic!("expected success, got {:?}", reply);
    };
    assert_eq!(message_history_array[0].display_content(), r#"{"rows":3}"#);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let gateway = HttpGateway::new(&uri, Duration::from_secs(2)).unwrap();
    assert!(gateway.list_files(&signed_in()).await.is_err());
}

#[tokio::test]
async fn test_upload_then_relist_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/data/receive-user-data"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/user-data-files-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": ["new.csv"] })))
        .expect(1)
        .mount(&server)
        .await;

    let files = FileRegistryController::new(context(
        &server,
        SessionCredentials::with_token("tok-123"),
        AuthPolicy::ServerSide,
    ));
    files.select_file(SelectedFile::new("new.csv", b"a\n1\n".to_vec()));
    files.upload_file().await.unwrap();

    assert_eq!(files.files(), vec!["new.csv".to_string()]);
    assert_eq!(files.status(), "Upload successful.");
    assert!(files.selected_file().is_none());
}

#[tokio::test]
async fn test_preflight_policy_blocks_without_token() {
    let server = MockServer::start().await;

    let conversation = ConversationController::new(context(
        &server,
        SessionCredentials::new(),
        AuthPolicy::Preflight,
    ));
    let err = conversation.send_message("hello").await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthenticated));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(conversation.history().is_empty());
}

#[tokio::test]
async fn test_send_then_refresh_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/langflow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messageHistoryArray": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ],
            "conversationId": "c-42"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chat/conversation/c-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messageHistoryArray": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" },
                { "role": "assistant", "content": "anything else?" }
            ]
        })))
        .mount(&server)
        .await;

    let conversation = ConversationController::new(context(
        &server,
        SessionCredentials::with_token("tok-123"),
        AuthPolicy::ServerSide,
    ));
    assert_eq!(conversation.send_message("hi").await.unwrap(), Applied::Yes);
    assert_eq!(conversation.conversation_id(), "c-42");

    assert_eq!(conversation.refresh_conversation().await.unwrap(), Applied::Yes);
    let history = conversation.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2], ChatMessage::assistant("anything else?"));
}
