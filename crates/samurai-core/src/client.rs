use std::sync::Arc;

use crate::config::ClientSettings;
use crate::context::ClientContext;
use crate::conversation::ConversationController;
use crate::credentials::SessionCredentials;
use crate::error::GatewayError;
use crate::files::FileRegistryController;
use crate::gateway::HttpGateway;
use crate::notify::Alerts;

/// Both controllers wired to one HTTP gateway and one credential store
#[derive(Clone)]
pub struct SamuraiClient {
    pub files: Arc<FileRegistryController>,
    pub conversation: Arc<ConversationController>,
    pub credentials: Arc<SessionCredentials>,
}

impl SamuraiClient {
    pub fn connect(
        settings: &ClientSettings,
        credentials: Arc<SessionCredentials>,
        alerts: Alerts,
    ) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(&settings.base_url, settings.timeout)?;
        tracing::info!(
            base_url = gateway.base_url(),
            auth_policy = settings.auth_policy.as_str(),
            "client configured"
        );

        let ctx = ClientContext::new(
            Arc::new(gateway),
            credentials.clone(),
            settings.auth_policy,
            alerts,
        );

        Ok(Self {
            files: Arc::new(FileRegistryController::new(ctx.clone())),
            conversation: Arc::new(ConversationController::new(ctx)),
            credentials,
        })
    }
}
