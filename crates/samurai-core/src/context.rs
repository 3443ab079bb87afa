use std::sync::Arc;

use crate::credentials::{authorize, AuthPolicy, Authorization, CredentialProvider};
use crate::error::{ClientError, ClientResult};
use crate::gateway::Gateway;
use crate::notify::Alerts;

/// Everything a controller needs from the outside world.
///
/// Both controllers get their own clone; they share the gateway and the
/// credential provider but never each other's state.
#[derive(Clone)]
pub struct ClientContext {
    pub gateway: Arc<dyn Gateway>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub auth_policy: AuthPolicy,
    pub alerts: Alerts,
}

impl ClientContext {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        credentials: Arc<dyn CredentialProvider>,
        auth_policy: AuthPolicy,
        alerts: Alerts,
    ) -> Self {
        Self {
            gateway,
            credentials,
            auth_policy,
            alerts,
        }
    }

    /// Reads the current credential for one request.
    pub fn authorize(&self) -> ClientResult<Authorization> {
        authorize(self.credentials.as_ref(), self.auth_policy).ok_or(ClientError::Unauthenticated)
    }
}

/// Whether a response was allowed to update state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Yes,
    /// A newer request already updated this state
    Stale,
}
