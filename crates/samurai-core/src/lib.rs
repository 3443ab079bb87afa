pub mod client;
pub mod config;
pub mod context;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod files;
pub mod gateway;
pub mod notify;
pub mod sequence;
pub mod state;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use client::SamuraiClient;
pub use config::{ClientSettings, Config};
pub use context::{Applied, ClientContext};
pub use conversation::{ConversationController, ConversationState};
pub use credentials::{AuthPolicy, Credential, CredentialProvider, SessionCredentials};
pub use error::{ClientError, ClientResult, GatewayError, PreconditionError};
pub use files::{FileRegistryController, FileRegistryState, SelectedFile};
pub use gateway::{Gateway, HttpGateway, Reply};
pub use notify::{Alert, AlertLevel, Alerts};
pub use state::{ChatMessage, ChatRole, MessageKey, RenderedMessage};
