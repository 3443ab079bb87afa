use thiserror::Error;

/// A request that never produced an HTTP response
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Could not build request: {0}")]
    Request(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            GatewayError::Request(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Input rejected before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("Please select a file to upload.")]
    NoFileSelected,

    #[error("Only .csv files are allowed.")]
    NotCsv { name: String },

    #[error("Message is empty.")]
    EmptyMessage,

    #[error("Please enter a conversation ID first.")]
    MissingConversationId,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("Not signed in or session expired.")]
    Unauthenticated,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Response with status {status} had no readable body")]
    Unparseable { status: u16 },
}

impl ClientError {
    /// Text for the inline status line. Failures without a server-provided
    /// message fall back to the operation's generic text.
    pub fn status_text(&self, fallback: &str) -> String {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            ClientError::Precondition(_) | ClientError::Unauthenticated => self.to_string(),
            ClientError::Gateway(_) | ClientError::Unparseable { .. } => fallback.to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
