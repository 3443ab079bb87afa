use std::collections::VecDeque;
use std::path::PathBuf;

use ratatui::widgets::ListState;
use samurai_core::{Alert, Alerts, ClientResult, SamuraiClient};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Files,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which text field keystrokes go to while editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    UploadPath,
    ConversationId,
    Draft,
}

/// Upload started from the files screen, with the path it was started from
pub struct PendingUpload {
    pub path: String,
    pub task: JoinHandle<ClientResult<()>>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub field: Field,

    pub client: SamuraiClient,
    /// Sender side used for errors raised by the UI itself
    pub alerts: Alerts,
    pub pending_alerts: VecDeque<Alert>,

    // Files screen
    pub file_state: ListState,
    pub upload_path: String,
    pub upload_path_cursor: usize,
    pub upload_task: Option<PendingUpload>,

    // Chat screen
    pub id_cursor: usize,
    pub draft_cursor: usize,
    pub chat_scroll: u16,
    pub follow_chat: bool,

    // Token input popup
    pub show_token_input: bool,
    pub token_input: String,
    pub token_input_cursor: usize,
    pub token_source: Option<&'static str>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(client: SamuraiClient, alerts: Alerts, token_source: Option<&'static str>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Files,
            input_mode: InputMode::Normal,
            field: Field::UploadPath,

            client,
            alerts,
            pending_alerts: VecDeque::new(),

            file_state: ListState::default(),
            upload_path: String::new(),
            upload_path_cursor: 0,
            upload_task: None,

            id_cursor: 0,
            draft_cursor: 0,
            chat_scroll: 0,
            follow_chat: true,

            show_token_input: false,
            token_input: String::new(),
            token_input_cursor: 0,
            token_source,

            animation_frame: 0,
        }
    }

    pub fn toggle_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Files => Screen::Chat,
            Screen::Chat => Screen::Files,
        };
        self.input_mode = InputMode::Normal;
    }

    pub fn start_editing(&mut self, field: Field) {
        self.field = field;
        self.input_mode = InputMode::Editing;
        // Cursor goes to the end of whatever is already there
        match field {
            Field::UploadPath => self.upload_path_cursor = self.upload_path.chars().count(),
            Field::ConversationId => {
                self.id_cursor = self.client.conversation.conversation_id().chars().count()
            }
            Field::Draft => self.draft_cursor = self.client.conversation.draft().chars().count(),
        }
    }

    pub fn is_busy(&self) -> bool {
        let conversation = self.client.conversation.snapshot();
        self.client.files.is_uploading() || conversation.is_sending() || conversation.is_refreshing()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn ellipsis(&self) -> &'static str {
        match self.animation_frame {
            0 => ".",
            1 => "..",
            _ => "...",
        }
    }

    // File list navigation
    pub fn selected_file_name(&self) -> Option<String> {
        let files = self.client.files.files();
        self.file_state.selected().and_then(|i| files.get(i).cloned())
    }

    pub fn file_nav_down(&mut self) {
        let len = self.client.files.files().len();
        if len > 0 {
            let i = self.file_state.selected().unwrap_or(0);
            self.file_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn file_nav_up(&mut self) {
        let i = self.file_state.selected().unwrap_or(0);
        self.file_state.select(Some(i.saturating_sub(1)));
    }

    /// Keep the list selection inside the registry after it changes underneath us
    pub fn clamp_file_selection(&mut self, len: usize) {
        match (self.file_state.selected(), len) {
            (_, 0) => self.file_state.select(None),
            (None, _) => self.file_state.select(Some(0)),
            (Some(i), len) if i >= len => self.file_state.select(Some(len - 1)),
            _ => {}
        }
    }

    // Chat scrolling
    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_chat_up(&mut self) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        self.follow_chat = true;
    }

    // Alerts
    pub fn push_alert(&mut self, alert: Alert) {
        self.pending_alerts.push_back(alert);
    }

    pub fn current_alert(&self) -> Option<&Alert> {
        self.pending_alerts.front()
    }

    pub fn dismiss_alert(&mut self) {
        self.pending_alerts.pop_front();
    }

    // Token popup
    pub fn open_token_input(&mut self) {
        self.show_token_input = true;
        self.token_input.clear();
        self.token_input_cursor = 0;
    }

    pub fn close_token_input(&mut self) {
        self.show_token_input = false;
        self.token_input.clear();
        self.token_input_cursor = 0;
    }

    /// Puts the typed token into the session; returns it when non-blank.
    pub fn apply_token_input(&mut self) -> Option<String> {
        let token = self.token_input.trim().to_string();
        self.close_token_input();

        if token.is_empty() {
            self.client.credentials.clear();
            self.token_source = None;
            return None;
        }

        self.client.credentials.set_token(token.clone());
        self.token_source = Some("session");
        Some(token)
    }

    pub fn token_status(&self) -> &'static str {
        match self.token_source {
            Some("env") => "token (env var)",
            Some("config") => "token (configured)",
            Some(_) => "token (session)",
            None => "no token",
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

/// App wired to an address nothing listens on
#[cfg(test)]
pub(crate) fn test_app() -> App {
    use samurai_core::{AuthPolicy, ClientSettings, SessionCredentials};
    use std::sync::Arc;
    use std::time::Duration;

    let settings = ClientSettings {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout: Duration::from_secs(1),
        auth_policy: AuthPolicy::ServerSide,
    };
    let client =
        SamuraiClient::connect(&settings, Arc::new(SessionCredentials::new()), Alerts::silent())
            .unwrap();
    App::new(client, Alerts::silent(), None)
}
