use std::future::Future;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use samurai_core::{ClientResult, Config, SelectedFile};

use crate::app::{expand_home, App, Field, InputMode, PendingUpload, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply a line-editing key to `text`. Returns false for keys it doesn't handle.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

/// Run a controller operation in the background. Failures have already been
/// surfaced through status or alerts by the controller.
fn spawn_op<T, F>(label: &'static str, op: F)
where
    T: Send + 'static,
    F: Future<Output = ClientResult<T>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = op.await {
            tracing::debug!(op = label, error = %e, "operation finished with error");
        }
    });
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
            finish_upload(app).await;
        }
        AppEvent::Alert(alert) => app.push_alert(alert),
    }
    Ok(())
}

/// Load the registry for the first time
pub fn mount(app: &App) {
    let files = app.client.files.clone();
    spawn_op("mount", async move { files.mount().await });
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Alerts block everything else until dismissed
    if app.current_alert().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_alert();
        }
        return Ok(());
    }

    if app.show_token_input {
        handle_token_input(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Tab => app.toggle_screen(),
        KeyCode::Char('t') => app.open_token_input(),
        _ => match app.screen {
            Screen::Files => handle_files_normal(app, key),
            Screen::Chat => handle_chat_normal(app, key),
        },
    }
}

fn handle_files_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.file_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.file_nav_up(),
        KeyCode::Char('i') | KeyCode::Char('/') => app.start_editing(Field::UploadPath),
        KeyCode::Char('u') => upload(app),
        KeyCode::Char('x') => app.client.files.clear_selection(),
        KeyCode::Char('r') => {
            let files = app.client.files.clone();
            spawn_op("refresh_file_list", async move { files.refresh_file_list().await });
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(name) = app.selected_file_name() {
                let files = app.client.files.clone();
                spawn_op("delete_file", async move { files.delete_file(&name).await });
            }
        }
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => app.start_editing(Field::Draft),
        KeyCode::Char('c') => app.start_editing(Field::ConversationId),
        KeyCode::Char('r') => {
            let conversation = app.client.conversation.clone();
            app.scroll_chat_to_bottom();
            spawn_op("refresh_conversation", async move {
                conversation.refresh_conversation().await
            });
        }
        KeyCode::Char('n') => {
            app.client.conversation.reset();
            app.draft_cursor = 0;
            app.id_cursor = 0;
            app.chat_scroll = 0;
            app.scroll_chat_to_bottom();
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }

    match app.field {
        Field::UploadPath => {
            if key.code == KeyCode::Enter {
                app.input_mode = InputMode::Normal;
                select_from_path(app);
            } else {
                edit_line(&mut app.upload_path, &mut app.upload_path_cursor, key);
            }
        }
        Field::ConversationId => {
            if key.code == KeyCode::Enter {
                app.input_mode = InputMode::Normal;
            } else {
                let conversation = &app.client.conversation;
                let mut id = conversation.conversation_id();
                if edit_line(&mut id, &mut app.id_cursor, key) {
                    conversation.set_conversation_id(id);
                }
            }
        }
        Field::Draft => {
            if key.code == KeyCode::Enter {
                send_draft(app);
            } else {
                let conversation = &app.client.conversation;
                let mut draft = conversation.draft();
                if edit_line(&mut draft, &mut app.draft_cursor, key) {
                    conversation.set_draft(draft);
                }
            }
        }
    }
}

fn send_draft(app: &mut App) {
    let conversation = app.client.conversation.clone();
    if conversation.draft().trim().is_empty() {
        return;
    }

    app.scroll_chat_to_bottom();
    spawn_op("send_message", async move { conversation.send_draft().await });
}

/// Read the file at the typed path and make it the upload selection.
fn select_from_path(app: &mut App) {
    let raw = app.upload_path.trim().to_string();
    if raw.is_empty() {
        return;
    }

    let path = expand_home(&raw);
    let files = app.client.files.clone();
    let alerts = app.alerts.clone();
    tokio::spawn(async move {
        match SelectedFile::from_path(&path).await {
            Ok(file) => {
                tracing::info!(name = %file.name, len = file.len(), "file selected");
                files.select_file(file);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read file");
                alerts.error(format!("Could not read {}: {}", raw, e));
            }
        }
    });
}

fn upload(app: &mut App) {
    let files = app.client.files.clone();
    app.upload_task = Some(PendingUpload {
        path: app.upload_path.clone(),
        task: tokio::spawn(async move { files.upload_file().await }),
    });
}

/// Clear the path field once the upload started from it has gone through.
async fn finish_upload(app: &mut App) {
    if !app.upload_task.as_ref().is_some_and(|p| p.task.is_finished()) {
        return;
    }
    let Some(pending) = app.upload_task.take() else {
        return;
    };

    match pending.task.await {
        Ok(Ok(())) => {
            // Leave it alone if the user has typed another path since
            if app.upload_path == pending.path {
                app.upload_path.clear();
                app.upload_path_cursor = 0;
            }
        }
        Ok(Err(e)) => tracing::debug!(op = "upload_file", error = %e, "operation finished with error"),
        Err(e) => tracing::warn!(error = %e, "upload task failed"),
    }
}

fn handle_token_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_token_input(),
        // Ctrl+S also writes the token to the config file
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(token) = app.apply_token_input() {
                match Config::save_token(&token) {
                    Ok(()) => app.token_source = Some("config"),
                    Err(e) => {
                        tracing::warn!(error = %e, "could not save token");
                        app.alerts.error(format!("Could not save token: {}", e));
                    }
                }
            }
        }
        KeyCode::Enter => {
            app.apply_token_input();
        }
        _ => {
            edit_line(&mut app.token_input, &mut app.token_input_cursor, key);
        }
    }
}
