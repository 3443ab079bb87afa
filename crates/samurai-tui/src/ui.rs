use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use samurai_core::{AlertLevel, ChatRole, RenderedMessage};

use crate::app::{App, Field, InputMode, Screen};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Files => render_files_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Popups (in order of priority)
    if app.current_alert().is_some() {
        render_alert(app, frame, area);
    } else if app.show_token_input {
        render_token_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let tab = |label: &'static str, active: bool| {
        if active {
            Span::styled(format!(" {} ", label), Style::default().fg(Color::Black).bg(Color::Cyan))
        } else {
            Span::styled(format!(" {} ", label), Style::default().fg(Color::DarkGray))
        }
    };

    let token_style = if app.token_source.is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let title = Line::from(vec![
        Span::styled(" Samurai ", Style::default().fg(Color::Cyan).bold()),
        tab("Files", app.screen == Screen::Files),
        tab("Chat", app.screen == Screen::Chat),
        Span::raw("  "),
        Span::styled(app.token_status(), token_style),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn key_hint(key: &'static str, action: &'static str) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!(" {} ", key), Style::default().fg(Color::Black).bg(Color::DarkGray)),
        Span::styled(format!(" {}  ", action), Style::default().fg(Color::Gray)),
    ]
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints: Vec<(&str, &str)> = if app.current_alert().is_some() {
        vec![("Enter", "dismiss")]
    } else if app.show_token_input {
        vec![("Enter", "use"), ("^S", "use & save"), ("Esc", "cancel")]
    } else if app.input_mode == InputMode::Editing {
        match app.field {
            Field::UploadPath => vec![("Enter", "select file"), ("Esc", "done")],
            Field::ConversationId => vec![("Enter", "done"), ("Esc", "done")],
            Field::Draft => vec![("Enter", "send"), ("Esc", "done")],
        }
    } else {
        match app.screen {
            Screen::Files => vec![
                ("i", "path"),
                ("u", "upload"),
                ("x", "unselect"),
                ("d", "delete"),
                ("r", "refresh"),
                ("t", "token"),
                ("Tab", "chat"),
                ("q", "quit"),
            ],
            Screen::Chat => vec![
                ("i", "write"),
                ("c", "conv id"),
                ("r", "refresh"),
                ("n", "new"),
                ("j/k", "scroll"),
                ("t", "token"),
                ("Tab", "files"),
                ("q", "quit"),
            ],
        }
    };

    let spans: Vec<Span> = hints
        .into_iter()
        .flat_map(|(key, action)| key_hint(key, action))
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_files_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let state = app.client.files.snapshot();
    app.clamp_file_selection(state.files.len());

    let [list_area, upload_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);

    let title = format!(" Context files ({}) ", state.files.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    if state.files.is_empty() {
        let empty = Paragraph::new("No files uploaded yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, list_area);
    } else {
        let items: Vec<ListItem> = state.files.iter().map(|name| ListItem::new(name.as_str())).collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, list_area, &mut app.file_state);
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Upload CSV ");
    let inner = block.inner(upload_area);
    frame.render_widget(block, upload_area);

    let [path_label, path_input, _, selected_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new("Path:").style(Style::default().fg(Color::DarkGray)),
        path_label,
    );

    let editing = app.input_mode == InputMode::Editing && app.field == Field::UploadPath;
    let path_style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    frame.render_widget(Paragraph::new(app.upload_path.as_str()).style(path_style), path_input);
    if editing {
        let cursor_x = app.upload_path_cursor.min(path_input.width as usize) as u16;
        frame.set_cursor_position((path_input.x + cursor_x, path_input.y));
    }

    let selected = match &state.selected {
        Some(file) => Line::from(vec![
            Span::raw("Selected: "),
            Span::styled(file.name.clone(), Style::default().fg(Color::Cyan)),
            Span::styled(format!(" ({} bytes)", file.len()), Style::default().fg(Color::DarkGray)),
        ]),
        None => Line::styled("No file selected", Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(Paragraph::new(selected), selected_area);

    let status = if state.is_uploading {
        Line::styled(format!("Uploading{}", app.ellipsis()), Style::default().fg(Color::Yellow))
    } else {
        Line::raw(state.status.clone())
    };
    frame.render_widget(Paragraph::new(status).wrap(Wrap { trim: true }), status_area);
}

/// Approximate wrapped height of the rendered history
fn chat_line_count(messages: &[RenderedMessage], width: u16) -> u16 {
    let wrap_width = width.max(1) as usize;
    let mut total = 0usize;
    for message in messages {
        total += 1; // role line
        for line in message.content.lines() {
            total += line.chars().count() / wrap_width + 1;
        }
        total += 1; // blank line between messages
    }
    total.min(u16::MAX as usize) as u16
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let state = app.client.conversation.snapshot();
    let messages = app.client.conversation.rendered_messages();

    let [id_area, history_area, input_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Conversation id field
    let editing_id = app.input_mode == InputMode::Editing && app.field == Field::ConversationId;
    let id_block = Block::default()
        .borders(Borders::ALL)
        .border_style(if editing_id {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .title(" Conversation ID ");
    let id_text = if state.conversation_id.is_empty() && !editing_id {
        Span::styled("(new conversation)", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(state.conversation_id.clone())
    };
    let id_inner = id_block.inner(id_area);
    frame.render_widget(Paragraph::new(Line::from(id_text)).block(id_block), id_area);
    if editing_id {
        let cursor_x = app.id_cursor.min(id_inner.width as usize) as u16;
        frame.set_cursor_position((id_inner.x + cursor_x, id_inner.y));
    }

    // History
    let history_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Chat ({} messages) ", messages.len()));
    let inner = history_block.inner(history_area);

    let mut lines: Vec<Line> = Vec::new();
    for message in &messages {
        let (label, alignment, color) = match message.role {
            ChatRole::User => ("You", Alignment::Right, Color::Green),
            ChatRole::Assistant => ("Samurai", Alignment::Left, Color::Cyan),
        };
        lines.push(Line::styled(label, Style::default().fg(color).bold()).alignment(alignment));
        for line in message.content.lines() {
            lines.push(Line::raw(line.to_string()).alignment(alignment));
        }
        lines.push(Line::default());
    }

    let max_scroll = chat_line_count(&messages, inner.width).saturating_sub(inner.height);
    if app.follow_chat || app.chat_scroll > max_scroll {
        app.chat_scroll = max_scroll;
    }

    let history = Paragraph::new(Text::from(lines))
        .block(history_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(history, history_area);

    // Draft input
    let editing_draft = app.input_mode == InputMode::Editing && app.field == Field::Draft;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(if editing_draft {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .title(" Message ");
    let input_inner = input_block.inner(input_area);
    frame.render_widget(Paragraph::new(state.draft.clone()).block(input_block), input_area);
    if editing_draft {
        let cursor_x = app.draft_cursor.min(input_inner.width as usize) as u16;
        frame.set_cursor_position((input_inner.x + cursor_x, input_inner.y));
    }

    let status = if state.is_sending() {
        Line::styled(format!("Sending{}", app.ellipsis()), Style::default().fg(Color::Yellow))
    } else if state.is_refreshing() {
        Line::styled(format!("Refreshing{}", app.ellipsis()), Style::default().fg(Color::Yellow))
    } else {
        Line::styled(state.status.clone(), Style::default().fg(Color::Red))
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(2));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn render_alert(app: &App, frame: &mut Frame, area: Rect) {
    let Some(alert) = app.current_alert() else {
        return;
    };

    let (title, color) = match alert.level {
        AlertLevel::Info => (" Notice ", Color::Cyan),
        AlertLevel::Error => (" Error ", Color::Red),
    };

    let popup_area = centered(area, 50, 7);
    frame.render_widget(Clear, popup_area);

    let more = app.pending_alerts.len().saturating_sub(1);
    let mut text = vec![Line::raw(alert.message.clone()), Line::default()];
    if more > 0 {
        text.push(Line::styled(format!("({} more)", more), Style::default().fg(Color::DarkGray)));
    }

    let popup = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title),
        );
    frame.render_widget(popup, popup_area);
}

fn render_token_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 60, 7);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Sign in with token ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Paste your token. Empty signs out.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    frame.render_widget(
        Paragraph::new(mask_secret(&app.token_input)).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let cursor_x = app.token_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let char_count = format!("{} characters", app.token_input.chars().count());
    let status = Paragraph::new(char_count).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

/// Mask everything but the last four characters
fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }

    let masked_len = len - 4;
    let last_four: String = secret.chars().skip(masked_len).collect();
    format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
}
