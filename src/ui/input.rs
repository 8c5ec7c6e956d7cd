//! Input handling for the TUI.
//!
//! Routes key presses by input mode: commands in normal mode, line editing
//! for the active panel's input, and the API key prompt.

use crate::app::{App, AppEvent, InputMode, Panel};
use crate::status::Slot;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{spawn_chat, spawn_proxy, spawn_refresh, spawn_summary, spawn_video};
use super::Action;

/// Lines moved by PageUp/PageDown.
const PAGE: isize = 10;

/// Main input dispatch function.
pub(super) async fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Ok(Action::Quit);
    }

    match app.mode {
        InputMode::Normal => handle_normal_input(app, code, event_tx).await,
        InputMode::Editing => {
            handle_editing_input(app, code, event_tx).await;
            Ok(Action::Continue)
        }
        InputMode::ApiKey => {
            handle_key_prompt_input(app, code).await;
            Ok(Action::Continue)
        }
    }
}

async fn handle_normal_input(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    match code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Tab => app.switch_panel(app.panel.next()),
        KeyCode::BackTab => app.switch_panel(app.panel.prev()),
        KeyCode::Char(c @ '1'..='4') => {
            if let Some(panel) = Panel::from_digit(c) {
                app.switch_panel(panel);
            }
        }
        KeyCode::Char('i') | KeyCode::Enter => app.mode = InputMode::Editing,
        KeyCode::Char('a') => {
            app.switch_panel(Panel::News);
            app.mode = InputMode::Editing;
        }
        KeyCode::Char('k') => {
            app.key_input.clear();
            app.mode = InputMode::ApiKey;
        }
        KeyCode::Char('r') => spawn_refresh(app, None, event_tx),
        KeyCode::Char('s') => spawn_summary(app, event_tx),
        KeyCode::Char('c') => {
            if app.session.chat.is_in_flight() {
                app.session.status.info(Slot::Chat, crate::llm::chat::BUSY);
            } else {
                app.session.clear_chat().await;
                app.scroll[Panel::Chat.index()] = 0;
            }
        }
        KeyCode::Char('o') => {
            if let Err(e) = app.session.video.open_last() {
                tracing::warn!(error = %e, "Failed to open video");
                app.session.status.error(Slot::Video, e.to_string());
            }
        }
        KeyCode::Up => app.scroll_by(-1),
        KeyCode::Down => app.scroll_by(1),
        KeyCode::PageUp => app.scroll_by(-PAGE),
        KeyCode::PageDown => app.scroll_by(PAGE),
        KeyCode::Home => app.scroll[app.panel.index()] = 0,
        _ => {}
    }
    Ok(Action::Continue)
}

async fn handle_editing_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) {
    match code {
        KeyCode::Esc => app.mode = InputMode::Normal,
        KeyCode::Enter => submit_input(app, event_tx).await,
        KeyCode::Backspace => {
            app.input_mut().pop();
        }
        KeyCode::Char(c) => app.input_mut().push(c),
        _ => {}
    }
}

/// Run the active panel's action on its input line.
async fn submit_input(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let input = app.take_input();
    match app.panel {
        Panel::News => {
            app.mode = InputMode::Normal;
            if let Some(url) = app.session.register_source(&input).await {
                spawn_refresh(app, Some(url), event_tx);
            }
        }
        // Chat stays in editing mode for the next message.
        Panel::Chat => spawn_chat(app, &input, event_tx),
        Panel::Proxy => {
            app.mode = InputMode::Normal;
            spawn_proxy(app, input, event_tx);
        }
        Panel::Video => {
            app.mode = InputMode::Normal;
            spawn_video(app, input, event_tx);
        }
    }
}

async fn handle_key_prompt_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.key_input.clear();
            app.mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let key = std::mem::take(&mut app.key_input);
            app.mode = InputMode::Normal;
            app.session.save_credential(&key).await;
        }
        KeyCode::Backspace => {
            app.key_input.pop();
        }
        KeyCode::Char(c) => app.key_input.push(c),
        _ => {}
    }
}
