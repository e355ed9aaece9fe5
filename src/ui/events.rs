use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::dispatcher::FetchData;
use crate::logstream::LogSession;
use crate::nav::{Effect, ViewKey};
use crate::ui::app::{App, AppMode};

/// The single merged event stream consumed by the UI loop. Every result
/// carries the ViewKey it was produced for.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Fetch {
        view: ViewKey,
        result: anyhow::Result<FetchData>,
    },
    StreamOpened {
        view: ViewKey,
        result: anyhow::Result<LogSession>,
    },
}

/// What the UI loop should do after a key press.
#[derive(Debug)]
pub enum KeyAction {
    None,
    Quit,
    Run(Effect),
}

/// Forward keyboard input into the merged event channel.
pub async fn event_loop(tx: mpsc::Sender<AppEvent>) {
    use crossterm::event::EventStream;

    let mut event_stream = EventStream::new();

    while let Some(Ok(event)) = event_stream.next().await {
        if let Event::Key(key) = event
            && tx.send(AppEvent::Key(key)).await.is_err()
        {
            break;
        }
    }
}

pub fn handle_key_event(app: &mut App, key: KeyEvent) -> KeyAction {
    // The error overlay is modal: it swallows everything except dismiss
    // and quit.
    if app.nav.error.is_some() {
        return handle_error_overlay(app, key);
    }

    match app.mode {
        AppMode::Normal => handle_normal_mode(app, key),
        AppMode::Filter => handle_filter_mode(app, key),
        AppMode::Help => {
            app.mode = AppMode::Normal;
            KeyAction::None
        }
    }
}

fn handle_error_overlay(app: &mut App, key: KeyEvent) -> KeyAction {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => KeyAction::Quit,
        (KeyCode::Esc, _) | (KeyCode::Enter, _) => match app.dismiss_error() {
            Some(effect) => KeyAction::Run(effect),
            None => KeyAction::None,
        },
        _ => KeyAction::None,
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> KeyAction {
    let in_logs = app.nav.key.is_log_view();

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            return KeyAction::Quit;
        }
        (KeyCode::Enter, _) => {
            if let Some(effect) = app.descend() {
                return KeyAction::Run(effect);
            }
        }
        (KeyCode::Esc, _) => {
            if let Some(effect) = app.ascend() {
                return KeyAction::Run(effect);
            }
        }
        (KeyCode::Char('r'), _) => {
            if let Some(effect) = app.refresh() {
                return KeyAction::Run(effect);
            }
        }
        (KeyCode::Char('f'), _) if in_logs => {
            app.mode = AppMode::Filter;
            app.filter_pattern.clear();
        }
        (KeyCode::Char('a'), _) if in_logs => {
            app.auto_scroll = !app.auto_scroll;
        }
        (KeyCode::Char('?'), _) => {
            app.mode = AppMode::Help;
        }
        (KeyCode::Up, _) => {
            if in_logs {
                app.scroll_up();
            } else {
                app.select_previous();
            }
        }
        (KeyCode::Down, _) => {
            if in_logs {
                app.scroll_down();
            } else {
                app.select_next();
            }
        }
        (KeyCode::PageUp, _) if in_logs => {
            app.page_up(20);
        }
        (KeyCode::PageDown, _) if in_logs => {
            app.page_down(20);
        }
        (KeyCode::Home, _) if in_logs => {
            app.scroll_to_top();
        }
        (KeyCode::End, _) if in_logs => {
            app.scroll_to_bottom();
        }
        _ => {}
    }

    KeyAction::None
}

fn handle_filter_mode(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Normal;
            app.filter_pattern.clear();
        }
        KeyCode::Enter => {
            app.mode = AppMode::Normal;
        }
        KeyCode::Char(c) => {
            app.filter_pattern.push(c);
        }
        KeyCode::Backspace => {
            app.filter_pattern.pop();
        }
        _ => {}
    }

    KeyAction::None
}
