use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct AppLayout {
    pub title: Rect,
    pub main: Rect,
    pub status_bar: Rect,
}

pub fn create_layout(area: Rect) -> AppLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title / breadcrumb
            Constraint::Min(1),    // Current view
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    AppLayout {
        title: chunks[0],
        main: chunks[1],
        status_bar: chunks[2],
    }
}
