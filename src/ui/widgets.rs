use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::types::LogEntry;

fn level_color(level: &str) -> Color {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" => Color::DarkGray,
        "info" => Color::Green,
        "warn" | "warning" => Color::Yellow,
        "error" | "fatal" | "panic" => Color::Red,
        _ => Color::Gray,
    }
}

pub struct LogView<'a> {
    entries: Vec<&'a LogEntry>,
    scroll_offset: usize,
    follow: bool,
}

impl<'a> LogView<'a> {
    pub fn new(entries: Vec<&'a LogEntry>, scroll_offset: usize, follow: bool) -> Self {
        Self {
            entries,
            scroll_offset,
            follow,
        }
    }

    fn format_entry(entry: &'a LogEntry) -> Line<'a> {
        // Lines that did not decode (or carried no msg) fall back to the
        // verbatim source text.
        if entry.msg.is_empty() {
            return Line::from(Span::raw(entry.raw.as_str()));
        }

        let mut spans = Vec::new();

        if !entry.time.is_empty() {
            spans.push(Span::styled(
                format!("{} ", entry.time),
                Style::default().fg(Color::DarkGray),
            ));
        }

        if !entry.level.is_empty() {
            spans.push(Span::styled(
                format!("{:<5} ", entry.level),
                Style::default().fg(level_color(&entry.level)),
            ));
        }

        spans.push(Span::raw(entry.msg.as_str()));

        Line::from(spans)
    }
}

impl<'a> Widget for LogView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines: Vec<Line> = self.entries.iter().map(|e| Self::format_entry(e)).collect();

        let top = if self.follow {
            lines.len().saturating_sub(area.height as usize)
        } else {
            self.scroll_offset.min(lines.len().saturating_sub(1))
        };

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((top as u16, 0));

        paragraph.render(area, buf);
    }
}

pub struct StatusBar<'a> {
    pub view_title: &'a str,
    pub item_count: usize,
    pub loading: bool,
    pub stream_ended: bool,
    pub filter_pattern: &'a str,
    pub last_refreshed: Option<String>,
    pub auto_scroll: bool,
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut parts = vec![
            self.view_title.to_string(),
            format!("{} items", self.item_count),
        ];

        if let Some(refreshed) = self.last_refreshed {
            parts.push(format!("refreshed {refreshed}"));
        }
        if !self.filter_pattern.is_empty() {
            parts.push(format!("filter: {}", self.filter_pattern));
        }

        let mut status_text = parts.join(" | ");

        if self.loading {
            status_text.push_str(" | [LOADING]");
        }
        if self.stream_ended {
            status_text.push_str(" | [STREAM CLOSED]");
        }
        if self.auto_scroll {
            status_text.push_str(" | [FOLLOW]");
        }
        status_text.push_str(" | ? for help");

        let paragraph =
            Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));

        paragraph.render(area, buf);
    }
}

pub struct ErrorOverlay<'a> {
    pub message: &'a str,
}

impl<'a> Widget for ErrorOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = area.width.saturating_sub(8).clamp(20, 80);
        let height = 7u16;
        let x = (area.width.saturating_sub(width)) / 2;
        let y = (area.height.saturating_sub(height)) / 2;

        let overlay_area = Rect {
            x: area.x + x,
            y: area.y + y,
            width: width.min(area.width),
            height: height.min(area.height),
        };

        Clear.render(overlay_area, buf);

        let block = Block::default()
            .title("error")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Red));

        let lines = vec![
            Line::from(Span::raw(self.message)),
            Line::from(""),
            Line::from(Span::styled(
                "Esc to go back, q to quit",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Left);

        paragraph.render(overlay_area, buf);
    }
}

pub struct HelpOverlay;

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let help_lines = vec![
            "Keyboard Shortcuts",
            "",
            "  q/Ctrl-C    - Quit",
            "  Enter       - Open the selected item",
            "  Esc         - Go back up one level",
            "  r           - Refresh the current view",
            "  ↑/↓         - Move selection / scroll logs",
            "",
            "Log views:",
            "  f           - Filter (show only matching lines)",
            "  a           - Toggle follow mode",
            "  PgUp/PgDn   - Page scroll",
            "  Home/End    - Jump to top/bottom",
            "",
            "Press any key to close",
        ];

        let lines: Vec<Line> = help_lines.iter().map(|s| Line::from(*s)).collect();

        let help_width = 52;
        let help_height = help_lines.len() as u16 + 2;
        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;

        let help_area = Rect {
            x: area.x + x,
            y: area.y + y,
            width: help_width.min(area.width),
            height: help_height.min(area.height),
        };

        Clear.render(help_area, buf);

        let block = Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black).fg(Color::White));

        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .style(Style::default().bg(Color::Black).fg(Color::White));

        paragraph.render(help_area, buf);
    }
}
