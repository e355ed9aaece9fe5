use chrono::{DateTime, Local};
use regex::Regex;
use std::collections::HashMap;

use crate::dispatcher::FetchData;
use crate::nav::{Effect, Navigator, ViewKey};
use crate::types::LogEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Normal,
    Filter,
    Help,
}

/// UI-side application state: the navigation state machine plus
/// presentation-only concerns (selection, scrolling, filter input). All
/// mutation happens on the UI loop.
pub struct App {
    pub nav: Navigator,
    pub mode: AppMode,
    pub filter_pattern: String,
    pub auto_scroll: bool,
    pub scroll_offset: usize,
    pub last_refreshed: Option<DateTime<Local>>,
    selection: HashMap<ViewKey, usize>,
}

impl App {
    pub fn new() -> Self {
        Self {
            nav: Navigator::new(),
            mode: AppMode::Normal,
            filter_pattern: String::new(),
            auto_scroll: true,
            scroll_offset: 0,
            last_refreshed: None,
            selection: HashMap::new(),
        }
    }

    /// Selected index in the current view, clamped to the item count.
    pub fn selected(&self) -> usize {
        let count = self.nav.item_count();
        let index = self.selection.get(&self.nav.key).copied().unwrap_or(0);
        index.min(count.saturating_sub(1))
    }

    pub fn select_next(&mut self) {
        let count = self.nav.item_count();
        if count == 0 {
            return;
        }
        let next = (self.selected() + 1) % count;
        self.selection.insert(self.nav.key, next);
    }

    pub fn select_previous(&mut self) {
        let count = self.nav.item_count();
        if count == 0 {
            return;
        }
        let current = self.selected();
        let previous = if current == 0 { count - 1 } else { current - 1 };
        self.selection.insert(self.nav.key, previous);
    }

    pub fn descend(&mut self) -> Option<Effect> {
        let from = self.nav.key;
        let index = self.selected();
        let effect = self.nav.descend(index);
        if self.nav.key != from {
            self.reset_view_state();
            self.selection.insert(self.nav.key, 0);
        }
        effect
    }

    pub fn ascend(&mut self) -> Option<Effect> {
        let from = self.nav.key;
        let effect = self.nav.ascend();
        if self.nav.key != from {
            self.reset_view_state();
        }
        effect
    }

    pub fn refresh(&mut self) -> Option<Effect> {
        self.nav.refresh()
    }

    pub fn dismiss_error(&mut self) -> Option<Effect> {
        let from = self.nav.key;
        let effect = self.nav.dismiss_error();
        if self.nav.key != from {
            self.reset_view_state();
        }
        effect
    }

    pub fn on_fetch(&mut self, view: ViewKey, result: anyhow::Result<FetchData>) {
        let ok = result.is_ok();
        self.nav.apply_fetch(view, result);
        if ok {
            self.last_refreshed = Some(Local::now());
        }
    }

    pub fn push_log(&mut self, view: ViewKey, entry: LogEntry) {
        self.nav.apply_log_entry(view, entry);
        if self.auto_scroll {
            self.scroll_offset = self.nav.log_entries().len().saturating_sub(1);
        }
    }

    /// Log entries of the current view with the filter applied. The
    /// pattern is a case-insensitive regex matched against the raw line;
    /// an invalid pattern filters nothing.
    pub fn visible_logs(&self) -> Vec<&LogEntry> {
        let filter = if self.filter_pattern.is_empty() {
            None
        } else {
            Regex::new(&format!("(?i){}", self.filter_pattern)).ok()
        };

        self.nav
            .log_entries()
            .iter()
            .filter(|entry| filter.as_ref().is_none_or(|re| re.is_match(&entry.raw)))
            .collect()
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
        self.auto_scroll = false;
    }

    pub fn scroll_down(&mut self) {
        let max = self.nav.log_entries().len().saturating_sub(1);
        if self.scroll_offset < max {
            self.scroll_offset += 1;
        } else {
            self.auto_scroll = true;
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(page_size);
        self.auto_scroll = false;
    }

    pub fn page_down(&mut self, page_size: usize) {
        let max = self.nav.log_entries().len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + page_size).min(max);
        if self.scroll_offset >= max {
            self.auto_scroll = true;
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
        self.auto_scroll = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.nav.log_entries().len().saturating_sub(1);
        self.auto_scroll = true;
    }

    fn reset_view_state(&mut self) {
        self.mode = AppMode::Normal;
        self.filter_pattern.clear();
        self.scroll_offset = 0;
        self.auto_scroll = true;
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
