use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::nav::{ApiKind, Navigator, ViewKey};
use crate::ui::app::{App, AppMode};
use crate::ui::layout::create_layout;
use crate::ui::widgets::{ErrorOverlay, HelpOverlay, LogView, StatusBar};

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> std::io::Result<()> {
    terminal.draw(|f| render_frame(f, app))?;
    Ok(())
}

fn render_frame(f: &mut Frame, app: &mut App) {
    let layout = create_layout(f.area());

    let title = Paragraph::new(breadcrumb(&app.nav))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(title, layout.title);

    if app.nav.key.is_log_view() {
        let entries = app.visible_logs();
        if entries.is_empty() && app.nav.loading {
            render_placeholder(f, layout.main, "waiting for logs...");
        } else {
            let log_view = LogView::new(entries, app.scroll_offset, app.auto_scroll);
            f.render_widget(log_view, layout.main);
        }
    } else {
        let items = list_lines(&app.nav);
        if items.is_empty() && app.nav.loading {
            render_placeholder(f, layout.main, "loading...");
        } else {
            let list = List::new(items.into_iter().map(ListItem::new))
                .highlight_style(
                    Style::default()
                        .add_modifier(Modifier::REVERSED)
                        .fg(Color::Yellow),
                )
                .highlight_symbol("> ");
            let mut state = ListState::default().with_selected(Some(app.selected()));
            f.render_stateful_widget(list, layout.main, &mut state);
        }
    }

    let status_bar = StatusBar {
        view_title: app.nav.key.title(),
        item_count: app.nav.item_count(),
        loading: app.nav.loading,
        stream_ended: app.nav.stream_ended,
        filter_pattern: &app.filter_pattern,
        last_refreshed: app.last_refreshed.map(|t| t.format("%H:%M:%S").to_string()),
        auto_scroll: app.nav.key.is_log_view() && app.auto_scroll,
    };
    f.render_widget(status_bar, layout.status_bar);

    if let Some(message) = &app.nav.error {
        f.render_widget(ErrorOverlay { message }, f.area());
        return;
    }

    if app.mode == AppMode::Help {
        f.render_widget(HelpOverlay, f.area());
    }

    if app.mode == AppMode::Filter {
        render_filter_input(f, &app.filter_pattern);
    }
}

fn render_placeholder(f: &mut Frame, area: ratatui::layout::Rect, message: &str) {
    let placeholder = Paragraph::new(message)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(placeholder, area);
}

fn render_filter_input(f: &mut Frame, pattern: &str) {
    let filter_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(f.area())[1];

    f.render_widget(Clear, filter_area);

    let filter_text = format!("Filter: {pattern}_");
    let filter_widget = Paragraph::new(Span::styled(filter_text, Style::default().fg(Color::Cyan)))
        .block(
            Block::default()
                .title("Filter (Enter to apply, Esc to cancel)")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Left);

    f.render_widget(filter_widget, filter_area);
}

/// Where the user currently is, built from the accumulated context.
fn breadcrumb(nav: &Navigator) -> String {
    let namespace = nav.context.namespace.as_deref().unwrap_or("");

    match nav.key {
        ViewKey::Namespaces => "namespaces".to_string(),
        ViewKey::ApiChoice => format!("{namespace} > apis"),
        ViewKey::Containers => format!("{namespace} > containers"),
        ViewKey::ContainerLogs => {
            let path = nav
                .context
                .container
                .as_ref()
                .map(|c| c.path())
                .unwrap_or_default();
            format!("{path} > logs")
        }
        ViewKey::CronJobs => format!("{namespace} > cronjobs"),
        ViewKey::CronJobJobs => {
            let cron_job = nav
                .context
                .cron_job
                .as_ref()
                .map(|cj| cj.name.as_str())
                .unwrap_or("");
            format!("{namespace}/{cron_job} > jobs")
        }
        ViewKey::CronJobContainers => {
            let job = nav
                .context
                .job
                .as_ref()
                .map(|j| j.name.as_str())
                .unwrap_or("");
            format!("{namespace}/{job} > containers")
        }
        ViewKey::CronJobLogs => {
            let path = nav
                .context
                .job_container
                .as_ref()
                .map(|c| c.path())
                .unwrap_or_default();
            format!("{path} > logs")
        }
    }
}

/// Display rows for the current list view.
fn list_lines(nav: &Navigator) -> Vec<String> {
    match nav.key {
        ViewKey::Namespaces => nav.store.namespaces.clone(),
        ViewKey::ApiChoice => ApiKind::ALL.iter().map(|api| api.label().to_string()).collect(),
        ViewKey::Containers => nav.store.containers.iter().map(|c| c.path()).collect(),
        ViewKey::CronJobs => nav
            .store
            .cron_jobs
            .iter()
            .map(|cj| format!("{} ({} jobs)", cj.name, cj.jobs.len()))
            .collect(),
        ViewKey::CronJobJobs => nav
            .embedded_jobs()
            .iter()
            .map(|job| format!("{}/{}", job.namespace, job.name))
            .collect(),
        ViewKey::CronJobContainers => nav.store.job_containers.iter().map(|c| c.path()).collect(),
        ViewKey::ContainerLogs | ViewKey::CronJobLogs => Vec::new(),
    }
}
