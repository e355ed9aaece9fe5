mod cli;
mod dispatcher;
mod kubernetes;
mod logstream;
mod nav;
#[cfg(test)]
mod tests;
mod types;
mod ui;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use kube::Client;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::IsTerminal;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use cli::Cli;
use dispatcher::{FetchRequest, spawn_dispatcher};
use kubernetes::{KubeProvider, ResourceProvider};
use logstream::LogSession;
use nav::{Effect, ViewKey};
use types::{Container, LogEntry};
use ui::events::KeyAction;
use ui::{App, AppEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let direct_target = cli.direct_target();
    let use_tui = direct_target.is_none() && !cli.no_tui && std::io::stdout().is_terminal();

    // Initialize tracing - in TUI mode logs go to a file so they do not
    // corrupt the display.
    let filter = if cli.verbose { "debug" } else { "info" };
    if use_tui {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/kube-drill.log")
            .unwrap_or_else(|_| {
                eprintln!("Warning: Could not open /tmp/kube-drill.log for logging");
                std::fs::File::create("/dev/null").expect("Failed to open /dev/null")
            });

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
            )
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(log_file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let client = build_client(&cli).await?;
    let provider = KubeProvider::new(client);

    if use_tui {
        run_tui_mode(provider, &cli).await
    } else {
        let Some(target) = direct_target else {
            anyhow::bail!(
                "stdout mode needs --namespace, --pod and --container (or run on a terminal for the TUI)"
            );
        };
        run_stdout_mode(provider, target, &cli).await
    }
}

async fn build_client(cli: &Cli) -> anyhow::Result<Client> {
    let config = match &cli.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer().await?,
    };

    Ok(Client::try_from(config)?)
}

/// Tail one container straight to stdout, no TUI. With --no-follow this
/// prints the current tail and exits; otherwise it follows the stream
/// until it closes.
async fn run_stdout_mode<P: ResourceProvider>(
    provider: P,
    target: Container,
    cli: &Cli,
) -> anyhow::Result<()> {
    if cli.no_follow {
        let lines = provider.get_log_tail(&target, cli.tail).await?;
        for entry in logstream::decode_tail(&lines) {
            print_entry(&entry);
        }
        return Ok(());
    }

    let lines = provider.open_log_stream(&target, cli.tail).await?;
    let mut session = logstream::spawn_reader(ViewKey::ContainerLogs, lines);

    while let Some(result) = session.recv().await {
        match result {
            Ok(entry) => print_entry(&entry),
            Err(err) => {
                error!("log stream failed: {err:#}");
                break;
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &LogEntry) {
    if entry.msg.is_empty() {
        println!("{}", entry.raw);
    } else {
        println!("{} {} {}", entry.time, entry.level, entry.msg);
    }
}

async fn run_tui_mode<P: ResourceProvider>(provider: P, cli: &Cli) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(provider, cli, &mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_event_loop<P: ResourceProvider>(
    provider: P,
    cli: &Cli,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(100);
    let (req_tx, req_rx) = mpsc::channel::<FetchRequest>(16);

    // Keyboard input feeds the merged event stream.
    let key_tx = event_tx.clone();
    tokio::spawn(async move {
        ui::events::event_loop(key_tx).await;
    });

    let dispatcher = spawn_dispatcher(provider.clone(), req_rx, event_tx.clone());

    let mut app = App::new();
    let mut session: Option<LogSession> = None;

    let initial = app.nav.initial_request();
    run_effect(initial, &provider, cli.tail, &req_tx, &event_tx, &mut session).await;

    let mut render_interval = tokio::time::interval(Duration::from_millis(100));
    render_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut should_quit = false;
    while !should_quit {
        tokio::select! {
            _ = render_interval.tick() => {
                ui::renderer::render(terminal, &mut app)?;
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    AppEvent::Key(key) => {
                        match ui::events::handle_key_event(&mut app, key) {
                            KeyAction::Quit => should_quit = true,
                            KeyAction::Run(effect) => {
                                run_effect(effect, &provider, cli.tail, &req_tx, &event_tx, &mut session)
                                    .await;
                            }
                            KeyAction::None => {}
                        }
                        // Render immediately after keyboard input.
                        ui::renderer::render(terminal, &mut app)?;
                    }
                    AppEvent::Fetch { view, result } => {
                        app.on_fetch(view, result);
                    }
                    AppEvent::StreamOpened { view, result } => {
                        if view != app.nav.key {
                            debug!(?view, current = ?app.nav.key, "dropping stream for stale view");
                            if let Ok(stale) = result {
                                stale.close();
                            }
                        } else {
                            match result {
                                Ok(new_session) => {
                                    if let Some(old) = session.replace(new_session) {
                                        old.close();
                                    }
                                }
                                Err(err) => app.nav.stream_failed(err),
                            }
                        }
                    }
                }
            }
            entry = recv_log_entry(&mut session), if session.is_some() => {
                match entry {
                    Some((view, Ok(entry))) => app.push_log(view, entry),
                    Some((_, Err(err))) => {
                        app.nav.stream_failed(err);
                        if let Some(dead) = session.take() {
                            dead.close();
                        }
                    }
                    None => {
                        app.nav.stream_closed();
                        session = None;
                    }
                }
            }
        }
    }

    dispatcher.abort();
    if let Some(open) = session.take() {
        open.close();
    }

    Ok(())
}

async fn recv_log_entry(
    session: &mut Option<LogSession>,
) -> Option<(ViewKey, anyhow::Result<LogEntry>)> {
    match session.as_mut() {
        Some(open) => {
            let view = open.view;
            open.recv().await.map(|result| (view, result))
        }
        None => std::future::pending().await,
    }
}

/// Execute one side effect requested by the state machine. This is the
/// only place where transitions touch channels or spawn tasks.
async fn run_effect<P: ResourceProvider>(
    effect: Effect,
    provider: &P,
    tail: i64,
    req_tx: &mpsc::Sender<FetchRequest>,
    event_tx: &mpsc::Sender<AppEvent>,
    session: &mut Option<LogSession>,
) {
    match effect {
        Effect::Fetch(request) => {
            if req_tx.send(request).await.is_err() {
                error!("dispatcher is gone; dropping fetch request");
            }
        }
        Effect::OpenStream { view, container } => {
            // Exactly one stream per log view: replace whatever is open.
            if let Some(old) = session.take() {
                old.close();
            }
            let provider = provider.clone();
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                let result = provider
                    .open_log_stream(&container, tail)
                    .await
                    .map(|lines| logstream::spawn_reader(view, lines));
                let _ = event_tx.send(AppEvent::StreamOpened { view, result }).await;
            });
        }
        Effect::CloseStream => {
            if let Some(open) = session.take() {
                open.close();
            }
        }
    }
}
