//! Command handling for modemsync.
//!
//! Wires configuration, persistence, the backend and the session together
//! and runs one subcommand on a current-thread runtime.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cli::{Cli, ColumnAction, Commands};
use crate::config::Config;
use crate::controller::Controller;
use crate::persist::{FileStateStore, Persistence};
use crate::registry::{PortId, RegistrySnapshot};
use crate::session::{Session, SessionHandle};
use crate::telemetry::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_FORWARD_CAPACITY, EventSink, SessionEvent, spawn_log_forwarder,
};
use crate::transport::{Backend, HttpBackend};

/// Run the parsed command with the loaded configuration.
pub fn handle_command(cli: &Cli, config: Config) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(run(cli, config))
}

async fn run(cli: &Cli, config: Config) -> Result<()> {
    let backend: Arc<dyn Backend> =
        Arc::new(HttpBackend::from_config(&config).context("Invalid backend configuration")?);
    let persistence = open_persistence(&config)?;

    let mut sink = EventSink::new(DEFAULT_EVENT_CAPACITY, config.log.max_lines());
    let forwarder = if config.log.remote_append() {
        let (tx, rx) = mpsc::channel(DEFAULT_FORWARD_CAPACITY);
        sink = sink.with_forwarder(tx);
        Some(spawn_log_forwarder(backend.clone(), rx))
    } else {
        None
    };

    let session = SessionHandle::new(Session::open(persistence, sink));
    let printer = spawn_log_printer(session.subscribe());
    let mut controller = Controller::new(backend, session.clone());

    let result = execute(&cli.command, &mut controller, &session).await;

    controller.shutdown().await;
    drop(controller);
    drop(session);

    // Both end once the last session handle is gone.
    if let Err(e) = printer.await {
        debug!("Log printer ended abnormally: {}", e);
    }
    if let Some(forwarder) = forwarder
        && let Err(e) = forwarder.await
    {
        debug!("Log forwarder ended abnormally: {}", e);
    }

    result
}

async fn execute(command: &Commands, controller: &mut Controller, session: &SessionHandle) -> Result<()> {
    match command {
        Commands::Scan => {
            controller.scan().await.context("Port scan failed")?;
        }
        Commands::Connect { ports, follow } => {
            ensure_ports(controller, session).await;
            controller.connect(ports);
            controller.wait_connect().await;
            if *follow {
                println!("Following live status, press Ctrl-C to stop");
                tokio::select! {
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for Ctrl-C")?;
                    }
                    _ = controller.wait_monitor() => {
                        warn!("Monitor feed ended");
                    }
                }
            }
        }
        Commands::Disconnect { ports } => {
            ensure_ports(controller, session).await;
            controller.disconnect(ports).await.context("Disconnect failed")?;
        }
        Commands::Refresh { port } => {
            controller.refresh(port).await.context("Refresh failed")?;
        }
        Commands::Show { sort, json } => {
            for key in sort {
                controller.sort_by(key)?;
            }
            let (snapshot, ids, columns) =
                session.with(|s| (s.snapshot(), s.display_ids(), s.visible_columns()));
            if *json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", render_table(&snapshot, &ids, &columns));
            }
        }
        Commands::Columns { action } => match action {
            ColumnAction::List => {
                for column in session.with(|s| s.visible_columns()) {
                    println!("{}", column);
                }
            }
            ColumnAction::Move { key, position } => {
                controller.move_column(key, *position)?;
            }
            ColumnAction::Hide { key } => {
                controller.set_column_hidden(key, true)?;
            }
            ColumnAction::Show { key } => {
                controller.set_column_hidden(key, false)?;
            }
        },
    }
    Ok(())
}

/// A fresh (or unreadable) saved state starts with a scan.
async fn ensure_ports(controller: &Controller, session: &SessionHandle) {
    if session.with(|s| s.registry().is_empty()) {
        if let Err(e) = controller.scan().await {
            debug!("Startup scan failed, continuing with saved state: {}", e);
        }
    }
}

fn open_persistence(config: &Config) -> Result<Persistence> {
    if config.storage.is_ephemeral() {
        debug!("Using in-memory state");
        return Ok(Persistence::in_memory());
    }
    let store = match config.storage.state_dir {
        Some(ref dir) => FileStateStore::new(dir),
        None => FileStateStore::default_location().context("No state directory available")?,
    };
    debug!("Using state directory {:?}", store.dir());
    Ok(Persistence::new(Arc::new(store)))
}

fn spawn_log_printer(mut rx: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::LogLine { line }) => println!("{}", line),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Log output skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Plain-text table of `ids` (in that order) over `columns`.
fn render_table(snapshot: &RegistrySnapshot, ids: &[PortId], columns: &[String]) -> String {
    if columns.is_empty() || ids.is_empty() {
        return "No ports\n".to_string();
    }

    let rows: Vec<Vec<String>> = ids
        .iter()
        .filter_map(|id| snapshot.get(id))
        .map(|record| {
            columns
                .iter()
                .map(|c| record.get(c).map(|v| v.as_text()).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let mut push_row = |cells: &[String]| {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    };
    push_row(columns);
    for row in &rows {
        push_row(row.as_slice());
    }
    out
}
