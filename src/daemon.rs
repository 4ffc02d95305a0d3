//! Daemon lifecycle
//!
//! Owns the process-wide pieces: the single-instance lock, the hotkey
//! orchestration thread, the settings file watcher, and signal handling.
//! The settings file doubles as the control surface: `keyswap enable`,
//! `keyswap hotkey set` and plain text edits all land on disk, and the
//! watcher converts each change into control messages for the hotkey
//! thread.

use crate::config::{HotkeyRole, Settings};
use crate::error::{KeyswapError, Result};
use crate::orchestrator::{self, OrchestratorHandle};
use crate::{autostart, notification, APP_NAME};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use pidlock::Pidlock;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

enum Shutdown {
    /// The hotkey loop ended on its own (exit hotkey or startup failure).
    HotkeyLoop,
    Signal(&'static str),
}

pub async fn run(settings_path: Option<PathBuf>) -> Result<()> {
    let path = match settings_path {
        Some(p) => p,
        None => Settings::default_path()?,
    };
    let mut settings = Settings::load(Some(&path))?;

    // Single instance per settings file.
    let lock_path = path.with_file_name("keyswap.pid");
    if let Some(dir) = lock_path.parent() {
        std::fs::create_dir_all(dir).map_err(KeyswapError::Io)?;
    }
    let mut lock = Pidlock::new(&lock_path.to_string_lossy());
    if lock.acquire().is_err() {
        return Err(KeyswapError::AlreadyRunning);
    }

    info!("Starting keyswap daemon (settings: {:?})", path);
    autostart::apply(settings.autorun).await;

    let (exit_tx, mut exit_rx) = oneshot::channel();
    let (handle, join) = orchestrator::spawn(Some(path.clone()), exit_tx);

    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
    let _watcher = match watch_settings(&path, watch_tx) {
        Ok(w) => Some(w),
        Err(e) => {
            // The daemon still works, it just won't pick up edits live.
            warn!("Settings watcher unavailable, live reload disabled: {e}");
            None
        }
    };

    let reason = loop {
        tokio::select! {
            _ = &mut exit_rx => break Shutdown::HotkeyLoop,
            _ = tokio::signal::ctrl_c() => break Shutdown::Signal("SIGINT"),
            _ = terminate_signal() => break Shutdown::Signal("SIGTERM"),
            Some(()) = watch_rx.recv() => {
                apply_settings_change(&path, &mut settings, &handle).await;
            }
        }
    };

    match reason {
        Shutdown::HotkeyLoop => info!("Hotkey loop ended, shutting down"),
        Shutdown::Signal(name) => {
            info!("Received {name}, shutting down...");
            handle.shutdown();
            // Wait for the hotkey thread to unregister everything.
            let _ = exit_rx.await;
        }
    }

    let _ = tokio::task::spawn_blocking(move || join.join()).await;
    let _ = lock.release();
    info!("Daemon stopped");
    Ok(())
}

/// Watch the settings file's directory; saves go through a temp file
/// plus rename, so watching the file itself would lose track after the
/// first write.
fn watch_settings(
    path: &Path,
    tx: mpsc::UnboundedSender<()>,
) -> notify::Result<RecommendedWatcher> {
    let file_name = path.file_name().map(|n| n.to_os_string());
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else { return };
            let relevant = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if relevant {
                let _ = tx.send(());
            }
        },
        NotifyConfig::default().with_poll_interval(Duration::from_millis(100)),
    )?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Diff the on-disk settings against the last applied state and post
/// the corresponding control messages. The persist-back performed by
/// `Settings::load` also fires the watcher; it diffs as unchanged and
/// stops the cycle.
async fn apply_settings_change(
    path: &Path,
    current: &mut Settings,
    handle: &OrchestratorHandle,
) {
    let latest = match Settings::load(Some(path)) {
        Ok(s) => s,
        Err(e) => {
            // A broken hand edit should not go unnoticed: the daemon
            // keeps running on the previous settings, but the user
            // needs to know their change was ignored.
            warn!("Settings file changed but does not parse, ignoring: {e}");
            notification::send(
                APP_NAME,
                "The settings file has an error and was ignored. The previous settings stay active.",
            )
            .await;
            return;
        }
    };
    if latest == *current {
        debug!("Settings file event without effective change");
        return;
    }
    info!("Settings changed on disk, applying");

    if latest.translate_hotkey != current.translate_hotkey {
        handle.update_binding(HotkeyRole::Trigger);
    }
    if latest.exit_hotkey != current.exit_hotkey {
        handle.update_binding(HotkeyRole::Exit);
    }
    if latest.case_hotkey != current.case_hotkey {
        handle.update_binding(HotkeyRole::Case);
    }
    if latest.enabled != current.enabled {
        handle.set_trigger_registration(latest.enabled);
    }
    if latest.autorun != current.autorun {
        autostart::apply(latest.autorun).await;
    }
    if latest.file_logging != current.file_logging {
        info!("file_logging changed; takes effect on the next daemon start");
    }

    *current = latest;
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to set up SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await
}
