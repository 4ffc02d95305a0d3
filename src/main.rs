//! Keyswap - keyboard layout converter for selected text
//!
//! Run with `keyswap` or `keyswap daemon` to start the daemon.
//! Use `keyswap convert <text>` to convert text on the command line.
//! Use `keyswap hotkey` to inspect or change the bindings.

use anyhow::{bail, Context};
use clap::Parser;
use keyswap::cli::{AutostartAction, Cli, Commands, HotkeyAction};
use keyswap::config::{HotkeyRole, Settings};
use keyswap::keys::HotkeyBinding;
use keyswap::transform::{self, Layout};
use keyswap::{autostart, daemon, hotkey_capture};
use std::io::Read;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    // File logging only applies to the daemon; the flag is read once at
    // startup, so flipping it in the settings file needs a restart.
    let is_daemon = matches!(cli.command, None | Some(Commands::Daemon));
    let file_logging = is_daemon
        && Settings::load(cli.config.as_deref())
            .map(|s| s.file_logging)
            .unwrap_or(false);
    init_logging(log_level, file_logging)?;

    match cli.command {
        None | Some(Commands::Daemon) => daemon::run(cli.config).await?,

        Some(Commands::Convert { text, from }) => {
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read stdin")?;
                    buf
                }
            };
            let source = match from.as_deref() {
                Some("latin") => Layout::Latin,
                Some("cyrillic") => Layout::Cyrillic,
                Some(other) => bail!("unknown layout {other:?} (expected latin or cyrillic)"),
                None => transform::guess_source(&text),
            };
            print!("{}", transform::convert(&text, source));
        }

        Some(Commands::Config) => {
            let path = match cli.config {
                Some(p) => p,
                None => Settings::default_path()?,
            };
            let settings = Settings::load(Some(&path))?;
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&settings)?);
        }

        Some(Commands::Enable) => set_enabled(cli.config.as_deref(), true)?,
        Some(Commands::Disable) => set_enabled(cli.config.as_deref(), false)?,

        Some(Commands::Hotkey { action }) => match action {
            HotkeyAction::Show => {
                let settings = Settings::load(cli.config.as_deref())?;
                println!("translate  {}", settings.translate_hotkey);
                println!("exit       {}", settings.exit_hotkey);
                match &settings.case_hotkey {
                    Some(b) => println!("case       {b}"),
                    None => println!("case       (not set)"),
                }
            }
            HotkeyAction::Set { role, combo } => {
                let role = parse_role(&role)?;
                let binding = HotkeyBinding::parse_combo(&combo)?;
                save_binding(cli.config.as_deref(), role, binding)?;
            }
            HotkeyAction::Capture { role } => {
                let role = parse_role(&role)?;
                println!("Press the desired combination (Escape to cancel)...");
                let captured =
                    tokio::task::spawn_blocking(hotkey_capture::capture_binding).await??;
                match captured {
                    Some(binding) => save_binding(cli.config.as_deref(), role, binding)?,
                    None => println!("Cancelled."),
                }
            }
        },

        Some(Commands::Autostart { action }) => {
            match action {
                AutostartAction::Enable => {
                    autostart::install().await?;
                    set_autorun(cli.config.as_deref(), true)?;
                }
                AutostartAction::Disable => {
                    autostart::uninstall().await?;
                    set_autorun(cli.config.as_deref(), false)?;
                }
                AutostartAction::Status => autostart::status().await?,
            };
        }
    }

    Ok(())
}

fn init_logging(level: &str, file_logging: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keyswap={},warn", level)));

    if file_logging {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let path = Settings::log_path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    Ok(())
}

fn parse_role(role: &str) -> anyhow::Result<HotkeyRole> {
    match role.to_ascii_lowercase().as_str() {
        "translate" => Ok(HotkeyRole::Trigger),
        "exit" => Ok(HotkeyRole::Exit),
        "case" => Ok(HotkeyRole::Case),
        other => bail!("unknown hotkey role {other:?} (expected translate, exit or case)"),
    }
}

/// Load, mutate, save. The running daemon picks the change up through
/// its settings watcher.
fn edit_settings(
    path: Option<&std::path::Path>,
    edit: impl FnOnce(&mut Settings) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Settings::default_path()?,
    };
    let mut settings = Settings::load(Some(&path))?;
    edit(&mut settings)?;
    settings.save(&path)?;
    Ok(())
}

fn set_enabled(path: Option<&std::path::Path>, enabled: bool) -> anyhow::Result<()> {
    edit_settings(path, |s| {
        s.enabled = enabled;
        Ok(())
    })?;
    println!(
        "Translate hotkey {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn set_autorun(path: Option<&std::path::Path>, autorun: bool) -> anyhow::Result<()> {
    edit_settings(path, |s| {
        s.autorun = autorun;
        Ok(())
    })
}

fn save_binding(
    path: Option<&std::path::Path>,
    role: HotkeyRole,
    binding: HotkeyBinding,
) -> anyhow::Result<()> {
    let pretty = binding.to_string();
    edit_settings(path, |s| {
        s.set_binding(role, binding)?;
        Ok(())
    })?;
    println!("{} hotkey set to {pretty}.", role.label());
    Ok(())
}
