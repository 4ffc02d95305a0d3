//! Start-on-login management (systemd user service on Linux)

use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "keyswap.service";

fn print_success(msg: &str) {
    println!("  \u{2713} {msg}");
}

fn print_failure(msg: &str) {
    println!("  \u{2717} {msg}");
}

/// The systemd user service directory
fn service_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.config_dir().join("systemd/user"))
        .unwrap_or_else(|| PathBuf::from("~/.config/systemd/user"))
}

fn service_path() -> PathBuf {
    service_dir().join(SERVICE_NAME)
}

/// Path baked into ExecStart. Falls back to a bare binary name so a
/// PATH-installed build still works.
fn executable_path() -> String {
    std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "keyswap".to_string())
}

fn generate_service_file() -> String {
    let keyswap_path = executable_path();

    format!(
        r#"[Unit]
Description=Keyswap keyboard layout converter daemon
PartOf=graphical-session.target
After=graphical-session.target

[Service]
Type=simple
ExecStart={keyswap_path} daemon
Restart=on-failure
RestartSec=5

# Ensure we have access to the display
Environment=XDG_RUNTIME_DIR=%t

[Install]
WantedBy=graphical-session.target
"#
    )
}

pub fn is_installed() -> bool {
    service_path().exists()
}

/// Install and enable the user service, with progress output for the
/// CLI.
pub async fn install() -> anyhow::Result<()> {
    println!("Installing keyswap systemd service...\n");

    let service_dir = service_dir();
    let service_path = service_path();

    std::fs::create_dir_all(&service_dir)?;
    print_success(&format!("Service directory: {:?}", service_dir));

    std::fs::write(&service_path, generate_service_file())?;
    print_success(&format!("Created: {:?}", service_path));

    println!("\nReloading systemd...");
    let reload = Command::new("systemctl")
        .args(["--user", "daemon-reload"])
        .status()
        .await?;
    if reload.success() {
        print_success("Systemd daemon reloaded");
    } else {
        print_failure("Failed to reload systemd daemon");
        return Ok(());
    }

    println!("\nEnabling service...");
    let enable = Command::new("systemctl")
        .args(["--user", "enable", SERVICE_NAME])
        .status()
        .await?;
    if enable.success() {
        print_success("Service enabled (will start on login)");
    } else {
        print_failure("Failed to enable service");
    }

    println!("\n---");
    println!("Useful commands:");
    println!("  systemctl --user start keyswap    # Start now");
    println!("  systemctl --user status keyswap   # Check status");
    println!("  journalctl --user -u keyswap -f   # View logs");

    Ok(())
}

/// Disable and remove the user service.
pub async fn uninstall() -> anyhow::Result<()> {
    println!("Uninstalling keyswap systemd service...\n");

    let service_path = service_path();

    let _ = Command::new("systemctl")
        .args(["--user", "stop", SERVICE_NAME])
        .status()
        .await;
    let _ = Command::new("systemctl")
        .args(["--user", "disable", SERVICE_NAME])
        .status()
        .await;
    print_success("Service stopped and disabled");

    if service_path.exists() {
        std::fs::remove_file(&service_path)?;
        print_success(&format!("Removed: {:?}", service_path));
    }

    let _ = Command::new("systemctl")
        .args(["--user", "daemon-reload"])
        .status()
        .await;
    print_success("Systemd daemon reloaded");

    Ok(())
}

/// Show the service status.
pub async fn status() -> anyhow::Result<()> {
    let output = Command::new("systemctl")
        .args(["--user", "status", SERVICE_NAME])
        .output()
        .await?;

    println!("{}", String::from_utf8_lossy(&output.stdout));
    if !output.stderr.is_empty() {
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
    }

    Ok(())
}

/// Quietly bring the installed state in line with the `autorun`
/// setting. Called by the daemon when the setting changes; failures are
/// logged, not surfaced.
pub async fn apply(autorun: bool) {
    if autorun == is_installed() {
        debug!("Autostart already {}", if autorun { "installed" } else { "absent" });
        return;
    }

    let result = if autorun {
        let outcome = std::fs::create_dir_all(service_dir())
            .and_then(|()| std::fs::write(service_path(), generate_service_file()));
        match outcome {
            Ok(()) => Command::new("systemctl")
                .args(["--user", "enable", SERVICE_NAME])
                .status()
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        }
    } else {
        let _ = Command::new("systemctl")
            .args(["--user", "disable", SERVICE_NAME])
            .status()
            .await;
        std::fs::remove_file(service_path())
    };

    match result {
        Ok(()) => debug!("Autostart {}", if autorun { "installed" } else { "removed" }),
        Err(e) => warn!("Failed to update autostart service: {e}"),
    }

    let _ = Command::new("systemctl")
        .args(["--user", "daemon-reload"])
        .status()
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_file_starts_the_daemon() {
        let unit = generate_service_file();
        assert!(unit.contains("ExecStart="));
        assert!(unit.contains(" daemon\n"));
        assert!(unit.contains("WantedBy=graphical-session.target"));
    }
}
