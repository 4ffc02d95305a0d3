// Command-line interface definitions for keyswap
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "keyswap")]
#[command(author, version, about = "Keyboard layout converter for selected text")]
#[command(long_about = "
Keyswap is a background utility that fixes text typed in the wrong
keyboard layout. Select the garbled text, press the translate hotkey
(F4 by default), and the selection is re-typed as if it had been entered
in the other layout: 'ghbdtn' becomes '\u{043f}\u{0440}\u{0438}\u{0432}\u{0435}\u{0442}' and back.

USAGE:
  1. Run: keyswap (to start the daemon)
  2. Select mistyped text in any application
  3. Press F4 to convert it in place
  4. Press F10 to stop the daemon
")]
pub struct Cli {
    /// Path to settings file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Convert text between layouts and print the result
    Convert {
        /// Text to convert (reads stdin when omitted)
        text: Option<String>,

        /// Source layout: "latin" or "cyrillic" (auto-detected when omitted)
        #[arg(long, value_name = "LAYOUT")]
        from: Option<String>,
    },

    /// Show current settings
    Config,

    /// Enable the translate hotkey
    Enable,

    /// Disable the translate hotkey (daemon stays running)
    Disable,

    /// Inspect or change hotkey bindings
    Hotkey {
        #[command(subcommand)]
        action: HotkeyAction,
    },

    /// Manage start-on-login
    Autostart {
        #[command(subcommand)]
        action: AutostartAction,
    },
}

#[derive(Subcommand)]
pub enum HotkeyAction {
    /// Show the configured bindings
    Show,

    /// Set a binding from a combo string, e.g. "Ctrl+Alt+T"
    Set {
        /// Which binding to change: translate, exit or case
        role: String,

        /// The combination, e.g. "F4" or "Ctrl+Shift+Y"
        combo: String,
    },

    /// Press the desired combination to set a binding interactively
    Capture {
        /// Which binding to change: translate, exit or case
        role: String,
    },
}

#[derive(Subcommand)]
pub enum AutostartAction {
    /// Install the systemd user service
    Enable,
    /// Remove the systemd user service
    Disable,
    /// Show the service status
    Status,
}
