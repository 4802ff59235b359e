use std::path::PathBuf;

use checkin_core::export::ExportFormat;
use clap::{Parser, Subcommand};

/// Attendance check-ins that survive a flaky network.
#[derive(Parser, Debug)]
#[command(name = "checkin", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a check-in
    Submit {
        /// Full name
        #[arg(long)]
        name: String,
        /// Registration number or CPF
        #[arg(long)]
        registration: String,
        /// Course or meeting
        #[arg(long)]
        course: Option<String>,
        /// Photo file (jpeg, png or webp)
        #[arg(long)]
        photo: Option<PathBuf>,
    },

    /// List check-ins (admin)
    List {
        /// Match against name or registration
        #[arg(long, default_value = "")]
        search: String,
        /// Match against course
        #[arg(long, default_value = "")]
        course: String,
        /// Reload from the remote store first
        #[arg(long)]
        refresh: bool,
    },

    /// Totals, photos and today's check-ins (admin)
    Stats,

    /// Distinct courses (admin)
    Courses,

    /// Reload records from the remote store
    Reload,

    /// Push check-ins kept on this device to the remote store
    Sync,

    /// Export check-ins to a spreadsheet (admin)
    Export {
        #[arg(long, default_value_t = ExportFormat::Xlsx)]
        format: ExportFormat,
        /// Output file; defaults to attendance_<date>.<ext>
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Save a check-in's photo to a file (admin)
    Photo {
        /// Record id
        id: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Log in as admin
    Login {
        #[arg(long, default_value = "admin")]
        username: String,
        /// Read from a prompt when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Log out
    Logout,

    /// Session, backend and cache status
    Status,

    /// Delete every check-in, remote and local (admin)
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Check the connection to the remote store
    Diagnose,
}
