//! Command-line interface
//!
//! The binary is a thin shell over the library: every command opens the
//! configured database, runs one engine operation and prints the result.

pub mod handlers;
pub mod output;

pub use output::OutputFormatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// IT support ticket desk
#[derive(Parser, Debug)]
#[command(name = "helpdesk", version, about, long_about = None)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./helpdesk.yaml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database URL, overriding the configuration
    #[arg(long, global = true, value_name = "URL", env = "HELPDESK_DATABASE")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Manage departments, device types and accounts
    #[command(subcommand)]
    Directory(DirectoryCommands),

    /// Open a new ticket for an employee
    Create {
        /// Employee profile id
        #[arg(long)]
        employee: i64,

        #[arg(long)]
        device_type: Option<i64>,

        #[arg(long)]
        device_name: Option<String>,

        /// Description of the issue
        #[arg(long, short)]
        description: Option<String>,

        /// low, medium, high or critical
        #[arg(long, short)]
        priority: Option<String>,

        /// Files to attach (repeatable)
        #[arg(long = "attach", value_name = "FILE")]
        attachments: Vec<PathBuf>,
    },

    /// List tickets, newest first
    List {
        #[arg(long)]
        employee: Option<i64>,

        #[arg(long)]
        provider: Option<i64>,

        #[arg(long, short)]
        status: Option<String>,

        #[arg(long, short)]
        priority: Option<String>,

        /// Case-insensitive text over number, description and employee name
        #[arg(long)]
        search: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Show a ticket with attachments, history and rating
    Show { ticket: i64 },

    /// Assign a provider to a ticket
    Assign {
        ticket: i64,

        #[arg(long)]
        provider: i64,

        /// Acting user id
        #[arg(long = "by")]
        by: i64,
    },

    /// Change a ticket's status
    Status {
        ticket: i64,

        /// assigned, in_progress, resolved or closed
        status: String,

        #[arg(long = "by")]
        by: i64,

        #[arg(long, short)]
        comment: Option<String>,
    },

    /// Comment on a ticket
    Comment {
        ticket: i64,

        message: String,

        #[arg(long = "by")]
        by: i64,
    },

    /// Rate the provider who handled a ticket
    Rate {
        ticket: i64,

        #[arg(long)]
        employee: i64,

        #[arg(long)]
        provider: i64,

        /// Score from 1 to 5
        #[arg(long)]
        score: i64,

        #[arg(long)]
        feedback: Option<String>,
    },

    /// Ticket totals by status and priority
    Stats {
        #[arg(long)]
        employee: Option<i64>,

        #[arg(long)]
        provider: Option<i64>,
    },

    /// Read and manage a user's notifications
    #[command(subcommand)]
    Notifications(NotificationCommands),
}

#[derive(Subcommand, Debug)]
pub enum DirectoryCommands {
    AddDepartment {
        name: String,

        #[arg(long, default_value = "General")]
        category: String,
    },

    AddDeviceType { name: String },

    AddEmployee {
        #[arg(long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        department: i64,

        #[arg(long)]
        phone: Option<String>,
    },

    AddProvider {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        specialization: Option<String>,

        #[arg(long, default_value_t = 5)]
        max_tickets: i64,
    },

    AddAdmin {
        #[arg(long)]
        email: String,
    },

    /// List device types
    DeviceTypes,

    /// List providers with their workload
    Providers {
        /// Only providers that can take another ticket
        #[arg(long)]
        available: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotificationCommands {
    List {
        #[arg(long)]
        user: i64,

        #[arg(long)]
        unread: bool,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Mark one notification read
    Read {
        id: i64,

        #[arg(long)]
        user: i64,
    },

    /// Mark every notification read
    ReadAll {
        #[arg(long)]
        user: i64,
    },

    Delete {
        id: i64,

        #[arg(long)]
        user: i64,
    },
}
