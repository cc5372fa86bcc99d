//! helpdesk - IT support ticket desk
//!
//! Entry point for the CLI. Parses arguments, loads configuration, installs
//! logging and dispatches to the command handlers.

use clap::Parser;
use helpdesk::cli::handlers::{
    CreateParams, HandlerContext, ListParams, handle_assign, handle_comment, handle_create,
    handle_directory_command, handle_init, handle_list, handle_notification_command,
    handle_rate, handle_show, handle_stats, handle_status,
};
use helpdesk::cli::{Cli, Commands, OutputFormatter};
use helpdesk::config::Config;
use helpdesk::error::{HelpdeskError, Result};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.json, cli.no_color);

    if let Err(e) = run(cli, &formatter).await {
        handle_error(&e, &formatter);
        process::exit(1);
    }
}

async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(url) = cli.database {
        config.database.url = url;
    }

    init_logging(cli.verbose, &config.logging.level);

    let ctx = HandlerContext::open(config).await?;
    let result = dispatch_command(&ctx, cli.command, formatter).await;
    ctx.finish().await;
    result
}

/// Log to stderr so JSON output on stdout stays clean
fn init_logging(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn dispatch_command(ctx: &HandlerContext, command: Commands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        Commands::Init => handle_init(ctx, formatter).await,
        Commands::Directory(command) => handle_directory_command(ctx, command, formatter).await,
        Commands::Create {
            employee,
            device_type,
            device_name,
            description,
            priority,
            attachments,
        } => {
            handle_create(
                ctx,
                CreateParams {
                    employee,
                    device_type,
                    device_name,
                    description,
                    priority,
                    attachments,
                },
                formatter,
            )
            .await
        },
        Commands::List {
            employee,
            provider,
            status,
            priority,
            search,
            limit,
            offset,
        } => {
            handle_list(
                ctx,
                ListParams {
                    employee,
                    provider,
                    status,
                    priority,
                    search,
                    limit,
                    offset,
                },
                formatter,
            )
            .await
        },
        Commands::Show { ticket } => handle_show(ctx, ticket, formatter).await,
        Commands::Assign {
            ticket,
            provider,
            by,
        } => handle_assign(ctx, ticket, provider, by, formatter).await,
        Commands::Status {
            ticket,
            status,
            by,
            comment,
        } => handle_status(ctx, ticket, &status, by, comment.as_deref(), formatter).await,
        Commands::Comment {
            ticket,
            message,
            by,
        } => handle_comment(ctx, ticket, &message, by, formatter).await,
        Commands::Rate {
            ticket,
            employee,
            provider,
            score,
            feedback,
        } => handle_rate(ctx, ticket, employee, provider, score, feedback.as_deref(), formatter).await,
        Commands::Stats { employee, provider } => handle_stats(ctx, employee, provider, formatter).await,
        Commands::Notifications(command) => handle_notification_command(ctx, command, formatter).await,
    }
}

/// Display an error with suggestions, or as JSON in JSON mode
fn handle_error(error: &HelpdeskError, formatter: &OutputFormatter) {
    if error.is_infrastructure() {
        tracing::error!(error = %error, "Command failed");
    }

    let suggestions = error.suggestions();
    if formatter.is_json() {
        let _ = formatter.print_json(&serde_json::json!({
            "status": "error",
            "error": error.user_message(),
            "suggestions": suggestions,
            "recoverable": error.is_recoverable(),
            "is_config_error": error.is_config_error(),
        }));
        return;
    }

    formatter.error(&error.user_message());
    if !suggestions.is_empty() {
        eprintln!("\nSuggestions:");
        for suggestion in &suggestions {
            eprintln!("  • {suggestion}");
        }
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}
