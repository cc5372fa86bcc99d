//! Terminal and JSON output for the CLI

use crate::core::{Status, TicketDetails, TicketStatistics, TicketSummary};
use crate::error::Result;
use crate::notifications::Notification;
use crate::storage::Provider;
use colored::Colorize;
use serde::Serialize;

/// Writes command results either as colored text or as JSON
///
/// In JSON mode only `print_json` and `error` produce output, so stdout stays
/// machine readable.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    json: bool,
}

impl OutputFormatter {
    #[must_use]
    pub fn new(json: bool, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { json }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    pub fn success(&self, message: &str) {
        if !self.json {
            println!("{}", message.green());
        }
    }

    pub fn info(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.json {
            eprintln!("{}", message.yellow());
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {message}", "Error:".red().bold());
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn ticket_table(&self, tickets: &[TicketSummary]) {
        if tickets.is_empty() {
            self.info("No tickets found");
            return;
        }
        self.info(&format!(
            "{:<6} {:<18} {:<12} {:<9} {:<20} {}",
            "ID", "NUMBER", "STATUS", "PRIORITY", "EMPLOYEE", "DEVICE"
        ));
        for summary in tickets {
            let ticket = &summary.ticket;
            self.info(&format!(
                "{:<6} {:<18} {:<12} {:<9} {:<20} {}",
                ticket.id,
                ticket.ticket_number,
                paint_status(ticket.status),
                ticket.priority,
                summary.employee_name(),
                ticket.device_name
            ));
        }
    }

    pub fn ticket_details(&self, details: &TicketDetails) {
        let ticket = details.ticket();
        let summary = &details.summary;
        self.info(&format!("{} {}", "Ticket".bold(), ticket.ticket_number.bold()));
        self.info(&format!("  Status:     {}", paint_status(ticket.status)));
        self.info(&format!("  Priority:   {}", ticket.priority));
        self.info(&format!(
            "  Employee:   {} <{}> ({})",
            summary.employee_name(),
            details.employee_email,
            summary.department_name
        ));
        self.info(&format!(
            "  Device:     {} ({})",
            ticket.device_name, summary.device_type_name
        ));
        if let Some(provider) = &summary.provider_name {
            self.info(&format!("  Provider:   {provider}"));
        }
        self.info(&format!("  Created:    {}", ticket.created_at.format("%Y-%m-%d %H:%M")));
        if let Some(resolved_at) = ticket.resolved_at {
            self.info(&format!("  Resolved:   {}", resolved_at.format("%Y-%m-%d %H:%M")));
        }
        if let Some(closed_at) = ticket.closed_at {
            self.info(&format!("  Closed:     {}", closed_at.format("%Y-%m-%d %H:%M")));
        }
        self.info(&format!("\n{}", ticket.issue_description));

        if !details.attachments.is_empty() {
            self.info(&format!("\n{}", "Attachments".bold()));
            for attachment in &details.attachments {
                self.info(&format!(
                    "  {} ({}, {} bytes)",
                    attachment.file_name, attachment.mime_type, attachment.size_bytes
                ));
            }
        }

        self.info(&format!("\n{}", "History".bold()));
        for update in &details.updates {
            self.info(&format!(
                "  {} [{}] {}: {}",
                update.created_at.format("%Y-%m-%d %H:%M"),
                update.update_type,
                update.author_email,
                update.message
            ));
        }

        if let Some(rating) = &details.rating {
            self.info(&format!("\nRating: {}/5", rating.score));
            if let Some(feedback) = &rating.feedback {
                self.info(&format!("  {feedback}"));
            }
        }
    }

    pub fn statistics(&self, stats: &TicketStatistics) {
        self.info(&format!("{} {}", "Total tickets:".bold(), stats.total));
        self.info("\nBy status:");
        for (status, count) in &stats.by_status {
            self.info(&format!("  {:<12} {count}", paint_status(*status)));
        }
        self.info("\nBy priority:");
        for (priority, count) in &stats.by_priority {
            self.info(&format!("  {:<12} {count}", priority.to_string()));
        }
    }

    pub fn providers(&self, providers: &[Provider]) {
        if providers.is_empty() {
            self.info("No providers found");
            return;
        }
        for provider in providers {
            let rating = provider
                .rating_average
                .map_or_else(|| "unrated".to_string(), |avg| format!("{avg:.1} ({})", provider.total_ratings));
            self.info(&format!(
                "{:<4} {:<20} {}/{} tickets  rating {}{}",
                provider.id,
                provider.provider_name,
                provider.current_assignments,
                provider.max_concurrent_tickets,
                rating,
                if provider.is_available { "" } else { "  (unavailable)" }
            ));
        }
    }

    pub fn notifications(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            self.info("No notifications");
            return;
        }
        for n in notifications {
            let marker = if n.is_read { " ".normal() } else { "●".blue() };
            self.info(&format!(
                "{marker} {:<4} {} {}: {}",
                n.id,
                n.created_at.format("%Y-%m-%d %H:%M"),
                n.title.bold(),
                n.message
            ));
        }
    }
}

fn paint_status(status: Status) -> String {
    let text = status.as_str();
    match status {
        Status::Pending => text.yellow().to_string(),
        Status::Assigned => text.cyan().to_string(),
        Status::InProgress => text.blue().to_string(),
        Status::Resolved => text.green().to_string(),
        Status::Closed => text.dimmed().to_string(),
    }
}
