use super::HandlerContext;
use crate::attachments::{AttachmentUpload, mime_for_extension};
use crate::cli::output::OutputFormatter;
use crate::core::{
    DeviceTypeId, EmployeeId, Priority, ProviderId, StatisticsFilter, Status, TicketFilter,
    TicketId, TicketInput, UserId,
};
use crate::error::Result;
use crate::lifecycle::Page;
use std::path::{Path, PathBuf};

/// Parameters for the create command
#[derive(Debug)]
pub struct CreateParams {
    pub employee: i64,
    pub device_type: Option<i64>,
    pub device_name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub attachments: Vec<PathBuf>,
}

/// Parameters for the list command
#[derive(Debug)]
pub struct ListParams {
    pub employee: Option<i64>,
    pub provider: Option<i64>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn handle_init(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "database": ctx.config.database.url,
        }))?;
    } else {
        output.success(&format!("Database ready at {}", ctx.config.database.url));
    }
    Ok(())
}

pub async fn handle_create(ctx: &HandlerContext, params: CreateParams, output: &OutputFormatter) -> Result<()> {
    let mut uploads = Vec::with_capacity(params.attachments.len());
    for path in &params.attachments {
        uploads.push(read_upload(path).await?);
    }

    let input = TicketInput {
        device_type_id: params.device_type.map(DeviceTypeId),
        device_name: params.device_name,
        issue_description: params.description,
        priority: params.priority,
    };
    let created = ctx
        .lifecycle
        .create(EmployeeId(params.employee), input, &uploads)
        .await?;

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket_id": created.ticket_id,
            "ticket_number": created.ticket_number,
        }))?;
    } else {
        output.success(&format!(
            "Created ticket {} (id {})",
            created.ticket_number, created.ticket_id
        ));
        if !uploads.is_empty() {
            output.info(&format!("  {} attachment(s) stored", uploads.len()));
        }
    }
    Ok(())
}

async fn read_upload(path: &Path) -> Result<AttachmentUpload> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    let declared = mime_for_extension(extension).unwrap_or("application/octet-stream");
    Ok(AttachmentUpload::new(file_name, declared, bytes))
}

pub async fn handle_list(ctx: &HandlerContext, params: ListParams, output: &OutputFormatter) -> Result<()> {
    let filter = TicketFilter {
        employee_id: params.employee.map(EmployeeId),
        provider_id: params.provider.map(ProviderId),
        status: params.status.as_deref().map(str::parse::<Status>).transpose()?,
        priority: params.priority.as_deref().map(str::parse::<Priority>).transpose()?,
        search: params.search,
    };
    let tickets = ctx
        .lifecycle
        .list_tickets(&filter, Page::new(params.limit, params.offset))
        .await?;

    if output.is_json() {
        output.print_json(&tickets)?;
    } else {
        output.ticket_table(&tickets);
    }
    Ok(())
}

pub async fn handle_show(ctx: &HandlerContext, ticket: i64, output: &OutputFormatter) -> Result<()> {
    let details = ctx.lifecycle.get_ticket(TicketId(ticket)).await?;
    if output.is_json() {
        output.print_json(&details)?;
    } else {
        output.ticket_details(&details);
    }
    Ok(())
}

pub async fn handle_assign(
    ctx: &HandlerContext,
    ticket: i64,
    provider: i64,
    by: i64,
    output: &OutputFormatter,
) -> Result<()> {
    let ticket = ctx
        .lifecycle
        .assign(TicketId(ticket), ProviderId(provider), UserId(by))
        .await?;
    if output.is_json() {
        output.print_json(&ticket)?;
    } else {
        output.success(&format!(
            "Assigned ticket {} to provider {provider}",
            ticket.ticket_number
        ));
    }
    Ok(())
}

pub async fn handle_status(
    ctx: &HandlerContext,
    ticket: i64,
    status: &str,
    by: i64,
    comment: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let ticket = ctx
        .lifecycle
        .update_status(TicketId(ticket), status, UserId(by), comment)
        .await?;
    if output.is_json() {
        output.print_json(&ticket)?;
    } else {
        output.success(&format!("Ticket {} is now {}", ticket.ticket_number, ticket.status));
    }
    Ok(())
}

pub async fn handle_comment(
    ctx: &HandlerContext,
    ticket: i64,
    message: &str,
    by: i64,
    output: &OutputFormatter,
) -> Result<()> {
    let update_id = ctx
        .lifecycle
        .add_comment(TicketId(ticket), UserId(by), message)
        .await?;
    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "update_id": update_id,
        }))?;
    } else {
        output.success("Comment added");
    }
    Ok(())
}

pub async fn handle_rate(
    ctx: &HandlerContext,
    ticket: i64,
    employee: i64,
    provider: i64,
    score: i64,
    feedback: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let aggregate = ctx
        .lifecycle
        .submit_rating(
            TicketId(ticket),
            EmployeeId(employee),
            ProviderId(provider),
            score,
            feedback,
        )
        .await?;
    if output.is_json() {
        output.print_json(&aggregate)?;
    } else {
        let average = aggregate
            .average
            .map_or_else(|| "n/a".to_string(), |avg| format!("{avg:.2}"));
        output.success(&format!(
            "Rating recorded; provider average {average} over {} rating(s)",
            aggregate.total
        ));
    }
    Ok(())
}

pub async fn handle_stats(
    ctx: &HandlerContext,
    employee: Option<i64>,
    provider: Option<i64>,
    output: &OutputFormatter,
) -> Result<()> {
    let stats = ctx
        .lifecycle
        .get_statistics(StatisticsFilter {
            employee_id: employee.map(EmployeeId),
            provider_id: provider.map(ProviderId),
        })
        .await?;
    if output.is_json() {
        output.print_json(&stats)?;
    } else {
        output.statistics(&stats);
    }
    Ok(())
}
