use super::HandlerContext;
use crate::cli::NotificationCommands;
use crate::cli::output::OutputFormatter;
use crate::core::{NotificationId, UserId};
use crate::error::Result;

pub async fn handle_notification_command(
    ctx: &HandlerContext,
    command: NotificationCommands,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        NotificationCommands::List {
            user,
            unread,
            limit,
        } => {
            let user_id = UserId(user);
            let notifications = ctx.dispatcher.list(user_id, unread, limit).await?;
            if output.is_json() {
                let unread_count = ctx.dispatcher.unread_count(user_id).await?;
                return output.print_json(&serde_json::json!({
                    "unread_count": unread_count,
                    "notifications": notifications,
                }));
            }
            output.notifications(&notifications);
            Ok(())
        },
        NotificationCommands::Read { id, user } => {
            let changed = ctx.dispatcher.mark_read(NotificationId(id), UserId(user)).await?;
            report(output, changed, "Notification marked as read", "Nothing to mark")
        },
        NotificationCommands::ReadAll { user } => {
            let count = ctx.dispatcher.mark_all_read(UserId(user)).await?;
            if output.is_json() {
                output.print_json(&serde_json::json!({ "status": "success", "updated": count }))
            } else {
                output.success(&format!("Marked {count} notification(s) as read"));
                Ok(())
            }
        },
        NotificationCommands::Delete { id, user } => {
            let deleted = ctx.dispatcher.delete(NotificationId(id), UserId(user)).await?;
            report(output, deleted, "Notification deleted", "Notification not found")
        },
    }
}

fn report(output: &OutputFormatter, changed: bool, done: &str, skipped: &str) -> Result<()> {
    if output.is_json() {
        output.print_json(&serde_json::json!({ "status": "success", "changed": changed }))
    } else {
        if changed {
            output.success(done);
        } else {
            output.warning(skipped);
        }
        Ok(())
    }
}
