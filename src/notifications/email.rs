use crate::config::NotificationConfig;
use crate::core::{Status, TicketDetails};
use crate::error::{HelpdeskError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tera::{Context, Tera};

/// Upper bound for a single delivery attempt
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound mail delivery
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

/// Transport that only logs what would have been sent
#[derive(Debug, Clone)]
pub struct LogMailTransport {
    from: String,
}

impl LogMailTransport {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        tracing::info!(
            from = %self.from,
            to,
            subject,
            bytes = html_body.len(),
            "Email delivered to log transport"
        );
        Ok(())
    }
}

const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
<div style="max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #2c3e50;">{% block heading %}{% endblock heading %}</h2>
{% block content %}{% endblock content %}
<p>Ticket Number: <strong>{{ ticket_number }}</strong></p>
<p style="color: #999; font-size: 12px;">This is an automated message from {{ from_name }}.</p>
</div>
</body>
</html>"#;

const TICKET_CREATED: &str = r#"{% extends "layout.html" %}
{% block heading %}Ticket Created{% endblock heading %}
{% block content %}
<p>Dear {{ recipient_name }},</p>
<p>Your support ticket has been created and is awaiting assignment.</p>
<p>Device: {{ device_name }} ({{ device_type }})</p>
<p>Priority: {{ priority }}</p>
<p>{{ issue_description }}</p>
{% endblock content %}"#;

const TICKET_ASSIGNED: &str = r#"{% extends "layout.html" %}
{% block heading %}Ticket Assigned{% endblock heading %}
{% block content %}
<p>Dear {{ recipient_name }},</p>
<p>Your ticket has been assigned to {{ provider_name }}.</p>
{% endblock content %}"#;

const PROVIDER_NEW_TICKET: &str = r#"{% extends "layout.html" %}
{% block heading %}New Ticket Assigned{% endblock heading %}
{% block content %}
<p>Dear {{ recipient_name }},</p>
<p>A ticket from {{ employee_name }} ({{ department }}) has been assigned to you.</p>
<p>Device: {{ device_name }} ({{ device_type }})</p>
<p>Priority: {{ priority }}</p>
<p>{{ issue_description }}</p>
{% endblock content %}"#;

const STATUS_CHANGED: &str = r#"{% extends "layout.html" %}
{% block heading %}Ticket Updated{% endblock heading %}
{% block content %}
<p>Dear {{ recipient_name }},</p>
<p>The status of your ticket changed from <strong>{{ old_status }}</strong> to <strong>{{ new_status }}</strong>.</p>
{% if comment %}<p>Comment: {{ comment }}</p>{% endif %}
{% endblock content %}"#;

const NEW_COMMENT: &str = r#"{% extends "layout.html" %}
{% block heading %}New Comment{% endblock heading %}
{% block content %}
<p>Dear {{ recipient_name }},</p>
<p>{{ author }} commented on the ticket:</p>
<blockquote>{{ comment }}</blockquote>
{% endblock content %}"#;

/// Fields shared by every ticket email
#[derive(Debug, Serialize)]
struct TicketMail<'a> {
    ticket_number: &'a str,
    from_name: &'a str,
    recipient_name: &'a str,
    employee_name: String,
    department: &'a str,
    device_name: &'a str,
    device_type: &'a str,
    priority: &'a str,
    issue_description: &'a str,
    provider_name: Option<&'a str>,
}

/// Renders ticket emails and hands them to a [`MailTransport`]
///
/// Templates are HTML with autoescaping on, so user text such as comments is
/// escaped when rendered.
pub struct EmailNotifier {
    tera: Tera,
    transport: Arc<dyn MailTransport>,
    from_name: String,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("transport", &"Arc<dyn MailTransport>")
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl EmailNotifier {
    pub fn new(transport: Arc<dyn MailTransport>, from_name: impl Into<String>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("layout.html", LAYOUT),
            ("ticket_created.html", TICKET_CREATED),
            ("ticket_assigned.html", TICKET_ASSIGNED),
            ("provider_new_ticket.html", PROVIDER_NEW_TICKET),
            ("status_changed.html", STATUS_CHANGED),
            ("new_comment.html", NEW_COMMENT),
        ])?;
        Ok(Self {
            tera,
            transport,
            from_name: from_name.into(),
        })
    }

    /// Build from configuration, logging through [`LogMailTransport`]
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let transport = Arc::new(LogMailTransport::new(config.from_address.clone()));
        Self::new(transport, config.from_name.clone())
    }

    fn context(&self, details: &TicketDetails, recipient_name: &str) -> Result<Context> {
        let summary = &details.summary;
        let ticket = details.ticket();
        let mail = TicketMail {
            ticket_number: &ticket.ticket_number,
            from_name: &self.from_name,
            recipient_name,
            employee_name: summary.employee_name(),
            department: &summary.department_name,
            device_name: &ticket.device_name,
            device_type: &summary.device_type_name,
            priority: ticket.priority.as_str(),
            issue_description: &ticket.issue_description,
            provider_name: summary.provider_name.as_deref(),
        };
        Ok(Context::from_serialize(mail)?)
    }

    async fn deliver(&self, to: &str, subject: &str, template: &str, context: &Context) -> Result<()> {
        let body = self.tera.render(template, context)?;
        match tokio::time::timeout(SEND_TIMEOUT, self.transport.send(to, subject, &body)).await {
            Ok(result) => result,
            Err(_) => Err(HelpdeskError::Timeout {
                operation: format!("send_email:{template}"),
            }),
        }
    }

    /// Confirmation to the employee who opened the ticket
    pub async fn ticket_created(&self, details: &TicketDetails) -> Result<()> {
        let context = self.context(details, &details.summary.employee_name())?;
        let subject = format!("Ticket Created - #{}", details.ticket().ticket_number);
        self.deliver(&details.employee_email, &subject, "ticket_created.html", &context)
            .await
    }

    /// Tell the employee who picked up their ticket
    pub async fn ticket_assigned(&self, details: &TicketDetails) -> Result<()> {
        let context = self.context(details, &details.summary.employee_name())?;
        let subject = format!("Ticket Assigned - #{}", details.ticket().ticket_number);
        self.deliver(&details.employee_email, &subject, "ticket_assigned.html", &context)
            .await
    }

    /// Tell the assigned provider about their new ticket
    pub async fn provider_new_ticket(&self, details: &TicketDetails) -> Result<()> {
        let Some(to) = details.provider_email.as_deref() else {
            return Ok(());
        };
        let recipient = details.summary.provider_name.as_deref().unwrap_or("Service Provider");
        let context = self.context(details, recipient)?;
        let subject = format!("New Ticket Assigned - #{}", details.ticket().ticket_number);
        self.deliver(to, &subject, "provider_new_ticket.html", &context).await
    }

    pub async fn status_changed(
        &self,
        details: &TicketDetails,
        old_status: Status,
        new_status: Status,
        comment: Option<&str>,
    ) -> Result<()> {
        let mut context = self.context(details, &details.summary.employee_name())?;
        context.insert("old_status", old_status.as_str());
        context.insert("new_status", new_status.as_str());
        context.insert("comment", &comment);
        let subject = format!("Ticket Updated - #{}", details.ticket().ticket_number);
        self.deliver(&details.employee_email, &subject, "status_changed.html", &context)
            .await
    }

    pub async fn new_comment(
        &self,
        to: &str,
        recipient_name: &str,
        details: &TicketDetails,
        author: &str,
        comment: &str,
    ) -> Result<()> {
        let mut context = self.context(details, recipient_name)?;
        context.insert("author", author);
        context.insert("comment", comment);
        let subject = format!("New Comment on Ticket #{}", details.ticket().ticket_number);
        self.deliver(to, &subject, "new_comment.html", &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Priority;
    use crate::test_utils::TestDesk;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_ticket_created_goes_to_employee() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Laptop fan <loud>", Priority::High).await;
        let details = desk.store.get_by_id(ticket_id).await.unwrap().unwrap();
        let subject = format!("Ticket Created - #{}", details.ticket().ticket_number);

        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .with(eq("ana@example.com"), eq(subject), mockall::predicate::always())
            .times(1)
            .returning(|_, _, body| {
                assert!(body.contains("Dear Ana Lopez"));
                assert!(body.contains("Laptop fan &lt;loud&gt;"));
                Ok(())
            });

        let notifier = EmailNotifier::new(Arc::new(transport), "IT Support").unwrap();
        notifier.ticket_created(&details).await.unwrap();
    }

    #[tokio::test]
    async fn test_status_email_includes_comment() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Printer", Priority::Low).await;
        let details = desk.store.get_by_id(ticket_id).await.unwrap().unwrap();

        let mut transport = MockMailTransport::new();
        transport.expect_send().times(1).returning(|_, subject, body| {
            assert!(subject.starts_with("Ticket Updated - #TKT-"));
            assert!(body.contains("<strong>in_progress</strong>"));
            assert!(body.contains("Comment: Replacing toner"));
            Ok(())
        });

        let notifier = EmailNotifier::new(Arc::new(transport), "IT Support").unwrap();
        notifier
            .status_changed(&details, Status::Assigned, Status::InProgress, Some("Replacing toner"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provider_email_skipped_without_provider() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Tablet", Priority::Low).await;
        let details = desk.store.get_by_id(ticket_id).await.unwrap().unwrap();

        let mut transport = MockMailTransport::new();
        transport.expect_send().never();

        let notifier = EmailNotifier::new(Arc::new(transport), "IT Support").unwrap();
        notifier.provider_new_ticket(&details).await.unwrap();
    }

    #[tokio::test]
    async fn test_log_transport_accepts_everything() {
        let transport = LogMailTransport::new("helpdesk@localhost");
        transport
            .send("someone@example.com", "Subject", "<p>body</p>")
            .await
            .unwrap();
    }
}
