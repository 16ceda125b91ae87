//! Email delivery for RSVP notifications.
//!
//! Only the `console` provider is built in: messages are written to the log
//! instead of being sent. [`EmailNotificationDispatcher`] turns each
//! [`RsvpCreated`] event into an attendee confirmation and an admin notice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::models::{Event, EventId};
use domain::services::{
    with_timeout, NotificationDispatcher, NotificationResult, RecordStore, RsvpCreated,
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;
use crate::middleware::metrics::record_notification_failure;

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

/// Email message to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Recipient name (optional)
    pub to_name: Option<String>,
    pub subject: String,
    /// Plain text body
    pub body_text: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }

    /// Send an email message. A disabled service accepts and drops it.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        if !shared::validation::is_valid_email(&message.to) {
            return Err(EmailError::InvalidAddress(message.to));
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Console provider - logs email to console (for development).
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );
        info!(body_text = %message.body_text, "Email body (plain text)");
        Ok(())
    }
}

/// Builds the RSVP emails for an event.
pub struct RsvpEmails<'a> {
    pub event: &'a Event,
    pub base_url: &'a str,
}

impl<'a> RsvpEmails<'a> {
    /// Confirmation sent to the attendee.
    pub fn confirmation(&self, rsvp: &RsvpCreated) -> EmailMessage {
        let mut body = format!(
            "Hi {},\n\nThank you for your RSVP to \"{}\".\n\n",
            rsvp.name, self.event.title
        );
        body.push_str(&self.detail_lines());
        body.push_str("\nWe look forward to seeing you!\n");

        EmailMessage {
            to: rsvp.email.clone(),
            to_name: Some(rsvp.name.clone()),
            subject: format!("RSVP Confirmation: {}", self.event.title),
            body_text: body,
        }
    }

    /// Notice sent to the site administrator.
    pub fn admin_notice(&self, rsvp: &RsvpCreated, admin_email: &str) -> EmailMessage {
        let mut body = format!(
            "A new RSVP has been received for \"{}\".\n\nName: {}\nEmail: {}\n\n",
            self.event.title, rsvp.name, rsvp.email
        );
        body.push_str(&self.detail_lines());

        EmailMessage {
            to: admin_email.to_string(),
            to_name: None,
            subject: format!("New RSVP: {} - {}", self.event.title, rsvp.name),
            body_text: body,
        }
    }

    fn detail_lines(&self) -> String {
        let mut lines = String::from("Event Details:\n");
        if let Some(date) = self.event.date {
            lines.push_str(&format!("Date: {}\n", date.format("%B %-d, %Y")));
        }
        if let Some(time) = &self.event.time {
            lines.push_str(&format!("Time: {}\n", time));
        }
        if !self.event.location.is_empty() {
            lines.push_str(&format!("Location: {}\n", self.event.location));
        }
        if let Some(link) = event_link(self.base_url, self.event.id) {
            lines.push_str(&format!("\nView event: {}\n", link));
        }
        lines
    }
}

fn event_link(base_url: &str, id: EventId) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    if base.is_empty() {
        None
    } else {
        Some(format!("{}/events/{}", base, id))
    }
}

/// [`NotificationDispatcher`] that emails the attendee and the admin.
pub struct EmailNotificationDispatcher {
    email: EmailService,
    store: Arc<dyn RecordStore>,
    store_timeout: Duration,
}

impl EmailNotificationDispatcher {
    pub fn new(email: EmailService, store: Arc<dyn RecordStore>, store_timeout: Duration) -> Self {
        Self {
            email,
            store,
            store_timeout,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for EmailNotificationDispatcher {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn dispatch(&self, rsvp: &RsvpCreated) -> NotificationResult {
        if !self.email.is_enabled() {
            return NotificationResult::Skipped;
        }

        let event = match with_timeout(
            self.store_timeout,
            "get_event",
            self.store.get_event(rsvp.event_id),
        )
        .await
        {
            Ok(Some(event)) => event,
            Ok(None) => {
                record_notification_failure(self.name(), "event_missing");
                return NotificationResult::Failed(format!("Event {} not found", rsvp.event_id));
            }
            Err(e) => {
                record_notification_failure(self.name(), "store");
                return NotificationResult::Failed(e.to_string());
            }
        };

        let emails = RsvpEmails {
            event: &event,
            base_url: &self.email.config().base_url,
        };

        let mut failures = Vec::new();

        if let Err(e) = self.email.send(emails.confirmation(rsvp)).await {
            record_notification_failure(self.name(), "attendee");
            failures.push(format!("attendee: {}", e));
        }

        let admin_email = self.email.config().admin_email.clone();
        if !admin_email.is_empty() {
            if let Err(e) = self.email.send(emails.admin_notice(rsvp, &admin_email)).await {
                record_notification_failure(self.name(), "admin");
                failures.push(format!("admin: {}", e));
            }
        }

        if failures.is_empty() {
            NotificationResult::Sent
        } else {
            NotificationResult::Failed(failures.join("; "))
        }
    }
}
