use serde::Serialize;

/// A templated message to be delivered out of band. Delivery is
/// fire-and-forget: a notifier never reports failure back to the workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub recipients: Vec<String>,
    pub subject: String,
    pub template: String,
    pub context: serde_json::Value,
}

impl Notification {
    pub fn new(template: &str, subject: impl Into<String>) -> Self {
        Self {
            recipients: Vec::new(),
            subject: subject.into(),
            template: template.to_string(),
            context: serde_json::Value::Null,
        }
    }

    /// Add a recipient address, skipping blanks and duplicates.
    pub fn to(mut self, email: &str) -> Self {
        let email = email.trim();
        if !email.is_empty() && !self.recipients.iter().any(|r| r.eq_ignore_ascii_case(email)) {
            self.recipients.push(email.to_string());
        }
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

pub trait Notifier: Send + Sync {
    /// Must return promptly; slow delivery belongs on a background worker.
    fn dispatch(&self, notification: Notification);
}

/// Drops every notification. Used where no delivery channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn dispatch(&self, notification: Notification) {
        tracing::debug!(
            template = %notification.template,
            recipients = notification.recipients.len(),
            "notification dropped"
        );
    }
}
