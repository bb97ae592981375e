use kaizen_core::config::NotificationConfig;
use kaizen_core::notify::{Notification, Notifier};
use tokio::sync::mpsc;

/// Hands notifications to a background worker so workflow calls never wait
/// on delivery.
///
/// With a webhook configured the worker POSTs each notification as JSON;
/// otherwise it only logs. Delivery failures are logged and dropped.
pub struct QueuedNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl QueuedNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        // Guard: only spawn if inside a Tokio runtime (skipped in sync unit tests).
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(deliver(rx, config.webhook_url.clone()));
        } else {
            tracing::debug!("no runtime; notifications will be queued but not delivered");
        }
        Self { tx }
    }
}

impl Notifier for QueuedNotifier {
    fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.tx.send(notification) {
            tracing::warn!(template = %e.0.template, "notification worker stopped; dropping");
        }
    }
}

/// Runs until every sender is gone. Returns how many notifications were
/// handled, delivered or not.
async fn deliver(mut rx: mpsc::UnboundedReceiver<Notification>, webhook: Option<String>) -> usize {
    let client = reqwest::Client::new();
    let mut handled = 0;
    while let Some(notification) = rx.recv().await {
        handled += 1;
        let Some(url) = webhook.as_deref() else {
            tracing::info!(
                template = %notification.template,
                subject = %notification.subject,
                recipients = ?notification.recipients,
                "notification"
            );
            continue;
        };
        match client.post(url).json(&notification).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(template = %notification.template, "notification delivered");
            }
            Ok(resp) => {
                tracing::warn!(
                    template = %notification.template,
                    status = %resp.status(),
                    "notification webhook rejected delivery"
                );
            }
            Err(e) => {
                tracing::warn!(template = %notification.template, error = %e, "notification delivery failed");
            }
        }
    }
    tracing::debug!(handled, "notification worker stopped");
    handled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_without_runtime_does_not_block() {
        let notifier = QueuedNotifier::new(&NotificationConfig::default());
        notifier.dispatch(Notification::new("opportunity_created", "New").to("a@example.com"));
    }

    fn queued() -> (QueuedNotifier, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (QueuedNotifier { tx }, rx)
    }

    #[tokio::test]
    async fn worker_drains_queue_without_webhook() {
        let (notifier, rx) = queued();
        for i in 0..3 {
            notifier.dispatch(Notification::new("leader_assigned", format!("n{i}")));
        }
        drop(notifier);
        assert_eq!(deliver(rx, None).await, 3);
    }

    #[tokio::test]
    async fn unreachable_webhook_is_logged_and_skipped() {
        let (notifier, rx) = queued();
        notifier.dispatch(Notification::new("approval_request", "first").to("hod@example.com"));
        notifier.dispatch(Notification::new("approval_request", "second").to("lof@example.com"));
        drop(notifier);
        let handled = deliver(rx, Some("http://127.0.0.1:1/hooks/kaizen".into())).await;
        assert_eq!(handled, 2);
    }

    #[test]
    fn dispatch_after_worker_stopped_is_dropped() {
        let (notifier, rx) = queued();
        drop(rx);
        notifier.dispatch(Notification::new("savings_approved", "late").to("a@example.com"));
    }
}
