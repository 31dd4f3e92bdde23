//! # Notification Fan-out
//!
//! Delivers one message to a set of recipients. Each delivery is independent:
//! a failure is logged and never stops delivery to the others.

use futures::future::join_all;
use std::sync::Arc;

use crate::domain::config::Recipient;
use crate::domain::traits::Notifier;
use crate::strings::logs;

#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Sends to one recipient; returns whether it was delivered.
    pub async fn send_to(&self, recipient: &Recipient, content: &str) -> bool {
        match self.notifier.send(&recipient.room, content).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("{}", logs::delivery_failed(&recipient.name, &e));
                false
            }
        }
    }

    /// Sends to a raw room id (command replies).
    pub async fn reply(&self, room: &str, content: &str) {
        if let Err(e) = self.notifier.send(room, content).await {
            tracing::error!("{}", logs::delivery_failed(room, &e));
        }
    }

    /// Sends to every recipient; returns how many deliveries succeeded.
    pub async fn broadcast(&self, recipients: &[Recipient], content: &str) -> usize {
        join_all(recipients.iter().map(|r| self.send_to(r, content)))
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockNotifier;
    use super::*;

    fn recipient(name: &str) -> Recipient {
        Recipient {
            name: name.to_string(),
            room: format!("!{}:example.org", name),
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_block_others() {
        let notifier = Arc::new(MockNotifier {
            failing: vec!["!b:example.org".to_string()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(notifier.clone());
        let recipients = vec![recipient("a"), recipient("b"), recipient("c")];

        let delivered = dispatcher.broadcast(&recipients, "hello").await;
        assert_eq!(delivered, 2);
        assert_eq!(notifier.sent_to("!a:example.org"), vec!["hello".to_string()]);
        assert_eq!(notifier.sent_to("!c:example.org"), vec!["hello".to_string()]);
        assert!(notifier.sent_to("!b:example.org").is_empty());
    }
}
