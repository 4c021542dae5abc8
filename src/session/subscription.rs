//! Background task guards

use tokio::task::JoinHandle;

/// Owns a spawned task and aborts it when dropped
#[derive(Debug)]
pub struct Subscription {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self { name, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!("Cancelling {} task", self.name);
            self.handle.abort();
        }
    }
}

/// Subscriptions torn down together
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.retain(|s| !s.is_finished());
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Abort every held task
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let handle = tokio::spawn(async move {
            let _tx = tx;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        let mut set = SubscriptionSet::new();
        set.push(Subscription::new("sleeper", handle));
        assert_eq!(set.len(), 1);

        set.clear();
        assert!(set.is_empty());
        // Sender dropped with the aborted task
        assert_eq!(rx.recv().await, None);
    }
}
