use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

/// Callback invoked for every decoded inbound message.
pub type SubscriberFn = Arc<dyn Fn(&Value) + Send + Sync>;

/// Opaque handle identifying one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub(crate) u64);

/// Ordered set of subscriber callbacks.
///
/// Insertion order is the dispatch order. A panicking subscriber is isolated
/// so the remaining subscribers still receive the message.
#[derive(Default)]
pub(crate) struct SubscriberSet {
    entries: Vec<(SubscriptionToken, SubscriberFn)>,
    next_id: u64,
}

impl SubscriberSet {
    pub fn add(&mut self, subscriber: SubscriberFn) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_id);
        self.next_id += 1;
        self.entries.push((token, subscriber));
        token
    }

    pub fn remove(&mut self, token: SubscriptionToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != token);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Deliver one message to every subscriber, in registration order.
    pub fn dispatch(&self, message: &Value) {
        for (token, subscriber) in &self.entries {
            let delivered = catch_unwind(AssertUnwindSafe(|| subscriber(message)));
            if delivered.is_err() {
                warn!(token = token.0, "subscriber panicked during dispatch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> SubscriberFn {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |message: &Value| {
            log.lock()
                .expect("log lock should not be poisoned")
                .push(format!("{tag}:{message}"));
        })
    }

    #[test]
    fn dispatches_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = SubscriberSet::default();
        set.add(recorder(&log, "a"));
        set.add(recorder(&log, "b"));
        set.add(recorder(&log, "c"));

        set.dispatch(&json!(1));

        let seen = log.lock().expect("log lock should not be poisoned");
        assert_eq!(*seen, vec!["a:1", "b:1", "c:1"]);
    }

    #[test]
    fn each_message_is_delivered_exactly_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = SubscriberSet::default();
        set.add(recorder(&log, "a"));

        set.dispatch(&json!(1));
        set.dispatch(&json!(2));

        let seen = log.lock().expect("log lock should not be poisoned");
        assert_eq!(*seen, vec!["a:1", "a:2"]);
    }

    #[test]
    fn removed_subscriber_stops_receiving() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = SubscriberSet::default();
        let first = set.add(recorder(&log, "a"));
        set.add(recorder(&log, "b"));

        assert!(set.remove(first));
        assert!(!set.remove(first));
        set.dispatch(&json!(1));

        let seen = log.lock().expect("log lock should not be poisoned");
        assert_eq!(*seen, vec!["b:1"]);
    }

    #[test]
    fn panicking_subscriber_does_not_block_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut set = SubscriberSet::default();
        set.add(recorder(&log, "a"));
        set.add(Arc::new(|_: &Value| panic!("subscriber bug")));
        set.add(recorder(&log, "c"));

        set.dispatch(&json!(1));

        let seen = log.lock().expect("log lock should not be poisoned");
        assert_eq!(*seen, vec!["a:1", "c:1"]);
    }
}
