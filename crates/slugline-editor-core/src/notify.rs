//! Change-notification mailboxes.
//!
//! Collaborators (scene, document, format set) own a `Notifier` and `emit`
//! events into it. Every subscriber gets its own mailbox and drains it when it
//! is ready to react, so a notification is always handled to completion before
//! the next one is looked at and nothing ever re-enters a borrowed
//! collaborator.

use std::collections::VecDeque;

/// Identifies one subscriber's mailbox on a `Notifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A collaborator that owns a `Notifier`.
pub trait Observable {
    type Event: Clone;

    fn notifier_mut(&mut self) -> &mut Notifier<Self::Event>;
}

/// Fan-out of events to subscriber mailboxes.
#[derive(Debug, Clone)]
pub struct Notifier<E> {
    next_id: u64,
    mailboxes: Vec<(SubscriptionId, VecDeque<E>)>,
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            mailboxes: Vec::new(),
        }
    }
}

impl<E: Clone> Notifier<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new mailbox. Only events emitted after this call are delivered.
    pub fn subscribe(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.mailboxes.push((id, VecDeque::new()));
        id
    }

    /// Close a mailbox, dropping anything still queued in it.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.mailboxes.len();
        self.mailboxes.retain(|(sub, _)| *sub != id);
        self.mailboxes.len() != before
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.mailboxes.iter().any(|(sub, _)| *sub == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.mailboxes.len()
    }

    /// Deliver an event to every open mailbox.
    pub fn emit(&mut self, event: E) {
        if let Some(((_, last), rest)) = self.mailboxes.split_last_mut() {
            for (_, queue) in rest {
                queue.push_back(event.clone());
            }
            last.push_back(event);
        }
    }

    /// Take everything queued for `id`, oldest first.
    pub fn drain(&mut self, id: SubscriptionId) -> Vec<E> {
        self.mailbox_mut(id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Take the oldest queued event for `id`.
    pub fn pop(&mut self, id: SubscriptionId) -> Option<E> {
        self.mailbox_mut(id)?.pop_front()
    }

    /// Number of events currently queued for `id`.
    pub fn mark(&self, id: SubscriptionId) -> usize {
        self.mailboxes
            .iter()
            .find(|(sub, _)| *sub == id)
            .map(|(_, queue)| queue.len())
            .unwrap_or(0)
    }

    /// Drop every event queued for `id` after `mark`.
    ///
    /// Used to swallow the echoes of a subscriber's own mutations.
    pub fn discard_since(&mut self, id: SubscriptionId, mark: usize) {
        if let Some(queue) = self.mailbox_mut(id) {
            queue.truncate(mark);
        }
    }

    fn mailbox_mut(&mut self, id: SubscriptionId) -> Option<&mut VecDeque<E>> {
        self.mailboxes
            .iter_mut()
            .find(|(sub, _)| *sub == id)
            .map(|(_, queue)| queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let mut notifier = Notifier::new();
        notifier.emit(1);
        let id = notifier.subscribe();
        assert!(notifier.drain(id).is_empty());
    }

    #[test]
    fn test_each_subscriber_gets_a_copy() {
        let mut notifier = Notifier::new();
        let a = notifier.subscribe();
        let b = notifier.subscribe();
        notifier.emit("x");
        notifier.emit("y");

        assert_eq!(notifier.drain(a), vec!["x", "y"]);
        assert_eq!(notifier.pop(b), Some("x"));
        assert_eq!(notifier.drain(b), vec!["y"]);
    }

    #[test]
    fn test_unsubscribe_closes_mailbox() {
        let mut notifier = Notifier::new();
        let a = notifier.subscribe();
        notifier.emit(1);
        assert!(notifier.unsubscribe(a));
        assert!(!notifier.unsubscribe(a));
        assert_eq!(notifier.subscriber_count(), 0);
        assert!(notifier.drain(a).is_empty());
    }

    #[test]
    fn test_discard_since_drops_only_newer_events() {
        let mut notifier = Notifier::new();
        let a = notifier.subscribe();
        notifier.emit(1);
        let mark = notifier.mark(a);
        notifier.emit(2);
        notifier.emit(3);
        notifier.discard_since(a, mark);
        assert_eq!(notifier.drain(a), vec![1]);
    }
}
