//! Idle-window batching of file change events.
//!
//! Unlike a per-path debouncer, the batch keeps every change in arrival
//! order and only becomes ready once no event has arrived for the whole
//! window. A delete that follows a write must still be applied after it.

use std::time::{Duration, Instant};

use super::event::FsChange;

/// Pending changes for one root plus the idle deadline.
#[derive(Debug)]
pub struct EventBatch {
    changes: Vec<FsChange>,
    window: Duration,
    /// Set while changes are pending; pushed back on every event.
    deadline: Option<Instant>,
}

impl EventBatch {
    pub fn new(window: Duration) -> Self {
        Self {
            changes: Vec::new(),
            window,
            deadline: None,
        }
    }

    /// Append a change and restart the idle window.
    pub fn record(&mut self, change: FsChange) {
        self.changes.push(change);
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Append several changes from one event.
    pub fn extend(&mut self, changes: impl IntoIterator<Item = FsChange>) {
        for change in changes {
            self.record(change);
        }
    }

    /// When the batch should be flushed, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drain all pending changes in arrival order and disarm the deadline.
    pub fn take(&mut self) -> Vec<FsChange> {
        self.deadline = None;
        std::mem::take(&mut self.changes)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::ChangeKind;
    use std::thread::sleep;

    #[test]
    fn test_batch_basic() {
        let mut batch = EventBatch::new(Duration::from_millis(50));
        assert!(batch.deadline().is_none());

        batch.record(FsChange::new("/w/a.md", ChangeKind::Write));

        assert!(batch.deadline().unwrap() > Instant::now());
        assert_eq!(batch.len(), 1);

        sleep(Duration::from_millis(60));
        assert!(batch.deadline().unwrap() <= Instant::now());

        let changes = batch.take();
        assert_eq!(changes.len(), 1);
        assert!(batch.is_empty());
        assert!(batch.deadline().is_none());
    }

    #[test]
    fn test_batch_deadline_moves_on_new_event() {
        let mut batch = EventBatch::new(Duration::from_millis(50));

        batch.record(FsChange::new("/w/a.md", ChangeKind::Write));
        let first = batch.deadline().unwrap();

        sleep(Duration::from_millis(30));
        batch.record(FsChange::new("/w/b.md", ChangeKind::Write));
        let second = batch.deadline().unwrap();

        assert!(second > first);
        // 60ms after the first event, but only 30ms after the second
        sleep(Duration::from_millis(30));
        assert!(batch.deadline().unwrap() > Instant::now());

        sleep(Duration::from_millis(30));
        assert!(batch.deadline().unwrap() <= Instant::now());
    }

    #[test]
    fn test_batch_keeps_arrival_order_and_duplicates() {
        let mut batch = EventBatch::new(Duration::from_millis(10));
        batch.extend([
            FsChange::new("/w/a.md", ChangeKind::Write),
            FsChange::new("/w/a.md", ChangeKind::Remove),
            FsChange::new("/w/a.md", ChangeKind::Write),
        ]);

        let kinds: Vec<_> = batch.take().into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Write, ChangeKind::Remove, ChangeKind::Write]
        );
    }
}
