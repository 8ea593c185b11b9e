//! Reactive project list using ArcSwap
//!
//! Readers take lock-free snapshots; every append swaps in a new vector.
//! Subscribers are notified through a tokio watch channel and only ever see
//! the list grow, even when appends race.

use crate::project::types::ProjectRecord;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of the list as seen by readers and subscribers
pub type ProjectSnapshot = Arc<Vec<ProjectRecord>>;

/// Append-only observable list of projects
///
/// Owned by the composition root and shared by `Arc`; there is no global
/// instance. Entries keep insertion order and are never deduplicated.
#[derive(Debug)]
pub struct ProjectList {
    /// Thread-safe atomic pointer to the current entries
    projects: ArcSwap<Vec<ProjectRecord>>,
    /// Latest snapshot published to subscribers
    changes: watch::Sender<ProjectSnapshot>,
}

impl Default for ProjectList {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectList {
    pub fn new() -> Self {
        let initial: ProjectSnapshot = Arc::new(Vec::new());
        let (changes, _) = watch::channel(initial.clone());
        Self {
            projects: ArcSwap::new(initial),
            changes,
        }
    }

    /// Append a record and notify subscribers
    pub fn append(&self, record: ProjectRecord) {
        let id = record.id().to_string();

        // rcu retries the clone-and-push if another append won the swap
        self.projects.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(record.clone());
            next
        });

        let snapshot = self.projects.load_full();
        self.changes.send_if_modified(|published| {
            // Append-only, so a longer list is always the newer one
            if snapshot.len() > published.len() {
                *published = snapshot.clone();
                true
            } else {
                false
            }
        });

        tracing::debug!("Appended project {} to list ({} entries)", id, snapshot.len());
    }

    /// Current entries (lock-free read)
    pub fn snapshot(&self) -> ProjectSnapshot {
        self.projects.load_full()
    }

    pub fn len(&self) -> usize {
        self.projects.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.load().is_empty()
    }

    /// Observe the list; the subscription starts at the current snapshot
    pub fn subscribe(&self) -> ProjectListSubscription {
        ProjectListSubscription {
            rx: self.changes.subscribe(),
        }
    }
}

/// Handle for UI consumers of a `ProjectList`
#[derive(Debug, Clone)]
pub struct ProjectListSubscription {
    rx: watch::Receiver<ProjectSnapshot>,
}

impl ProjectListSubscription {
    /// Latest published snapshot, marking it as seen
    pub fn current(&mut self) -> ProjectSnapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next change; `None` once the list has been dropped
    pub async fn changed(&mut self) -> Option<ProjectSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Record;

    fn record(id: &str, name: &str) -> ProjectRecord {
        let mut fields = Record::new();
        fields.insert("name".into(), name.into());
        ProjectRecord::assemble(id, fields, None)
    }

    #[test]
    fn append_keeps_order_and_duplicates() {
        let list = ProjectList::new();
        assert!(list.is_empty());

        let alpha = record("k1", "Alpha");
        list.append(alpha.clone());
        list.append(record("k2", "Beta"));
        list.append(alpha.clone());

        let ids: Vec<String> = list.snapshot().iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, vec!["k1", "k2", "k1"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn old_snapshots_are_not_affected_by_appends() {
        let list = ProjectList::new();
        list.append(record("k1", "Alpha"));
        let before = list.snapshot();

        list.append(record("k2", "Beta"));

        assert_eq!(before.len(), 1);
        assert_eq!(list.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_appends() {
        let list = ProjectList::new();
        let mut subscription = list.subscribe();
        assert!(subscription.current().is_empty());

        list.append(record("k1", "Alpha"));

        let snapshot = subscription.changed().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), "k1");
    }

    #[tokio::test]
    async fn subscription_ends_when_list_is_dropped() {
        let list = ProjectList::new();
        let mut subscription = list.subscribe();
        drop(list);
        assert!(subscription.changed().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let list = Arc::new(ProjectList::new());
        let mut handles = Vec::new();

        for worker in 0..8 {
            let list = Arc::clone(&list);
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    list.append(record(&format!("k{}-{}", worker, i), "p"));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(list.len(), 200);
        assert_eq!(list.subscribe().current().len(), 200);
    }
}
