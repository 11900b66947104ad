use std::{fmt, future::Future};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::warn;

/// Collections a write can touch. Live views refresh only on events for
/// their own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    RideRequests,
    Trips,
}

/// In-process change feed. The ledger publishes a collection tag after every
/// committed write; views re-run their query when they see a relevant tag.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Collection>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn publish(&self, collection: Collection) {
        // Nobody listening is fine.
        let _ = self.tx.send(collection);
    }

    fn subscribe(&self) -> broadcast::Receiver<Collection> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live query subscription. Holds the latest snapshot and refreshes it in
/// the background for as long as the handle is alive; dropping the handle (or
/// calling [`LiveView::unsubscribe`]) stops the refresh task. Cancellation is
/// cooperative: a refresh already running may finish, but no further snapshot
/// is observable through this handle.
pub struct LiveView<T> {
    rx: watch::Receiver<Vec<T>>,
    task: JoinHandle<()>,
}

impl<T> fmt::Debug for LiveView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveView").finish_non_exhaustive()
    }
}

impl<T: Clone> LiveView<T> {
    /// The most recent snapshot.
    pub fn current(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot that differs from the last one seen
    /// through this handle. Returns `None` if the change feed shut down.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Registers a live query: loads the current matching set and spawns a task
/// that re-runs `query` on every change event for `collection`, publishing
/// the result only when the matched set actually changed.
///
/// The feed subscription is taken before the initial load runs. A write that
/// commits while the load is in flight therefore lands in the receiver and
/// triggers a redundant refresh instead of going unseen.
pub async fn spawn_view<T, F, Fut>(
    feed: &ChangeFeed,
    collection: Collection,
    query: F,
) -> Result<LiveView<T>, crate::error::AppError>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, crate::error::AppError>> + Send,
{
    let mut events = feed.subscribe();
    let initial = query().await?;
    let (tx, rx) = watch::channel(initial);

    let task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(tag) if tag == collection => {}
                Ok(_) => continue,
                // Missed events: the snapshot query is self-healing, refresh.
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }

            match query().await {
                Ok(rows) => {
                    tx.send_if_modified(|current| {
                        if *current != rows {
                            *current = rows;
                            true
                        } else {
                            false
                        }
                    });
                }
                Err(err) => warn!("live view refresh failed: {err}"),
            }
        }
    });

    Ok(LiveView { rx, task })
}
