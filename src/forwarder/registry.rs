//! Registry of running bulk forward tasks.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use super::runner::{run_bulk_forward, ForwardReport};
use crate::telegram::{ChannelGateway, ReplySink};

/// Reasons a forward task is not started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("A forward to {0} is already in progress.")]
    AlreadyRunning(String),
}

/// A forward routine that has been launched and not yet finished.
#[derive(Debug, Clone)]
pub struct ForwardTask {
    pub id: u64,
    pub source: String,
    pub target: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    active: HashMap<u64, ForwardTask>,
}

/// Launches forward routines as detached tasks and tracks them until they
/// finish.
///
/// With `single_flight` disabled any number of routines may run at once,
/// including several into the same target.
#[derive(Debug, Clone)]
pub struct ForwardRegistry {
    inner: Arc<Mutex<Inner>>,
    single_flight: bool,
}

impl ForwardRegistry {
    #[must_use]
    pub fn new(single_flight: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            single_flight,
        }
    }

    /// Starts a bulk forward in the background and returns its task id.
    ///
    /// The caller is never blocked on the routine; its outcome reaches the
    /// user only through `reply`.
    pub async fn spawn(
        &self,
        gateway: Arc<dyn ChannelGateway>,
        source: String,
        target: String,
        reply: Arc<dyn ReplySink>,
    ) -> Result<u64, SpawnError> {
        let id = {
            let mut inner = self.inner.lock().await;

            if self.single_flight && inner.active.values().any(|t| t.target == target) {
                return Err(SpawnError::AlreadyRunning(target));
            }

            inner.next_id += 1;
            let id = inner.next_id;
            inner.active.insert(
                id,
                ForwardTask {
                    id,
                    source: source.clone(),
                    target: target.clone(),
                    started_at: Utc::now(),
                },
            );
            id
        };

        info!("Starting forward task #{} ({} -> {})", id, source, target);

        let registry = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let report =
                run_bulk_forward(gateway.as_ref(), &source, &target, reply.as_ref()).await;

            let task = registry.lock().await.active.remove(&id);
            let elapsed_secs = task.map_or(0, |t| (Utc::now() - t.started_at).num_seconds());
            match &report {
                ForwardReport::Completed { forwarded, total } => info!(
                    "Forward task #{} finished in {}s: {}/{} ({} failed)",
                    id,
                    elapsed_secs,
                    forwarded,
                    total,
                    report.failed()
                ),
                ForwardReport::HistoryFailed(reason) => {
                    info!("Forward task #{} aborted: {}", id, reason);
                }
            }
        });

        Ok(id)
    }

    /// Returns the tasks that are still running.
    pub async fn active(&self) -> Vec<ForwardTask> {
        let mut tasks: Vec<ForwardTask> =
            self.inner.lock().await.active.values().cloned().collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    pub async fn is_idle(&self) -> bool {
        self.inner.lock().await.active.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;
    use crate::forwarder::runner::tests::{FakeGateway, RecordingReply};

    pub(crate) async fn wait_idle(registry: &ForwardRegistry) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !registry.is_idle().await {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_spawned_task_deregisters() {
        let registry = ForwardRegistry::new(false);
        let gateway = Arc::new(FakeGateway::with_history(&[2, 1]));
        let reply = Arc::new(RecordingReply::default());

        let id = registry
            .spawn(gateway.clone(), "abc".to_owned(), "xyz".to_owned(), reply.clone())
            .await
            .unwrap();
        assert_eq!(id, 1);

        wait_idle(&registry).await;
        assert_eq!(gateway.attempted_ids(), vec![1, 2]);
        assert_eq!(reply.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_forwards_allowed_by_default() {
        let registry = ForwardRegistry::new(false);
        let gateway = Arc::new(FakeGateway::with_history(&[1]));
        let reply = Arc::new(RecordingReply::default());

        let first = registry
            .spawn(gateway.clone(), "abc".to_owned(), "xyz".to_owned(), reply.clone())
            .await;
        let second = registry
            .spawn(gateway.clone(), "abc".to_owned(), "xyz".to_owned(), reply.clone())
            .await;

        assert!(first.is_ok());
        assert!(second.is_ok());
        wait_idle(&registry).await;
        assert_eq!(gateway.attempted_ids(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_single_flight_rejects_same_target() {
        let registry = ForwardRegistry::new(true);
        {
            let mut inner = registry.inner.lock().await;
            inner.next_id = 7;
            inner.active.insert(
                7,
                ForwardTask {
                    id: 7,
                    source: "abc".to_owned(),
                    target: "xyz".to_owned(),
                    started_at: Utc::now(),
                },
            );
        }

        let gateway = Arc::new(FakeGateway::with_history(&[1]));
        let reply = Arc::new(RecordingReply::default());

        let result = registry
            .spawn(gateway.clone(), "abc".to_owned(), "xyz".to_owned(), reply.clone())
            .await;
        assert_eq!(result, Err(SpawnError::AlreadyRunning("xyz".to_owned())));

        let other = registry
            .spawn(gateway, "abc".to_owned(), "other".to_owned(), reply)
            .await;
        assert_eq!(other, Ok(8));

        let ids: Vec<u64> = registry.active().await.iter().map(|t| t.id).collect();
        assert!(ids.contains(&7));
        assert_eq!(ids.first(), Some(&7));
    }
}
