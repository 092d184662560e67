use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::RoomCode;

/// Deferred room reclamation. One pending timer per room code; scheduling a
/// code again replaces its previous timer and a revive cancels it.
///
/// Cancellation here is best-effort bookkeeping: the drain-epoch check the
/// reclaim future performs when it fires is what actually keeps a stale
/// timer from removing a revived room.
#[derive(Clone)]
pub struct ReclaimScheduler {
    grace: Duration,
    pending: Arc<DashMap<RoomCode, (u64, JoinHandle<()>)>>,
    generation: Arc<AtomicU64>,
}

impl ReclaimScheduler {
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.grace
    }

    /// Run `reclaim` once the grace window elapses, unless cancelled or
    /// replaced first.
    pub fn schedule<F>(&self, code: RoomCode, reclaim: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let grace = self.grace;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let key = code.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            reclaim.await;
            // Drop our own entry only; a replacement timer keeps its.
            pending.remove_if(&key, |_, (owner, _)| *owner == generation);
        });

        debug!(room_id = %code, grace_secs = grace.as_secs(), "room reclaim scheduled");
        if let Some((_, previous)) = self.pending.insert(code, (generation, handle)) {
            previous.abort();
        }
    }

    /// Cancel the pending reclaim for a room. Returns false when nothing
    /// was pending.
    pub fn cancel(&self, code: &RoomCode) -> bool {
        match self.pending.remove(code) {
            Some((_, (_, handle))) => {
                handle.abort();
                debug!(room_id = %code, "pending room reclaim cancelled");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn code(s: &str) -> RoomCode {
        RoomCode::from_string(s.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_grace_window() {
        let scheduler = ReclaimScheduler::new(Duration::from_secs(60));
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        scheduler.schedule(code("ROOM0001"), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_the_timer() {
        let scheduler = ReclaimScheduler::new(Duration::from_secs(60));
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        scheduler.schedule(code("ROOM0001"), async move {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(scheduler.cancel(&code("ROOM0001")));
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_without_pending_timer() {
        let scheduler = ReclaimScheduler::new(Duration::from_secs(60));
        assert!(!scheduler.cancel(&code("ROOM0001")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_timer() {
        let scheduler = ReclaimScheduler::new(Duration::from_secs(60));
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&first);
        scheduler.schedule(code("ROOM0001"), async move {
            flag.store(true, Ordering::SeqCst);
        });

        let flag = Arc::clone(&second);
        scheduler.schedule(code("ROOM0001"), async move {
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
        assert_eq!(scheduler.pending_count(), 0);
    }
}
