use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use phonedesk_core::domain::business::BusinessContext;
use phonedesk_core::domain::call::{CallId, Session};

/// Shared handle to one call's state. A turn holds the lock for its whole
/// read-modify-write.
pub type SessionHandle = Arc<Mutex<Session>>;

/// In-process registry of active calls keyed by call id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<CallId, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(
        &self,
        call_id: &CallId,
        business: &BusinessContext,
        caller_number: &str,
    ) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(call_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(call_id.clone()).or_insert_with(|| {
            debug!(
                event_name = "dialogue.session.created",
                call_id = %call_id,
                business_id = %business.id,
                "session created"
            );
            Arc::new(Mutex::new(Session::new(
                call_id.clone(),
                business.clone(),
                caller_number,
                Utc::now(),
            )))
        });
        Arc::clone(handle)
    }

    pub async fn get(&self, call_id: &CallId) -> Option<SessionHandle> {
        self.sessions.read().await.get(call_id).map(Arc::clone)
    }

    /// Removes the session if present. Discarding an unknown call is a no-op.
    pub async fn discard(&self, call_id: &CallId) -> bool {
        self.sessions.write().await.remove(call_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn sweep(&self, max_age: Duration) -> usize {
        self.sweep_as_of(Utc::now(), max_age).await
    }

    /// Evicts sessions started at least `max_age` before `now`. Sessions whose
    /// lock is held by an in-flight turn are left for the next pass.
    pub async fn sweep_as_of(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => {
                let expired = (now - session.started_at())
                    .to_std()
                    .map(|age| age >= max_age)
                    .unwrap_or(false);
                !expired
            }
            Err(_) => true,
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(
                event_name = "dialogue.session.swept",
                correlation_id = "sweeper",
                evicted,
                remaining = sessions.len(),
                "evicted idle sessions"
            );
        }
        evicted
    }
}

/// Runs `sweep` on a fixed interval until the returned task is aborted.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    every: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        info!(
            event_name = "dialogue.sweeper.started",
            correlation_id = "sweeper",
            interval_secs = every.as_secs(),
            max_age_secs = max_age.as_secs(),
            "session sweeper started"
        );

        loop {
            ticker.tick().await;
            store.sweep(max_age).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use phonedesk_core::domain::business::{BusinessContext, BusinessId};
    use phonedesk_core::domain::call::CallId;

    use super::{spawn_sweeper, SessionStore};

    fn business() -> BusinessContext {
        BusinessContext::new(BusinessId("biz-1".to_string()), "Spice Route")
    }

    fn call(id: &str) -> CallId {
        CallId(id.to_string())
    }

    #[tokio::test]
    async fn get_or_create_returns_the_same_session() {
        let store = SessionStore::new();
        let first = store.get_or_create(&call("CA-1"), &business(), "+15550001111").await;
        first.lock().await.record_caller_turn("hello");

        let second = store.get_or_create(&call("CA-1"), &business(), "+15550002222").await;
        let session = second.lock().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.turn_count(), 1);
        assert_eq!(session.caller_number, "+15550001111");
    }

    #[tokio::test]
    async fn discard_is_idempotent() {
        let store = SessionStore::new();
        store.get_or_create(&call("CA-2"), &business(), "+15550001111").await;

        assert!(store.discard(&call("CA-2")).await);
        assert!(!store.discard(&call("CA-2")).await);
        assert!(store.get(&call("CA-2")).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sweep_evicts_only_old_sessions() {
        let store = SessionStore::new();
        store.get_or_create(&call("CA-old"), &business(), "+15550001111").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let fresh = store.get_or_create(&call("CA-new"), &business(), "+15550001111").await;
        let now = fresh.lock().await.started_at();

        let evicted = store.sweep_as_of(now, Duration::from_millis(1)).await;
        assert_eq!(evicted, 1);
        assert!(store.get(&call("CA-old")).await.is_none());
        assert!(store.get(&call("CA-new")).await.is_some());
    }

    #[tokio::test]
    async fn sweep_skips_sessions_held_by_a_turn() {
        let store = SessionStore::new();
        let handle = store.get_or_create(&call("CA-busy"), &business(), "+15550001111").await;
        let guard = handle.lock().await;

        let later = Utc::now() + chrono::Duration::hours(3);
        assert_eq!(store.sweep_as_of(later, Duration::from_secs(60)).await, 0);
        drop(guard);

        assert_eq!(store.sweep_as_of(later, Duration::from_secs(60)).await, 1);
    }

    #[tokio::test]
    async fn different_calls_progress_independently() {
        let store = Arc::new(SessionStore::new());
        let mut tasks = Vec::new();
        for index in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                let id = CallId(format!("CA-{index}"));
                for turn in 0..5 {
                    let handle = store.get_or_create(&id, &business(), "+15550001111").await;
                    handle.lock().await.record_caller_turn(format!("turn {turn}"));
                }
            }));
        }
        for task in tasks {
            task.await.expect("task completes");
        }

        assert_eq!(store.len().await, 8);
        for index in 0..8 {
            let handle = store.get(&CallId(format!("CA-{index}"))).await.expect("session");
            assert_eq!(handle.lock().await.turn_count(), 5);
        }
    }

    #[tokio::test]
    async fn sweeper_task_runs_on_its_interval() {
        let store = Arc::new(SessionStore::new());
        store.get_or_create(&call("CA-idle"), &business(), "+15550001111").await;

        let sweeper = spawn_sweeper(
            Arc::clone(&store),
            Duration::from_millis(10),
            Duration::from_millis(1),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(store.is_empty().await);
        sweeper.abort();
    }
}
