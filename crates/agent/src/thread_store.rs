//! Process-wide conversation state.
//!
//! Threads are created lazily on first use of an id and live until the
//! process exits; nothing is persisted and nothing is ever deleted. Each
//! thread sits behind its own async mutex, held for a whole turn.

use capstone_core::message::{ConversationThread, ThreadId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Default)]
pub struct ThreadStore {
    threads: RwLock<HashMap<ThreadId, Arc<Mutex<ConversationThread>>>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: &ThreadId) -> Arc<Mutex<ConversationThread>> {
        if let Some(slot) = self.threads.read().await.get(id) {
            return slot.clone();
        }
        self.threads
            .write()
            .await
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(thread_id = %id, "Creating thread");
                Arc::new(Mutex::new(ConversationThread::new(id.clone())))
            })
            .clone()
    }

    /// Exclusive access to a thread, creating it if needed. Other turns on
    /// the same id wait until the guard is dropped.
    pub async fn acquire(&self, id: &ThreadId) -> OwnedMutexGuard<ConversationThread> {
        self.slot(id).await.lock_owned().await
    }

    /// A copy of the thread's current history, or `None` if it was never used.
    /// Waits for any turn in progress on that thread.
    pub async fn snapshot(&self, id: &ThreadId) -> Option<ConversationThread> {
        let slot = self.threads.read().await.get(id).cloned()?;
        let thread = slot.lock().await;
        Some(thread.clone())
    }

    pub async fn contains(&self, id: &ThreadId) -> bool {
        self.threads.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.threads.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstone_core::message::Message;
    use std::time::Duration;

    #[tokio::test]
    async fn threads_are_created_lazily() {
        let store = ThreadStore::new();
        let id = ThreadId::from("t1");
        assert!(store.snapshot(&id).await.is_none());
        assert!(store.is_empty().await);

        store.acquire(&id).await.push(Message::user("hi"));

        assert!(store.contains(&id).await);
        assert_eq!(store.snapshot(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_is_kept_across_acquisitions() {
        let store = ThreadStore::new();
        let id = ThreadId::default();
        store.acquire(&id).await.push(Message::user("one"));
        store.acquire(&id).await.push(Message::user("two"));

        let thread = store.snapshot(&id).await.unwrap();
        let contents: Vec<&str> = thread.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn same_thread_turns_are_serialized() {
        let store = Arc::new(ThreadStore::new());
        let id = ThreadId::from("shared");

        let mut tasks = Vec::new();
        for i in 0..4 {
            let store = store.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let mut thread = store.acquire(&id).await;
                let before = thread.len();
                tokio::time::sleep(Duration::from_millis(10)).await;
                thread.push(Message::user(format!("turn {i}")));
                assert_eq!(thread.len(), before + 1);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(store.snapshot(&id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn different_threads_do_not_block_each_other() {
        let store = ThreadStore::new();
        let _held = store.acquire(&ThreadId::from("a")).await;
        let mut other = store.acquire(&ThreadId::from("b")).await;
        other.push(Message::user("not blocked"));
        assert_eq!(other.len(), 1);
    }
}
