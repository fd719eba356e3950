//! In-process store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rookery_protocol::{GameResult, GameStatus, MoveToken, SessionId, UserId};
use tokio::sync::Mutex;

use crate::{QueueEntry, SessionRecord, SessionStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<SessionId, SessionRecord>,
    /// Insertion order is queue order.
    queue: Vec<QueueEntry>,
}

/// A [`SessionStore`] held entirely in memory.
///
/// Durable only for the life of the process. Writes can be made to fail on
/// demand with [`fail_writes`](Self::fail_writes), which is how the
/// persistence-failure paths above the store are tested.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While `true`, every write returns [`StoreError::Unavailable`] and
    /// changes nothing. Reads keep working.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Inserts a record as-is, bypassing the append-only API. Used to seed
    /// legacy or damaged records.
    pub async fn insert_record(&self, record: SessionRecord) {
        let mut tables = self.tables.lock().await;
        tables.sessions.insert(record.id.clone(), record);
    }

    /// Number of users currently in the queue.
    pub async fn queue_len(&self) -> usize {
        self.tables.lock().await.queue.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes are disabled".into()));
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        id: &SessionId,
        white: UserId,
        black: Option<UserId>,
        status: GameStatus,
    ) -> Result<SessionRecord, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        if tables.sessions.contains_key(id) {
            return Err(StoreError::SessionExists(id.clone()));
        }
        let record = SessionRecord::new(id.clone(), white, black, status);
        tables.sessions.insert(id.clone(), record.clone());
        Ok(record)
    }

    async fn append_move(&self, id: &SessionId, token: &MoveToken) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let record = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.clone()))?;
        record.moves.push(token.clone());
        record.touch();
        Ok(())
    }

    async fn commit_move(
        &self,
        id: &SessionId,
        token: &MoveToken,
        result: Option<GameResult>,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let record = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.clone()))?;
        record.moves.push(token.clone());
        if let Some(result) = result {
            record.status = GameStatus::Finished;
            record.result = Some(result);
        }
        record.touch();
        Ok(())
    }

    async fn set_status(
        &self,
        id: &SessionId,
        status: GameStatus,
        result: Option<GameResult>,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let record = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.clone()))?;
        record.status = status;
        record.result = result;
        record.touch();
        Ok(())
    }

    async fn seat_black(&self, id: &SessionId, user: UserId) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let record = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.clone()))?;
        record.black = Some(user);
        record.status = GameStatus::Active;
        record.touch();
        Ok(())
    }

    async fn read_session(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.tables.lock().await.sessions.get(id).cloned())
    }

    async fn create_queue_entry(&self, user: UserId) -> Result<QueueEntry, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.queue.iter().find(|e| e.user_id == user) {
            return Ok(*existing);
        }
        let entry = QueueEntry::new(user);
        tables.queue.push(entry);
        Ok(entry)
    }

    async fn delete_queue_entry(&self, user: UserId) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let before = tables.queue.len();
        tables.queue.retain(|e| e.user_id != user);
        Ok(tables.queue.len() != before)
    }

    async fn find_queue_entry_excluding(
        &self,
        user: UserId,
    ) -> Result<Option<QueueEntry>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.queue.iter().find(|e| e.user_id != user).copied())
    }

    async fn clear_queue(&self) -> Result<(), StoreError> {
        self.check_writable()?;
        self.tables.lock().await.queue.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SessionId {
        SessionId::new(s)
    }

    #[tokio::test]
    async fn test_create_session_duplicate_id_fails() {
        let store = MemoryStore::new();
        store
            .create_session(&sid("a"), UserId(1), Some(UserId(2)), GameStatus::Active)
            .await
            .unwrap();
        let err = store
            .create_session(&sid("a"), UserId(3), None, GameStatus::Waiting)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionExists(_)));
    }

    #[tokio::test]
    async fn test_append_move_preserves_order() {
        let store = MemoryStore::new();
        store
            .create_session(&sid("a"), UserId(1), Some(UserId(2)), GameStatus::Active)
            .await
            .unwrap();
        for token in ["e2e4", "e7e5", "g1f3"] {
            store.append_move(&sid("a"), &MoveToken::new(token)).await.unwrap();
        }
        let record = store.read_session(&sid("a")).await.unwrap().unwrap();
        let moves: Vec<&str> = record.moves.iter().map(MoveToken::as_str).collect();
        assert_eq!(moves, ["e2e4", "e7e5", "g1f3"]);
    }

    #[tokio::test]
    async fn test_append_move_unknown_session_not_found() {
        let store = MemoryStore::new();
        let err = store
            .append_move(&sid("nope"), &MoveToken::new("e2e4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_fail_writes_rejects_and_leaves_record_unchanged() {
        let store = MemoryStore::new();
        store
            .create_session(&sid("a"), UserId(1), Some(UserId(2)), GameStatus::Active)
            .await
            .unwrap();

        store.fail_writes(true);
        let err = store
            .append_move(&sid("a"), &MoveToken::new("e2e4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        let record = store.read_session(&sid("a")).await.unwrap().unwrap();
        assert!(record.moves.is_empty(), "reads still work, nothing written");

        store.fail_writes(false);
        store.append_move(&sid("a"), &MoveToken::new("e2e4")).await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_move_terminal_sets_finished_with_move() {
        let store = MemoryStore::new();
        store
            .create_session(&sid("a"), UserId(1), Some(UserId(2)), GameStatus::Active)
            .await
            .unwrap();
        store
            .commit_move(&sid("a"), &MoveToken::new("f2f3"), None)
            .await
            .unwrap();
        store
            .commit_move(&sid("a"), &MoveToken::new("e7e5"), Some(GameResult::Black))
            .await
            .unwrap();

        let record = store.read_session(&sid("a")).await.unwrap().unwrap();
        assert_eq!(record.moves.len(), 2);
        assert_eq!(record.status, GameStatus::Finished);
        assert_eq!(record.result, Some(GameResult::Black));
    }

    #[tokio::test]
    async fn test_commit_move_failed_write_changes_nothing() {
        let store = MemoryStore::new();
        store
            .create_session(&sid("a"), UserId(1), Some(UserId(2)), GameStatus::Active)
            .await
            .unwrap();
        store.fail_writes(true);
        let err = store
            .commit_move(&sid("a"), &MoveToken::new("e2e4"), Some(GameResult::White))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        let record = store.read_session(&sid("a")).await.unwrap().unwrap();
        assert!(record.moves.is_empty());
        assert_eq!(record.status, GameStatus::Active);
        assert_eq!(record.result, None);
    }

    #[tokio::test]
    async fn test_find_queue_entry_excluding_is_fifo_and_skips_self() {
        let store = MemoryStore::new();
        store.create_queue_entry(UserId(1)).await.unwrap();
        store.create_queue_entry(UserId(2)).await.unwrap();
        store.create_queue_entry(UserId(3)).await.unwrap();

        let found = store.find_queue_entry_excluding(UserId(1)).await.unwrap();
        assert_eq!(found.map(|e| e.user_id), Some(UserId(2)));
        let found = store.find_queue_entry_excluding(UserId(9)).await.unwrap();
        assert_eq!(found.map(|e| e.user_id), Some(UserId(1)));
    }

    #[tokio::test]
    async fn test_create_queue_entry_twice_keeps_one_entry() {
        let store = MemoryStore::new();
        let first = store.create_queue_entry(UserId(1)).await.unwrap();
        let second = store.create_queue_entry(UserId(1)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.queue_len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_queue_entry_reports_presence() {
        let store = MemoryStore::new();
        store.create_queue_entry(UserId(1)).await.unwrap();
        assert!(store.delete_queue_entry(UserId(1)).await.unwrap());
        assert!(!store.delete_queue_entry(UserId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_queue_empties_pool() {
        let store = MemoryStore::new();
        store.create_queue_entry(UserId(1)).await.unwrap();
        store.create_queue_entry(UserId(2)).await.unwrap();
        store.clear_queue().await.unwrap();
        assert_eq!(store.find_queue_entry_excluding(UserId(0)).await.unwrap(), None);
    }
}
