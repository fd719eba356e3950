//! JSON-on-disk store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/sessions/<session id>.json   one SessionRecord per file
//! <root>/queue.json                   Vec<QueueEntry>, oldest first
//! ```
//!
//! Every write goes to a uniquely named temp file in the same directory,
//! is synced, and is then renamed over the target. The directory is
//! synced after the rename, so a write that returned survives a power
//! loss. A crash leaves either the old record or the new one, never a
//! torn file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rookery_protocol::{GameResult, GameStatus, MoveToken, SessionId, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{QueueEntry, SessionRecord, SessionStore, StoreError};

const SESSIONS_DIR: &str = "sessions";
const QUEUE_FILE: &str = "queue.json";
const MAX_ID_LEN: usize = 128;

/// A [`SessionStore`] that keeps one JSON file per session.
///
/// Meant for a single server process. Writes are serialized through one
/// lock so read-modify-write cycles never interleave.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    writes: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(SESSIONS_DIR)).await?;
        tracing::info!(root = %root.display(), "file store opened");
        Ok(Self {
            root,
            writes: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a session's file, or `None` if the id cannot be a file name.
    ///
    /// Session ids arrive from clients, so anything outside
    /// `[A-Za-z0-9_-]` is refused before it gets near the filesystem.
    fn session_path(&self, id: &SessionId) -> Option<PathBuf> {
        let raw = id.as_str();
        let safe = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        safe.then(|| self.root.join(SESSIONS_DIR).join(format!("{raw}.json")))
    }

    fn writable_session_path(&self, id: &SessionId) -> Result<PathBuf, StoreError> {
        self.session_path(id)
            .ok_or_else(|| StoreError::Unavailable(format!("invalid session id {id:?}")))
    }

    fn queue_path(&self) -> PathBuf {
        self.root.join(QUEUE_FILE)
    }

    async fn load_queue(&self) -> Result<Vec<QueueEntry>, StoreError> {
        Ok(read_json(&self.queue_path()).await?.unwrap_or_default())
    }

    /// Loads a record, applies `edit`, and writes it back.
    async fn update_record(
        &self,
        id: &SessionId,
        edit: impl FnOnce(&mut SessionRecord) + Send,
    ) -> Result<(), StoreError> {
        let path = self.writable_session_path(id)?;
        let _guard = self.writes.lock().await;
        let mut record: SessionRecord = read_json(&path)
            .await?
            .ok_or_else(|| StoreError::SessionNotFound(id.clone()))?;
        edit(&mut record);
        record.touch();
        write_json_atomic(&path, &record).await
    }
}

impl SessionStore for JsonFileStore {
    async fn create_session(
        &self,
        id: &SessionId,
        white: UserId,
        black: Option<UserId>,
        status: GameStatus,
    ) -> Result<SessionRecord, StoreError> {
        let path = self.writable_session_path(id)?;
        let _guard = self.writes.lock().await;
        if tokio::fs::try_exists(&path).await? {
            return Err(StoreError::SessionExists(id.clone()));
        }
        let record = SessionRecord::new(id.clone(), white, black, status);
        write_json_atomic(&path, &record).await?;
        tracing::debug!(session_id = %id, "session record created");
        Ok(record)
    }

    async fn append_move(&self, id: &SessionId, token: &MoveToken) -> Result<(), StoreError> {
        self.update_record(id, |record| record.moves.push(token.clone()))
            .await
    }

    async fn commit_move(
        &self,
        id: &SessionId,
        token: &MoveToken,
        result: Option<GameResult>,
    ) -> Result<(), StoreError> {
        self.update_record(id, |record| {
            record.moves.push(token.clone());
            if let Some(result) = result {
                record.status = GameStatus::Finished;
                record.result = Some(result);
            }
        })
        .await
    }

    async fn set_status(
        &self,
        id: &SessionId,
        status: GameStatus,
        result: Option<GameResult>,
    ) -> Result<(), StoreError> {
        self.update_record(id, |record| {
            record.status = status;
            record.result = result;
        })
        .await
    }

    async fn seat_black(&self, id: &SessionId, user: UserId) -> Result<(), StoreError> {
        self.update_record(id, |record| {
            record.black = Some(user);
            record.status = GameStatus::Active;
        })
        .await
    }

    async fn read_session(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        match self.session_path(id) {
            Some(path) => read_json(&path).await,
            None => Ok(None),
        }
    }

    async fn create_queue_entry(&self, user: UserId) -> Result<QueueEntry, StoreError> {
        let _guard = self.writes.lock().await;
        let mut queue = self.load_queue().await?;
        if let Some(existing) = queue.iter().find(|e| e.user_id == user) {
            return Ok(*existing);
        }
        let entry = QueueEntry::new(user);
        queue.push(entry);
        write_json_atomic(&self.queue_path(), &queue).await?;
        Ok(entry)
    }

    async fn delete_queue_entry(&self, user: UserId) -> Result<bool, StoreError> {
        let _guard = self.writes.lock().await;
        let mut queue = self.load_queue().await?;
        let before = queue.len();
        queue.retain(|e| e.user_id != user);
        if queue.len() == before {
            return Ok(false);
        }
        write_json_atomic(&self.queue_path(), &queue).await?;
        Ok(true)
    }

    async fn find_queue_entry_excluding(
        &self,
        user: UserId,
    ) -> Result<Option<QueueEntry>, StoreError> {
        let queue = self.load_queue().await?;
        Ok(queue.into_iter().find(|e| e.user_id != user))
    }

    async fn clear_queue(&self) -> Result<(), StoreError> {
        let _guard = self.writes.lock().await;
        write_json_atomic(&self.queue_path(), &Vec::<QueueEntry>::new()).await
    }
}

/// Reads and decodes a JSON file, `None` if it does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json_atomic<T: Serialize + Sync>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension(format!("{:016x}.tmp", rand::random::<u64>()));

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    drop(file);

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
        }
        return Err(e.into());
    }
    sync_parent_dir(path).await
}

/// Flushes the directory entry a rename just changed.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::File::open(parent).await?.sync_all().await?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
