use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::UploadSession;

/// Errors from session persistence.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("duplicate session id: {0}")]
    Duplicate(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable storage for session records.
///
/// `save` must write the whole record atomically: the engine relies on
/// all mutated fields landing together.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>, RepositoryError>;

    async fn create(&self, session: UploadSession) -> Result<UploadSession, RepositoryError>;

    async fn save(&self, session: &UploadSession) -> Result<(), RepositoryError>;
}

/// In-memory repository for tests and single-process deployments.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<Uuid, UploadSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>, RepositoryError> {
        Ok(self.sessions.read().unwrap().get(&id).cloned())
    }

    async fn create(&self, session: UploadSession) -> Result<UploadSession, RepositoryError> {
        let mut sessions = self.sessions.write().unwrap();
        if sessions.contains_key(&session.id) {
            return Err(RepositoryError::Duplicate(session.id));
        }
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn save(&self, session: &UploadSession) -> Result<(), RepositoryError> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkflow_protocol::HashFunction;

    fn sample() -> UploadSession {
        UploadSession::new(
            "file.bin".into(),
            64,
            HashFunction::Md5,
            &crate::EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn create_then_get() {
        let repo = InMemorySessionRepository::new();
        let session = repo.create(sample()).await.unwrap();
        let loaded = repo.get(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
    }

    #[tokio::test]
    async fn create_duplicate_rejected() {
        let repo = InMemorySessionRepository::new();
        let session = repo.create(sample()).await.unwrap();
        let result = repo.create(session).await;
        assert!(matches!(result, Err(RepositoryError::Duplicate(_))));
    }

    #[tokio::test]
    async fn save_overwrites_whole_record() {
        let repo = InMemorySessionRepository::new();
        let mut session = repo.create(sample()).await.unwrap();

        session.advance(32, "digest".into());
        session.retry_budget = 0;
        repo.save(&session).await.unwrap();

        let loaded = repo.get(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.offset, 32);
        assert_eq!(loaded.retry_budget, 0);
        assert_eq!(loaded.running_digest.as_deref(), Some("digest"));
    }

    #[tokio::test]
    async fn get_unknown_is_none() {
        let repo = InMemorySessionRepository::new();
        assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
    }
}
