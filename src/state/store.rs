// Agent store
// Sole owner of the roster and its persisted document. All mutations
// run read-modify-write-persist under one write guard, so concurrent
// commands can never interleave with a half-applied update and readers
// only ever see whole document versions.

use super::agent::{Agent, AgentProfile, AgentStatus, RosterSnapshot};
use super::persistence::{DocumentStorage, RosterDocument};
use crate::error::AppError;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Authoritative store for the agent roster
///
/// Holds the roster in memory and rewrites the persisted document on
/// every mutation. The in-memory copy is only committed after the
/// document write succeeds, so memory and disk stay reconciled even
/// when persistence fails mid-command.
pub struct AgentStore {
    storage: Arc<dyn DocumentStorage>,
    document: String,
    roster: RwLock<Vec<Agent>>,
}

impl AgentStore {
    /// Open the store, loading the named document from storage
    ///
    /// A document that does not exist yet yields an empty roster. An
    /// unreadable medium yields `StoreUnavailable`; a document that
    /// exists but does not parse yields `StoreCorrupt`.
    pub async fn open(
        storage: Arc<dyn DocumentStorage>,
        document: &str,
    ) -> Result<Self, AppError> {
        let agents = match storage.read(document).await? {
            Some(contents) => parse_document(&contents)?.agents,
            None => Vec::new(),
        };

        Ok(Self {
            storage,
            document: document.to_string(),
            roster: RwLock::new(agents),
        })
    }

    /// Read the current roster as a snapshot of projections
    pub async fn load(&self) -> RosterSnapshot {
        let roster = self.roster.read().await;
        RosterSnapshot {
            agents: roster.iter().map(Agent::profile).collect(),
        }
    }

    /// Look up a single agent by id
    pub async fn find_by_id(&self, id: &str) -> Result<AgentProfile, AppError> {
        let roster = self.roster.read().await;
        roster
            .iter()
            .find(|agent| agent.id == id)
            .map(Agent::profile)
            .ok_or_else(|| AppError::AgentNotFound(id.to_string()))
    }

    /// Number of agents currently on the roster
    pub async fn agent_count(&self) -> usize {
        self.roster.read().await.len()
    }

    /// Set an agent's status, stamp the change time, and persist
    ///
    /// The whole read-modify-write-persist sequence runs under the
    /// write guard; the mutation is acknowledged only after the
    /// document rewrite has completed.
    pub async fn apply_status_change(
        &self,
        id: &str,
        new_status: AgentStatus,
    ) -> Result<AgentProfile, AppError> {
        let mut roster = self.roster.write().await;
        let index = roster
            .iter()
            .position(|agent| agent.id == id)
            .ok_or_else(|| AppError::AgentNotFound(id.to_string()))?;

        // Mutate a copy first: the live roster must not change unless
        // the document write succeeds.
        let mut updated = roster.clone();
        updated[index].status = new_status;
        updated[index].last_status_change = Some(Utc::now());

        self.persist(&updated).await?;
        *roster = updated;

        Ok(roster[index].profile())
    }

    /// Check an agent's credential and return its projection
    ///
    /// Unknown id and wrong credential both come back as the same
    /// `AuthFailed`, with no hint of which check tripped.
    pub async fn authenticate(
        &self,
        id: &str,
        credential: &str,
    ) -> Result<AgentProfile, AppError> {
        let roster = self.roster.read().await;
        match roster.iter().find(|agent| agent.id == id) {
            // TODO: replace plaintext comparison with a real credential
            // verifier once agents get hashed credentials
            Some(agent) if agent.credential == credential => Ok(agent.profile()),
            _ => Err(AppError::AuthFailed),
        }
    }

    async fn persist(&self, agents: &[Agent]) -> Result<(), AppError> {
        let document = RosterDocument {
            agents: agents.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
        self.storage.write(&self.document, &json).await?;
        Ok(())
    }
}

fn parse_document(contents: &str) -> Result<RosterDocument, AppError> {
    serde_json::from_str(contents).map_err(|e| AppError::StoreCorrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::persistence::FileDocumentStorage;
    use tempfile::TempDir;

    const DOCUMENT: &str = "agent-data.json";

    fn sample_agent(id: &str, name: &str) -> Agent {
        Agent {
            id: id.to_string(),
            name: name.to_string(),
            department: "Sales".to_string(),
            status: AgentStatus::Offline,
            credential: "secret".to_string(),
            last_status_change: None,
        }
    }

    async fn seeded_store(dir: &TempDir, agents: Vec<Agent>) -> AgentStore {
        let storage = Arc::new(FileDocumentStorage::new(dir.path()));
        let json = serde_json::to_string_pretty(&RosterDocument { agents }).unwrap();
        storage.write(DOCUMENT, &json).await.unwrap();
        AgentStore::open(storage, DOCUMENT).await.unwrap()
    }

    async fn document_contents(dir: &TempDir) -> String {
        tokio::fs::read_to_string(dir.path().join(DOCUMENT))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_missing_document_yields_empty_roster() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileDocumentStorage::new(dir.path()));
        let store = AgentStore::open(storage, DOCUMENT).await.unwrap();
        assert!(store.load().await.agents.is_empty());
    }

    #[tokio::test]
    async fn test_open_corrupt_document_fails() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileDocumentStorage::new(dir.path()));
        storage.write(DOCUMENT, "{not json").await.unwrap();

        let result = AgentStore::open(storage, DOCUMENT).await;
        match result {
            Err(AppError::StoreCorrupt(_)) => {}
            other => panic!("Expected StoreCorrupt, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, vec![sample_agent("A1", "Som")]).await;

        let first = store.load().await;
        let second = store.load().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_status_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, vec![sample_agent("A1", "Som")]).await;

        let before = Utc::now();
        let updated = store
            .apply_status_change("A1", AgentStatus::Available)
            .await
            .unwrap();
        assert_eq!(updated.status, AgentStatus::Available);
        assert!(updated.last_status_change.unwrap() >= before);

        // A fresh read sees the same change
        let agent = store.find_by_id("A1").await.unwrap();
        assert_eq!(agent.status, AgentStatus::Available);

        // And so does the persisted document
        let on_disk: RosterDocument =
            serde_json::from_str(&document_contents(&dir).await).unwrap();
        assert_eq!(on_disk.agents[0].status, AgentStatus::Available);
        assert!(on_disk.agents[0].last_status_change.is_some());
    }

    #[tokio::test]
    async fn test_unknown_id_leaves_document_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, vec![sample_agent("A1", "Som")]).await;
        let before = document_contents(&dir).await;

        let result = store
            .apply_status_change("does-not-exist", AgentStatus::Busy)
            .await;
        match result {
            Err(AppError::AgentNotFound(id)) => assert_eq!(id, "does-not-exist"),
            other => panic!("Expected AgentNotFound, got: {:?}", other.map(|_| ())),
        }

        assert_eq!(document_contents(&dir).await, before);
    }

    #[tokio::test]
    async fn test_authenticate_success_returns_projection() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, vec![sample_agent("A1", "Som")]).await;

        let profile = store.authenticate("A1", "secret").await.unwrap();
        assert_eq!(profile.id, "A1");
        assert_eq!(profile.name, "Som");
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, vec![sample_agent("A1", "Som")]).await;

        let unknown_id = store.authenticate("ghost", "secret").await.unwrap_err();
        let wrong_credential = store.authenticate("A1", "nope").await.unwrap_err();
        assert_eq!(unknown_id.to_string(), wrong_credential.to_string());
    }

    struct FailingWriteStorage {
        seeded: String,
    }

    #[async_trait::async_trait]
    impl DocumentStorage for FailingWriteStorage {
        async fn read(&self, _name: &str) -> std::io::Result<Option<String>> {
            Ok(Some(self.seeded.clone()))
        }

        async fn write(&self, _name: &str, _contents: &str) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "medium unreachable",
            ))
        }
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_unchanged() {
        let seeded = serde_json::to_string(&RosterDocument {
            agents: vec![sample_agent("A1", "Som")],
        })
        .unwrap();
        let storage = Arc::new(FailingWriteStorage { seeded });
        let store = AgentStore::open(storage, DOCUMENT).await.unwrap();

        let result = store.apply_status_change("A1", AgentStatus::Available).await;
        match result {
            Err(AppError::StoreUnavailable(_)) => {}
            other => panic!("Expected StoreUnavailable, got: {:?}", other.map(|_| ())),
        }

        // The mutation was never committed: readers still see the old
        // status and no change timestamp
        let agent = store.find_by_id("A1").await.unwrap();
        assert_eq!(agent.status, AgentStatus::Offline);
        assert!(agent.last_status_change.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_status_changes_both_persist() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            seeded_store(
                &dir,
                vec![sample_agent("A1", "Som"), sample_agent("A2", "Nok")],
            )
            .await,
        );

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(
                async move { store.apply_status_change("A1", AgentStatus::Available).await },
            )
        };
        let second = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.apply_status_change("A2", AgentStatus::Busy).await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        // No lost update: the final document contains both changes
        let on_disk: RosterDocument =
            serde_json::from_str(&document_contents(&dir).await).unwrap();
        assert_eq!(on_disk.agents[0].status, AgentStatus::Available);
        assert_eq!(on_disk.agents[1].status, AgentStatus::Busy);
    }
}
