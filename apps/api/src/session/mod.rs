//! Session-scoped state: the in-memory contact table and the poem shown for it.
//!
//! A session moves from unloaded to loaded exactly once. After that the table only
//! changes through [`Session::append`]; it is never re-read from the store. Writes are
//! based on the version this session read or last wrote, so a session never overwrites
//! rows another session has stored in the meantime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::contact::{Contact, ContactTable};
use crate::poem_client::{PoemError, PoemGenerator};
use crate::store::{StoreError, TableStore};

pub mod controller;
pub mod handlers;

#[derive(Debug, Clone)]
struct CachedPoem {
    name: String,
    text: String,
}

#[derive(Debug)]
pub struct Session {
    data_file: String,
    table: Option<ContactTable>,
    /// Store version the table is based on; `None` while no file exists.
    version: Option<String>,
    poem: Option<CachedPoem>,
}

impl Session {
    pub fn new(data_file: impl Into<String>) -> Self {
        Self {
            data_file: data_file.into(),
            table: None,
            version: None,
            poem: None,
        }
    }

    pub fn data_file(&self) -> &str {
        &self.data_file
    }

    /// The loaded table, or `None` before [`Session::load`].
    pub fn table(&self) -> Option<&ContactTable> {
        self.table.as_ref()
    }

    /// Reads the table from the store on first use; later calls return the session copy.
    /// A missing file starts the session with an empty table.
    pub async fn load(&mut self, store: &dyn TableStore) -> Result<&ContactTable, StoreError> {
        if self.table.is_none() {
            let table = if store.file_exists(&self.data_file).await? {
                let read = store.read_table(&self.data_file).await?;
                self.version = Some(read.version);
                read.table
            } else {
                info!("{} not found in store, starting empty", self.data_file);
                ContactTable::default()
            };
            info!("Session loaded {} contacts", table.len());
            self.table = Some(table);
        }
        Ok(self.table.get_or_insert_with(ContactTable::default))
    }

    pub fn append(&mut self, contact: Contact) {
        self.table
            .get_or_insert_with(ContactTable::default)
            .push(contact);
    }

    /// Overwrites the stored file with the session's full table. Fails with
    /// [`StoreError::Conflict`] if the file changed since this session last saw it.
    pub async fn persist(
        &mut self,
        store: &dyn TableStore,
        message: &str,
    ) -> Result<(), StoreError> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        let version = store
            .write_table(&self.data_file, table, self.version.as_deref(), message)
            .await?;
        self.version = Some(version);
        Ok(())
    }

    /// Poem for the last row's name. Regenerated only when that name changes.
    pub async fn poem(&mut self, poems: &dyn PoemGenerator) -> Result<Option<String>, PoemError> {
        let Some(name) = self
            .table
            .as_ref()
            .and_then(|t| t.last())
            .map(|c| c.name.clone())
        else {
            return Ok(None);
        };

        if let Some(cached) = &self.poem {
            if cached.name == name {
                return Ok(Some(cached.text.clone()));
            }
        }

        let text = poems.generate_poem(&name).await?;
        self.poem = Some(CachedPoem {
            name,
            text: text.clone(),
        });
        Ok(Some(text))
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

struct Entry {
    session: SharedSession,
    last_seen: Instant,
}

/// All live sessions, keyed by the id carried in the session cookie.
///
/// A session not resolved for longer than the idle TTL is dropped; its cookie then
/// gets a fresh session.
pub struct SessionRegistry {
    data_file: String,
    idle_ttl: Duration,
    sessions: Mutex<HashMap<Uuid, Entry>>,
}

impl SessionRegistry {
    pub fn new(data_file: impl Into<String>, idle_ttl: Duration) -> Self {
        Self {
            data_file: data_file.into(),
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `id`. A missing, unknown or expired id gets a fresh
    /// session; the returned flag is `true` in that case.
    pub async fn resolve(&self, id: Option<Uuid>) -> (Uuid, SharedSession, bool) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_ttl);
        if sessions.len() < before {
            debug!("Evicted {} idle sessions", before - sessions.len());
        }

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_seen = now;
                return (id, Arc::clone(&entry.session), false);
            }
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(self.data_file.clone())));
        sessions.insert(
            id,
            Entry {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        debug!("Session {id} created ({} live)", sessions.len());
        (id, session, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::testing::{contact, StubPoems};

    const FILE: &str = "contacts.csv";

    #[tokio::test]
    async fn test_load_starts_empty_when_file_is_absent() {
        let store = MemoryStore::new();
        let mut session = Session::new(FILE);
        assert!(session.table().is_none());

        let table = session.load(&store).await.unwrap();
        assert!(table.is_empty());
        assert!(session.table().is_some());
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_load_reads_store_only_once() {
        let store = MemoryStore::new();
        store
            .seed(FILE, &ContactTable::from_rows(vec![contact("Anna", 47.0, 8.0)]))
            .await;

        let mut session = Session::new(FILE);
        assert_eq!(session.load(&store).await.unwrap().len(), 1);

        // A change made behind the session's back is not picked up.
        store.seed(FILE, &ContactTable::default()).await;
        assert_eq!(session.load(&store).await.unwrap().len(), 1);
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_append_then_persist_writes_full_snapshot() {
        let store = MemoryStore::new();
        store
            .seed(FILE, &ContactTable::from_rows(vec![contact("Anna", 47.0, 8.0)]))
            .await;

        let mut session = Session::new(FILE);
        session.load(&store).await.unwrap();
        session.append(contact("Ben", 46.0, 7.0));
        session.persist(&store, "Add contact 'Ben'").await.unwrap();

        let stored = store.stored(FILE).await.unwrap();
        assert_eq!(stored, *session.table().unwrap());
        assert_eq!(stored.len(), 2);
        assert_eq!(store.messages().await, vec!["Add contact 'Ben'".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_in_memory_row() {
        let store = MemoryStore::failing_writes();
        let mut session = Session::new(FILE);
        session.load(&store).await.unwrap();
        session.append(contact("Ben", 46.0, 7.0));

        assert!(session.persist(&store, "m").await.is_err());
        assert_eq!(session.table().unwrap().len(), 1);
        assert!(store.stored(FILE).await.is_none());
    }

    #[tokio::test]
    async fn test_second_session_cannot_overwrite_first_sessions_row() {
        let store = MemoryStore::new();
        store
            .seed(FILE, &ContactTable::from_rows(vec![contact("Old", 1.0, 2.0)]))
            .await;

        let mut alice = Session::new(FILE);
        let mut bob = Session::new(FILE);
        alice.load(&store).await.unwrap();
        bob.load(&store).await.unwrap();

        alice.append(contact("Alice", 47.0, 8.0));
        alice.persist(&store, "Add contact 'Alice'").await.unwrap();

        bob.append(contact("Bob", 46.0, 7.0));
        let err = bob.persist(&store, "Add contact 'Bob'").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let names: Vec<_> = store
            .stored(FILE)
            .await
            .unwrap()
            .rows()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["Old", "Alice"]);
    }

    #[tokio::test]
    async fn test_consecutive_persists_build_on_own_writes() {
        let store = MemoryStore::new();
        let mut session = Session::new(FILE);
        session.load(&store).await.unwrap();

        for name in ["Anna", "Ben", "Cleo"] {
            session.append(contact(name, 47.0, 8.0));
            session.persist(&store, name).await.unwrap();
        }
        assert_eq!(store.stored(FILE).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_poem_is_cached_per_last_name() {
        let poems = StubPoems::new();
        let mut session = Session::new(FILE);
        assert_eq!(session.poem(&poems).await.unwrap(), None);

        session.append(contact("Anna", 47.0, 8.0));
        let first = session.poem(&poems).await.unwrap().unwrap();
        let again = session.poem(&poems).await.unwrap().unwrap();
        assert_eq!(first, again);
        assert_eq!(poems.calls(), vec!["Anna".to_string()]);

        session.append(contact("Ben", 46.0, 7.0));
        let second = session.poem(&poems).await.unwrap().unwrap();
        assert!(second.contains("Ben"));
        assert_eq!(poems.calls(), vec!["Anna".to_string(), "Ben".to_string()]);
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_registry_reuses_known_ids_and_replaces_unknown_ones() {
        let registry = SessionRegistry::new(FILE, TTL);

        let (id, first, created) = registry.resolve(None).await;
        assert!(created);

        let (same_id, again, created) = registry.resolve(Some(id)).await;
        assert!(!created);
        assert_eq!(same_id, id);
        assert!(Arc::ptr_eq(&first, &again));

        let (new_id, _, created) = registry.resolve(Some(Uuid::new_v4())).await;
        assert!(created);
        assert_ne!(new_id, id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let registry = SessionRegistry::new(FILE, TTL);

        let (kept, _, _) = registry.resolve(None).await;
        let (idle, _, _) = registry.resolve(None).await;

        tokio::time::advance(Duration::from_secs(40)).await;
        let (_, _, created) = registry.resolve(Some(kept)).await;
        assert!(!created);

        tokio::time::advance(Duration::from_secs(30)).await;
        let (replacement, _, created) = registry.resolve(Some(idle)).await;
        assert!(created);
        assert_ne!(replacement, idle);

        let sessions = registry.sessions.lock().await;
        assert!(sessions.contains_key(&kept));
        assert!(!sessions.contains_key(&idle));
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cookieless_traffic_does_not_accumulate() {
        let registry = SessionRegistry::new(FILE, TTL);
        for _ in 0..1000 {
            registry.resolve(None).await;
        }
        assert_eq!(registry.sessions.lock().await.len(), 1000);

        tokio::time::advance(TTL).await;
        registry.resolve(None).await;
        assert_eq!(registry.sessions.lock().await.len(), 1);
    }
}
