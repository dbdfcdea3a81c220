use std::collections::BTreeMap;

use async_trait::async_trait;
use bench_core::types::DbId;
use bench_db::models::bench::{BenchRecord, CreateBench, CredentialInput, GsimCredential, UpdateBench};
use bench_db::models::user::{CreateUser, UpdateUser, User};
use tokio::sync::Mutex;

use super::{DurableState, DurableStore};
use crate::error::EngineError;

#[derive(Debug, Default)]
struct MemoryDb {
    version: Option<i64>,
    benches: BTreeMap<DbId, BenchRecord>,
    users: BTreeMap<DbId, User>,
    credentials: BTreeMap<DbId, GsimCredential>,
    last_id: DbId,
}

impl MemoryDb {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    fn insert_credentials(&mut self, input: &CredentialInput) -> GsimCredential {
        let credential = GsimCredential {
            id: self.next_id(),
            username: input.username.clone(),
            password: input.password.clone(),
        };
        self.credentials.insert(credential.id, credential.clone());
        credential
    }

    fn bench_name_taken(&self, name: &str, except: Option<DbId>) -> bool {
        self.benches
            .values()
            .any(|b| b.name == name && Some(b.id) != except)
    }

    fn user_name_taken(&self, name: &str, except: Option<DbId>) -> bool {
        self.users
            .values()
            .any(|u| u.name == name && Some(u.id) != except)
    }
}

/// In-process [`DurableStore`] with the same uniqueness rules as the
/// database. Used by tests and local runs without Postgres.
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    inner: Mutex<MemoryDb>,
}

impl MemoryDurableStore {
    /// An empty store at `version`.
    pub fn new(version: i64) -> Self {
        Self {
            inner: Mutex::new(MemoryDb {
                version: Some(version),
                ..Default::default()
            }),
        }
    }

    /// An empty store that has never been versioned.
    pub fn unversioned() -> Self {
        Self::default()
    }

    pub async fn set_version(&self, version: i64) {
        self.inner.lock().await.version = Some(version);
    }

    /// Insert a bench directly, bypassing validation.
    pub async fn seed_bench(&self, name: &str) -> BenchRecord {
        let mut db = self.inner.lock().await;
        let record = BenchRecord {
            id: db.next_id(),
            name: name.to_string(),
            ip: None,
            stid: None,
            build: None,
            sw_ver: None,
            voice_control: None,
            gsim_cred_id: None,
            gsim_credentials: None,
        };
        db.benches.insert(record.id, record.clone());
        record
    }

    /// Insert a user directly, bypassing validation.
    pub async fn seed_user(&self, name: &str) -> User {
        let mut db = self.inner.lock().await;
        let user = User {
            id: db.next_id(),
            name: name.to_string(),
            color: None,
        };
        db.users.insert(user.id, user.clone());
        user
    }
}

fn duplicate(entity: &str, name: &str) -> EngineError {
    EngineError::Validation(format!("{entity} named '{name}' already exists"))
}

#[async_trait]
impl DurableStore for MemoryDurableStore {
    async fn load(&self) -> Result<DurableState, EngineError> {
        let db = self.inner.lock().await;
        let version = db.version.ok_or(EngineError::MissingVersion)?;
        Ok(DurableState {
            version,
            benches: db.benches.values().cloned().collect(),
            users: db.users.values().cloned().collect(),
        })
    }

    async fn create_bench(&self, input: &CreateBench) -> Result<BenchRecord, EngineError> {
        let mut db = self.inner.lock().await;
        if db.bench_name_taken(&input.name, None) {
            return Err(duplicate("Bench", &input.name));
        }
        let credentials = match &input.gsim_credentials {
            Some(creds) if creds.is_complete() => Some(db.insert_credentials(creds)),
            _ => None,
        };
        let record = BenchRecord {
            id: db.next_id(),
            name: input.name.clone(),
            ip: input.ip.clone(),
            stid: input.stid.clone(),
            build: input.build.clone(),
            sw_ver: input.sw_ver.clone(),
            voice_control: input.voice_control,
            gsim_cred_id: credentials.as_ref().map(|c| c.id),
            gsim_credentials: credentials,
        };
        db.benches.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_bench(&self, input: &UpdateBench) -> Result<BenchRecord, EngineError> {
        let mut db = self.inner.lock().await;
        if !db.benches.contains_key(&input.id) {
            return Err(EngineError::NotFound {
                entity: "Bench",
                id: input.id,
            });
        }
        if let Some(name) = &input.name {
            if db.bench_name_taken(name, Some(input.id)) {
                return Err(duplicate("Bench", name));
            }
        }

        let credentials = match &input.gsim_credentials {
            Some(creds) => match creds.id {
                Some(id) => {
                    let credential = GsimCredential {
                        id,
                        username: creds.username.clone(),
                        password: creds.password.clone(),
                    };
                    db.credentials.insert(id, credential.clone());
                    Some(credential)
                }
                None if creds.is_complete() => Some(db.insert_credentials(creds)),
                None => None,
            },
            None => None,
        };

        let Some(record) = db.benches.get_mut(&input.id) else {
            return Err(EngineError::NotFound {
                entity: "Bench",
                id: input.id,
            });
        };
        if let Some(name) = &input.name {
            record.name = name.clone();
        }
        if input.ip.is_some() {
            record.ip = input.ip.clone();
        }
        if input.stid.is_some() {
            record.stid = input.stid.clone();
        }
        if input.build.is_some() {
            record.build = input.build.clone();
        }
        if input.sw_ver.is_some() {
            record.sw_ver = input.sw_ver.clone();
        }
        if input.voice_control.is_some() {
            record.voice_control = input.voice_control;
        }
        if let Some(credential) = credentials {
            record.gsim_cred_id = Some(credential.id);
            record.gsim_credentials = Some(credential);
        }
        Ok(record.clone())
    }

    async fn delete_bench(&self, id: DbId) -> Result<BenchRecord, EngineError> {
        let mut db = self.inner.lock().await;
        let record = db.benches.remove(&id).ok_or(EngineError::NotFound {
            entity: "Bench",
            id,
        })?;
        if let Some(cred_id) = record.gsim_cred_id {
            db.credentials.remove(&cred_id);
        }
        Ok(record)
    }

    async fn create_user(&self, input: &CreateUser) -> Result<User, EngineError> {
        let mut db = self.inner.lock().await;
        if db.user_name_taken(&input.name, None) {
            return Err(duplicate("User", &input.name));
        }
        let user = User {
            id: db.next_id(),
            name: input.name.clone(),
            color: input.color.clone(),
        };
        db.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, input: &UpdateUser) -> Result<User, EngineError> {
        let mut db = self.inner.lock().await;
        if let Some(name) = &input.name {
            if db.user_name_taken(name, Some(input.id)) {
                return Err(duplicate("User", name));
            }
        }
        let user = db.users.get_mut(&input.id).ok_or(EngineError::NotFound {
            entity: "User",
            id: input.id,
        })?;
        if let Some(name) = &input.name {
            user.name = name.clone();
        }
        if input.color.is_some() {
            user.color = input.color.clone();
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: DbId) -> Result<User, EngineError> {
        self.inner
            .lock()
            .await
            .users
            .remove(&id)
            .ok_or(EngineError::NotFound { entity: "User", id })
    }
}
