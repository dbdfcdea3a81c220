//! Bench entity model, its GSIM credentials, and DTOs.

use bench_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `gsim_credentials` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct GsimCredential {
    pub id: DbId,
    pub username: String,
    pub password: String,
}

/// A bench row joined with its (optional) credentials.
///
/// This is the durable half of a bench; the ephemeral half lives in the
/// cache. Field names are camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchRecord {
    pub id: DbId,
    pub name: String,
    pub ip: Option<String>,
    pub stid: Option<String>,
    pub build: Option<String>,
    pub sw_ver: Option<String>,
    pub voice_control: Option<bool>,
    pub gsim_cred_id: Option<DbId>,
    pub gsim_credentials: Option<GsimCredential>,
}

/// Flat row produced by the `benches LEFT JOIN gsim_credentials` query.
#[derive(Debug, FromRow)]
pub(crate) struct BenchRow {
    pub id: DbId,
    pub name: String,
    pub ip: Option<String>,
    pub stid: Option<String>,
    pub build: Option<String>,
    pub sw_ver: Option<String>,
    pub voice_control: Option<bool>,
    pub gsim_cred_id: Option<DbId>,
    pub cred_username: Option<String>,
    pub cred_password: Option<String>,
}

impl From<BenchRow> for BenchRecord {
    fn from(row: BenchRow) -> Self {
        let gsim_credentials = match (row.gsim_cred_id, row.cred_username, row.cred_password) {
            (Some(id), Some(username), Some(password)) => Some(GsimCredential {
                id,
                username,
                password,
            }),
            _ => None,
        };
        Self {
            id: row.id,
            name: row.name,
            ip: row.ip,
            stid: row.stid,
            build: row.build,
            sw_ver: row.sw_ver,
            voice_control: row.voice_control,
            gsim_cred_id: row.gsim_cred_id,
            gsim_credentials,
        }
    }
}

/// Credentials as supplied by a client. `id` is set when editing an
/// existing credential row.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CredentialInput {
    pub id: Option<DbId>,
    #[validate(length(max = 256))]
    pub username: String,
    #[validate(length(max = 256))]
    pub password: String,
}

impl CredentialInput {
    /// Both username and password are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// DTO for creating a new bench.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBench {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub ip: Option<String>,
    pub stid: Option<String>,
    pub build: Option<String>,
    pub sw_ver: Option<String>,
    pub voice_control: Option<bool>,
    #[validate(nested)]
    pub gsim_credentials: Option<CredentialInput>,
}

/// DTO for updating an existing bench. All fields except `id` are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBench {
    pub id: DbId,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub ip: Option<String>,
    pub stid: Option<String>,
    pub build: Option<String>,
    pub sw_ver: Option<String>,
    pub voice_control: Option<bool>,
    #[validate(nested)]
    pub gsim_credentials: Option<CredentialInput>,
}
