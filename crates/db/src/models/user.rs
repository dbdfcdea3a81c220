//! User (requester) entity model and DTOs.

use bench_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A user row from the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub color: Option<String>,
}

/// DTO for creating a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub color: Option<String>,
}

/// DTO for updating an existing user. All fields except `id` are optional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUser {
    pub id: DbId,
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub color: Option<String>,
}
