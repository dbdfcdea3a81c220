//! Requester model. Users carry no runtime state of their own.

use bench_core::types::DbId;
use bench_db::models::user::User;
use serde::Serialize;

/// Color shown for users that never picked one.
pub const DEFAULT_USER_COLOR: &str = "#FFF";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserModel {
    user: User,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSnapshot {
    pub id: DbId,
    pub name: String,
    pub color: String,
}

impl UserModel {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn id(&self) -> DbId {
        self.user.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn update(&mut self, user: User) {
        self.user = user;
    }

    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.user.id,
            name: self.user.name.clone(),
            color: self
                .user
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_COLOR.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_color_defaults_to_white() {
        let model = UserModel::new(User {
            id: 1,
            name: "Ann".into(),
            color: None,
        });
        assert_eq!(model.snapshot().color, "#FFF");
    }

    #[test]
    fn update_replaces_record() {
        let mut model = UserModel::new(User {
            id: 1,
            name: "Ann".into(),
            color: Some("#F00".into()),
        });
        model.update(User {
            id: 1,
            name: "Anna".into(),
            color: Some("#0F0".into()),
        });
        let snapshot = model.snapshot();
        assert_eq!(snapshot.name, "Anna");
        assert_eq!(snapshot.color, "#0F0");
    }
}
