use crate::error::{AppError, AppResult};
use crate::id::ObjectId;

/// Authenticated user for one request.
///
/// Built by the auth middleware from the session token and passed
/// explicitly into every service call that checks ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: ObjectId,
    username: String,
    is_admin: bool,
}

impl Principal {
    pub fn new(id: ObjectId, username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id,
            username: username.into(),
            is_admin,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn can_act_for(&self, owner: ObjectId) -> bool {
        self.is_admin || self.id == owner
    }

    pub fn require_owner(&self, owner: ObjectId, msg: &str) -> AppResult<()> {
        if self.can_act_for(owner) {
            Ok(())
        } else {
            Err(AppError::forbidden(msg))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::forbidden("admin only"))
        }
    }
}
