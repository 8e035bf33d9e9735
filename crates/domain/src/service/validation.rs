use std::sync::Arc;

use identity_core::{Entity, UserId};

use crate::error::{UniqueField, UniquenessError};
use crate::profile::{Email, Nickname, Username};
use crate::repository::{RepositoryResult, UserRepository};
use crate::user::User;

/// Platform-wide uniqueness of user profile fields.
///
/// Each check accepts an optional user to exclude, so a user being edited does
/// not collide with its own stored record.
#[derive(Clone)]
pub struct UserValidationService {
    users: Arc<dyn UserRepository>,
}

impl UserValidationService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub fn is_email_unique(&self, email: &Email, exclude: Option<&UserId>) -> RepositoryResult<bool> {
        if !self.users.exists_by_email(email)? {
            return Ok(true);
        }
        let Some(exclude) = exclude else {
            return Ok(false);
        };
        Ok(is_excluded(self.users.find_by_email(email)?, exclude))
    }

    pub fn is_username_unique(
        &self,
        username: &Username,
        exclude: Option<&UserId>,
    ) -> RepositoryResult<bool> {
        if !self.users.exists_by_username(username)? {
            return Ok(true);
        }
        let Some(exclude) = exclude else {
            return Ok(false);
        };
        Ok(is_excluded(self.users.find_by_username(username)?, exclude))
    }

    pub fn is_nickname_unique(
        &self,
        nickname: &Nickname,
        exclude: Option<&UserId>,
    ) -> RepositoryResult<bool> {
        if !self.users.exists_by_nickname(nickname)? {
            return Ok(true);
        }
        let Some(exclude) = exclude else {
            return Ok(false);
        };
        Ok(is_excluded(self.users.find_by_nickname(nickname)?, exclude))
    }

    /// Check every unique field of `user` against the other stored users.
    pub fn ensure_user_is_unique(&self, user: &User) -> Result<(), UniquenessError> {
        let id = Some(user.id());
        if !self.is_email_unique(user.email(), id)? {
            return Err(taken(UniqueField::Email, user.email().as_str()));
        }
        if !self.is_username_unique(user.username(), id)? {
            return Err(taken(UniqueField::Username, user.username().as_str()));
        }
        if !self.is_nickname_unique(user.nickname(), id)? {
            return Err(taken(UniqueField::Nickname, user.nickname().as_str()));
        }
        Ok(())
    }
}

impl core::fmt::Debug for UserValidationService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserValidationService").finish_non_exhaustive()
    }
}

// A record that vanished between the probe and the load no longer conflicts.
fn is_excluded(found: Option<User>, exclude: &UserId) -> bool {
    found.is_none_or(|user| user.id() == exclude)
}

fn taken(field: UniqueField, value: &str) -> UniquenessError {
    UniquenessError::Taken {
        field,
        value: value.to_string(),
    }
}
