//! Credential store hook: where user rows live.
//!
//! Authgate doesn't own the relational user table. It defines the
//! [`CredentialStore`] trait (lookup by login name, lookup by id, create,
//! update password, update profile) and you implement it over your
//! database. The coordinator reads identity and block state through it,
//! writes a password hash after a successful reset, and writes the display
//! fields when a user edits their profile.
//!
//! [`MemoryCredentialStore`] is a complete in-process implementation for
//! tests, demos, and single-node setups.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};

use authgate_types::{BlockState, UserBaseInfo, UserId};
use tokio::sync::Mutex;

/// A user row as the credential store keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub login_name: String,
    pub password_hash: String,
    pub nickname: String,
    pub avatar: String,
    pub slogan: String,
    pub block_state: BlockState,
}

impl UserRecord {
    /// The identity part of the row, without the password hash.
    pub fn base_info(&self) -> UserBaseInfo {
        UserBaseInfo {
            id: self.id,
            login_name: self.login_name.clone(),
            nickname: self.nickname.clone(),
            avatar: self.avatar.clone(),
            slogan: self.slogan.clone(),
            block_state: self.block_state,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.block_state, BlockState::Blocked)
    }
}

/// Profile fields supplied at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub login_name: String,
    pub nickname: String,
    pub avatar: String,
    pub slogan: String,
}

/// Replacement display fields for an existing user.
///
/// All three are written as given; an empty string clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub nickname: String,
    pub avatar: String,
    pub slogan: String,
}

/// Errors from a [`CredentialStore`].
///
/// "No such user" is not an error for lookups; they return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The store could not be reached or timed out internally.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// `create` hit an existing login name (unique-key violation).
    #[error("login name {0:?} already exists")]
    Duplicate(String),

    /// An update targeted a row that no longer exists.
    #[error("user {0} not found")]
    NotFound(UserId),
}

impl CredentialError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Reads and writes user rows.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one store is shared by every request task
///   for the life of the process.
/// - Each method returns a `Send` future so coordinator calls can run on
///   any Tokio worker.
///
/// # Example
///
/// ```rust
/// use authgate_session::{CredentialError, CredentialStore, NewUser, ProfileUpdate, UserRecord};
/// use authgate_types::UserId;
///
/// /// A store with no users at all.
/// struct EmptyStore;
///
/// impl CredentialStore for EmptyStore {
///     async fn find_by_login_name(
///         &self,
///         _login_name: &str,
///     ) -> Result<Option<UserRecord>, CredentialError> {
///         Ok(None)
///     }
///
///     async fn find_by_id(
///         &self,
///         _id: UserId,
///     ) -> Result<Option<UserRecord>, CredentialError> {
///         Ok(None)
///     }
///
///     async fn create(
///         &self,
///         _user: NewUser,
///         _password_hash: String,
///     ) -> Result<UserRecord, CredentialError> {
///         Err(CredentialError::Unavailable("read-only".into()))
///     }
///
///     async fn update_password(
///         &self,
///         id: UserId,
///         _password_hash: String,
///     ) -> Result<(), CredentialError> {
///         Err(CredentialError::NotFound(id))
///     }
///
///     async fn update_profile(
///         &self,
///         id: UserId,
///         _profile: ProfileUpdate,
///     ) -> Result<UserRecord, CredentialError> {
///         Err(CredentialError::NotFound(id))
///     }
/// }
/// ```
pub trait CredentialStore: Send + Sync + 'static {
    /// Looks a user up by login name.
    fn find_by_login_name(
        &self,
        login_name: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, CredentialError>> + Send;

    /// Looks a user up by id.
    fn find_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<UserRecord>, CredentialError>> + Send;

    /// Inserts a new user row.
    ///
    /// # Errors
    /// [`CredentialError::Duplicate`] if the login name is taken.
    fn create(
        &self,
        user: NewUser,
        password_hash: String,
    ) -> impl Future<Output = Result<UserRecord, CredentialError>> + Send;

    /// Replaces a user's password hash.
    ///
    /// # Errors
    /// [`CredentialError::NotFound`] if the row is gone.
    fn update_password(
        &self,
        id: UserId,
        password_hash: String,
    ) -> impl Future<Output = Result<(), CredentialError>> + Send;

    /// Replaces a user's nickname, avatar, and slogan, returning the
    /// updated row.
    ///
    /// # Errors
    /// [`CredentialError::NotFound`] if the row is gone.
    fn update_profile(
        &self,
        id: UserId,
        profile: ProfileUpdate,
    ) -> impl Future<Output = Result<UserRecord, CredentialError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// An in-process [`CredentialStore`].
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
    next_id: AtomicI64,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Inserts a fully formed row, replacing any row with the same id.
    /// Later `create` calls allocate ids above it.
    pub async fn insert(&self, record: UserRecord) {
        self.next_id.fetch_max(record.id.0 + 1, Ordering::Relaxed);
        self.users.lock().await.insert(record.id, record);
    }

    /// Changes a user's block state. Returns `false` if the user is unknown.
    pub async fn set_block_state(&self, id: UserId, state: BlockState) -> bool {
        let mut users = self.users.lock().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.block_state = state;
                true
            }
            None => false,
        }
    }

    /// Deletes a user row. Returns `false` if the user is unknown.
    pub async fn remove(&self, id: UserId) -> bool {
        self.users.lock().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn find_by_login_name(
        &self,
        login_name: &str,
    ) -> Result<Option<UserRecord>, CredentialError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.login_name == login_name).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, CredentialError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn create(
        &self,
        user: NewUser,
        password_hash: String,
    ) -> Result<UserRecord, CredentialError> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.login_name == user.login_name) {
            return Err(CredentialError::Duplicate(user.login_name));
        }
        let id = UserId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = UserRecord {
            id,
            login_name: user.login_name,
            password_hash,
            nickname: user.nickname,
            avatar: user.avatar,
            slogan: user.slogan,
            block_state: BlockState::Normal,
        };
        users.insert(id, record.clone());
        tracing::debug!(user_id = %id, "user row created");
        Ok(record)
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: String,
    ) -> Result<(), CredentialError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&id).ok_or(CredentialError::NotFound(id))?;
        user.password_hash = password_hash;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: UserId,
        profile: ProfileUpdate,
    ) -> Result<UserRecord, CredentialError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&id).ok_or(CredentialError::NotFound(id))?;
        user.nickname = profile.nickname;
        user.avatar = profile.avatar;
        user.slogan = profile.slogan;
        Ok(user.clone())
    }
}
