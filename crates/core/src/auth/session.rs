//! Login session state machine
//!
//! A session is either logged out or holds the user that last logged in,
//! registered, or was injected by a test. Every operation opens the
//! database for its own duration and drops it before returning.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use super::password::{hash_password, verify_password};
use crate::config::{Config, Environment};
use crate::error::{Error, Result};
use crate::models::User;
use crate::storage::{Database, UserRepository};

/// Current authentication state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn(User),
}

/// Result of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Account created and logged in; carries the new user id
    Registered(i64),
    PasswordMismatch,
    UsernameTaken,
}

/// Result of a password change attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordUpdate {
    Updated,
    /// New password and its confirmation differ
    ConfirmationMismatch,
    /// Old password did not verify against the stored hash
    IncorrectPassword,
}

pub struct Session {
    database_path: PathBuf,
    state: SessionState,
}

impl Session {
    /// Create a logged-out session on the database selected by `env`
    pub fn new(config: &Config, env: Environment) -> Result<Self> {
        Self::open(config.database_path(env))
    }

    /// Create a logged-out session on an explicit database file
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let session = Self {
            database_path: path.as_ref().to_path_buf(),
            state: SessionState::LoggedOut,
        };
        // Opening ensures the users table exists
        session.connect()?;
        Ok(session)
    }

    fn connect(&self) -> Result<Database> {
        Database::open(&self.database_path)
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn(_))
    }

    pub fn current_user(&self) -> Option<&User> {
        match &self.state {
            SessionState::LoggedIn(user) => Some(user),
            SessionState::LoggedOut => None,
        }
    }

    /// Put a user into the session without checking credentials.
    ///
    /// Intended for test setup.
    pub fn set_current_user(&mut self, user: User) {
        self.state = SessionState::LoggedIn(user);
    }

    fn require_user(&self) -> Result<&User> {
        self.current_user().ok_or(Error::NotLoggedIn)
    }

    /// Try to log in; `false` covers both unknown user and wrong password
    #[instrument(skip(self, password))]
    pub fn login_user(&mut self, username: &str, password: &str) -> Result<bool> {
        let rows = self.connect()?.get_user_by_username(username)?;

        let Some(user) = rows.into_iter().next() else {
            debug!("Login rejected");
            return Ok(false);
        };

        let verified = match verify_password(password, &user.password_hash) {
            Ok(verified) => verified,
            Err(Error::PasswordHash(e)) => {
                warn!(user_id = user.id, error = %e, "Stored password hash is unreadable");
                false
            }
            Err(e) => return Err(e),
        };

        if !verified {
            debug!("Login rejected");
            return Ok(false);
        }

        info!(user_id = user.id, "User logged in");
        self.state = SessionState::LoggedIn(user);
        Ok(true)
    }

    /// Clear the session; calling it while logged out changes nothing
    pub fn logout(&mut self) {
        if let SessionState::LoggedIn(user) = &self.state {
            info!(user_id = user.id, "User logged out");
        }
        self.state = SessionState::LoggedOut;
    }

    /// Whether any account already uses `username`
    pub fn user_exists(&self, username: &str) -> Result<bool> {
        let rows = self.connect()?.get_user_by_username(username)?;
        Ok(!rows.is_empty())
    }

    /// All stored usernames
    pub fn usernames(&self) -> Result<Vec<String>> {
        self.connect()?.get_all_usernames()
    }

    /// Register a new account and log it in
    #[instrument(skip(self, password, confirm_password))]
    pub fn register_user(
        &mut self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Registration> {
        if !Self::is_matching_password(password, confirm_password) {
            return Ok(Registration::PasswordMismatch);
        }

        if self.user_exists(username)? {
            return Ok(Registration::UsernameTaken);
        }

        match self.create_new_user(username, password) {
            Ok(id) => Ok(Registration::Registered(id)),
            Err(Error::DuplicateUsername(_)) => Ok(Registration::UsernameTaken),
            Err(e) => Err(e),
        }
    }

    /// Hash `password`, store the account, and log it in
    #[instrument(skip(self, password))]
    pub fn create_new_user(&mut self, username: &str, password: &str) -> Result<i64> {
        let password_hash = hash_password(password)?;
        let id = self.connect()?.insert_user(username, &password_hash)?;

        info!(user_id = id, "User created and logged in");
        self.state = SessionState::LoggedIn(User::new(id, username.to_string(), password_hash));
        Ok(id)
    }

    pub fn is_matching_password(password: &str, confirmed_password: &str) -> bool {
        password == confirmed_password
    }

    /// New password is confirmed and the old one verifies for the current user
    pub fn is_password_valid(
        &self,
        old_password: &str,
        new_password: &str,
        confirmed_password: &str,
    ) -> Result<bool> {
        let user = self.require_user()?;
        if !Self::is_matching_password(new_password, confirmed_password) {
            return Ok(false);
        }
        verify_password(old_password, &user.password_hash)
    }

    /// Change the current user's password after checking the old one
    #[instrument(skip_all)]
    pub fn update_password(
        &mut self,
        old_password: &str,
        new_password: &str,
        confirmed_password: &str,
    ) -> Result<PasswordUpdate> {
        let user = self.require_user()?;

        if !Self::is_matching_password(new_password, confirmed_password) {
            return Ok(PasswordUpdate::ConfirmationMismatch);
        }

        if !verify_password(old_password, &user.password_hash)? {
            debug!(user_id = user.id, "Old password rejected");
            return Ok(PasswordUpdate::IncorrectPassword);
        }

        self.update_user_password(new_password)?;
        Ok(PasswordUpdate::Updated)
    }

    /// Store a new hash for the current user and cache it in the session
    #[instrument(skip_all)]
    pub fn update_user_password(&mut self, new_password: &str) -> Result<()> {
        let user = self.require_user()?;
        let new_hash = hash_password(new_password)?;

        self.connect()?
            .update_user(user.id, &user.username, &new_hash)?;

        if let SessionState::LoggedIn(user) = &mut self.state {
            user.password_hash = new_hash;
            info!(user_id = user.id, "Password updated");
        }
        Ok(())
    }

    /// Delete the current user's account and log out
    #[instrument(skip(self))]
    pub fn deactivate_account(&mut self) -> Result<()> {
        let user_id = self.require_user()?.id;

        match self.connect()?.delete_user(user_id) {
            Ok(()) => info!(user_id, "Account deactivated"),
            Err(Error::NotFound(_)) => warn!(user_id, "Account was already gone"),
            Err(e) => return Err(e),
        }

        self.state = SessionState::LoggedOut;
        Ok(())
    }
}
