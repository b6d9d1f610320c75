//! Credential lifecycle: password hashing and the login session

mod password;
mod session;

pub use password::{hash_password, verify_password};
pub use session::{PasswordUpdate, Registration, Session, SessionState};
