use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use log::warn;

use crate::models::User;

/// Demo accounts as argon2id PHC strings (default cost). The passwords are
/// `password123`, `password456` and `password789`.
const DEMO_USERS: [(&str, &str, &str); 3] = [
    (
        "John Doe",
        "john@example.com",
        "$argon2id$v=19$m=19456,t=2,p=1$5ZpTmCEFELjBwP46rywAlA$zlE/0kZ5Ha39xOh2ABKleafa3yxJssfbelWaNxToepM",
    ),
    (
        "Jane Doe",
        "jane@example.com",
        "$argon2id$v=19$m=19456,t=2,p=1$IKx3EnUvtBv9LEebb6NCiw$mGCIJMFPuC7iRb5kzhCc+S6/4fgiLdUevFETtvcG0+E",
    ),
    (
        "Alice Smith",
        "alice@example.com",
        "$argon2id$v=19$m=19456,t=2,p=1$NBGzhxnsvMW2pMwABBH18w$wkmxVhEz7tlz9bVaBf3hP3ftNFUU8nZMCCr82wi0QKM",
    ),
];

/// Read-only lookup of user records by email.
pub trait UserDirectory: Send + Sync {
    fn find_by_email(&self, email: &str) -> Option<User>;
}

/// In-memory directory keyed by email.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Vec<User>,
}

impl InMemoryUserDirectory {
    /// Fails if two records share an email.
    pub fn new(users: Vec<User>) -> Result<Self> {
        let mut seen = HashSet::new();
        for user in &users {
            if !seen.insert(user.email.as_str()) {
                bail!("Duplicate user email {}", user.email);
            }
        }
        Ok(Self { users })
    }

    /// Loads a JSON array of `{name, email, password_hash}` records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read users file {}", path.display()))?;
        let users: Vec<User> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse users file {}", path.display()))?;
        Self::new(users).with_context(|| format!("Invalid users file {}", path.display()))
    }

    pub fn with_demo_users() -> Result<Self> {
        warn!("USERS_FILE not set, seeding demo users");
        let users = DEMO_USERS
            .iter()
            .map(|(name, email, hash)| User {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: hash.to_string(),
            })
            .collect();
        Self::new(users)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_by_email(&self, email: &str) -> Option<User> {
        self.users.iter().find(|u| u.email == email).cloned()
    }
}
