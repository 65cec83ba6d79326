use serde::{Deserialize, Serialize};

/// Login request body. Missing fields deserialize to empty strings and simply
/// fail to match.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// A verified user, as carried in token claims.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub name: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    pub email: String,
    pub token: String,
}
