use axum::http::{header::AUTHORIZATION, HeaderMap};
use mural::{MuralError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_sha256: String,
}

/// Accounts allowed to post. Read access needs no account.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, String>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<UserRecord>) -> Self {
        let users = records
            .into_iter()
            .map(|r| (r.username, r.password_sha256.to_lowercase()))
            .collect();
        Self { users }
    }

    /// Add a user with a plaintext password (hashed before storing).
    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users
            .insert(username.to_string(), hash_password(password));
        self
    }

    /// Parse `name:password,name2:password2`. Entries without a `:` are skipped.
    pub fn parse_user_list(raw: &str) -> Self {
        raw.split(',')
            .filter_map(|entry| entry.trim().split_once(':'))
            .filter(|(name, _)| !name.is_empty())
            .fold(Self::new(), |dir, (name, password)| {
                dir.with_user(name, password)
            })
    }

    /// Load users from {data_dir}/users.json, falling back to `MURAL_USERS`.
    pub fn load_or_default(data_dir: &Path) -> Self {
        let users_json = data_dir.join("users.json");

        if users_json.exists() {
            match std::fs::read_to_string(&users_json) {
                Ok(contents) => match serde_json::from_str::<Vec<UserRecord>>(&contents) {
                    Ok(records) => {
                        let dir = Self::from_records(records);
                        tracing::info!("Loaded {} users from users.json", dir.len());
                        return dir;
                    }
                    Err(e) => tracing::warn!("Failed to parse users.json: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read users.json: {}", e),
            }
        }

        let dir = std::env::var("MURAL_USERS")
            .map(|raw| Self::parse_user_list(&raw))
            .unwrap_or_default();
        if dir.is_empty() {
            tracing::warn!("⚠ No users configured, posting is disabled until users.json or MURAL_USERS is set.");
        } else {
            tracing::info!("Loaded {} users from MURAL_USERS", dir.len());
        }
        dir
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|stored| *stored == hash_password(password))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// In-memory session tokens, valid until the process exits.
#[derive(Default)]
pub struct SessionStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check credentials and issue a fresh token for `username`.
    pub fn login(&self, users: &UserDirectory, username: &str, password: &str) -> Result<String> {
        if !users.verify(username, password) {
            return Err(MuralError::InvalidCredentials);
        }
        let token = generate_token();
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone(), username.to_string());
        Ok(token)
    }

    pub fn username_for(&self, token: &str) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .cloned()
    }

    /// Resolve the `Authorization: Bearer <token>` header to a username.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<String> {
        bearer_token(headers)
            .and_then(|token| self.username_for(token))
            .ok_or(MuralError::Unauthorized)
    }
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::io::Write;

    #[test]
    fn test_verify_hashed_password() {
        let users = UserDirectory::new().with_user("alice", "s3cret");
        assert!(users.verify("alice", "s3cret"));
        assert!(!users.verify("alice", "wrong"));
        assert!(!users.verify("bob", "s3cret"));
    }

    #[test]
    fn test_parse_user_list() {
        let users = UserDirectory::parse_user_list("alice:pw1, bob:pw:with:colons,broken,:nobody");
        assert_eq!(users.len(), 2);
        assert!(users.verify("alice", "pw1"));
        assert!(users.verify("bob", "pw:with:colons"));
    }

    #[test]
    fn test_load_from_users_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = vec![UserRecord {
            username: "carol".to_string(),
            password_sha256: hash_password("hunter2").to_uppercase(),
        }];
        let mut file = std::fs::File::create(temp_dir.path().join("users.json")).unwrap();
        file.write_all(serde_json::to_string(&records).unwrap().as_bytes())
            .unwrap();

        let users = UserDirectory::load_or_default(temp_dir.path());
        assert!(users.verify("carol", "hunter2"));
    }

    #[test]
    fn test_login_issues_distinct_tokens() {
        let users = UserDirectory::new().with_user("alice", "pw");
        let sessions = SessionStore::new();

        let t1 = sessions.login(&users, "alice", "pw").unwrap();
        let t2 = sessions.login(&users, "alice", "pw").unwrap();

        assert_ne!(t1, t2);
        assert_eq!(t1.len(), 32);
        assert_eq!(sessions.username_for(&t1).as_deref(), Some("alice"));
        assert_eq!(sessions.username_for(&t2).as_deref(), Some("alice"));
    }

    #[test]
    fn test_login_rejects_bad_password() {
        let users = UserDirectory::new().with_user("alice", "pw");
        let sessions = SessionStore::new();
        assert!(matches!(
            sessions.login(&users, "alice", "nope"),
            Err(MuralError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_authenticate_from_bearer_header() {
        let users = UserDirectory::new().with_user("alice", "pw");
        let sessions = SessionStore::new();
        let token = sessions.login(&users, "alice", "pw").unwrap();

        let mut headers = HeaderMap::new();
        assert!(matches!(
            sessions.authenticate(&headers),
            Err(MuralError::Unauthorized)
        ));

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(sessions.authenticate(&headers).unwrap(), "alice");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer unknown"));
        assert!(sessions.authenticate(&headers).is_err());
    }
}
