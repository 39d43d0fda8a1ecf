use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use rand::rngs::OsRng;
use serde::Deserialize;

use super::{invalid, ServiceError, Validated};
use crate::events::{self, Event, EventBus};
use crate::models::User;
use crate::pagination::{Page, Pagination};
use crate::repository::UserRepository;

// ─── Requests ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Validated for RegisterUser {
    const RULES: &'static [(&'static str, &'static [&'static str])] = &[
        ("username", &["required", "min:3", "max:50"]),
        ("email", &["required", "email"]),
        ("password", &["required", "min:8"]),
        ("first_name", &["required"]),
        ("last_name", &["required"]),
    ];
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
}

impl Validated for UpdateUser {
    const RULES: &'static [(&'static str, &'static [&'static str])] = &[
        ("username", &["min:3", "max:50"]),
        ("email", &["email"]),
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

impl Validated for ChangePassword {
    const RULES: &'static [(&'static str, &'static [&'static str])] = &[
        ("current_password", &["required"]),
        ("new_password", &["required", "min:8"]),
    ];
}

/// `login` is an email when it contains `@`, else a username.
#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub login: String,
    pub password: String,
}

impl Validated for Login {
    const RULES: &'static [(&'static str, &'static [&'static str])] =
        &[("login", &["required"]), ("password", &["required"])];
}

// ─── Service ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    bus: Arc<EventBus>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, bus: Arc<EventBus>) -> Self {
        Self { repo, bus }
    }

    /// New users start active and non-admin.
    pub fn register(&self, req: RegisterUser) -> Result<User, ServiceError> {
        if self.repo.find_by_email(&req.email).is_some() {
            return Err(ServiceError::Taken("email"));
        }
        if self.repo.find_by_username(&req.username).is_some() {
            return Err(ServiceError::Taken("username"));
        }

        let now = Utc::now();
        let user = User {
            id: 0,
            username: req.username,
            email: req.email,
            password_hash: hash_password(&req.password)?,
            first_name: req.first_name,
            last_name: req.last_name,
            is_active: true,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        let user = self
            .repo
            .create(user)
            .map_err(|e| ServiceError::from_repo("User", e))?;

        tracing::debug!(id = user.id, username = %user.username, "user registered");
        self.bus.publish(Event::new(events::USER_CREATED, user.clone()));
        Ok(user)
    }

    pub fn get(&self, id: i64) -> Result<User, ServiceError> {
        self.repo.find(id).ok_or(ServiceError::NotFound("User"))
    }

    pub fn list(&self, window: Pagination) -> Page<User> {
        let items = self.repo.list(window.limit(), window.offset());
        Page::new(items, self.repo.count(), window)
    }

    pub fn update(&self, id: i64, req: UpdateUser) -> Result<User, ServiceError> {
        let mut user = self.get(id)?;

        if let Some(username) = req.username {
            user.username = username;
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        if let Some(first_name) = req.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = req.last_name {
            user.last_name = last_name;
        }
        if let Some(is_active) = req.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();

        let user = self
            .repo
            .update(user)
            .map_err(|e| ServiceError::from_repo("User", e))?;
        self.bus.publish(Event::new(events::USER_UPDATED, user.clone()));
        Ok(user)
    }

    pub fn change_password(&self, id: i64, req: ChangePassword) -> Result<(), ServiceError> {
        let mut user = self.get(id)?;
        if !verify_password(&req.current_password, &user.password_hash) {
            return Err(ServiceError::WrongPassword);
        }
        if req.new_password.chars().count() < 8 {
            return Err(invalid("new_password", "This field must be at least 8 characters."));
        }

        user.password_hash = hash_password(&req.new_password)?;
        user.updated_at = Utc::now();
        let user = self
            .repo
            .update(user)
            .map_err(|e| ServiceError::from_repo("User", e))?;
        self.bus.publish(Event::new(events::USER_UPDATED, user));
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.repo
            .delete(id)
            .map_err(|e| ServiceError::from_repo("User", e))?;
        self.bus.publish(Event::new(events::USER_DELETED, id));
        Ok(())
    }

    /// Unknown login and wrong password are indistinguishable to the caller.
    pub fn authenticate(&self, req: &Login) -> Result<User, ServiceError> {
        let found = if req.login.contains('@') {
            self.repo.find_by_email(&req.login)
        } else {
            self.repo.find_by_username(&req.login)
        };
        let user = found.ok_or(ServiceError::InvalidCredentials)?;

        if !user.is_active || !verify_password(&req.password, &user.password_hash) {
            tracing::warn!(login = %req.login, "login failed");
            return Err(ServiceError::InvalidCredentials);
        }

        self.bus.publish(Event::new(events::USER_LOGGED_IN, user.clone()));
        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryUserRepository;
    use crate::services::parse;
    use serde_json::json;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryUserRepository::new()), Arc::new(EventBus::new()))
    }

    fn alice() -> RegisterUser {
        parse(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "correct horse",
            "first_name": "Alice",
            "last_name": "Liddell",
        }))
        .unwrap()
    }

    #[test]
    fn register_hashes_and_hides_password() {
        let users = service();
        let user = users.register(alice()).unwrap();

        assert!(user.is_active);
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "correct horse");
        assert!(user.password_hash.starts_with("$argon2"));

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
    }

    #[test]
    fn duplicate_email_or_username_conflicts() {
        let users = service();
        users.register(alice()).unwrap();

        let mut again = alice();
        again.username = "alice2".into();
        assert!(matches!(users.register(again), Err(ServiceError::Taken("email"))));

        let mut again = alice();
        again.email = "other@example.com".into();
        assert!(matches!(users.register(again), Err(ServiceError::Taken("username"))));
    }

    #[test]
    fn register_rules_reject_bad_input() {
        let err = parse::<RegisterUser>(json!({
            "username": "al",
            "email": "nope",
            "password": "short",
        }))
        .unwrap_err();
        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 5);
        assert!(fields.contains_key("first_name"));
    }

    #[test]
    fn login_by_email_or_username() {
        let users = service();
        users.register(alice()).unwrap();

        let by_name = Login { login: "alice".into(), password: "correct horse".into() };
        let by_mail = Login { login: "alice@example.com".into(), password: "correct horse".into() };
        let wrong = Login { login: "alice".into(), password: "incorrect".into() };
        let ghost = Login { login: "ghost".into(), password: "correct horse".into() };

        assert_eq!(users.authenticate(&by_name).unwrap().username, "alice");
        assert_eq!(users.authenticate(&by_mail).unwrap().username, "alice");
        assert!(matches!(users.authenticate(&wrong), Err(ServiceError::InvalidCredentials)));
        assert!(matches!(users.authenticate(&ghost), Err(ServiceError::InvalidCredentials)));
    }

    #[test]
    fn change_password_verifies_current() {
        let users = service();
        let id = users.register(alice()).unwrap().id;

        let wrong = ChangePassword {
            current_password: "nope".into(),
            new_password: "new password".into(),
        };
        assert!(matches!(users.change_password(id, wrong), Err(ServiceError::WrongPassword)));

        let ok = ChangePassword {
            current_password: "correct horse".into(),
            new_password: "battery staple".into(),
        };
        users.change_password(id, ok).unwrap();

        let login = Login { login: "alice".into(), password: "battery staple".into() };
        assert!(users.authenticate(&login).is_ok());
    }

    #[test]
    fn partial_update_and_delete() {
        let users = service();
        let id = users.register(alice()).unwrap().id;

        let patch = UpdateUser { first_name: Some("Alicia".into()), ..Default::default() };
        let user = users.update(id, patch).unwrap();
        assert_eq!(user.first_name, "Alicia");
        assert_eq!(user.last_name, "Liddell");

        users.delete(id).unwrap();
        assert!(matches!(users.get(id), Err(ServiceError::NotFound("User"))));
        assert!(matches!(users.delete(id), Err(ServiceError::NotFound("User"))));
    }
}
