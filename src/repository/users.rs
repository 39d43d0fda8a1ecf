use parking_lot::RwLock;

use super::{RepoError, Row, Table};
use crate::models::User;

pub trait UserRepository: Send + Sync {
    /// Store a new user; the returned copy carries the assigned id.
    fn create(&self, user: User) -> Result<User, RepoError>;
    fn find(&self, id: i64) -> Option<User>;
    fn find_by_email(&self, email: &str) -> Option<User>;
    fn find_by_username(&self, username: &str) -> Option<User>;
    /// Users in id order.
    fn list(&self, limit: usize, offset: usize) -> Vec<User>;
    fn count(&self) -> usize;
    fn update(&self, user: User) -> Result<User, RepoError>;
    fn delete(&self, id: i64) -> Result<(), RepoError>;
}

impl Row for User {
    fn id(&self) -> i64 {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    table: RwLock<Table<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Email and username are unique across all users other than `user` itself.
fn check_unique(table: &Table<User>, user: &User) -> Result<(), RepoError> {
    for other in table.rows().filter(|u| u.id != user.id) {
        if other.email.eq_ignore_ascii_case(&user.email) {
            return Err(RepoError::Duplicate { field: "email" });
        }
        if other.username == user.username {
            return Err(RepoError::Duplicate { field: "username" });
        }
    }
    Ok(())
}

impl UserRepository for MemoryUserRepository {
    fn create(&self, mut user: User) -> Result<User, RepoError> {
        let mut table = self.table.write();
        user.id = 0;
        check_unique(&table, &user)?;
        Ok(table.insert(user))
    }

    fn find(&self, id: i64) -> Option<User> {
        self.table.read().get(id).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        self.table
            .read()
            .rows()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn find_by_username(&self, username: &str) -> Option<User> {
        self.table
            .read()
            .rows()
            .find(|u| u.username == username)
            .cloned()
    }

    fn list(&self, limit: usize, offset: usize) -> Vec<User> {
        self.table.read().window(limit, offset)
    }

    fn count(&self) -> usize {
        self.table.read().len()
    }

    fn update(&self, user: User) -> Result<User, RepoError> {
        let mut table = self.table.write();
        if table.get(user.id).is_none() {
            return Err(RepoError::NotFound);
        }
        check_unique(&table, &user)?;
        table.replace(user)
    }

    fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.table.write().remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(username: &str, email: &str) -> User {
        User {
            id: 0,
            username: username.into(),
            email: email.into(),
            password_hash: String::new(),
            first_name: "A".into(),
            last_name: "B".into(),
            is_active: true,
            is_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let repo = MemoryUserRepository::new();
        let a = repo.create(user("alice", "a@x.io")).unwrap();
        let b = repo.create(user("bob", "b@x.io")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(repo.count(), 2);
        assert_eq!(repo.list(1, 1)[0].username, "bob");
    }

    #[test]
    fn uniqueness_is_enforced() {
        let repo = MemoryUserRepository::new();
        repo.create(user("alice", "a@x.io")).unwrap();
        assert_eq!(
            repo.create(user("alice2", "A@X.io")).unwrap_err(),
            RepoError::Duplicate { field: "email" }
        );
        assert_eq!(
            repo.create(user("alice", "other@x.io")).unwrap_err(),
            RepoError::Duplicate { field: "username" }
        );
    }

    #[test]
    fn update_may_keep_own_email() {
        let repo = MemoryUserRepository::new();
        let mut a = repo.create(user("alice", "a@x.io")).unwrap();
        a.first_name = "Alicia".into();
        assert_eq!(repo.update(a).unwrap().first_name, "Alicia");
    }

    #[test]
    fn delete_missing_is_not_found() {
        let repo = MemoryUserRepository::new();
        assert_eq!(repo.delete(9), Err(RepoError::NotFound));
        assert!(repo.find_by_username("ghost").is_none());
    }
}
