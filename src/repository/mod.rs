//! Storage seams. The in-memory implementations stand in for a database and
//! enforce the same uniqueness constraints one would.

pub mod products;
pub mod users;

use std::collections::BTreeMap;

use thiserror::Error;

pub use products::{MemoryProductRepository, ProductRepository};
pub use users::{MemoryUserRepository, UserRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("{field} is already taken")]
    Duplicate { field: &'static str },
}

/// Rows carry their own primary key.
pub(crate) trait Row: Clone {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

/// Id-ordered rows plus an auto-increment counter.
pub(crate) struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Row> Table<T> {
    pub(crate) fn insert(&mut self, mut row: T) -> T {
        row.set_id(self.next_id);
        self.next_id += 1;
        self.rows.insert(row.id(), row.clone());
        row
    }

    pub(crate) fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub(crate) fn replace(&mut self, row: T) -> Result<T, RepoError> {
        match self.rows.get_mut(&row.id()) {
            Some(slot) => {
                *slot = row.clone();
                Ok(row)
            }
            None => Err(RepoError::NotFound),
        }
    }

    pub(crate) fn remove(&mut self, id: i64) -> Result<(), RepoError> {
        self.rows.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub(crate) fn window(&self, limit: usize, offset: usize) -> Vec<T> {
        self.rows.values().skip(offset).take(limit).cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}
