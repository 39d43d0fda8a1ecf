use parking_lot::RwLock;

use super::{RepoError, Row, Table};
use crate::models::Product;

pub trait ProductRepository: Send + Sync {
    fn create(&self, product: Product) -> Result<Product, RepoError>;
    fn find(&self, id: i64) -> Option<Product>;
    fn list(&self, limit: usize, offset: usize) -> Vec<Product>;
    fn list_by_category(&self, category_id: i64) -> Vec<Product>;
    fn count(&self) -> usize;
    fn update(&self, product: Product) -> Result<Product, RepoError>;
    fn delete(&self, id: i64) -> Result<(), RepoError>;
}

impl Row for Product {
    fn id(&self) -> i64 {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Default)]
pub struct MemoryProductRepository {
    table: RwLock<Table<Product>>,
}

impl MemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_sku(table: &Table<Product>, product: &Product) -> Result<(), RepoError> {
    if table
        .rows()
        .any(|p| p.id != product.id && p.sku == product.sku)
    {
        return Err(RepoError::Duplicate { field: "sku" });
    }
    Ok(())
}

impl ProductRepository for MemoryProductRepository {
    fn create(&self, mut product: Product) -> Result<Product, RepoError> {
        let mut table = self.table.write();
        product.id = 0;
        check_sku(&table, &product)?;
        Ok(table.insert(product))
    }

    fn find(&self, id: i64) -> Option<Product> {
        self.table.read().get(id).cloned()
    }

    fn list(&self, limit: usize, offset: usize) -> Vec<Product> {
        self.table.read().window(limit, offset)
    }

    fn list_by_category(&self, category_id: i64) -> Vec<Product> {
        self.table
            .read()
            .rows()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect()
    }

    fn count(&self) -> usize {
        self.table.read().len()
    }

    fn update(&self, product: Product) -> Result<Product, RepoError> {
        let mut table = self.table.write();
        if table.get(product.id).is_none() {
            return Err(RepoError::NotFound);
        }
        check_sku(&table, &product)?;
        table.replace(product)
    }

    fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.table.write().remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(sku: &str, category_id: i64) -> Product {
        Product {
            id: 0,
            name: "Widget".into(),
            description: "A widget".into(),
            price: 9.99,
            sku: sku.into(),
            stock: 5,
            category_id,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn category_filter() {
        let repo = MemoryProductRepository::new();
        repo.create(product("A-1", 1)).unwrap();
        repo.create(product("A-2", 2)).unwrap();
        repo.create(product("A-3", 1)).unwrap();

        let in_one: Vec<_> = repo.list_by_category(1).into_iter().map(|p| p.sku).collect();
        assert_eq!(in_one, ["A-1", "A-3"]);
        assert!(repo.list_by_category(7).is_empty());
    }

    #[test]
    fn sku_is_unique() {
        let repo = MemoryProductRepository::new();
        repo.create(product("A-1", 1)).unwrap();
        assert_eq!(
            repo.create(product("A-1", 2)).unwrap_err(),
            RepoError::Duplicate { field: "sku" }
        );
    }

    #[test]
    fn update_unknown_is_not_found() {
        let repo = MemoryProductRepository::new();
        let mut p = product("A-1", 1);
        p.id = 42;
        assert_eq!(repo.update(p).unwrap_err(), RepoError::NotFound);
    }
}
