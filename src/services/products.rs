use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use super::{invalid, ServiceError, Validated};
use crate::events::{self, Event, EventBus};
use crate::models::Product;
use crate::pagination::{Page, Pagination};
use crate::repository::ProductRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub sku: String,
    pub stock: i64,
    pub category_id: i64,
}

impl Validated for CreateProduct {
    const RULES: &'static [(&'static str, &'static [&'static str])] = &[
        ("name", &["required"]),
        ("description", &["required"]),
        ("price", &["required", "numeric", "min:0"]),
        ("sku", &["required"]),
        ("stock", &["required", "numeric", "min:0"]),
        ("category_id", &["required", "numeric"]),
    ];
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub sku: Option<String>,
    pub stock: Option<i64>,
    pub category_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl Validated for UpdateProduct {
    const RULES: &'static [(&'static str, &'static [&'static str])] = &[
        ("price", &["numeric", "min:0"]),
        ("stock", &["numeric", "min:0"]),
    ];
}

/// Absolute stock level, not a delta.
#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdate {
    pub quantity: i64,
}

impl Validated for StockUpdate {
    const RULES: &'static [(&'static str, &'static [&'static str])] =
        &[("quantity", &["required", "numeric", "min:0"])];
}

#[derive(Clone)]
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
    bus: Arc<EventBus>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>, bus: Arc<EventBus>) -> Self {
        Self { repo, bus }
    }

    pub fn create(&self, req: CreateProduct) -> Result<Product, ServiceError> {
        if req.sku.trim().is_empty() {
            return Err(invalid("sku", "SKU cannot be empty"));
        }
        check_amounts(req.price, req.stock)?;

        let now = Utc::now();
        let product = Product {
            id: 0,
            name: req.name,
            description: req.description,
            price: req.price,
            sku: req.sku,
            stock: req.stock,
            category_id: req.category_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let product = self
            .repo
            .create(product)
            .map_err(|e| ServiceError::from_repo("Product", e))?;

        tracing::debug!(id = product.id, sku = %product.sku, "product created");
        self.bus.publish(Event::new(events::PRODUCT_CREATED, product.clone()));
        Ok(product)
    }

    pub fn get(&self, id: i64) -> Result<Product, ServiceError> {
        self.repo.find(id).ok_or(ServiceError::NotFound("Product"))
    }

    pub fn list(&self, window: Pagination) -> Page<Product> {
        let items = self.repo.list(window.limit(), window.offset());
        Page::new(items, self.repo.count(), window)
    }

    pub fn list_by_category(&self, category_id: i64) -> Vec<Product> {
        self.repo.list_by_category(category_id)
    }

    pub fn update(&self, id: i64, req: UpdateProduct) -> Result<Product, ServiceError> {
        let mut product = self.get(id)?;

        if let Some(name) = req.name {
            product.name = name;
        }
        if let Some(description) = req.description {
            product.description = description;
        }
        if let Some(price) = req.price {
            product.price = price;
        }
        if let Some(sku) = req.sku {
            product.sku = sku;
        }
        if let Some(stock) = req.stock {
            product.stock = stock;
        }
        if let Some(category_id) = req.category_id {
            product.category_id = category_id;
        }
        if let Some(is_active) = req.is_active {
            product.is_active = is_active;
        }
        check_amounts(product.price, product.stock)?;
        product.updated_at = Utc::now();

        let product = self
            .repo
            .update(product)
            .map_err(|e| ServiceError::from_repo("Product", e))?;
        self.bus.publish(Event::new(events::PRODUCT_UPDATED, product.clone()));
        Ok(product)
    }

    pub fn update_stock(&self, id: i64, quantity: i64) -> Result<Product, ServiceError> {
        let mut product = self.get(id)?;
        check_amounts(product.price, quantity)?;

        product.stock = quantity;
        product.updated_at = Utc::now();
        let product = self
            .repo
            .update(product)
            .map_err(|e| ServiceError::from_repo("Product", e))?;
        self.bus.publish(Event::new(events::STOCK_UPDATED, product.clone()));
        Ok(product)
    }

    pub fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.repo
            .delete(id)
            .map_err(|e| ServiceError::from_repo("Product", e))?;
        self.bus.publish(Event::new(events::PRODUCT_DELETED, id));
        Ok(())
    }
}

fn check_amounts(price: f64, stock: i64) -> Result<(), ServiceError> {
    if !price.is_finite() || price < 0.0 {
        return Err(invalid("price", "This field must be at least 0."));
    }
    if stock < 0 {
        return Err(invalid("stock", "This field must be at least 0."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryProductRepository;
    use crate::services::parse;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn service_with_bus(bus: Arc<EventBus>) -> ProductService {
        ProductService::new(Arc::new(MemoryProductRepository::new()), bus)
    }

    fn widget(sku: &str) -> CreateProduct {
        CreateProduct {
            name: "Widget".into(),
            description: "Blue".into(),
            price: 4.5,
            sku: sku.into(),
            stock: 3,
            category_id: 2,
        }
    }

    #[test]
    fn create_rules() {
        let err = parse::<CreateProduct>(json!({
            "name": "Widget",
            "description": "Blue",
            "price": -1,
            "sku": "W-1",
            "stock": 1,
            "category_id": 1,
        }))
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(f) if f.contains_key("price")));

        let ok = parse::<CreateProduct>(json!({
            "name": "Widget",
            "description": "Blue",
            "price": 0,
            "sku": "W-1",
            "stock": 0,
            "category_id": 1,
        }));
        assert!(ok.is_ok());
    }

    #[test]
    fn crud_round() {
        let products = service_with_bus(Arc::new(EventBus::new()));
        let p = products.create(widget("W-1")).unwrap();
        assert!(p.is_active);

        let patch = UpdateProduct { price: Some(5.0), ..Default::default() };
        assert_eq!(products.update(p.id, patch).unwrap().price, 5.0);

        let bad = UpdateProduct { stock: Some(-3), ..Default::default() };
        assert!(matches!(products.update(p.id, bad), Err(ServiceError::Validation(_))));

        assert_eq!(products.update_stock(p.id, 40).unwrap().stock, 40);
        assert_eq!(products.list_by_category(2).len(), 1);

        products.delete(p.id).unwrap();
        assert!(matches!(products.get(p.id), Err(ServiceError::NotFound("Product"))));
    }

    #[test]
    fn duplicate_sku_conflicts() {
        let products = service_with_bus(Arc::new(EventBus::new()));
        products.create(widget("W-1")).unwrap();
        assert!(matches!(products.create(widget("W-1")), Err(ServiceError::Taken("sku"))));
    }

    #[tokio::test]
    async fn mutations_are_published() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe_many(
            &[events::PRODUCT_CREATED, events::STOCK_UPDATED, events::PRODUCT_DELETED],
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        let products = service_with_bus(Arc::clone(&bus));
        let p = products.create(widget("W-9")).unwrap();
        products.update_stock(p.id, 1).unwrap();
        products.delete(p.id).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
