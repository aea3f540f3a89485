use crate::models::product::{NewProduct, Product, ProductPatch};
use crate::services::store::{ProductStore, StoreResult};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keeps products in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: RwLock<Vec<Product>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let product = Product::create(Uuid::new_v4(), product);
        self.products.write().await.push(product.clone());
        Ok(product)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_all(&self) -> StoreResult<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        let mut products = self.products.write().await;

        match products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.apply(patch);
                Ok(Some(product.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let mut products = self.products.write().await;

        match products.iter().position(|p| p.id == id) {
            Some(index) => Ok(Some(products.remove(index))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(name: &str, price: f64) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            price,
            product_image: format!("{}.png", name),
        }
    }

    #[actix_web::test]
    async fn keeps_insertion_order() {
        let store = MemoryStore::new();
        let a = store.insert(new_product("a", 1.0)).await.unwrap();
        let b = store.insert(new_product("b", 2.0)).await.unwrap();
        let c = store.insert(new_product("c", 3.0)).await.unwrap();

        store.delete(b.id).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all, vec![a, c]);
    }

    #[actix_web::test]
    async fn update_and_delete_report_missing_ids() {
        let store = MemoryStore::new();
        let missing = Uuid::new_v4();

        let patch = ProductPatch {
            name: Some("x".to_owned()),
            price: None,
        };
        assert!(store.update(missing, patch).await.unwrap().is_none());
        assert!(store.delete(missing).await.unwrap().is_none());
        assert!(store.get(missing).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn update_applies_patch_in_place() {
        let store = MemoryStore::new();
        let lamp = store.insert(new_product("lamp", 10.0)).await.unwrap();

        let patch = ProductPatch {
            name: None,
            price: Some(42.0),
        };
        let updated = store.update(lamp.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.price, 42.0);

        let stored = store.get(lamp.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "lamp");
        assert_eq!(stored.price, 42.0);
        assert_eq!(stored.product_image, "lamp.png");
    }
}
