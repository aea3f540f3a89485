use crate::models::product::{NewProduct, Product, ProductPatch};
use crate::services::store::{ProductStore, StoreResult};
use async_trait::async_trait;
use redis::aio::Connection;
use redis::{AsyncCommands, Client, RedisResult};
use uuid::Uuid;

/// Stores each product as a JSON document under `{base_key}:{id}`.
///
/// Insertion order is tracked in the list `{base_key}:__order`; writes that
/// touch both the document and the list run inside `MULTI`/`EXEC`.
#[derive(Debug, Clone)]
pub struct RedisService {
    client: Client,
    base_key: String,
}

impl RedisService {
    pub fn new<S: Into<String>>(client: Client, key: S) -> Self {
        let base_key = key.into();
        Self { client, base_key }
    }

    fn key(&self, id: &Uuid) -> String {
        format!("{}:{}", self.base_key, id)
    }

    fn order_key(&self) -> String {
        format!("{}:__order", self.base_key)
    }

    async fn read(&self, con: &mut Connection, id: &Uuid) -> StoreResult<Option<Product>> {
        let json: Option<String> = con.get(self.key(id)).await?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// `SET key json XX`, replies nil when the key is gone.
    fn replace_cmd(&self, id: &Uuid, json: &str) -> redis::Cmd {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(id)).arg(json).arg("XX");
        cmd
    }

    /// Removes the document and its order entry; replies with the `DEL` count.
    fn delete_pipe(&self, id: &Uuid) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(self.key(id))
            .lrem(self.order_key(), 0, id.to_string())
            .ignore();
        pipe
    }

    // Get a connection to the Redis server
    async fn connection(&self) -> RedisResult<Connection> {
        self.client.get_async_connection().await
    }
}

#[async_trait]
impl ProductStore for RedisService {
    async fn insert(&self, product: NewProduct) -> StoreResult<Product> {
        let product = Product::create(Uuid::new_v4(), product);
        let json = serde_json::to_string(&product)?;

        let mut con = self.connection().await?;
        redis::pipe()
            .atomic()
            .set(self.key(&product.id), json)
            .ignore()
            .rpush(self.order_key(), product.id.to_string())
            .ignore()
            .query_async::<_, ()>(&mut con)
            .await?;

        Ok(product)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let mut con = self.connection().await?;
        self.read(&mut con, &id).await
    }

    async fn get_all(&self) -> StoreResult<Vec<Product>> {
        let mut con = self.connection().await?;
        let ids: Vec<String> = con.lrange(self.order_key(), 0, -1).await?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys = ids
            .iter()
            .map(|id| format!("{}:{}", self.base_key, id))
            .collect::<Vec<_>>();

        let documents: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut con)
            .await?;

        let mut values = Vec::with_capacity(documents.len());

        // An id can outlive its document only if someone edits the keys by hand.
        for json in documents.into_iter().flatten() {
            values.push(serde_json::from_str(&json)?);
        }

        Ok(values)
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        let mut con = self.connection().await?;

        let mut product = match self.read(&mut con, &id).await? {
            Some(product) => product,
            None => return Ok(None),
        };

        product.apply(patch);
        let json = serde_json::to_string(&product)?;

        // XX: a delete that lands after the read must not bring the key back.
        let written: Option<String> = self
            .replace_cmd(&id, &json)
            .query_async(&mut con)
            .await?;

        Ok(written.map(|_| product))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let mut con = self.connection().await?;

        let product = match self.read(&mut con, &id).await? {
            Some(product) => product,
            None => return Ok(None),
        };

        let (removed,): (u32,) = self.delete_pipe(&id).query_async(&mut con).await?;

        // Another delete won the race.
        if removed == 0 {
            return Ok(None);
        }

        Ok(Some(product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let client = Client::open("redis://127.0.0.1/").unwrap();
        let service = RedisService::new(client, "products");
        let id = Uuid::nil();

        assert_eq!(
            service.key(&id),
            "products:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(service.order_key(), "products:__order");
    }

    fn packed(parts: &[&str]) -> Vec<u8> {
        let mut cmd = redis::cmd(parts[0]);
        for part in &parts[1..] {
            cmd.arg(*part);
        }
        cmd.get_packed_command()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }

    #[test]
    fn update_only_replaces_an_existing_document() {
        let client = Client::open("redis://127.0.0.1/").unwrap();
        let service = RedisService::new(client, "products");
        let id = Uuid::nil();
        let key = service.key(&id);

        assert_eq!(
            service.replace_cmd(&id, "{}").get_packed_command(),
            packed(&["SET", key.as_str(), "{}", "XX"])
        );
    }

    #[test]
    fn delete_removes_document_and_order_entry_atomically() {
        let client = Client::open("redis://127.0.0.1/").unwrap();
        let service = RedisService::new(client, "products");
        let id = Uuid::nil();
        let key = service.key(&id);
        let order_key = service.order_key();
        let id = id.to_string();

        let pipeline = service.delete_pipe(&Uuid::nil()).get_packed_pipeline();

        assert!(pipeline.starts_with(&packed(&["MULTI"])));
        assert!(contains(&pipeline, &packed(&["DEL", key.as_str()])));
        assert!(contains(
            &pipeline,
            &packed(&["LREM", order_key.as_str(), "0", id.as_str()])
        ));
        assert!(pipeline.ends_with(&packed(&["EXEC"])));
    }
}
