use crate::models::product::Product;
use crate::requests::{Request, RequestHandler};
use crate::services::store::{SharedStore, StoreError};
use async_trait::async_trait;
use uuid::Uuid;

pub struct DeleteProductCommand(pub Uuid);
impl Request<Result<Option<Product>, StoreError>> for DeleteProductCommand {}

pub struct DeleteProductRequestHandler(pub SharedStore);

#[async_trait]
impl RequestHandler<DeleteProductCommand, Result<Option<Product>, StoreError>>
    for DeleteProductRequestHandler
{
    async fn handle(
        &mut self,
        request: DeleteProductCommand,
    ) -> Result<Option<Product>, StoreError> {
        let result = self.0.delete(request.0).await?;

        if let Some(deleted) = &result {
            log::info!("Deleted: {} - {}", deleted.name, deleted.id);
        }

        Ok(result)
    }
}
