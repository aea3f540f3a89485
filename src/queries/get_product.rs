use crate::models::product::Product;
use crate::requests::{Request, RequestHandler};
use crate::services::store::{SharedStore, StoreError};
use async_trait::async_trait;
use uuid::Uuid;

pub struct GetProductRequest(pub Uuid);
impl Request<Result<Option<Product>, StoreError>> for GetProductRequest {}

pub struct GetProductRequestHandler(pub SharedStore);

#[async_trait]
impl RequestHandler<GetProductRequest, Result<Option<Product>, StoreError>>
    for GetProductRequestHandler
{
    async fn handle(&mut self, req: GetProductRequest) -> Result<Option<Product>, StoreError> {
        self.0.get(req.0).await
    }
}
