use crate::models::product::Product;
use crate::requests::{Request, RequestHandler};
use crate::services::store::{SharedStore, StoreError};
use async_trait::async_trait;

pub struct GetAllProductsRequest;
impl Request<Result<Vec<Product>, StoreError>> for GetAllProductsRequest {}

pub struct GetAllProductsRequestHandler(pub SharedStore);

#[async_trait]
impl RequestHandler<GetAllProductsRequest, Result<Vec<Product>, StoreError>>
    for GetAllProductsRequestHandler
{
    async fn handle(&mut self, _: GetAllProductsRequest) -> Result<Vec<Product>, StoreError> {
        self.0.get_all().await
    }
}
