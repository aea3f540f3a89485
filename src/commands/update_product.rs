use crate::commands::CommandError;
use crate::models::product::{Product, ProductPatch, UpdateOp};
use crate::requests::{Request, RequestHandler};
use crate::services::store::SharedStore;
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UpdateProductCommand {
    pub id: Uuid,
    pub ops: Vec<UpdateOp>,
}

impl Request<Result<Option<Product>, CommandError>> for UpdateProductCommand {}

pub struct UpdateProductRequestHandler(pub SharedStore);

#[async_trait]
impl RequestHandler<UpdateProductCommand, Result<Option<Product>, CommandError>>
    for UpdateProductRequestHandler
{
    async fn handle(
        &mut self,
        command: UpdateProductCommand,
    ) -> Result<Option<Product>, CommandError> {
        let patch = ProductPatch::from_ops(command.ops)?;
        if patch.is_empty() {
            log::debug!("Empty update for {}", command.id);
        }

        let result = self.0.update(command.id, patch).await?;

        if let Some(product) = &result {
            log::info!("Updated: {} - {}", product.name, product.id);
        }

        Ok(result)
    }
}
