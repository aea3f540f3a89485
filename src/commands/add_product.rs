use crate::commands::CommandError;
use crate::models::product::{NewProduct, Product};
use crate::requests::{Request, RequestHandler};
use crate::services::store::SharedStore;
use async_trait::async_trait;

/// Raw form values for a new product; `product_image` is the name the
/// upload stage gave the stored file.
#[derive(Debug, Clone)]
pub struct AddProductCommand {
    pub name: Option<String>,
    pub price: Option<String>,
    pub product_image: String,
}

impl Request<Result<Product, CommandError>> for AddProductCommand {}

pub struct AddProductRequestHandler(pub SharedStore);

#[async_trait]
impl RequestHandler<AddProductCommand, Result<Product, CommandError>> for AddProductRequestHandler {
    async fn handle(&mut self, command: AddProductCommand) -> Result<Product, CommandError> {
        let product = NewProduct::from_form(
            command.name.as_deref(),
            command.price.as_deref(),
            &command.product_image,
        )?;

        let product = self.0.insert(product).await?;
        log::info!("Added: {} - {}", product.name, product.id);

        Ok(product)
    }
}
