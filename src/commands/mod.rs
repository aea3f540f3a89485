mod add_product;
pub use add_product::*;

mod update_product;
pub use update_product::*;

mod delete_product;
pub use delete_product::*;

use crate::models::product::SchemaError;
use crate::services::store::StoreError;
use thiserror::Error;

/// Why a product command did not go through.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
