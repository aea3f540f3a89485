mod get_product;
pub use get_product::*;

mod get_all_products;
pub use get_all_products::*;
