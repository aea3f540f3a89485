use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// A product document as it is kept in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    #[serde(rename = "productImage")]
    pub product_image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartialEq<Self> for Product {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Product {}

impl Product {
    pub fn create(id: Uuid, new: NewProduct) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: new.name,
            price: new.price,
            product_image: new.product_image,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `patch` and returns whether any field was written.
    pub fn apply(&mut self, patch: ProductPatch) -> bool {
        let will_update = patch.name.is_some() || patch.price.is_some();
        self.name = patch.name.unwrap_or_else(|| std::mem::take(&mut self.name));
        self.price = patch.price.unwrap_or(self.price);

        if will_update {
            self.updated_at = Utc::now();
        }

        will_update
    }
}

/// The public projection of a [`Product`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(serialize_with = "serialize_price")]
    pub price: f64,
    #[serde(rename = "productImage")]
    pub product_image: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        ProductView {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            product_image: product.product_image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("Path `{0}` is required.")]
    Required(&'static str),

    #[error("Cast to {expected} failed for value {value} at path \"{path}\"")]
    Cast {
        path: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Path `price` ({0}) must not be negative.")]
    NegativePrice(f64),

    #[error("Path `{0}` can not be updated.")]
    NotUpdatable(String),
}

/// A product that passed schema validation but has no id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub product_image: String,
}

impl NewProduct {
    /// Validates raw form values the way the product schema requires.
    pub fn from_form(
        name: Option<&str>,
        price: Option<&str>,
        product_image: &str,
    ) -> Result<NewProduct, SchemaError> {
        let name = name
            .filter(|s| !s.trim().is_empty())
            .ok_or(SchemaError::Required("name"))?;

        let price = match price.map(str::trim) {
            None | Some("") => return Err(SchemaError::Required("price")),
            Some(raw) => parse_price(&Value::String(raw.to_owned()))?,
        };

        if product_image.is_empty() {
            return Err(SchemaError::Required("productImage"));
        }

        Ok(NewProduct {
            name: name.to_owned(),
            price,
            product_image: product_image.to_owned(),
        })
    }
}

/// One `{propName, value}` pair of a partial update body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOp {
    #[serde(rename = "propName")]
    pub prop_name: String,
    pub value: Value,
}

/// The set of fields a partial update may change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
}

impl ProductPatch {
    /// Folds update operations in order; a later op on the same field wins.
    pub fn from_ops<I>(ops: I) -> Result<ProductPatch, SchemaError>
    where
        I: IntoIterator<Item = UpdateOp>,
    {
        let mut patch = ProductPatch::default();

        for op in ops {
            match op.prop_name.as_str() {
                "name" => match op.value {
                    Value::String(name) if !name.trim().is_empty() => patch.name = Some(name),
                    Value::String(_) | Value::Null => return Err(SchemaError::Required("name")),
                    other => {
                        return Err(SchemaError::Cast {
                            path: "name",
                            expected: "string",
                            value: other.to_string(),
                        })
                    }
                },
                "price" => patch.price = Some(parse_price(&op.value)?),
                other => return Err(SchemaError::NotUpdatable(other.to_owned())),
            }
        }

        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none()
    }
}

fn parse_price(value: &Value) -> Result<f64, SchemaError> {
    let cast_error = || SchemaError::Cast {
        path: "price",
        expected: "Number",
        value: value.to_string(),
    };

    let price = match value {
        Value::Number(n) => n.as_f64().ok_or_else(cast_error)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| cast_error())?,
        Value::Null => return Err(SchemaError::Required("price")),
        _ => return Err(cast_error()),
    };

    if !price.is_finite() {
        return Err(cast_error());
    }

    if price < 0.0 {
        return Err(SchemaError::NegativePrice(price));
    }

    Ok(price)
}

// Integers above 2^53 are not exact in a JSON number anyway.
const MAX_EXACT_PRICE: f64 = 9_007_199_254_740_992.0;

/// Writes whole prices as integers (`10`, not `10.0`).
fn serialize_price<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if price.fract() == 0.0 && price.abs() <= MAX_EXACT_PRICE {
        serializer.serialize_i64(*price as i64)
    } else {
        serializer.serialize_f64(*price)
    }
}

/// Text fields of a multipart form, by name.
pub type FormFields = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(prop_name: &str, value: Value) -> UpdateOp {
        UpdateOp {
            prop_name: prop_name.to_owned(),
            value,
        }
    }

    #[test]
    fn form_values_are_validated() {
        let product = NewProduct::from_form(Some("Lamp"), Some("12.5"), "img.png").unwrap();
        assert_eq!(product.name, "Lamp");
        assert_eq!(product.price, 12.5);
        assert_eq!(product.product_image, "img.png");

        assert_eq!(
            NewProduct::from_form(None, Some("1"), "img.png"),
            Err(SchemaError::Required("name"))
        );
        assert_eq!(
            NewProduct::from_form(Some("Lamp"), Some(" "), "img.png"),
            Err(SchemaError::Required("price"))
        );
        assert!(matches!(
            NewProduct::from_form(Some("Lamp"), Some("cheap"), "img.png"),
            Err(SchemaError::Cast { path: "price", .. })
        ));
        assert_eq!(
            NewProduct::from_form(Some("Lamp"), Some("-1"), "img.png"),
            Err(SchemaError::NegativePrice(-1.0))
        );
    }

    #[test]
    fn patch_only_accepts_known_fields() {
        let patch = ProductPatch::from_ops(vec![
            op("name", json!("Desk")),
            op("price", json!(42)),
            op("price", json!("43.5")),
        ])
        .unwrap();

        assert_eq!(patch.name.as_deref(), Some("Desk"));
        assert_eq!(patch.price, Some(43.5));

        assert_eq!(
            ProductPatch::from_ops(vec![op("productImage", json!("evil.png"))]),
            Err(SchemaError::NotUpdatable("productImage".to_owned()))
        );
        assert_eq!(
            ProductPatch::from_ops(vec![op("_id", json!("x"))]),
            Err(SchemaError::NotUpdatable("_id".to_owned()))
        );
        assert!(matches!(
            ProductPatch::from_ops(vec![op("name", json!(7))]),
            Err(SchemaError::Cast { path: "name", .. })
        ));
        assert!(ProductPatch::from_ops(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn apply_leaves_other_fields_alone() {
        let new = NewProduct::from_form(Some("Lamp"), Some("10"), "lamp.png").unwrap();
        let mut product = Product::create(Uuid::new_v4(), new);
        let created_at = product.created_at;

        let changed = product.apply(ProductPatch {
            name: None,
            price: Some(42.0),
        });

        assert!(changed);
        assert_eq!(product.name, "Lamp");
        assert_eq!(product.price, 42.0);
        assert_eq!(product.product_image, "lamp.png");
        assert_eq!(product.created_at, created_at);
        assert!(!product.apply(ProductPatch::default()));
    }

    #[test]
    fn view_uses_wire_names() {
        let new = NewProduct::from_form(Some("Lamp"), Some("10"), "lamp.png").unwrap();
        let product = Product::create(Uuid::new_v4(), new);
        let json = serde_json::to_value(ProductView::from(&product)).unwrap();

        assert_eq!(json["_id"], json!(product.id.to_string()));
        assert_eq!(json["productImage"], json!("lamp.png"));
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn whole_prices_are_written_as_integers() {
        let new = NewProduct::from_form(Some("Lamp"), Some("10"), "lamp.png").unwrap();
        let mut product = Product::create(Uuid::new_v4(), new);

        let json = serde_json::to_string(&ProductView::from(&product)).unwrap();
        assert!(json.contains("\"price\":10,"));

        product.price = 12.5;
        let json = serde_json::to_value(ProductView::from(&product)).unwrap();
        assert_eq!(json["price"], json!(12.5));
    }
}
