use crate::commands::{
    AddProductCommand, AddProductRequestHandler, DeleteProductCommand, DeleteProductRequestHandler,
    UpdateProductCommand, UpdateProductRequestHandler,
};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::middleware::auth::RequireAuth;
use crate::middleware::upload::ProductUpload;
use crate::models::product::{Product, ProductView, UpdateOp};
use crate::queries::{
    GetAllProductsRequest, GetAllProductsRequestHandler, GetProductRequest,
    GetProductRequestHandler,
};
use crate::requests::RequestHandler;
use crate::services::store::ProductStore;
use actix_web::error::JsonPayloadError;
use actix_web::http::header::LOCATION;
use actix_web::http::StatusCode;
use actix_web::web::{self, Data, Json};
use actix_web::{delete, get, patch, post, HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Registers the `/products` scope. Expects `Data<AppConfig>` and
/// `Data<dyn ProductStore>` in the app data. Mutating routes sit behind
/// [`RequireAuth`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .service(get_all)
            .service(create)
            .service(get)
            .service(update)
            .service(delete),
    );
}

/// Hypermedia hint describing a related call.
#[derive(Debug, Serialize)]
pub struct RequestHint {
    #[serde(rename = "type")]
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestHint {
    fn get(url: String) -> Self {
        RequestHint {
            method: "GET",
            description: None,
            url,
            body: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LinkedProduct {
    #[serde(flatten)]
    pub product: ProductView,
    pub request: RequestHint,
}

impl LinkedProduct {
    fn new(product: &Product, config: &AppConfig) -> Self {
        LinkedProduct {
            product: ProductView::from(product),
            request: RequestHint::get(config.product_url(product.id)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProductList {
    count: usize,
    products: Vec<LinkedProduct>,
}

#[derive(Debug, Serialize)]
struct ProductCreated {
    message: &'static str,
    #[serde(rename = "createdProduct")]
    created_product: LinkedProduct,
}

#[derive(Debug, Serialize)]
struct ProductFound {
    product: ProductView,
    request: RequestHint,
}

#[get("")]
pub async fn get_all(
    store: Data<dyn ProductStore>,
    config: Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let products = GetAllProductsRequestHandler(store.into_inner())
        .handle(GetAllProductsRequest)
        .await?;

    let products = products
        .iter()
        .map(|product| LinkedProduct::new(product, &config))
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(ProductList {
        count: products.len(),
        products,
    }))
}

#[post("", wrap = "RequireAuth")]
pub async fn create(
    store: Data<dyn ProductStore>,
    config: Data<AppConfig>,
    upload: ProductUpload,
) -> Result<HttpResponse, ApiError> {
    let image = match &upload.image {
        Some(image) => image.clone(),
        None => {
            return Err(ApiError::rejected(
                &config,
                StatusCode::BAD_REQUEST,
                "File field is empty",
            ))
        }
    };

    let command = AddProductCommand {
        name: upload.field("name").map(str::to_owned),
        price: upload.field("price").map(str::to_owned),
        product_image: image.filename.clone(),
    };

    let product = match AddProductRequestHandler(store.into_inner()).handle(command).await {
        Ok(product) => product,
        Err(err) => {
            image.discard().await;
            return Err(ApiError::from_command(&config, err));
        }
    };

    Ok(HttpResponse::Created()
        .insert_header((LOCATION, config.product_url(product.id)))
        .json(ProductCreated {
            message: "Created product successfully",
            created_product: LinkedProduct::new(&product, &config),
        }))
}

#[get("/{product_id}")]
pub async fn get(
    path: web::Path<String>,
    store: Data<dyn ProductStore>,
    config: Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&config, &path)?;
    let result = GetProductRequestHandler(store.into_inner())
        .handle(GetProductRequest(id))
        .await?;

    match result {
        Some(product) => Ok(HttpResponse::Ok().json(ProductFound {
            product: ProductView::from(&product),
            request: RequestHint {
                method: "GET",
                description: Some("Get all products"),
                url: config.collection_url(),
                body: None,
            },
        })),
        None => Err(ApiError::EntryNotFound),
    }
}

#[patch("/{product_id}", wrap = "RequireAuth")]
pub async fn update(
    path: web::Path<String>,
    body: Json<Vec<UpdateOp>>,
    store: Data<dyn ProductStore>,
    config: Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&config, &path)?;
    let command = UpdateProductCommand {
        id,
        ops: body.into_inner(),
    };

    let result = UpdateProductRequestHandler(store.into_inner())
        .handle(command)
        .await
        .map_err(|err| ApiError::from_command(&config, err))?;

    match result {
        Some(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Product updated!",
            "url": config.product_url(id),
        }))),
        None => Err(ApiError::ProductNotFound),
    }
}

#[delete("/{product_id}", wrap = "RequireAuth")]
pub async fn delete(
    path: web::Path<String>,
    store: Data<dyn ProductStore>,
    config: Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_id(&config, &path)?;
    let result = DeleteProductRequestHandler(store.into_inner())
        .handle(DeleteProductCommand(id))
        .await?;

    match result {
        Some(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Product deleted!",
            "request": RequestHint {
                method: "POST",
                description: None,
                url: config.collection_url(),
                body: Some(json!({ "name": "String", "price": "Number" })),
            },
        }))),
        None => Err(ApiError::ProductNotFound),
    }
}

fn parse_id(config: &AppConfig, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::rejected(
            config,
            StatusCode::BAD_REQUEST,
            format!("Invalid product id {:?}", raw),
        )
    })
}

fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let status = req
        .app_data::<Data<AppConfig>>()
        .map(|config| config.validation_status(StatusCode::BAD_REQUEST))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    ApiError::Rejected {
        message: err.to_string(),
        status,
    }
    .into()
}
