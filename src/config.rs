use actix_web::http::StatusCode;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 5;
pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpg", "image/jpeg", "image/png"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    Missing(&'static str),

    #[error("invalid value {value:?} for `{var}`")]
    Invalid { var: &'static str, value: String },
}

/// Everything the service needs at runtime, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Base used for every link returned in a response body.
    pub public_url: String,
    pub store_url: String,
    pub store_key: String,
    pub upload: UploadConfig,
    pub jwt_secret: String,
    /// Report client mistakes with 4xx codes instead of 500.
    pub client_errors: bool,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub field_name: String,
    pub max_bytes: u64,
    pub allowed_mime_types: HashSet<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            dir: PathBuf::from("./uploads"),
            field_name: "productImage".to_owned(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadConfig {
    pub fn allows(&self, mime: &str) -> bool {
        self.allowed_mime_types.contains(&mime.to_ascii_lowercase())
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let public_url = lookup("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_owned();

        let mut upload = UploadConfig::default();
        if let Some(dir) = lookup("UPLOAD_DIR") {
            upload.dir = PathBuf::from(dir);
        }
        upload.max_bytes = parse_or(&lookup, "UPLOAD_MAX_BYTES", upload.max_bytes)?;
        if let Some(list) = lookup("UPLOAD_ALLOWED_MIME") {
            let allowed = list
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect::<HashSet<_>>();

            if allowed.is_empty() {
                return Err(ConfigError::Invalid {
                    var: "UPLOAD_ALLOWED_MIME",
                    value: list,
                });
            }
            upload.allowed_mime_types = allowed;
        }

        let jwt_secret = lookup("JWT_KEY")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_KEY"))?;

        Ok(AppConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            public_url,
            store_url: lookup("PRODUCTS_STORE_URL")
                .unwrap_or_else(|| "redis://127.0.0.1/".to_owned()),
            store_key: lookup("PRODUCTS_STORE_KEY").unwrap_or_else(|| "products".to_owned()),
            upload,
            jwt_secret,
            client_errors: parse_or(&lookup, "PRODUCTS_CLIENT_ERRORS", false)?,
        })
    }

    /// Status for a request the client got wrong. Stays 500 unless
    /// `client_errors` is enabled.
    pub fn validation_status(&self, client_status: StatusCode) -> StatusCode {
        if self.client_errors {
            client_status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    pub fn collection_url(&self) -> String {
        format!("{}/products", self.public_url)
    }

    pub fn product_url(&self, id: impl std::fmt::Display) -> String {
        format!("{}/products/{}", self.public_url, id)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_only_need_a_secret() {
        let config = AppConfig::from_lookup(lookup(&[("JWT_KEY", "secret")])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.public_url, "http://localhost:3000");
        assert_eq!(config.store_key, "products");
        assert_eq!(config.upload.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.upload.field_name, "productImage");
        assert!(!config.client_errors);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_KEY")));
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[("JWT_KEY", "s"), ("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn links_use_the_public_url() {
        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_KEY", "s"),
            ("PUBLIC_URL", "https://shop.example.com/"),
        ]))
        .unwrap();

        assert_eq!(config.collection_url(), "https://shop.example.com/products");
        assert_eq!(
            config.product_url("abc"),
            "https://shop.example.com/products/abc"
        );
    }

    #[test]
    fn mime_allowlist_is_a_set() {
        let upload = UploadConfig::default();
        assert!(upload.allows("image/jpg"));
        assert!(upload.allows("image/jpeg"));
        assert!(upload.allows("IMAGE/PNG"));
        assert!(!upload.allows("image/gif"));

        let config = AppConfig::from_lookup(lookup(&[
            ("JWT_KEY", "s"),
            ("UPLOAD_ALLOWED_MIME", "image/webp, image/gif"),
        ]))
        .unwrap();
        assert!(config.upload.allows("image/gif"));
        assert!(!config.upload.allows("image/png"));
    }

    #[test]
    fn validation_status_follows_the_flag() {
        let mut config = AppConfig::from_lookup(lookup(&[("JWT_KEY", "s")])).unwrap();
        assert_eq!(
            config.validation_status(StatusCode::BAD_REQUEST),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        config.client_errors = true;
        assert_eq!(
            config.validation_status(StatusCode::BAD_REQUEST),
            StatusCode::BAD_REQUEST
        );
    }
}
