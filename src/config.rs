use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub replicate: ReplicateConfig,
    pub storage: StorageConfig,
    pub stripe: StripeConfig,
    pub oblio: OblioConfig,
    pub sketchfab: SketchfabConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Public origin of the deployment, used for checkout redirect URLs
    /// and for building storage-proxy model URLs.
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateConfig {
    pub api_token: String,
    #[serde(default = "default_replicate_base_url")]
    pub base_url: String,
    #[serde(default = "default_text_to_image_model")]
    pub text_to_image_model: String,
    #[serde(default = "default_image_to_3d_version")]
    pub image_to_3d_version: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_voice_version")]
    pub voice_version: String,
}

fn default_replicate_base_url() -> String {
    "https://api.replicate.com".to_string()
}

fn default_text_to_image_model() -> String {
    "black-forest-labs/flux-1.1-pro".to_string()
}

// Trellis image->3D, pinned by version hash.
fn default_image_to_3d_version() -> String {
    "e8f6c45206993f297372f5436b90350817bd9b4a0d52d2a76df50c1c8afa2b3c".to_string()
}

fn default_llm_model() -> String {
    "meta/meta-llama-3-8b-instruct".to_string()
}

fn default_voice_version() -> String {
    "68414679e306c59344c9f2003eb760a92b23cc3a083d262ed23528b12f4581a0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Base under which stored objects are reachable by clients. Usually the
    /// app's own storage proxy (`<base_url>/api/v1/storage`), but a public
    /// bucket domain works too.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OblioConfig {
    pub cif: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_oblio_series")]
    pub series: String,
    #[serde(default = "default_oblio_base_url")]
    pub base_url: String,
}

fn default_oblio_series() -> String {
    "KID".to_string()
}

fn default_oblio_base_url() -> String {
    "https://www.oblio.eu".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchfabConfig {
    pub api_key: String,
    #[serde(default = "default_sketchfab_base_url")]
    pub base_url: String,
}

fn default_sketchfab_base_url() -> String {
    "https://api.sketchfab.com".to_string()
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        fn get_env(name: &str) -> Option<String> {
            env::var(name).ok()
        }
        fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
            env::var(name)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        // Read the config file if present, otherwise build entirely from the
        // environment.
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| anyhow::anyhow!("Failed to parse {config_path}: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = get_env("DATABASE_URL").ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL is required when no config.toml is present")
                })?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    app: AppConfig {
                        base_url: get_env("APP_BASE_URL")
                            .unwrap_or_else(|| "http://localhost:8080".to_string()),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    replicate: ReplicateConfig {
                        api_token: get_env("REPLICATE_API_TOKEN").unwrap_or_default(),
                        base_url: get_env("REPLICATE_BASE_URL")
                            .unwrap_or_else(default_replicate_base_url),
                        text_to_image_model: get_env("REPLICATE_TEXT_TO_IMAGE_MODEL")
                            .unwrap_or_else(default_text_to_image_model),
                        image_to_3d_version: get_env("REPLICATE_IMAGE_TO_3D_VERSION")
                            .unwrap_or_else(default_image_to_3d_version),
                        llm_model: get_env("REPLICATE_LLM_MODEL").unwrap_or_else(default_llm_model),
                        voice_version: get_env("REPLICATE_VOICE_VERSION")
                            .unwrap_or_else(default_voice_version),
                    },
                    storage: StorageConfig {
                        endpoint: get_env("R2_ENDPOINT").unwrap_or_default(),
                        access_key_id: get_env("R2_ACCESS_KEY_ID").unwrap_or_default(),
                        secret_access_key: get_env("R2_SECRET_ACCESS_KEY").unwrap_or_default(),
                        bucket: get_env("R2_BUCKET_NAME")
                            .unwrap_or_else(|| "kidmy-assets".to_string()),
                        public_base_url: get_env("R2_PUBLIC_BASE_URL").unwrap_or_default(),
                    },
                    stripe: StripeConfig {
                        secret_key: get_env("STRIPE_SECRET_KEY").unwrap_or_default(),
                        webhook_secret: get_env("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
                    },
                    oblio: OblioConfig {
                        cif: get_env("OBLIO_CIF_FIRMA").unwrap_or_default(),
                        client_id: get_env("OBLIO_CLIENT_ID").unwrap_or_default(),
                        client_secret: get_env("OBLIO_CLIENT_SECRET").unwrap_or_default(),
                        series: get_env("OBLIO_SERIE_FACTURA").unwrap_or_else(default_oblio_series),
                        base_url: get_env("OBLIO_BASE_URL").unwrap_or_else(default_oblio_base_url),
                    },
                    sketchfab: SketchfabConfig {
                        api_key: get_env("SKETCHFAB_API_KEY").unwrap_or_default(),
                        base_url: get_env("SKETCHFAB_BASE_URL")
                            .unwrap_or_else(default_sketchfab_base_url),
                    },
                }
            }
            Err(e) => {
                return Err(anyhow::anyhow!("Failed to read config file {config_path}: {e}"));
            }
        };

        // Environment variables override the file when both are present.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("APP_BASE_URL") {
            config.app.base_url = v;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.access_token_expires_in = n;
            }
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.refresh_token_expires_in = n;
            }
        }
        if let Ok(v) = env::var("REPLICATE_API_TOKEN") {
            config.replicate.api_token = v;
        }
        if let Ok(v) = env::var("R2_ENDPOINT") {
            config.storage.endpoint = v;
        }
        if let Ok(v) = env::var("R2_ACCESS_KEY_ID") {
            config.storage.access_key_id = v;
        }
        if let Ok(v) = env::var("R2_SECRET_ACCESS_KEY") {
            config.storage.secret_access_key = v;
        }
        if let Ok(v) = env::var("R2_BUCKET_NAME") {
            config.storage.bucket = v;
        }
        if let Ok(v) = env::var("R2_PUBLIC_BASE_URL") {
            config.storage.public_base_url = v;
        }
        if let Ok(v) = env::var("STRIPE_SECRET_KEY") {
            config.stripe.secret_key = v;
        }
        if let Ok(v) = env::var("STRIPE_WEBHOOK_SECRET") {
            config.stripe.webhook_secret = v;
        }
        if let Ok(v) = env::var("OBLIO_CIF_FIRMA") {
            config.oblio.cif = v;
        }
        if let Ok(v) = env::var("OBLIO_CLIENT_ID") {
            config.oblio.client_id = v;
        }
        if let Ok(v) = env::var("OBLIO_CLIENT_SECRET") {
            config.oblio.client_secret = v;
        }
        if let Ok(v) = env::var("OBLIO_SERIE_FACTURA") {
            config.oblio.series = v;
        }
        if let Ok(v) = env::var("SKETCHFAB_API_KEY") {
            config.sketchfab.api_key = v;
        }

        // Fall back to the storage proxy when no public bucket domain is set.
        if config.storage.public_base_url.is_empty() {
            config.storage.public_base_url = format!(
                "{}/api/v1/storage",
                config.app.base_url.trim_end_matches('/')
            );
        }

        Ok(config)
    }
}
