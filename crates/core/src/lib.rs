pub mod config;
pub mod error;
pub mod indicator;

pub use config::{
    load_dotenv, ApiConfig, AuthScheme, Config, FailurePolicy, LookupConfig, SchemaVersion,
    TlsConfig, DEFAULT_API_URL, DEFAULT_CONCURRENCY, MAX_CONCURRENCY,
};
pub use error::*;
pub use indicator::*;
