use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OptionError, VoidcheckError};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).map(|v| v.to_lowercase()) {
        Some(v) if v == "true" || v == "1" || v == "yes" => true,
        Some(v) if v == "false" || v == "0" || v == "no" => false,
        _ => default,
    }
}

/// Parse an enum-valued env var, warning and falling back on unknown values.
fn profiled_env_parse<T>(profile: &str, key: &str, default: T) -> T
where
    T: FromStr<Err = VoidcheckError>,
{
    match profiled_env_opt(profile, key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "ignoring invalid config value");
            default
        }),
        None => default,
    }
}

pub const DEFAULT_API_URL: &str = "https://api.apivoid.com";
pub const DEFAULT_CONCURRENCY: usize = 10;
/// Upper bound on lookups in flight at once.
pub const MAX_CONCURRENCY: usize = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_QUOTA_HEADER: &str = "x-ratelimit-quota";

// ── Enumerated options ────────────────────────────────────────

/// Upstream response schema the normalizer should expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaVersion {
    /// Current API: report fields at the top level of the body.
    Flat,
    /// Legacy API: report nested under `data.report` with a `success` flag.
    Envelope,
    /// Flat body plus a rate-limit quota response header.
    FlatWithQuota,
    /// Pick one of the above per response.
    Auto,
}

impl FromStr for SchemaVersion {
    type Err = VoidcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "flat" | "v2" => Ok(SchemaVersion::Flat),
            "envelope" | "v1" => Ok(SchemaVersion::Envelope),
            "flat-with-quota" | "quota" => Ok(SchemaVersion::FlatWithQuota),
            "auto" => Ok(SchemaVersion::Auto),
            _ => Err(VoidcheckError::UnknownValue {
                key: "schema".into(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVersion::Flat => write!(f, "flat"),
            SchemaVersion::Envelope => write!(f, "envelope"),
            SchemaVersion::FlatWithQuota => write!(f, "flat-with-quota"),
            SchemaVersion::Auto => write!(f, "auto"),
        }
    }
}

/// How the API key travels with each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", content = "name", rename_all = "lowercase")]
pub enum AuthScheme {
    /// Request header carrying the key.
    Header(String),
    /// Query-string parameter carrying the key.
    Query(String),
}

impl AuthScheme {
    pub fn header() -> Self {
        AuthScheme::Header("X-API-Key".to_string())
    }

    pub fn query() -> Self {
        AuthScheme::Query("key".to_string())
    }

    fn from_env_profiled(p: &str) -> Self {
        let name = profiled_env_opt(p, "VOIDCHECK_AUTH_NAME");
        match profiled_env_or(p, "VOIDCHECK_AUTH", "header").to_lowercase().as_str() {
            "query" => name.map(AuthScheme::Query).unwrap_or_else(AuthScheme::query),
            "header" => name.map(AuthScheme::Header).unwrap_or_else(AuthScheme::header),
            other => {
                tracing::warn!(value = other, "unknown VOIDCHECK_AUTH, using header auth");
                AuthScheme::header()
            }
        }
    }
}

/// What the batch returns when some lookups fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Any single failure fails the whole batch.
    FailBatch,
    /// Failures are reported per indicator next to the successes.
    Inline,
}

impl FromStr for FailurePolicy {
    type Err = VoidcheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "fail-batch" | "batch" => Ok(FailurePolicy::FailBatch),
            "inline" | "partial" => Ok(FailurePolicy::Inline),
            _ => Err(VoidcheckError::UnknownValue {
                key: "failure_policy".into(),
                value: s.to_string(),
            }),
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub api: ApiConfig,
    pub lookup: LookupConfig,
    pub tls: TlsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VOIDCHECK_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VOIDCHECK_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            api: ApiConfig::from_env_profiled(p),
            lookup: LookupConfig::from_env_profiled(p),
            tls: TlsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Collect every invalid option instead of stopping at the first one.
    pub fn option_errors(&self) -> Vec<OptionError> {
        let mut errors = Vec::new();

        if self.api.api_key.as_deref().map_or(true, str::is_empty) {
            errors.push(OptionError::new("apiKey", "You must provide a valid API Key."));
        }
        if self.api.url.trim().is_empty() {
            errors.push(OptionError::new("url", "You must provide a valid API url."));
        }
        if self.lookup.concurrency == 0 {
            errors.push(OptionError::new(
                "concurrency",
                "Concurrency limit must be at least 1.",
            ));
        } else if self.lookup.concurrency > MAX_CONCURRENCY {
            errors.push(OptionError::new(
                "concurrency",
                format!("Concurrency limit must be at most {MAX_CONCURRENCY}."),
            ));
        }

        errors
    }

    /// Fail with every option error at once, before any request is issued.
    pub fn validate(&self) -> Result<(), VoidcheckError> {
        let errors = self.option_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(VoidcheckError::Validation(errors))
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  api:     url={}, schema={}, key={}",
            self.api.url,
            self.api.schema,
            if self.api.api_key.is_some() { "(set)" } else { "(none)" }
        );
        tracing::info!(
            "  lookup:  concurrency={}, blocklisted_only={}, policy={:?}",
            self.lookup.concurrency,
            self.lookup.blocklisted_only,
            self.lookup.failure_policy
        );
        tracing::info!(
            "  tls:     proxy={}, reject_unauthorized={}",
            self.tls.proxy.as_deref().unwrap_or("(none)"),
            self.tls.reject_unauthorized
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "api": {
                "url": self.api.url,
                "schema": self.api.schema,
                "auth": self.api.auth,
                "configured": self.api.api_key.is_some(),
            },
            "lookup": {
                "blocklisted_only": self.lookup.blocklisted_only,
                "concurrency": self.lookup.concurrency,
                "failure_policy": self.lookup.failure_policy,
                "timeout_secs": self.lookup.timeout_secs,
            },
            "tls": {
                "ca_file": self.tls.ca_file,
                "cert_file": self.tls.cert_file,
                "proxy": self.tls.proxy,
                "reject_unauthorized": self.tls.reject_unauthorized,
            },
        })
    }
}

// ── Upstream API ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the scheme, without a trailing path.
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub auth: AuthScheme,
    pub schema: SchemaVersion,
    /// Response header carrying the `key=value;...` quota string.
    pub quota_header: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            api_key: None,
            auth: AuthScheme::header(),
            schema: SchemaVersion::Flat,
            quota_header: DEFAULT_QUOTA_HEADER.to_string(),
        }
    }
}

impl ApiConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_or(p, "VOIDCHECK_API_URL", DEFAULT_API_URL),
            api_key: profiled_env_opt(p, "VOIDCHECK_API_KEY"),
            auth: AuthScheme::from_env_profiled(p),
            schema: profiled_env_parse(p, "VOIDCHECK_SCHEMA", SchemaVersion::Flat),
            quota_header: profiled_env_or(p, "VOIDCHECK_QUOTA_HEADER", DEFAULT_QUOTA_HEADER),
        }
    }
}

// ── Lookup behaviour ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Suppress indicators with zero engine detections.
    pub blocklisted_only: bool,
    /// Maximum number of requests in flight at once.
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            blocklisted_only: true,
            concurrency: DEFAULT_CONCURRENCY,
            failure_policy: FailurePolicy::FailBatch,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LookupConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            blocklisted_only: profiled_env_bool(p, "VOIDCHECK_BLOCKLISTED_ONLY", true),
            concurrency: profiled_env_u64(p, "VOIDCHECK_CONCURRENCY", DEFAULT_CONCURRENCY as u64)
                as usize,
            failure_policy: profiled_env_parse(
                p,
                "VOIDCHECK_FAILURE_POLICY",
                FailurePolicy::FailBatch,
            ),
            timeout_secs: profiled_env_u64(p, "VOIDCHECK_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        }
    }
}

// ── TLS / proxy ───────────────────────────────────────────────

/// Client TLS material locations. Files are read by the caller, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,
    pub proxy: Option<String>,
    pub reject_unauthorized: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            ca_file: None,
            cert_file: None,
            key_file: None,
            passphrase: None,
            proxy: None,
            reject_unauthorized: true,
        }
    }
}

impl TlsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            ca_file: profiled_env_opt(p, "VOIDCHECK_CA_FILE").map(PathBuf::from),
            cert_file: profiled_env_opt(p, "VOIDCHECK_CERT_FILE").map(PathBuf::from),
            key_file: profiled_env_opt(p, "VOIDCHECK_KEY_FILE").map(PathBuf::from),
            passphrase: profiled_env_opt(p, "VOIDCHECK_KEY_PASSPHRASE"),
            proxy: profiled_env_opt(p, "VOIDCHECK_PROXY"),
            reject_unauthorized: profiled_env_bool(p, "VOIDCHECK_REJECT_UNAUTHORIZED", true),
        }
    }
}
