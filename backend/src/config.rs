use once_cell::sync::Lazy;

use crate::billing::QuotaMode;

fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_flag(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
}

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// PostgreSQL connection string. When absent the in-memory store is used.
pub static DATABASE_URL: Lazy<Option<String>> = Lazy::new(|| read_optional_env("DATABASE_URL"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Record store backing: `memory` or `postgres`. Defaults to `postgres` whenever
/// `DATABASE_URL` is set.
pub static RECORD_STORE: Lazy<StoreBackend> = Lazy::new(|| {
    match read_optional_env("RECORD_STORE")
        .map(|value| value.to_ascii_lowercase())
        .as_deref()
    {
        Some("memory") => StoreBackend::Memory,
        Some("postgres") => StoreBackend::Postgres,
        _ if DATABASE_URL.is_some() => StoreBackend::Postgres,
        _ => StoreBackend::Memory,
    }
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> = Lazy::new(|| read_flag("ALLOW_MIGRATION_FAILURE"));

/// key: quota-config -> `optimistic` (default) or `strict`
pub static QUOTA_MODE: Lazy<QuotaMode> = Lazy::new(|| {
    read_optional_env("QUOTA_MODE")
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
});

/// Signing secret for the billing webhook endpoint. Must be set via `STRIPE_WEBHOOK_SECRET`.
pub static STRIPE_WEBHOOK_SECRET: Lazy<String> = Lazy::new(|| {
    std::env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET must be set")
});

pub static STRIPE_SECRET_KEY: Lazy<Option<String>> =
    Lazy::new(|| read_optional_env("STRIPE_SECRET_KEY"));

/// Recurring price offered by the checkout endpoint.
pub static STRIPE_PRICE_ID: Lazy<Option<String>> = Lazy::new(|| read_optional_env("STRIPE_PRICE_ID"));

pub static STRIPE_API_BASE: Lazy<String> = Lazy::new(|| {
    read_optional_env("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".to_string())
});

/// Public origin used to build checkout return URLs.
pub static APP_BASE_URL: Lazy<String> = Lazy::new(|| {
    read_optional_env("APP_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string())
});

pub static GOOGLE_AI_API_KEY: Lazy<String> =
    Lazy::new(|| read_optional_env("GOOGLE_AI_API_KEY").unwrap_or_default());

pub static GENERATION_MODEL: Lazy<String> = Lazy::new(|| {
    read_optional_env("GENERATION_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string())
});

pub static GENERATION_API_BASE: Lazy<String> = Lazy::new(|| {
    read_optional_env("GENERATION_API_BASE")
        .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string())
});

/// Upper bound on extracted page text. Defaults to `20000` characters.
pub static EXTRACT_MAX_CHARS: Lazy<usize> = Lazy::new(|| {
    std::env::var("EXTRACT_MAX_CHARS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(20_000)
});

/// Timeout applied to every outbound HTTP request. Defaults to `30` seconds.
pub static HTTP_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(30)
});
