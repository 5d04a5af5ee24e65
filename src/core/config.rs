//! Server configuration
//!
//! All settings can be overridden through environment variables:
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | WORK_DIR | /var/lib/feast | Work directory (database, logs) |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | JWT_SECRET | (generated in dev) | Token signing secret |
//! | STRIPE_SECRET_KEY | sk_test_placeholder | Payment processor API key |
//! | STRIPE_WEBHOOK_SECRET | whsec_placeholder | Webhook signature secret |
//! | CURRENCY | usd | Charge currency |
//! | TAX_RATE | 0.08 | Flat tax rate |
//! | SERVICE_FEE_RATE | 0.02 | Flat service-fee rate |
//! | DELIVERY_EXTRA_MINUTES | 20 | Delivery buffer added to prep time |
//! | PROMO_CODE | TASTY10 | The single active promo code |
//! | PROMO_PERCENT | 10 | Promo discount percentage |

use std::path::PathBuf;

use crate::auth::JwtConfig;

/// Pricing policy. The formula itself is fixed (subtotal + tax + delivery
/// fee + service fee - discount); the rates are configuration.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Flat tax rate applied to the subtotal
    pub tax_rate: f64,
    /// Flat service-fee rate applied to the subtotal
    pub service_fee_rate: f64,
    /// Minutes added on top of preparation time for delivery orders
    pub delivery_extra_minutes: i64,
    /// The single active fixed-percentage promo code
    pub promo_code: String,
    pub promo_percent: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: env_parse("TAX_RATE", 0.08),
            service_fee_rate: env_parse("SERVICE_FEE_RATE", 0.02),
            delivery_extra_minutes: env_parse("DELIVERY_EXTRA_MINUTES", 20),
            promo_code: std::env::var("PROMO_CODE").unwrap_or_else(|_| "TASTY10".into()),
            promo_percent: env_parse("PROMO_PERCENT", 10.0),
        }
    }
}

/// Payment processor configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub currency: String,
    pub api_base: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: std::env::var("STRIPE_SECRET_KEY")
                .unwrap_or_else(|_| "sk_test_placeholder".into()),
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "whsec_placeholder".into()),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "usd".into()),
            api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com/v1".into()),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Work directory for database and log files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub pricing: PricingConfig,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/feast".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            jwt: JwtConfig::default(),
            stripe: StripeConfig::default(),
            pricing: PricingConfig::default(),
        }
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Ensure the work directory structure exists
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
