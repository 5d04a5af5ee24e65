//! Feast Server - food delivery backend
//!
//! # Architecture overview
//!
//! - **HTTP API** (`api`): RESTful endpoints under `/api`
//! - **Auth** (`auth`): JWT + Argon2
//! - **Database** (`db`): embedded SurrealDB storage
//! - **Orders** (`orders`): pricing, lifecycle pipeline, reconciliation
//! - **Payments** (`payments`): Stripe gateway, signed webhooks
//! - **Realtime** (`realtime`): Socket.IO push for live order updates
//!
//! # Module structure
//!
//! ```text
//! src/
//! ├── core/          # Config, state, server bootstrap
//! ├── auth/          # JWT auth, guards
//! ├── api/           # HTTP routes and handlers
//! ├── db/            # Models and repositories
//! ├── orders/        # Order domain
//! ├── payments/      # Payment gateway and webhooks
//! ├── realtime/      # Socket.IO layer and notifier
//! └── utils/         # Errors, logging, validation
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod orders;
pub mod payments;
pub mod realtime;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::OrderService;
pub use payments::PaymentService;
pub use utils::{ApiResponse, AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - structured events on the "security" target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
    ($level:expr, $event:expr) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
        );
    };
}

/// Load .env, create the work directory tree and initialize logging.
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    config.ensure_work_dir_structure()?;
    init_logger_with_file(None, config.log_dir().to_str());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ______               __
   / ____/__  ____ _____/ /_
  / /_  / _ \/ __ `/ ___/ __/
 / __/ /  __/ /_/ (__  ) /_
/_/    \___/\__,_/____/\__/
    "#
    );
}
