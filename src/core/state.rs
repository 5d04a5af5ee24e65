//! Server state
//!
//! Shared state injected into every handler. Cheap to clone: the heavy
//! members are handles or behind `Arc`.

use std::sync::Arc;

use socketioxide::layer::SocketIoLayer;

use super::config::Config;
use crate::auth::JwtService;
use crate::db::DbService;
use crate::orders::OrderService;
use crate::payments::{PaymentGateway, PaymentService, StripeGateway};
use crate::realtime::{self, Notifier, RealtimeCtx};
use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub jwt_service: Arc<JwtService>,
    pub notifier: Notifier,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl ServerState {
    /// Initialize all services: storage, auth, realtime, payments.
    ///
    /// Returns the state and the Socket.IO layer to mount on the router.
    pub async fn initialize(config: &Config) -> Result<(Self, SocketIoLayer), AppError> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work dir: {e}")))?;

        let db_path = config.database_dir().join("feast.db");
        let db = DbService::new(&db_path.to_string_lossy()).await?.db;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        let (socket_layer, io) = realtime::build_layer(RealtimeCtx {
            jwt: jwt_service.clone(),
            db: db.clone(),
        });
        let notifier = Notifier::new(io);

        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(config.stripe.clone()));

        tracing::info!("Server state initialized");
        Ok((
            Self {
                config: config.clone(),
                db,
                jwt_service,
                notifier,
                gateway,
            },
            socket_layer,
        ))
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(
            self.db.clone(),
            self.notifier.clone(),
            self.config.pricing.clone(),
        )
    }

    pub fn payments(&self) -> PaymentService {
        PaymentService::new(
            self.db.clone(),
            self.gateway.clone(),
            self.notifier.clone(),
            self.config.stripe.clone(),
            self.config.pricing.clone(),
        )
    }
}
