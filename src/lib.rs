pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::bulk_submission::BulkSubmissionHandler;
use application::consolidation::ConsolidationTrigger;
use application::order_service::OrderService;
use application::outbox_service::OutboxService;
use application::processor::MessageProcessor;
use config::DispatchConfig;
use domain::outbox::PayloadRegistry;
use domain::ports::{OrderRepository, OutboxStore, ResellerRepository, SubmissionClient};
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::outbox_store::DieselOutboxStore;
use infrastructure::reseller_repo::DieselResellerRepository;

pub use db::{create_pool, DbPool};
pub use handlers::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type MigrationError = Box<dyn std::error::Error + Send + Sync>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), MigrationError> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        log::info!("Applied migration {}", version);
    }
    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::process_pending_orders,
        handlers::outbox::pending_count,
        handlers::outbox::messages_by_correlation_id,
        handlers::outbox::process_pending,
        handlers::outbox::process_retry,
        handlers::outbox::purge_completed,
    ),
    tags(
        (name = "orders", description = "Customer orders and direct submission"),
        (name = "outbox", description = "Outbox inspection and manual processing"),
    )
)]
pub struct ApiDoc;

/// Wires the Diesel adapters and the services over one connection pool.
pub fn build_state(
    pool: DbPool,
    dispatch: &DispatchConfig,
    client: Arc<dyn SubmissionClient>,
) -> AppState {
    let orders: Arc<dyn OrderRepository> = Arc::new(DieselOrderRepository::new(pool.clone()));
    let resellers: Arc<dyn ResellerRepository> =
        Arc::new(DieselResellerRepository::new(pool.clone()));
    let store: Arc<dyn OutboxStore> = Arc::new(DieselOutboxStore::new(pool));

    let trigger = ConsolidationTrigger::new(
        orders.clone(),
        store.clone(),
        dispatch.consolidation_threshold,
        dispatch.max_retries,
    );
    let bulk_submission = BulkSubmissionHandler::new(
        orders.clone(),
        resellers.clone(),
        client.clone(),
        dispatch.consolidation_threshold,
    );
    let processor = MessageProcessor::new(
        store.clone(),
        PayloadRegistry::default(),
        bulk_submission,
        dispatch.instance_id.clone(),
        dispatch.fail_fast_permanent,
    );
    let outbox = Arc::new(OutboxService::new(
        store,
        trigger,
        processor,
        dispatch.batch_size,
    ));

    let orders = Arc::new(OrderService::new(
        orders,
        resellers,
        client,
        outbox.clone(),
        dispatch.consolidation_threshold,
    ));

    AppState { orders, outbox }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route(
                        "/process-pending",
                        web::post().to(handlers::orders::process_pending_orders),
                    )
                    .route("/{id}", web::get().to(handlers::orders::get_order)),
            )
            .service(
                web::scope("/outbox")
                    .route("/pending-count", web::get().to(handlers::outbox::pending_count))
                    .route(
                        "/messages/{correlation_id}",
                        web::get().to(handlers::outbox::messages_by_correlation_id),
                    )
                    .route(
                        "/process-pending",
                        web::post().to(handlers::outbox::process_pending),
                    )
                    .route("/process-retry", web::post().to(handlers::outbox::process_retry))
                    .route("/completed", web::delete().to(handlers::outbox::purge_completed)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
