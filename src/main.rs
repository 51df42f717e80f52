use std::sync::Arc;

use dotenvy::dotenv;
use reseller_orders::application::dispatcher::Dispatcher;
use reseller_orders::config::{AppConfig, SubmissionConfig, SubmissionMode};
use reseller_orders::domain::ports::SubmissionClient;
use reseller_orders::infrastructure::submission_client::{
    HttpSubmissionClient, MockSubmissionClient, ResilientSubmissionClient,
};
use reseller_orders::{build_server, build_state, create_pool, run_migrations};
use tokio_util::sync::CancellationToken;

async fn submission_client(
    config: &SubmissionConfig,
) -> std::io::Result<Arc<dyn SubmissionClient>> {
    let client: Arc<dyn SubmissionClient> = match &config.mode {
        SubmissionMode::Mock => {
            log::warn!(
                "Using the mock submission client (failure rate {})",
                config.mock_failure_rate
            );
            Arc::new(ResilientSubmissionClient::new(
                MockSubmissionClient::new(config.mock_failure_rate),
                config.max_retries,
                config.retry_base_delay,
            ))
        }
        SubmissionMode::Http { base_url } => {
            // reqwest's blocking client may not be built on a runtime thread.
            let base_url = base_url.clone();
            let timeout = config.timeout;
            let http = tokio::task::spawn_blocking(move || {
                HttpSubmissionClient::new(&base_url, timeout)
            })
            .await
            .map_err(std::io::Error::other)?
            .map_err(std::io::Error::other)?;
            Arc::new(ResilientSubmissionClient::new(
                http,
                config.max_retries,
                config.retry_base_delay,
            ))
        }
    };
    Ok(client)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let pool = create_pool(&config.database_url).map_err(std::io::Error::other)?;
    run_migrations(&pool).map_err(std::io::Error::other)?;

    let client = submission_client(&config.submission).await?;
    let state = build_state(pool, &config.dispatch, client);

    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        state.outbox.clone(),
        config.dispatch.poll_interval,
        config.dispatch.error_cooldown,
        shutdown.clone(),
    );
    let dispatcher = tokio::spawn(dispatcher.run());

    log::info!(
        "Starting server at http://{}:{} (instance {})",
        config.host,
        config.port,
        config.dispatch.instance_id
    );

    let result = build_server(state, &config.host, config.port)?.await;

    shutdown.cancel();
    if let Err(e) = dispatcher.await {
        log::error!("Outbox dispatcher task failed: {}", e);
    }

    result
}
