use actix_extensible_rate_limit::backend::memory::InMemoryBackend;
use actix_web::{web, HttpServer};
use gateway::app::build_app;
use gateway::config::GatewayConfig;
use gateway::state::StateBuilder;

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Real environment wins; dotenvy never overrides variables already set.
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let app_state = match StateBuilder::from_config(&config).and_then(StateBuilder::build) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("❌ Failed to build application state: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        host = %config.host,
        port = config.port,
        env = %config.app_env,
        "starting api gateway"
    );

    let data = web::Data::new(app_state);
    let limiter = InMemoryBackend::builder().build();

    HttpServer::new(move || build_app(data.clone(), limiter.clone()))
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
