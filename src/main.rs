use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info, warn};
use std::fmt::Display;
use std::io;
use std::sync::Arc;

use tasksphere::auth::{AuthMiddleware, PasswordHasher, TokenIssuer};
use tasksphere::config::Config;
use tasksphere::repository::{MemoryStore, PgStore};
use tasksphere::{routes, AppState};

fn startup_error(context: &str, e: impl Display) -> io::Error {
    error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl())
        .map_err(|e| startup_error("Invalid token configuration", e))?;
    let tokens = Arc::new(tokens);
    let hasher = PasswordHasher::new(config.bcrypt_cost);

    let state = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .map_err(|e| startup_error("Failed to connect to database", e))?;
            store
                .migrate()
                .await
                .map_err(|e| startup_error("Failed to migrate database", e))?;
            AppState::postgres(store, hasher, tokens.clone())
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store, data will not persist");
            AppState::in_memory(MemoryStore::new(), hasher, tokens.clone())
        }
    };
    let state = web::Data::new(state);

    info!("Starting TaskSphere server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(tokens.clone()))
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
