use actix_web::{web, App, HttpServer, middleware::Logger};
use actix_web::main;
use actix_cors::Cors;
use anyhow::{Context, Result};
use env_logger::Env;
use log::{info, warn};
use std::io::{self, BufRead};
use std::sync::Arc;

mod auth;
mod config;
mod directory;
mod error;
mod handlers;
mod models;
mod token;

use config::Config;
use directory::{InMemoryUserDirectory, UserDirectory};
use handlers::AppState;
use token::TokenIssuer;

#[main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if std::env::args().nth(1).as_deref() == Some("hash-password") {
        return print_password_hash();
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Starting with {:?}", config);

    let directory = match &config.users_file {
        Some(path) => InMemoryUserDirectory::from_json_file(path)?,
        None => InMemoryUserDirectory::with_demo_users()?,
    };
    if directory.is_empty() {
        warn!("User directory is empty, every login will fail");
    }
    info!("Loaded {} users", directory.len());

    let issuer = TokenIssuer::new(config.build_signer()?, config.token_ttl)?;
    info!("Tokens expire {}s after issue", issuer.ttl_seconds());
    let state = web::Data::new(AppState {
        directory: Arc::new(directory) as Arc<dyn UserDirectory>,
        issuer,
    });

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::configure_routes)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}

/// Reads one password from stdin and prints its argon2 hash for `USERS_FILE`.
fn print_password_hash() -> Result<()> {
    let mut password = String::new();
    io::stdin()
        .lock()
        .read_line(&mut password)
        .context("Failed to read password from stdin")?;
    let password = password.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    println!("{}", auth::hash_password(password)?);
    Ok(())
}
