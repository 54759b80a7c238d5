use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod db;
mod error;
mod models;
mod routes;

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting api server...");

    dotenvy::dotenv().ok();

    // Create database connection pool
    let db_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set in .env");

    let options = SqliteConnectOptions::from_str(&db_url)
        .expect("DATABASE_URL is not a valid sqlite URL")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .expect("Failed to connect to database");

    db::init_db(&pool)
        .await
        .expect("Failed to create database schema");

    tracing::info!("Database connection established.");

    let host: Ipv4Addr = std::env::var("HOST")
        .expect("HOST is set in .env")
        .parse()
        .expect("HOST is not in the correct format");

    let port: u16 = std::env::var("PORT")
        .expect("PORT must be set in .env")
        .parse()
        .expect("PORT is not the correct format");

    let addr = SocketAddr::from((host, port));

    // CORS configuration for the frontend
    let cors = CorsLayer::new()
        .allow_origin(Any) // In production, use specific origins
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::app(pool)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server.");
}
