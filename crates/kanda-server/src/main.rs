use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;

use kanda_core::config::{AuthMode, Config};
use kanda_duckdb::DuckDbBackend;
use kanda_metadata::AdminRole;
use kanda_server::auth::password::{normalize_email, AdminHasher};
use kanda_server::state::AppState;

/// `kanda health`: liveness check for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$KANDA_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("KANDA_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

fn open_store(cfg: &Config) -> Result<DuckDbBackend> {
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/kanda.db", cfg.data_dir);
    DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)
}

/// `kanda create-admin <email> <password>`: seed an admin account.
///
/// Idempotent: an existing account is reported and left untouched.
async fn run_create_admin(cfg: &Config, args: &[String]) -> Result<()> {
    let (Some(email), Some(password)) = (args.first(), args.get(1)) else {
        bail!("usage: kanda create-admin <email> <password>");
    };
    let email = normalize_email(email)?;
    let hash = AdminHasher::from_config(cfg)?.hash(password)?;

    let db = open_store(cfg)?;
    if db.create_admin(&email, &hash, AdminRole::Admin).await? {
        info!(email = %email, "Admin user created");
    } else {
        info!(email = %email, "Admin user already exists, nothing changed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kanda=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    if args.get(1).map(|s| s.as_str()) == Some("create-admin") {
        return run_create_admin(&cfg, &args[2..]).await;
    }

    let db = open_store(&cfg)?;

    match cfg.auth_mode {
        AuthMode::Local => {
            match db.ensure_jwt_secret().await {
                Ok(_) => info!("JWT secret ready"),
                Err(e) => tracing::error!(error = %e, "Failed to ensure JWT secret"),
            }
            info!("Admin auth enabled");
        }
        AuthMode::None => {
            tracing::warn!("Auth disabled (KANDA_AUTH=none), admin routes are open");
        }
    }

    let state = Arc::new(AppState::new(db, cfg.clone()));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = kanda_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "Kanda listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
