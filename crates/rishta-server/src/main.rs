mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use rishta_api::{AppState, AppStateInner, auth};
use rishta_db::Database;
use rishta_notify::Notifier;
use rishta_notify::push::{DisabledPush, HttpPush, PushProvider};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rishta=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = Arc::new(Database::open(&config.db_path)?);
    info!("Database ready at {}", config.db_path.display());

    if let Some((email, password)) = &config.admin_seed {
        if auth::seed_admin(&db, email, password)? {
            info!("Created admin account {}", email);
        }
    }
    if db.count_admins()? == 0 {
        warn!("No admin account exists; set RISHTA_ADMIN_EMAIL and RISHTA_ADMIN_PASSWORD to create one");
    }

    let push: Arc<dyn PushProvider> = match &config.push {
        Some(push) => {
            info!("Push delivery via {}", push.url);
            Arc::new(HttpPush::new(&push.url, &push.key)?)
        }
        None => {
            info!("Push delivery disabled");
            Arc::new(DisabledPush)
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        user_jwt_secret: config.user_jwt_secret,
        admin_jwt_secret: config.admin_jwt_secret,
        token_ttl_days: config.token_ttl_days,
        notifier: Notifier::new(db, push),
    });

    let app = rishta_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Rishta server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
