use std::net::SocketAddr;
use std::sync::Arc;

use furima_api::config::Config;
use furima_api::db::create_pool;
use furima_api::google_auth::GoogleOAuthClient;
use furima_api::middleware::AuthState;
use furima_api::routes::{build_router, AppState};
use furima_api::services::{
    AiService, ApplicationWorkflow, AuthService, ItemStore, MessageService, Notifier,
    ProfileService,
};
use furima_api::storage::{S3Backend, StorageBackend};

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "furima_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting furima-api server...");
    tracing::info!("Connecting to database...");

    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied");

    // Google OAuth is optional so the server can run in local setups
    // without credentials; the auth routes report the missing config.
    let oauth = match (&config.google_client_id, &config.google_client_secret) {
        (Some(id), Some(secret)) => {
            tracing::info!("Google OAuth enabled");
            Some(GoogleOAuthClient::new(
                id.clone(),
                secret.clone(),
                config.google_redirect_uri.clone(),
            ))
        }
        _ => {
            tracing::warn!("Google OAuth disabled (GOOGLE_CLIENT_ID / SECRET not set)");
            None
        }
    };

    // Object storage is optional too; without it /upload responds 500.
    let storage: Option<Arc<dyn StorageBackend>> = match &config.s3_bucket {
        Some(bucket) => {
            tracing::info!("S3 storage enabled: bucket={}", bucket);
            match S3Backend::new(
                bucket.clone(),
                config.s3_region.clone(),
                config.s3_endpoint.clone(),
                config.s3_access_key.clone(),
                config.s3_secret_key.clone(),
                config.s3_public_url.clone(),
            ) {
                Ok(backend) => Some(Arc::new(backend)),
                Err(e) => {
                    tracing::error!("Failed to create S3 backend: {}", e);
                    None
                }
            }
        }
        None => {
            tracing::info!("S3 storage disabled");
            None
        }
    };

    let notifier = Notifier::new(
        config.resend_api_key.clone(),
        config.notification_email.clone(),
    );

    let state = AppState {
        items: ItemStore::new(pool.clone()),
        applications: ApplicationWorkflow::new(pool.clone()),
        messages: MessageService::new(
            pool.clone(),
            notifier.clone(),
            config.notification_email.clone(),
        ),
        profiles: ProfileService::new(pool.clone()),
        ai: AiService::new(pool.clone(), config.gemini_api_key.clone()),
        auth: AuthService::new(pool.clone(), oauth, config.session_secret.clone()),
        auth_state: AuthState {
            session_secret: config.session_secret.clone(),
        },
        notifier,
        storage,
        frontend_origin: config.frontend_origin.clone(),
    };

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        // Wildcards are not allowed together with credentials.
        CorsLayer::new()
            .allow_origin(origins)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_credentials(true)
    };

    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
