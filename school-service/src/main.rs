use std::sync::Arc;

use auth::password::hash_password;
use auth::{Role, RoleFlags, UserStore};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use school_service::{router, AppState, AuthService, InMemoryUserStore, NewUser, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "school_service=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServiceConfig::from_env()?;
    tracing::info!("Starting School Service v{}", config.version);

    let store = build_store(&config).await?;
    let auth = AuthService::from_config(&config, store)?;
    let app = router(AppState {
        auth: Arc::new(auth),
        version: config.version.clone(),
    });

    let listener = TcpListener::bind(&config.http_addr).await?;
    tracing::info!("HTTP server listening on {}", config.http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    if !config.use_in_memory_store {
        let pool = db::create_pool(&config.db).await?;
        return Ok(Arc::new(db::MySqlUserStore::new(pool)));
    }

    tracing::warn!("Using in-memory user store");
    let store = InMemoryUserStore::new();
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let admin = store.create_user(NewUser {
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            username: username.clone(),
            hashed_password: hash_password(password)?,
            roles: RoleFlags::of(&[Role::Admin]),
        })?;
        tracing::info!(id = %admin.id, "Seeded admin user '{}'", username);
    }
    Ok(Arc::new(store))
}
