/// HTTP admin server for pgbackup-admin
/// Serves the backup listing page plus a small JSON API on top of `BackupManager`

#[cfg(feature = "server")]
pub mod auth;

#[cfg(feature = "server")]
pub mod flash;

#[cfg(feature = "server")]
pub mod handlers;

#[cfg(feature = "server")]
pub mod page;

#[cfg(feature = "server")]
pub mod routes;

#[cfg(feature = "server")]
pub use routes::create_router;

#[cfg(feature = "server")]
use crate::core::BackupManager;

/// State shared by every request
#[cfg(feature = "server")]
pub struct AppState {
    pub manager: BackupManager,
    pub flashes: flash::FlashMessages,
    pub token: Option<String>,
}

#[cfg(feature = "server")]
impl AppState {
    pub fn new(manager: BackupManager, token: Option<String>) -> Self {
        Self {
            manager,
            flashes: flash::FlashMessages::new(),
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

#[cfg(feature = "server")]
pub type SharedState = std::sync::Arc<AppState>;

#[cfg(feature = "server")]
pub async fn run(
    host: String,
    port: u16,
    enable_cors: bool,
    manager: BackupManager,
) -> anyhow::Result<()> {
    use crate::utils::ENV_WEB_TOKEN;
    use std::io::{self, IsTerminal, Write};
    use std::net::SocketAddr;

    let mut token = std::env::var(ENV_WEB_TOKEN).ok().filter(|t| !t.is_empty());

    // Prompt for a token when started interactively without one
    if token.is_none() && io::stdin().is_terminal() {
        println!("⚠️  {} environment variable not set!", ENV_WEB_TOKEN);
        println!("    This token protects the admin page and API.");
        println!();
        print!("Enter a secure token (or press Enter to continue without auth): ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if !input.is_empty() {
            token = Some(input.to_string());
            println!("✓ Token set for this session");
            println!("  To persist, add to your environment: export {}=\"{}\"", ENV_WEB_TOKEN, input);
            println!();
        }
    }

    if token.is_none() {
        tracing::warn!("{} not set - authentication disabled", ENV_WEB_TOKEN);
    }

    let backup_dir = manager.backup_dir().display().to_string();
    let auth_enabled = token.is_some();
    let state = std::sync::Arc::new(AppState::new(manager, token));
    let app = create_router(state, enable_cors);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("🚀 pgbackup-admin server");
    println!("   📍 Admin page: http://{}", addr);
    println!("   🔌 API:        http://{}/api", addr);
    println!("   📂 Backups:    {}", backup_dir);

    if auth_enabled {
        println!("   🔒 Auth:       Enabled (token required)");
    } else {
        println!("   ⚠️  Auth:       Disabled (no token)");
    }

    println!();
    println!("📚 Endpoints:");
    println!("   GET    /                     - Backup listing page");
    println!("   POST   /backup               - Create backup");
    println!("   GET    /download/:file       - Download backup");
    println!("   GET    /delete/:file         - Delete backup");
    println!("   GET    /api/backups          - List backups");
    println!("   POST   /api/backups          - Create backup");
    println!("   DELETE /api/backups/:file    - Delete backup");
    println!("   GET    /api/config           - Show configuration");
    println!("   GET    /api/health           - Health check");
    println!();

    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
