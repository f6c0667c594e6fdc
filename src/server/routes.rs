/// Routes definition

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth;
use super::handlers;
use super::SharedState;

pub fn create_router(state: SharedState, enable_cors: bool) -> Router {
    // Protected routes (require the token when one is configured)
    let protected_routes = Router::new()
        .route("/", get(handlers::admin_page))
        .route("/backup", post(handlers::create_backup_action))
        .route("/download/:file", get(handlers::download_backup))
        .route(
            "/delete/:file",
            get(handlers::delete_backup_action).post(handlers::delete_backup_action),
        )
        .route(
            "/api/backups",
            get(handlers::list_backups).post(handlers::create_backup),
        )
        .route("/api/backups/:file", delete(handlers::delete_backup))
        .route("/api/config", get(handlers::get_config))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Public routes
    let public_routes = Router::new().route("/api/health", get(handlers::health_check));

    let mut app = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::command::Pipeline;
    use crate::core::runner::MockCommandRunner;
    use crate::core::{BackupManager, BackupSettings};
    use crate::server::page::with_token;
    use crate::server::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state_with(dir: &Path, runner: MockCommandRunner, token: Option<&str>) -> SharedState {
        let mut settings = BackupSettings::default();
        settings.backup_dir = dir.to_path_buf();
        settings.database.name = "app".to_string();
        settings.generations = 2;
        settings.sudo = false;

        Arc::new(AppState::new(
            BackupManager::with_runner(settings, Arc::new(runner)),
            token.map(String::from),
        ))
    }

    fn state(dir: &Path) -> SharedState {
        state_with(dir, MockCommandRunner::new(), None)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_admin_page_lists_backups() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-2024-06-01_10-15.sql.bz2"), b"data").unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        let response = create_router(state(dir.path()), false)
            .oneshot(get("/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Database Backups"));
        assert!(html.contains("app-2024-06-01_10-15.sql.bz2"));
        assert!(!html.contains("readme.txt"));
    }

    #[tokio::test]
    async fn test_download_existing_backup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-2024-06-01_10-15.sql.bz2"), b"BZh9payload").unwrap();

        let response = create_router(state(dir.path()), false)
            .oneshot(get("/download/app-2024-06-01_10-15.sql.bz2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-bzip2");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"app-2024-06-01_10-15.sql.bz2\""
        );
        assert_eq!(body_string(response).await, "BZh9payload");
    }

    #[tokio::test]
    async fn test_download_missing_backup_is_not_found() {
        let dir = tempfile::tempdir().unwrap();

        let response = create_router(state(dir.path()), false)
            .oneshot(get("/download/missing.sql.bz2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "File not found");
    }

    #[tokio::test]
    async fn test_delete_action_redirects_with_flash() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app-2024-06-01_10-15.sql.bz2");
        fs::write(&file, b"x").unwrap();
        let state = state(dir.path());

        let response = create_router(state.clone(), false)
            .oneshot(get("/delete/app-2024-06-01_10-15.sql.bz2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(!file.exists());

        let response = create_router(state.clone(), false)
            .oneshot(get("/delete/app-2024-06-01_10-15.sql.bz2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let flashes = state.flashes.drain();
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].text, "Backup app-2024-06-01_10-15.sql.bz2 deleted successfully!");
        assert_eq!(flashes[1].text, "Backup file app-2024-06-01_10-15.sql.bz2 not found.");
    }

    #[tokio::test]
    async fn test_create_backup_action() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|p: &Pipeline| {
            fs::write(p.stdout.as_ref().unwrap(), b"dump")?;
            Ok(())
        });
        let state = state_with(dir.path(), runner, None);

        let request = Request::builder()
            .method("POST")
            .uri("/backup")
            .body(Body::empty())
            .unwrap();
        let response = create_router(state.clone(), false).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(state.manager.list_backups().unwrap().len(), 1);
        assert_eq!(state.flashes.drain()[0].text, "Backup created successfully!");
    }

    #[tokio::test]
    async fn test_api_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/backups/missing.sql.bz2")
            .body(Body::empty())
            .unwrap();

        let response = create_router(state(dir.path()), false).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_list_backups() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app-2024-06-01_10-15.sql.bz2"), b"abc").unwrap();

        let response = create_router(state(dir.path()), false)
            .oneshot(get("/api/backups"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][0]["file_name"], "app-2024-06-01_10-15.sql.bz2");
        assert_eq!(json["data"][0]["size_bytes"], 3);
    }

    #[tokio::test]
    async fn test_token_required_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), MockCommandRunner::new(), Some("s3cret"));
        let router = create_router(state, false);

        let response = router.clone().oneshot(get("/api/backups")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router.clone().oneshot(get("/?token=wrong")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/backups")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.clone().oneshot(get("/?token=s3cret")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_page_links_carry_a_usable_token() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), MockCommandRunner::new(), Some("p@ss word"));
        let router = create_router(state, false);

        let link = with_token("/", Some("p@ss word"));
        assert_eq!(link, "/?token=p%40ss%20word");

        let response = router.oneshot(get(&link)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
