//! Development server implementation.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use folio_static::{SiteBuilder, SiteConfig};
use tower_http::services::ServeDir;

use crate::reload::{
    inject_reload_script, reload_client_script, ReloadHub, ReloadMessage, RELOAD_PATH,
    RELOAD_SCRIPT_PATH,
};
use crate::watcher::{FileWatcher, WatchEvent, WatchRules};

/// HTML responses larger than this are served without the reload script.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    pub site: SiteConfig,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    AddressError(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Build(#[from] folio_static::BuildError),
}

/// Shared server state.
struct ServerState {
    builder: SiteBuilder,
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Build the site, then serve it until the process exits.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::AddressError(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let site = self.config.site.clone();
        let output_dir = site.output_dir();
        let builder = SiteBuilder::new(site.clone());
        let report = builder.build().await?;
        tracing::info!(
            "Built {} passthroughs and {} templates in {}ms",
            report.passthroughs.len(),
            report.templates.len(),
            report.duration_ms
        );

        let state = Arc::new(ServerState {
            builder,
            hub: ReloadHub::new(),
        });

        let rules = WatchRules::from_config(&site);
        let (watcher, mut rx) = FileWatcher::new(&site.watch_paths(), rules)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let state_clone = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let state = Arc::clone(&state_clone);
                // Copies touch the filesystem
                let message =
                    tokio::task::spawn_blocking(move || react(&state.builder, &event)).await;
                match message {
                    Ok(message) => state_clone.hub.send(message),
                    Err(e) => tracing::warn!("Watch handler failed: {}", e),
                }
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(&output_dir, state);

        tracing::info!("Starting dev server at http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

fn router(output_dir: &Path, state: Arc<ServerState>) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(ws_handler))
        .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
        .fallback_service(ServeDir::new(output_dir))
        .layer(middleware::from_fn(inject_into_html))
        .with_state(state)
}

/// Bring the output up to date with a change and pick the browser update.
fn react(builder: &SiteBuilder, event: &WatchEvent) -> ReloadMessage {
    let path = event.path();

    let copied = match event {
        WatchEvent::TemplateModified(_) => {
            tracing::info!("Template modified: {}", path.display());
            return ReloadMessage::Reload;
        }
        _ => builder.copy_changed(path),
    };

    match (event, copied) {
        (WatchEvent::StyleModified(_), Ok(Some(target))) => {
            tracing::info!("Stylesheet modified: {}", path.display());
            match url_path(builder.config(), &target) {
                Some(url) => ReloadMessage::Css { path: url },
                None => ReloadMessage::Reload,
            }
        }
        (_, Ok(Some(target))) => {
            tracing::info!("Updated {}", target.display());
            ReloadMessage::Reload
        }
        (_, Ok(None)) => ReloadMessage::Reload,
        (_, Err(e)) => {
            tracing::warn!("Failed to copy {}: {}", path.display(), e);
            ReloadMessage::Reload
        }
    }
}

/// URL path of an output file, e.g. `/assets/css/main.css`.
fn url_path(config: &SiteConfig, target: &Path) -> Option<String> {
    let relative = target.strip_prefix(config.output_dir()).ok()?;
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(format!("/{}", segments.join("/")))
}

/// Add the reload script to HTML pages.
async fn inject_into_html(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read page for reload injection: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_reload_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one browser until it disconnects.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    while let Ok(msg) = rx.recv().await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

async fn reload_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        reload_client_script(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    async fn built_site(root: &Path) -> SiteBuilder {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("assets/css")).unwrap();
        fs::write(root.join("assets/css/main.css"), "body {}").unwrap();
        fs::write(root.join("src/index.njk"), "<h1>Hi</h1>").unwrap();

        let builder = SiteBuilder::new(SiteConfig::default().with_root(root));
        builder.build().await.unwrap();
        builder
    }

    #[test]
    fn creates_server_with_default_config() {
        let server = DevServer::new(DevServerConfig::default());
        assert_eq!(server.config.port, 8080);
        assert_eq!(server.config.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn stylesheet_changes_swap_in_place() {
        let temp = tempdir().unwrap();
        let builder = built_site(temp.path()).await;

        let css = temp.path().join("assets/css/main.css");
        fs::write(&css, "body { margin: 0 }").unwrap();

        let message = react(&builder, &WatchEvent::StyleModified(css));
        assert_eq!(
            message,
            ReloadMessage::Css {
                path: "/assets/css/main.css".to_string()
            }
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("_site/assets/css/main.css")).unwrap(),
            "body { margin: 0 }"
        );
    }

    #[tokio::test]
    async fn other_changes_reload_the_page() {
        let temp = tempdir().unwrap();
        let builder = built_site(temp.path()).await;

        let image = temp.path().join("images/me.jpg");
        fs::create_dir_all(image.parent().unwrap()).unwrap();
        fs::write(&image, "jpeg").unwrap();

        let message = react(&builder, &WatchEvent::Created(image));
        assert_eq!(message, ReloadMessage::Reload);
        assert!(temp.path().join("_site/images/me.jpg").exists());

        let template = temp.path().join("src/index.njk");
        assert_eq!(
            react(&builder, &WatchEvent::TemplateModified(template)),
            ReloadMessage::Reload
        );
    }

    #[test]
    fn url_paths_are_rooted_at_the_output() {
        let config = SiteConfig::default().with_root("/site");
        assert_eq!(
            url_path(&config, Path::new("/site/_site/assets/css/main.css")),
            Some("/assets/css/main.css".to_string())
        );
        assert_eq!(url_path(&config, Path::new("/elsewhere/main.css")), None);
    }
}
