// src/server/mod.rs

//! Development server: static files from the output directory, plus a
//! WebSocket that tells connected browsers to reload.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, trace, warn};

use crate::errors::ServerError;
use crate::types::ReloadKind;

pub mod client;

pub use client::{CLIENT_PATH, RELOAD_PATH};

/// Largest HTML document the script injector will buffer.
const MAX_HTML_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Swap stylesheets in place on `css` reloads instead of a page refresh.
    pub inject_changes: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            inject_changes: true,
        }
    }
}

#[derive(Debug)]
struct ServerSession {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<ReloadKind>,
}

/// One dev server per process. Reload signals can be sent before the
/// server starts; they reach nobody.
#[derive(Debug)]
pub struct DevServer {
    options: ServerOptions,
    reload_tx: broadcast::Sender<ReloadKind>,
    session: Mutex<Option<ServerSession>>,
}

impl DevServer {
    pub fn new(options: ServerOptions) -> Self {
        let (reload_tx, _) = broadcast::channel(16);
        Self {
            options,
            reload_tx,
            session: Mutex::new(None),
        }
    }

    /// Bind and start serving `root`. Returns the bound address (useful
    /// with port 0).
    pub async fn start(&self, root: PathBuf, addr: SocketAddr) -> Result<SocketAddr, ServerError> {
        let mut session = self.session.lock().await;
        if let Some(existing) = session.as_ref() {
            return Err(ServerError::Duplicate(existing.addr));
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Start { addr, source })?;
        let bound = listener
            .local_addr()
            .map_err(|source| ServerError::Start { addr, source })?;

        let app = router(&root, self.reload_tx.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                error!("dev server stopped: {e}");
            }
        });

        info!(addr = %bound, root = %root.display(), "dev server listening on http://{bound}");
        *session = Some(ServerSession {
            addr: bound,
            shutdown: shutdown_tx,
            handle,
        });
        Ok(bound)
    }

    /// Tell connected browsers to reload. Never fails.
    pub fn reload(&self, kind: ReloadKind) {
        let kind = match kind {
            ReloadKind::Css if !self.options.inject_changes => ReloadKind::Page,
            other => other,
        };
        match self.reload_tx.send(kind) {
            Ok(clients) => debug!(kind = kind.as_message(), clients, "reload sent"),
            Err(_) => trace!(kind = kind.as_message(), "reload with no connected clients"),
        }
    }

    /// Receive reload signals as clients do.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.reload_tx.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.session.lock().await.as_ref().map(|s| s.addr)
    }

    /// Stop serving and wait for in-flight connections to drain. No-op when
    /// not running.
    pub async fn shutdown(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };
        let _ = session.shutdown.send(());
        if let Err(e) = session.handle.await {
            warn!("dev server task ended abnormally: {e}");
        }
        info!(addr = %session.addr, "dev server stopped");
    }
}

fn router(root: &Path, reload_tx: broadcast::Sender<ReloadKind>) -> Router {
    Router::new()
        .route(CLIENT_PATH, get(client_js))
        .route(RELOAD_PATH, get(reload_socket))
        .fallback_service(ServeDir::new(root))
        .layer(middleware::map_response(inject_client))
        .with_state(AppState { reload_tx })
}

async fn client_js() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        client::CLIENT_JS,
    )
}

async fn reload_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| forward_reloads(socket, rx))
}

async fn forward_reloads(mut socket: WebSocket, mut rx: broadcast::Receiver<ReloadKind>) {
    trace!("reload client connected");
    loop {
        tokio::select! {
            signal = rx.recv() => {
                let kind = match signal {
                    Ok(kind) => kind,
                    // Missed signals collapse into one full reload.
                    Err(RecvError::Lagged(_)) => ReloadKind::Page,
                    Err(RecvError::Closed) => break,
                };
                if socket.send(Message::Text(kind.as_message().into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    trace!("reload client disconnected");
}

fn is_html(response: &Response) -> bool {
    response.status() == StatusCode::OK
        && response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"))
}

async fn inject_client(response: Response) -> Response {
    if !is_html(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_HTML_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("cannot buffer HTML response: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(with_client(bytes)))
}

/// Documents that are not UTF-8 are served untouched.
fn with_client(bytes: Bytes) -> Bytes {
    match std::str::from_utf8(&bytes) {
        Ok(html) => Bytes::from(client::inject_script(html)),
        Err(_) => {
            debug!("HTML response is not UTF-8; serving without the reload client");
            bytes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_port() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[test]
    fn non_utf8_html_is_served_byte_for_byte() {
        let latin1 = Bytes::from_static(b"<body>caf\xe9</body>");
        assert_eq!(with_client(latin1.clone()), latin1);

        let utf8 = with_client(Bytes::from_static("<body>café</body>".as_bytes()));
        let text = std::str::from_utf8(&utf8).unwrap();
        assert!(text.contains(CLIENT_PATH));
        assert!(text.contains("café"));
    }

    #[tokio::test]
    async fn css_reload_downgrades_without_injection() {
        let server = DevServer::new(ServerOptions {
            inject_changes: false,
        });
        let mut rx = server.subscribe();
        server.reload(ReloadKind::Css);
        assert_eq!(rx.recv().await.unwrap(), ReloadKind::Page);

        let server = DevServer::new(ServerOptions::default());
        let mut rx = server.subscribe();
        server.reload(ReloadKind::Css);
        assert_eq!(rx.recv().await.unwrap(), ReloadKind::Css);
    }

    #[test]
    fn reload_without_clients_is_fine() {
        DevServer::new(ServerOptions::default()).reload(ReloadKind::Page);
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = DevServer::new(ServerOptions::default());

        let addr = server.start(dir.path().to_path_buf(), any_port()).await.unwrap();
        assert_eq!(server.local_addr().await, Some(addr));

        let err = server
            .start(dir.path().to_path_buf(), any_port())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Duplicate(a) if a == addr));

        server.shutdown().await;
        assert!(!server.is_running().await);
    }

    #[tokio::test]
    async fn bind_failure_is_a_start_error() {
        let taken = std::net::TcpListener::bind(any_port()).unwrap();
        let addr = taken.local_addr().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let server = DevServer::new(ServerOptions::default());
        let err = server.start(dir.path().to_path_buf(), addr).await.unwrap_err();
        assert!(matches!(err, ServerError::Start { .. }));
        assert!(!server.is_running().await);
    }
}
