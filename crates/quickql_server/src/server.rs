//! HTTP surface.
//!
//! Routes:
//! - POST / -> GraphQL execution (JSON request/response)
//! - GET / -> GraphQL playground, when enabled

use crate::error::BootstrapError;
use async_graphql::dynamic::Schema;
use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use axum::extract::State;
use axum::response::Html;
use axum::routing::post;
use axum::{Json, Router};
use log::{error, info};
use quickql_core::ServerOptions;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Builds the GraphQL router for `schema`.
pub fn build_router(schema: Schema, options: &ServerOptions) -> Router {
    let route = if options.playground {
        post(graphql).get(playground)
    } else {
        post(graphql)
    };
    Router::new().route("/", route).with_state(schema)
}

async fn graphql(
    State(schema): State<Schema>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(schema.execute(request).await)
}

async fn playground() -> Html<String> {
    Html(playground_source(GraphQLPlaygroundConfig::new("/")))
}

/// Running server; dropping it leaves the server running until process exit.
pub struct ServerHandle {
    url: String,
    local_addr: SocketAddr,
    join: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServerHandle {
    /// Reachable base URL, e.g. `http://127.0.0.1:4000/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(err) = self.join.await {
            error!("event=server_stop module=server status=error error={err}");
            return;
        }
        info!(
            "event=server_stop module=server status=ok addr={}",
            self.local_addr
        );
    }
}

/// Binds `options.host:options.port` and serves `schema` in the background.
///
/// # Errors
/// - The address cannot be bound.
pub async fn listen(schema: Schema, options: &ServerOptions) -> Result<ServerHandle, BootstrapError> {
    let address = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(address.as_str())
        .await
        .map_err(|source| BootstrapError::Bind {
            address: address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr()?;
    let url = format!("http://{local_addr}/");

    let app = build_router(schema, options);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        if let Err(err) = server.await {
            error!("event=server_run module=server status=error error={err}");
        }
    });

    info!(
        "event=server_listen module=server status=ok addr={} playground={}",
        local_addr, options.playground
    );
    Ok(ServerHandle {
        url,
        local_addr,
        join,
        shutdown_tx: Some(shutdown_tx),
    })
}
