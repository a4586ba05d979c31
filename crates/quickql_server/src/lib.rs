//! Serves a QuickQL composition over HTTP.
//!
//! `build_schema` turns the composition into an executable schema and
//! `listen` exposes it with `axum` on the ambient `tokio` runtime.

pub mod error;
pub mod schema;
pub mod server;

pub use error::BootstrapError;
pub use schema::{build_schema, MUTATION_INPUT_ARG};
pub use server::{build_router, listen, ServerHandle};

use quickql_core::{CompositionResult, HandlerContext, ServerOptions};

/// Builds the schema and starts serving it.
pub async fn serve(
    composition: &CompositionResult,
    options: &ServerOptions,
    context: HandlerContext,
) -> Result<ServerHandle, BootstrapError> {
    let schema = build_schema(composition, options, context)?;
    listen(schema, options).await
}
