//! The `/graphql` endpoint.

use std::sync::Arc;

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tracing::info;

use devnode_model::Dispatcher;

use crate::schema::{build_schema, ReaderSchema};

/// Router serving the reader GraphQL API at `/graphql`. `POST` executes a
/// query; `GET` serves the playground.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    info!("serving GraphQL reader API");
    let schema = build_schema(dispatcher);
    Router::new()
        .route("/graphql", get(playground).post(execute))
        .with_state(schema)
}

async fn execute(State(schema): State<ReaderSchema>, request: GraphQLRequest) -> GraphQLResponse {
    schema.execute(request.into_inner()).await.into()
}

async fn playground() -> Html<String> {
    Html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
}
