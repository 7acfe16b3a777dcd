//! GraphQL transport for the moderation console.
//!
//! Execution errors still come back as 200 with an `errors` array; only a
//! request the executor cannot run at all (unknown operation, malformed
//! document) maps to 400.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use juniper::http::{GraphQLBatchRequest, GraphQLRequest};

use crate::server::graphql::{GraphQLContext, Schema};

fn respond<T: serde::Serialize>(executed_ok: bool, body: T) -> Response {
    let status = if executed_ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(body)).into_response()
}

pub async fn graphql_handler(
    State(schema): State<Arc<Schema>>,
    Extension(context): Extension<GraphQLContext>,
    Json(request): Json<GraphQLRequest>,
) -> Response {
    let response = request.execute(&schema, &context).await;
    respond(response.is_ok(), response)
}

/// Batch endpoint, used by the console to fetch the report queue and
/// analytics panels in one round trip.
pub async fn graphql_batch_handler(
    State(schema): State<Arc<Schema>>,
    Extension(context): Extension<GraphQLContext>,
    Json(batch): Json<GraphQLBatchRequest>,
) -> Response {
    let response = batch.execute(&schema, &context).await;
    respond(response.is_ok(), response)
}

/// GraphiQL page for poking at the moderation schema. Routed only in debug
/// builds; requests it issues still go through the JWT layer.
pub async fn graphql_playground() -> Html<&'static str> {
    Html(PLAYGROUND_HTML)
}

const PLAYGROUND_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Chorus Moderation GraphQL</title>
    <style>
        body { height: 100%; margin: 0; width: 100%; overflow: hidden; }
        #graphiql { height: 100vh; }
    </style>
    <script crossorigin src="https://unpkg.com/react@18/umd/react.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/react-dom@18/umd/react-dom.production.min.js"></script>
    <link rel="stylesheet" href="https://unpkg.com/graphiql/graphiql.min.css" />
</head>
<body>
    <div id="graphiql">Loading...</div>
    <script src="https://unpkg.com/graphiql/graphiql.min.js" type="application/javascript"></script>
    <script>
        const fetcher = GraphiQL.createFetcher({ url: '/graphql' });
        ReactDOM.render(
            React.createElement(GraphiQL, {
                fetcher: fetcher,
                defaultQuery: '{ moderationQueue { id reason priority } }',
            }),
            document.getElementById('graphiql'),
        );
    </script>
</body>
</html>
"#;
