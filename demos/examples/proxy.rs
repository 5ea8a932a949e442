//! Filtering reverse proxy.
//!
//! Forwards every request to `UPSTREAM` (default `http://127.0.0.1:8080`)
//! through a hyper-util client and filters the replies. The filter is
//! configured with YAML, read from the file given as the first argument or
//! from the built-in document below.
//!
//! ```sh
//! cargo run -p jsonsift-demos --example proxy -- filter.yaml
//! curl 'localhost:3001/anything?jsonpath_filter=$.headers'
//! ```

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use hyper::Response;
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use jsonsift_configuration::ConfigFilter;
use jsonsift_tower::Sift;
use tower::{BoxError, ServiceBuilder};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = r#"
selector:
  Query: jsonpath_filter
language: JsonPath
shape: Any
on_error: Respond
max_body_size: 8MiB
"#;

#[derive(Clone)]
struct Upstream {
    base: String,
    client: Client<HttpConnector, Body>,
}

async fn forward(
    State(upstream): State<Upstream>,
    mut request: Request,
) -> Result<Response<Incoming>, StatusCode> {
    let path = request
        .uri()
        .path_and_query()
        .map_or("/", |path| path.as_str());
    let uri: Uri = format!("{}{}", upstream.base, path)
        .parse()
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    *request.uri_mut() = uri;

    upstream.client.request(request).await.map_err(|error| {
        tracing::warn!(%error, "upstream request failed");
        StatusCode::BAD_GATEWAY
    })
}

async fn handle_error(error: BoxError) -> (StatusCode, String) {
    (StatusCode::BAD_GATEWAY, error.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jsonsift=debug")),
        )
        .init();

    let yaml = match std::env::args().nth(1) {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => DEFAULT_CONFIG.to_owned(),
    };
    let filter = ConfigFilter::from_yaml(&yaml)?.into_filter()?;

    let upstream = Upstream {
        base: std::env::var("UPSTREAM").unwrap_or_else(|_| "http://127.0.0.1:8080".to_owned()),
        client: Client::builder(TokioExecutor::new()).build_http(),
    };

    let app = Router::new()
        .fallback(forward)
        .with_state(upstream)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_error))
                .layer(Sift::new(filter)),
        );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    tracing::info!(address = %listener.local_addr()?, "proxy listening");
    axum::serve(listener, app).await?;
    Ok(())
}
