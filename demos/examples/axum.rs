use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{BoxError, Json, Router};
use jsonsift_core::{Jq, ShapePolicy};
use jsonsift_tower::Sift;
use serde::Serialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;

#[derive(Serialize)]
struct Book {
    id: u32,
    title: &'static str,
    author: &'static str,
    price: f64,
}

async fn books() -> Json<Vec<Book>> {
    Json(vec![
        Book {
            id: 1,
            title: "Sayings of the Century",
            author: "Nigel Rees",
            price: 8.95,
        },
        Book {
            id: 2,
            title: "Moby Dick",
            author: "Herman Melville",
            price: 8.99,
        },
        Book {
            id: 3,
            title: "The Lord of the Rings",
            author: "J. R. R. Tolkien",
            price: 22.99,
        },
    ])
}

async fn store() -> Json<Value> {
    Json(json!({
        "store": {
            "name": "corner",
            "open": true,
            "bicycle": {"color": "red", "price": 19.95}
        }
    }))
}

async fn greet() -> &'static str {
    "plain text is never filtered\n"
}

async fn handle_error(error: BoxError) -> (StatusCode, String) {
    (StatusCode::BAD_GATEWAY, format!("filter failed: {error}"))
}

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter("debug,jsonsift=trace")
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    // $ curl localhost:3000/books -H 'X-JsonPath: $[?(@.price < 10)].title'
    let jsonpath = Sift::default();

    // $ curl 'localhost:3000/jq/store?filter=.store.bicycle'
    let jq = Sift::builder()
        .query_param("filter")
        .evaluator(Jq, ShapePolicy::Object)
        .build();

    let filtered = Router::new()
        .route("/books", get(books))
        .route("/store", get(store))
        .route("/greet", get(greet))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_error))
                .layer(jsonpath),
        );

    let scripted = Router::new().route("/store", get(store)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(jq),
    );

    let app = filtered.nest("/jq", scripted);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
