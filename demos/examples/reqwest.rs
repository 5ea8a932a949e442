//! Filtering responses on the client side with reqwest-middleware.

use jsonsift_core::{JsonPath, ShapePolicy};
use jsonsift_http::ErrorPolicy;
use jsonsift_reqwest::{ResponseFilter, SiftMiddleware};
use reqwest::Client;
use reqwest_middleware::ClientBuilder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("jsonsift=debug")
        .init();

    let filter = ResponseFilter::builder()
        .evaluator(JsonPath, ShapePolicy::Any)
        .error_policy(ErrorPolicy::Respond)
        .build();

    let client = ClientBuilder::new(Client::new())
        .with(SiftMiddleware::new(filter))
        .build();

    let url = "https://api.github.com/repos/rust-lang/rust";

    println!("=== Whole document ===");
    let response = client
        .get(url)
        .header("User-Agent", "jsonsift-example/1.0")
        .send()
        .await?;
    println!("Status: {}", response.status());
    let body = response.text().await?;
    println!("Body length: {} bytes", body.len());

    println!("\n=== Selected fields ===");
    for query in ["$.full_name", "$.owner.login", "$.stargazers_count"] {
        let response = client
            .get(url)
            .header("User-Agent", "jsonsift-example/1.0")
            .header("X-JsonPath", query)
            .send()
            .await?;
        println!("{query} -> {}", response.text().await?);
    }

    println!("\n=== Missing field ===");
    let response = client
        .get(url)
        .header("User-Agent", "jsonsift-example/1.0")
        .header("X-JsonPath", "$.nonexistent")
        .send()
        .await?;
    println!("Status: {}", response.status());
    println!("Body: {}", response.text().await?);

    Ok(())
}
