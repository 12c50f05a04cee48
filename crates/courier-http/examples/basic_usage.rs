//! Walkthrough of the client against jsonplaceholder.typicode.com
//!
//! Run with `RUST_LOG=courier=debug,courier_http=debug` to see the pipeline trace.

use courier_http::{ClientConfig, HttpClient, Interceptors, LoggingInterceptor, RequestOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

const BASE: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    id: u64,
    user_id: u64,
    title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPost<'a> {
    title: &'a str,
    body: &'a str,
    user_id: u64,
}

#[tokio::main]
async fn main() -> courier_http::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let client = HttpClient::new(ClientConfig::fetch_style())?;

    // Basic GET
    let post: Post = client.get(&format!("{BASE}/posts/1"), None).await?;
    info!(id = post.id, user = post.user_id, "GET result: {}", post.title);

    // Default headers apply to every later call
    client.set_defaults(RequestOptions::new().with_headers([
        ("Authorization", "Bearer my-token"),
        ("Content-Type", "application/json"),
    ]));
    let post: Post = client.get(&format!("{BASE}/posts/2"), None).await?;
    info!(id = post.id, "GET with default headers: {}", post.title);

    // POST with a body
    let created: Value = client
        .post(
            &format!("{BASE}/posts"),
            &NewPost {
                title: "foo",
                body: "bar",
                user_id: 1,
            },
            None,
        )
        .await?;
    info!("POST result: {created}");

    // Interceptors
    client.set_interceptors(Interceptors::all(LoggingInterceptor));
    let post: Post = client.get(&format!("{BASE}/posts/3"), None).await?;
    info!(id = post.id, "GET with interceptors: {}", post.title);

    Ok(())
}
