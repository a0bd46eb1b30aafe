//! Basic example demonstrating GET and POST requests built with fluent calls.
//!
//! This example shows how to:
//! - Create a client bound to a base address
//! - Compose paths and query parameters
//! - Send a JSON body with a POST request
//! - Read typed JSON and response metadata
//!
//! Run with: `cargo run --example basic_request`

use restwright::{Error, HttpClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restwright=debug,basic_request=info")
        .init();

    let client = HttpClient::builder()
        .base_address("https://jsonplaceholder.typicode.com")?
        .default_header("User-Agent", "restwright-demo")?
        .build()?;

    println!("=== GET Request Example ===");
    let request = client.rest()?.set_paths(["posts", "1"]);
    println!("Requesting {}", request.current_uri());

    let post = request.get().await?.read_json_as::<Post>()?;
    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!("Request latency: {:?}", post.latency);
    println!();

    println!("=== Query Example ===");
    let response = client
        .rest()?
        .set_paths(["comments"])
        .add_query("postId", 1)
        .add_optional_query("email", None::<&str>)
        .get()
        .await?;
    println!("Status: {}, {} bytes", response.status, response.body.len());
    println!();

    println!("=== POST Request Example ===");
    let created = client
        .rest()?
        .set_paths(["posts"])
        .set_bearer_token("demo-token")?
        .set_json_content(&NewPost {
            title: "My New Post",
            body: "This is the content of my new post!",
            user_id: 1,
        })?
        .post()
        .await?
        .read_json_as::<Post>()?;

    println!("Created post ID: {}", created.id);
    println!("Content-Type: {:?}", created.header("content-type"));
    println!("Was retried: {}", created.was_retried());

    Ok(())
}
