//! Example demonstrating page-by-page iteration.
//!
//! This example shows how to:
//! - Wrap a paginated endpoint in a `PaginatedCursor`
//! - Map an endpoint's own paging scheme onto `Paginated<T>`
//! - Iterate with `move_next` or consume the cursor as a stream
//!
//! Run with: `cargo run --example pagination`

use futures::StreamExt;
use restwright::{ClientFactory, Error, HttpClient, Paginated, PaginatedCursor, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

/// Fetches one page; the API signals the end with a short page.
async fn fetch_posts(client: HttpClient, page: u32, size: u32) -> Result<Paginated<Post>> {
    let items: Vec<Post> = client
        .rest()?
        .set_paths(["posts"])
        .add_query("_page", page)
        .add_query("_limit", size)
        .get()
        .await?
        .read_json_as::<Vec<Post>>()?
        .data;

    let has_more = items.len() as u32 == size;
    Ok(Paginated {
        items,
        current_page: page,
        has_more,
    })
}

#[tokio::main]
async fn main() -> std::result::Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restwright=debug,pagination=info")
        .init();

    let client = ClientFactory::create_url_client("https://jsonplaceholder.typicode.com")?;

    println!("=== Cursor Example ===");
    let mut cursor = PaginatedCursor::new(None, Some(25), |page, size| {
        fetch_posts(client.clone(), page, size)
    });

    let mut total = 0;
    while cursor.move_next().await {
        if let Some(page) = cursor.current() {
            println!("Page {}: {} posts", page.current_page, page.items.len());
            total += page.items.len();
        }
    }
    if let Some(err) = cursor.last_error() {
        eprintln!("Stopped early: {}", err);
    }
    println!("Read {} posts", total);
    println!();

    println!("=== Stream Example ===");
    let pages = PaginatedCursor::new(Some(3), Some(10), |page, size| {
        fetch_posts(client.clone(), page, size)
    })
    .into_stream();
    futures::pin_mut!(pages);

    while let Some(page) = pages.next().await {
        let page = page?;
        let first = page.items.first().map(|post| post.title.as_str());
        println!("Page {} starts with {:?}", page.current_page, first);
    }

    Ok(())
}
