//! A small book catalogue wired through Satchel.
//!
//! Run with `RUST_LOG=satchel_container=debug cargo run --example books` to
//! watch keys resolve lazily.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use satchel::prelude::*;

// === Domain ===

#[derive(Debug, Clone)]
struct Book {
    name: String,
    read: bool,
}

#[derive(Default)]
struct BookStore {
    books: Mutex<Vec<Book>>,
}

impl BookStore {
    fn set(&self, books: Vec<Book>) {
        *self.books.lock() = books;
    }

    fn unread(&self) -> Vec<String> {
        self.books.lock().iter().filter(|b| !b.read).map(|b| b.name.clone()).collect()
    }
}

#[async_trait]
trait BookSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Book>>;
}

struct BookApiClient {
    base_url: String,
}

#[async_trait]
impl BookSource for BookApiClient {
    async fn fetch(&self) -> Result<Vec<Book>> {
        tracing::info!(url = %self.base_url, "Fetching books");
        Ok(vec![
            Book { name: "The name of the wind".into(), read: true },
            Book { name: "The Wise Man's Fear".into(), read: false },
            Book { name: "The way of kings".into(), read: true },
            Book { name: "Word of radiance".into(), read: false },
        ])
    }
}

struct BookService {
    client: Arc<Arc<dyn BookSource>>,
    store: Arc<BookStore>,
}

impl BookService {
    async fn refresh(&self) -> Result<usize> {
        let books = self.client.fetch().await?;
        let count = books.len();
        self.store.set(books);
        Ok(count)
    }
}

struct GetBooksUseCase {
    deps: Bag,
}

impl GetBooksUseCase {
    async fn execute(&self) -> Result<Vec<String>> {
        let service: Arc<BookService> = self.deps.path_as("books.service")?;
        service.refresh().await?;
        Ok(self.deps.path_as::<BookStore>("books.store")?.unread())
    }
}

// === Wiring ===

fn build() -> Result<Container> {
    Container::builder()
        .register("baseUrl", from_value(String::from("https://books.example")))
        .register(
            "books",
            context([
                (
                    "apiClient",
                    try_from_class(|deps: Bag| {
                        let base_url: Arc<String> = deps.get_as("baseUrl")?;
                        let client = BookApiClient {
                            base_url: base_url.to_string(),
                        };
                        Ok(Arc::new(client) as Arc<dyn BookSource>)
                    }),
                ),
                ("store", singleton(|_: &Bag| Ok(BookStore::default()))),
                (
                    "service",
                    extract(
                        |(client, store): (Arc<Arc<dyn BookSource>>, Arc<BookStore>)| {
                            Ok(BookService { client, store })
                        },
                        ["books.apiClient", "books.store"],
                    )?,
                ),
            ]),
        )
        .register("useCase", from_class(|deps: Bag| GetBooksUseCase { deps }))
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let container = build()?;
    println!("Registered: {:?}", container.keys());

    let unread = container.get_as::<GetBooksUseCase>("useCase")?.execute().await?;
    println!("Still to read: {unread:?}");

    if let Err(err) = container.get("book") {
        println!("{err}");
    }

    Ok(())
}
