//! Fetches a URL, following redirects, and prints the status and body size.
//!
//! ```text
//! $ cargo run --example fetch -- http://example.com/
//! ```

use micro_net::client::HttpClient;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let url = std::env::args().nth(1).unwrap_or_else(|| "http://example.com/".to_owned());

    let mut session = match HttpClient::new().target(&url) {
        Ok(session) => session,
        Err(e) => {
            error!(cause = %e, url, "invalid target");
            return;
        }
    };
    session.add_header("User-Agent", "micro-net-fetch");

    if let Err(e) = session.request().await {
        error!(cause = %e, url, "request failed");
        return;
    }

    let response = session.response();
    println!("{}", response.status_line());
    for (name, value) in response.headers().iter() {
        println!("{name}: {value}");
    }
    println!("\n{} body bytes from {}", response.body().len(), session.target().url());
}
