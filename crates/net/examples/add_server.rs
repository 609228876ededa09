//! Answers `GET /a+b` with the sum of `a` and `b`.
//!
//! ```text
//! $ curl http://127.0.0.1:8080/40+2
//! 42
//! ```

use std::net::SocketAddr;

use http::StatusCode;
use micro_net::server::{HttpConfig, HttpRequestReceived, HttpServer, ServerConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn add(path: &str) -> Option<i64> {
    let (a, b) = path.trim_start_matches('/').split_once('+')?;
    a.trim().parse::<i64>().ok()?.checked_add(b.trim().parse().ok()?)
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let addr = SocketAddr::from(([127, 0, 0, 1], 8080));
    let mut server = HttpServer::new(ServerConfig::new(addr).with_worker_threads(4), HttpConfig::default());
    server
        .on_request(|e: &mut HttpRequestReceived| {
            let uri = e.request().uri().to_owned();
            let response = e.response_mut();
            response.add_header("Content-Type", "text/plain");
            match add(&uri) {
                Some(sum) => {
                    info!(uri, sum, "added");
                    response.set_body(format!("{sum}\n"));
                }
                None => {
                    response.set_status(StatusCode::BAD_REQUEST);
                    response.set_body("expected /a+b\n");
                }
            }
        })
        .expect("server has not started yet");

    match server.start() {
        Ok(addr) => info!(%addr, "listening"),
        Err(e) => {
            error!(cause = %e, "failed to start server");
            return;
        }
    }

    loop {
        std::thread::park();
    }
}
