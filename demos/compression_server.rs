//! HTTP server with response compression
//!
//! Serves a few routes through the compression middleware so responses can
//! be inspected with curl.
//!
//! Run with:
//! ```bash
//! RUST_LOG=squeeze_compression=debug cargo run --bin compression_server -- --listen 127.0.0.1:8080
//! curl -sv -H 'Accept-Encoding: br, gzip' http://127.0.0.1:8080/json -o /dev/null
//! ```

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use hyper_util::rt::TokioIo;
use squeeze_compression::{load_from_file, CompressionConfig, CompressionMiddleware};
use squeeze_core::middleware::HandlerFuture;
use squeeze_core::response::responses;
use squeeze_core::{body, Body, Error, Middleware, Next};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Compression middleware demo server")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// Compression configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_from_file(path)
            .with_context(|| format!("loading compression config from {}", path.display()))?,
        None => CompressionConfig::default(),
    };
    let compression = CompressionMiddleware::with_config(config)?;
    let stack: Arc<[Arc<dyn Middleware>]> = Arc::new([Arc::new(compression) as Arc<dyn Middleware>]);

    let listener = TcpListener::bind(args.listen).await?;
    info!(addr = %args.listen, "Demo server listening");

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                tracing::trace!("Accepted connection from {}", peer);

                let stack = Arc::clone(&stack);
                tokio::spawn(async move {
                    let service = hyper::service::service_fn(move |req: Request<hyper::body::Incoming>| {
                        let stack = Arc::clone(&stack);
                        async move {
                            let req = req.map(|b| b.map_err(body::body_error).boxed_unsync());
                            let next = Next::with_handler(stack, Box::new(|req: Request<Body>| -> HandlerFuture {
                                Box::pin(route(req))
                            }));
                            let response = next.run(req).await.unwrap_or_else(|e| {
                                error!("Request handler error: {}", e);
                                error_response(e.to_status_code(), &e.to_string())
                            });
                            Ok::<_, std::convert::Infallible>(response)
                        }
                    });

                    let io = TokioIo::new(stream);
                    if let Err(e) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("HTTP connection error: {}", e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

async fn route(req: Request<Body>) -> squeeze_core::Result<Response<Body>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => responses::ok().text("hello world"),
        (&Method::GET, "/text") => {
            let repeat = repeat_param(req.uri().query())?;
            responses::ok().text("The quick brown fox jumps over the lazy dog.\n".repeat(repeat))
        }
        (&Method::GET, "/json") => {
            let items: Vec<_> = (0..200)
                .map(|i| serde_json::json!({ "id": i, "name": format!("item-{i}"), "tags": ["demo", "json"] }))
                .collect();
            responses::ok().json_body(&serde_json::json!({ "items": items }))
        }
        (&Method::GET, "/stream") => {
            let ticks = futures::stream::unfold(0u32, |n| async move {
                if n == 20 {
                    return None;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                let line = format!("{{\"tick\":{n},\"payload\":\"{}\"}}\n", "z".repeat(120));
                Some((Ok(Bytes::from(line)), n + 1))
            });
            responses::ok().stream("application/stream+json", body::from_stream(ticks))
        }
        (&Method::GET, "/image") => {
            responses::ok().bytes("image/png", vec![0x89u8; 8192])
        }
        _ => responses::not_found("Not Found"),
    }
}

/// `repeat=N` from the query string, 200 when absent
fn repeat_param(query: Option<&str>) -> squeeze_core::Result<usize> {
    let Some(value) = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("repeat="))
    else {
        return Ok(200);
    };
    match value.parse::<usize>() {
        Ok(n) if n <= 100_000 => Ok(n),
        _ => Err(Error::InvalidRequest(format!("repeat must be 0-100000, got '{value}'"))),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(body::full(message.to_string()));
    *response.status_mut() = status;
    response
}
