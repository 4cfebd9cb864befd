//! The nginx `location` documentation example, served by waypost.
//!
//! Run with:
//!   RUST_LOG=trace cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/                         # A: exact
//!   curl http://localhost:3000/index.html               # B: prefix
//!   curl http://localhost:3000/documents/document.html  # C: longer prefix
//!   curl http://localhost:3000/images/1.gif             # D: ^~ beats the regex
//!   curl http://localhost:3000/documents/1.gif          # E: regex beats prefix
//!   curl -X POST http://localhost:3000/upload -d hello  # method predicate
//!   curl http://localhost:3000/Cargo.toml               # try_files

use http::Method;
use waypost::{LocationOptions, Request, Response, RouteTable, Server, TryFiles};

#[tokio::main]
async fn main() -> Result<(), waypost::Error> {
    tracing_subscriber::fmt::init();

    let mut table = RouteTable::new();
    table
        .try_files(TryFiles::new())?
        .location("= /", LocationOptions::new(), |_req: Request| async { "A" })?
        .location("/", LocationOptions::new(), |_req: Request| async { "B" })?
        .location("/documents/", LocationOptions::new(), |_req: Request| async { "C" })?
        .location("^~ /images/", LocationOptions::new(), |_req: Request| async { "D" })?
        .location(r"~* \.(gif|jpg|jpeg)$", LocationOptions::new(), extension)?
        .location("/upload", LocationOptions::new().method(Method::POST), upload)?;

    Server::bind("0.0.0.0:3000")?.serve(table.freeze()).await
}

// The regex captures are on the request by the time the handler runs.
async fn extension(req: Request) -> String {
    let ext = req.matches().and_then(|m| m.get(1)).unwrap_or("?");
    format!("E ({ext})")
}

async fn upload(req: Request) -> Response {
    Response::builder()
        .status(http::StatusCode::CREATED)
        .text(format!("{} bytes", req.body().len()))
}
