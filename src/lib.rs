//! # waypost
//!
//! nginx `location` routing for Rust HTTP services.
//!
//! You describe locations the way an nginx config does: exact matches,
//! prefixes, `^~` prefixes that stop the regex search, regexes, and a
//! `try_files` probe for files on disk. waypost picks one location per request
//! with nginx's precedence and runs its handler.
//!
//! ## Precedence
//!
//! | Order | Location                  | Wins when                                 |
//! |-------|---------------------------|-------------------------------------------|
//! | 1     | `try_files`               | a matching file exists under its base dir |
//! | 2     | `= /path`                 | the path is exactly `/path`               |
//! | 3     | `^~ /prefix`              | longest such prefix; skips regexes        |
//! | 4     | `~ regex` / `Regex`       | first registered regex that matches       |
//! | 5     | `/prefix`                 | longest such prefix                       |
//!
//! Request paths are percent-decoded and lower-cased before any comparison.
//! Locations can also require request attributes (method, headers, anything
//! in the request's attribute bag) to hold a value or match a regex.
//!
//! ## Setup, then serve
//!
//! Locations are registered on a mutable [`RouteTable`]. [`RouteTable::freeze`]
//! sorts it and hands back read-only [`Routes`], which is what the server
//! shares between requests. Registration errors are returned while building
//! the table, before any traffic is accepted.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use waypost::{LocationOptions, Request, Response, RouteTable, Server, TryFiles};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waypost::Error> {
//!     let mut table = RouteTable::new();
//!     table
//!         .try_files(TryFiles::patterns([":uri", ":uri/index.html"]).dir("public"))?
//!         .location("= /", LocationOptions::new(), home)?
//!         .location(r"~ ^/users/(?P<id>\d+)$", LocationOptions::new(), user)?
//!         .location("/api/", LocationOptions::new().method(http::Method::POST), api)?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(table.freeze()).await
//! }
//!
//! async fn home(_req: Request) -> &'static str {
//!     "home"
//! }
//!
//! async fn user(req: Request) -> String {
//!     format!("user {}", req.param("id").unwrap_or("?"))
//! }
//!
//! async fn api(req: Request) -> Response {
//!     Response::builder().bytes("application/json", req.body().to_vec())
//! }
//! ```

mod error;
mod files;
mod handler;
mod location;
mod matcher;
mod predicate;
mod request;
mod response;
mod server;
mod table;
mod tier;

pub use error::Error;
pub use files::{FileHit, FileServer, StaticFiles, TryFiles, URI_PLACEHOLDER};
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use location::{LocationOptions, Pattern};
pub use matcher::{Found, MatchContext, Matcher, Routes};
pub use predicate::{PredicateValue, Predicates};
pub use request::{Matches, Request};
pub use response::{IntoResponse, NOT_FOUND_BODY, Response, ResponseBuilder};
pub use server::Server;
pub use table::{RouteEntry, RouteTable};
pub use tier::Tier;
