use std::fs;
use std::path::PathBuf;

use http::StatusCode;
use tempfile::TempDir;
use waypost::{BoxFuture, FileServer, LocationOptions, Request, Response, RouteTable, Routes, TryFiles};

fn public_tree() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("public/docs")).unwrap();
    fs::write(root.path().join("public/docs/foo.html"), "hello foo\n").unwrap();
    fs::write(root.path().join("public/docs/index.html"), "hello index\n").unwrap();
    fs::write(root.path().join("public/docs/Mixed.TXT"), "mixed\n").unwrap();
    fs::write(root.path().join("public/private.txt"), "secret\n").unwrap();
    root
}

/// Echoes the rewritten request path and the file name it was handed.
struct EchoFiles;

impl FileServer for EchoFiles {
    fn serve(&self, path: PathBuf, req: Request) -> BoxFuture {
        Box::pin(async move {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            Response::text(format!("{} {}", req.path(), name))
        })
    }
}

async fn body(routes: &Routes, path: &str) -> (StatusCode, String) {
    let res = routes.call(Request::get(path)).await;
    (res.status_code(), String::from_utf8(res.body().to_vec()).unwrap())
}

#[tokio::test]
async fn default_pattern_serves_the_uri() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table.try_files(TryFiles::new().dir(root.path().join("public/docs"))).unwrap();
    let routes = table.freeze();

    let res = routes.call(Request::get("/foo.html")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.header("content-type"), Some("text/html"));
    assert_eq!(res.body(), b"hello foo\n");
}

#[tokio::test]
async fn index_pattern_serves_directory_index() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table.try_files(TryFiles::patterns([":uri/index.html"]).dir(root.path().join("public/docs"))).unwrap();
    let routes = table.freeze();

    assert_eq!(body(&routes, "/").await, (StatusCode::OK, "hello index\n".to_owned()));
}

#[tokio::test]
async fn dir_option_and_nested_index() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table.try_files(TryFiles::patterns([":uri/index.html"]).dir(root.path().join("public"))).unwrap();
    let routes = table.freeze();

    assert_eq!(body(&routes, "/docs").await, (StatusCode::OK, "hello index\n".to_owned()));
    assert_eq!(body(&routes, "/private.txt").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_never_leaves_the_base_dir() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table.try_files(TryFiles::new().dir(root.path().join("public/docs"))).unwrap();
    let routes = table.freeze();

    for path in ["/../private.txt", "/..%2Fprivate.txt", "/%2E%2E/private.txt", "/docs/../../private.txt"] {
        let (status, text) = body(&routes, path).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(text, "Route not found", "{path}");
    }
}

#[tokio::test]
async fn request_path_is_rewritten_for_the_file_server() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table
        .try_files(
            TryFiles::patterns([":uri", ":uri/index.html"])
                .dir(root.path().join("public"))
                .server(EchoFiles),
        )
        .unwrap();
    let routes = table.freeze();

    assert_eq!(body(&routes, "/docs").await.1, "/docs/index.html index.html");
    assert_eq!(body(&routes, "/docs/foo.html").await.1, "/docs/foo.html foo.html");
}

#[tokio::test]
async fn file_lookup_keeps_request_case() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table.try_files(TryFiles::new().dir(root.path().join("public/docs"))).unwrap();
    let routes = table.freeze();

    assert_eq!(body(&routes, "/Mixed.TXT").await.1, "mixed\n");
}

#[tokio::test]
async fn files_take_precedence_then_fall_through() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table
        .location("= /foo.html", LocationOptions::new(), |_req: Request| async { "exact" })
        .unwrap()
        .location("/", LocationOptions::new(), |_req: Request| async { "app" })
        .unwrap()
        .try_files(TryFiles::new().dir(root.path().join("public/docs")))
        .unwrap();
    let routes = table.freeze();

    assert_eq!(body(&routes, "/foo.html").await.1, "hello foo\n");
    assert_eq!(body(&routes, "/missing.html").await.1, "app");
}

#[tokio::test]
async fn missing_base_dir_falls_through() {
    let root = public_tree();
    let mut table = RouteTable::new();
    table
        .try_files(TryFiles::new().dir(root.path().join("gone")))
        .unwrap()
        .location("/", LocationOptions::new(), |_req: Request| async { "app" })
        .unwrap();
    let routes = table.freeze();

    assert_eq!(body(&routes, "/foo.html").await.1, "app");
}
