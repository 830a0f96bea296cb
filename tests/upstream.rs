//! Decoration of pages served by an upstream application, over real sockets.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use page_decorator::config::{ServerConfig, UpstreamConfig};
use page_decorator::{HttpServer, Shutdown};

use common::MockResponse;

mod common;

const DECORATOR: &str = "<html><head><title>${content.title}</title></head><body><nav/>${content.body}</body></html>";

async fn start_server(mut config: ServerConfig, upstream: SocketAddr) -> (SocketAddr, Shutdown) {
    config.upstream = Some(UpstreamConfig {
        address: upstream.to_string(),
    });
    config.timeouts.upstream_secs = 2;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_upstream_page_is_decorated() {
    let upstream = common::start_mock_backend(MockResponse::html(
        "<html><head><title>Orders</title></head><body><ul><li>1</li></ul></body></html>",
    ))
    .await;
    let (addr, shutdown) = start_server(common::decorated_config(DECORATOR), upstream).await;

    let res = client().get(format!("http://{addr}/orders")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers()[reqwest::header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(
        res.text().await.unwrap(),
        "<html><head><title>Orders</title></head><body><nav/><ul><li>1</li></ul></body></html>"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_fragment_is_wrapped() {
    let upstream = common::start_mock_backend(MockResponse::html("<p>fragment</p>")).await;
    let (addr, shutdown) = start_server(common::decorated_config(DECORATOR), upstream).await;

    let body = client()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(
        body,
        "<html><head><title></title></head><body><nav/><p>fragment</p></body></html>"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_non_html_is_byte_identical() {
    let css = "body { color: red; }\n<title>not html</title>";
    let upstream = common::start_mock_backend(MockResponse::html(css).with_type("text/css")).await;
    let (addr, shutdown) = start_server(common::decorated_config(DECORATOR), upstream).await;

    let res = client().get(format!("http://{addr}/site.css")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), css);

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let upstream = common::start_mock_backend(
        MockResponse::html("<html><body>broken</body></html>").with_status(500),
    )
    .await;
    let (addr, shutdown) = start_server(common::decorated_config(DECORATOR), upstream).await;

    let res = client().get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "<html><body>broken</body></html>");

    shutdown.trigger();
}

#[tokio::test]
async fn test_each_request_reaches_upstream_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let upstream = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            MockResponse::html(format!("<html><body>call {n}</body></html>"))
        }
    })
    .await;
    let (addr, shutdown) = start_server(common::decorated_config(DECORATOR), upstream).await;

    let client = client();
    for i in 0..3 {
        let body = client
            .get(format!("http://{addr}/page"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.ends_with(&format!("<nav/>call {i}</body></html>")), "{body}");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Bind then drop to get a port nobody listens on.
    let dead = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (addr, shutdown) = start_server(common::decorated_config(DECORATOR), dead).await;

    let res = client().get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let upstream = common::start_mock_backend(MockResponse::html("<p>x</p>")).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = common::decorated_config(DECORATOR);
    config.upstream = Some(UpstreamConfig {
        address: upstream.to_string(),
    });

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}
