//! End-to-end checks against a mock server.
//!
//! The mock server is used as the session's HTTP proxy so request URLs can keep
//! real hostnames (`shop.example.com`) while traffic lands on localhost.

use ezreq::{Session, SessionConfig};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const BASE: &str = "http://shop.example.com";

async fn session(server: &MockServer, config: SessionConfig) -> Session {
    Session::with_config(BASE, &config.with_proxy(server.uri())).unwrap()
}

fn header_value<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers.get(name).and_then(|v| v.to_str().ok())
}

async fn received(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

#[tokio::test]
async fn get_resolves_relative_url_and_sends_referer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("referer", BASE))
        .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut s = session(&server, SessionConfig::default()).await;
    let response = s.get("/?page=rss").await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "<rss/>");
    assert_eq!(s.last_url(), "http://shop.example.com/?page=rss");

    let requests = received(&server).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), Some("page=rss"));
    assert!(header_value(&requests[0], "origin").is_none());
}

#[tokio::test]
async fn post_sends_origin_and_forwards_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cart/add"))
        .and(header("origin", BASE))
        .and(body_string("sku=42"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut s = session(&server, SessionConfig::default()).await;
    let response = s
        .post_with("/cart/add", |req| {
            req.header("content-type", "application/x-www-form-urlencoded")
                .body("sku=42")
        })
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let requests = received(&server).await;
    assert!(header_value(&requests[0], "referer").is_none());
}

#[tokio::test]
async fn caller_referer_replaces_managed_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut s = session(&server, SessionConfig::default()).await;
    s.get_with("/landing", |req| {
        req.header("referer", "https://search.example.net/?q=shop")
    })
    .await
    .unwrap();

    let requests = received(&server).await;
    let referers: Vec<_> = requests[0].headers.get_all("referer").iter().collect();
    assert_eq!(referers.len(), 1);
    assert_eq!(referers[0], "https://search.example.net/?q=shop");
}

#[tokio::test]
async fn visit_sends_neither_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut s = session(&server, SessionConfig::default()).await;
    s.get("/catalog").await.unwrap();
    s.visit("http://blog.example.org/post").await.unwrap();

    let requests = received(&server).await;
    assert_eq!(requests.len(), 2);
    let visit = &requests[1];
    assert_eq!(visit.url.path(), "/post");
    assert!(header_value(visit, "origin").is_none());
    assert!(header_value(visit, "referer").is_none());
    assert_eq!(s.base_url(), "http://blog.example.org/post");
}

#[tokio::test]
async fn navigation_chain_tracks_previous_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut s = session(&server, SessionConfig::default()).await;
    s.get("/products").await.unwrap();
    s.get("item.html").await.unwrap();
    s.post("?buy=1").await.unwrap();
    s.get("//cdn.example.net/app.js").await.unwrap();

    let requests = received(&server).await;
    assert_eq!(requests.len(), 4);

    assert_eq!(requests[1].url.path(), "/item.html");
    assert_eq!(
        header_value(&requests[1], "referer"),
        Some("http://shop.example.com/products")
    );

    assert_eq!(requests[2].url.path(), "/");
    assert_eq!(requests[2].url.query(), Some("buy=1"));
    assert_eq!(header_value(&requests[2], "origin"), Some(BASE));
    assert!(header_value(&requests[2], "referer").is_none());

    assert_eq!(
        header_value(&requests[3], "referer"),
        Some("http://shop.example.com/?buy=1")
    );
    assert_eq!(s.base_url(), "http://cdn.example.net/app.js");
}

#[tokio::test]
async fn session_headers_and_cookies_are_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "sid=abc123; Path=/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = SessionConfig::default().with_header("x-client", "ezreq-tests");
    let mut s = session(&server, config).await;
    s.post("/login").await.unwrap();
    s.get("/account").await.unwrap();

    let requests = received(&server).await;
    assert_eq!(requests.len(), 2);
    for req in &requests {
        assert_eq!(header_value(req, "x-client"), Some("ezreq-tests"));
    }
    let cookie = header_value(&requests[1], "cookie").unwrap_or_default();
    assert!(cookie.contains("sid=abc123"), "cookie header was {:?}", cookie);
}

#[tokio::test]
async fn http_errors_are_returned_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut s = session(&server, SessionConfig::default().with_max_retries(3)).await;
    let response = s.get("/busy").await.unwrap();
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn unsupported_uri_is_reported_before_sending() {
    let server = MockServer::start().await;

    let mut s = session(&server, SessionConfig::default()).await;
    let err = s.get("//[bad").await.unwrap_err();
    assert!(err.is_unsupported_uri());
    assert!(received(&server).await.is_empty());

    assert!(Session::new("/relative/start").unwrap_err().is_unsupported_uri());
}
