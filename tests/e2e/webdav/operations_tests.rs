use fast_webdav_client::{Config, Error, RequestOption, TransportCode, WebDavClient};
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::util::{client_for, multistatus};

#[tokio::test]
async fn test_list_over_the_wire() {
    let server = MockServer::start().await;
    let body = multistatus(&[
        ("/dav/docs/", "<d:resourcetype><d:collection/></d:resourcetype>"),
        (
            "/dav/docs/a%20b.txt",
            "<d:getcontentlength>11</d:getcontentlength><d:resourcetype/>",
        ),
    ]);
    Mock::given(method("PROPFIND"))
        .and(path("/dav/docs/"))
        .and(header("Depth", "1"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(207).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let entries = client.list("/docs/").await.expect("listing should succeed");

    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_collection());
    assert_eq!(entries[1].href, "/dav/docs/a b.txt");
    assert_eq!(entries[1].size, Some(11));
}

#[tokio::test]
async fn test_info_and_is_directory() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/dav/photos"))
        .and(header("Depth", "0"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[(
            "/dav/photos/",
            "<d:displayname>photos</d:displayname><d:resourcetype><d:collection/></d:resourcetype>",
        )])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let info = client.info("/photos").await.expect("info should match");
    assert_eq!(info.display_name.as_deref(), Some("photos"));
    assert!(client.is_directory("/photos").await);
    assert!(client.info("/unknown").await.is_none());
}

#[tokio::test]
async fn test_mkdir_recursive_over_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/dav/"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[])))
        .mount(&server)
        .await;
    Mock::given(method("MKCOL"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.mkdir("/a/b", true).await);

    let mkcols: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "MKCOL")
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(mkcols, vec!["/dav/a/", "/dav/a/b/"]);
}

#[tokio::test]
async fn test_move_sends_destination() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/dav/old%20name.txt"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[])))
        .mount(&server)
        .await;
    Mock::given(method("MOVE"))
        .and(path("/dav/old%20name.txt"))
        .and(header("Destination", "/dav/new%20name.txt"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.r#move("old name.txt", "new name.txt").await);
}

#[tokio::test]
async fn test_delete_missing_sends_no_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.delete("/ghost.txt").await);
}

#[tokio::test]
async fn test_free_size_over_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/dav/"))
        .and(header("Depth", "0"))
        .and(header("Content-Type", "text/xml"))
        .and(body_string_contains("quota-available-bytes"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[(
            "/dav/",
            "<d:quota-available-bytes>987654321</d:quota-available-bytes>",
        )])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.free_size().await, 987654321);
}

#[tokio::test]
async fn test_http_error_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dav/secret.txt"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let target = client.resolve("/secret.txt");
    let mut request = client.request();
    request.configure(RequestOption::Url(client.url_for(&target)));
    let outcome = request.execute().await;

    assert_eq!(outcome.http_status, 403);
    assert_eq!(outcome.into_result(), Err(Error::Http { code: 403 }));
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let config = Config {
        webdav_hostname: "http://127.0.0.1:1".into(),
        webdav_root: "/dav/".into(),
        ..Config::default()
    };
    let client = WebDavClient::new(config).unwrap();

    assert!(!client.check("/anything").await);

    let target = client.resolve("/anything");
    let mut request = client.request();
    request.configure(RequestOption::Url(client.url_for(&target)));
    let outcome = request.execute().await;
    assert_eq!(outcome.transport, TransportCode::Connect);
    assert_eq!(
        outcome.to_error(),
        Some(Error::Transport {
            code: TransportCode::Connect
        })
    );
}
