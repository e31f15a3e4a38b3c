use fast_webdav_client::{Config, WebDavClient};
use wiremock::MockServer;

pub fn config_for(server: &MockServer) -> Config {
    Config {
        webdav_hostname: server.uri(),
        webdav_root: "/dav/".into(),
        webdav_username: "user".into(),
        webdav_password: "pass".into(),
        ..Config::default()
    }
}

pub fn client_for(server: &MockServer) -> WebDavClient {
    WebDavClient::new(config_for(server)).expect("client should build")
}

pub fn multistatus(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><d:multistatus xmlns:d="DAV:">"#);
    for (href, props) in entries {
        xml.push_str(&format!(
            "<d:response><d:href>{href}</d:href><d:propstat><d:prop>{props}</d:prop>\
             <d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>"
        ));
    }
    xml.push_str("</d:multistatus>");
    xml
}
