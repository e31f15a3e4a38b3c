use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use hyper::header::HeaderValue;
use serde::Deserialize;

/// Recognized configuration keys, in the order [`Config::options`] reports them.
pub const OPTION_KEYS: [&str; 9] = [
    "webdav_hostname",
    "webdav_root",
    "webdav_username",
    "webdav_password",
    "proxy_hostname",
    "proxy_username",
    "proxy_password",
    "cert_path",
    "key_path",
];

/// Connection settings of a [`WebDavClient`](crate::WebDavClient).
///
/// Missing values are empty strings. Once handed to a client the configuration is
/// shared read-only between all of its operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheme, host and optional port, e.g. `https://dav.example.com`.
    pub webdav_hostname: String,
    /// Path prefix prepended to every remote path.
    pub webdav_root: String,
    pub webdav_username: String,
    pub webdav_password: String,
    pub proxy_hostname: String,
    pub proxy_username: String,
    pub proxy_password: String,
    /// PEM client certificate chain.
    pub cert_path: String,
    /// PEM private key; when empty the key is read from `cert_path`.
    pub key_path: String,
}

impl Config {
    /// Build a configuration from key/value pairs. Unknown keys are ignored.
    pub fn from_options<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Config::default();
        for (key, value) in options {
            if let Some(slot) = config.slot_mut(key.as_ref()) {
                *slot = value.into();
            }
        }
        config
    }

    /// Read `WEBDAV_HOSTNAME`, `WEBDAV_ROOT`, ... `KEY_PATH` from the environment.
    pub fn from_env() -> Self {
        Self::from_options(OPTION_KEYS.iter().filter_map(|key| {
            std::env::var(key.to_ascii_uppercase())
                .ok()
                .map(|value| (*key, value))
        }))
    }

    /// All recognized keys with their current values.
    pub fn options(&self) -> BTreeMap<&'static str, String> {
        OPTION_KEYS
            .iter()
            .map(|key| (*key, self.value(key).to_owned()))
            .collect()
    }

    pub fn proxy_enabled(&self) -> bool {
        !self.proxy_hostname.is_empty()
    }

    pub fn cert_required(&self) -> bool {
        !self.cert_path.is_empty()
    }

    /// `Authorization` value for the server, when a username is configured.
    pub fn basic_auth(&self) -> Option<HeaderValue> {
        basic_auth_value(&self.webdav_username, &self.webdav_password)
    }

    /// `Proxy-Authorization` value, when a proxy username is configured.
    pub fn proxy_auth(&self) -> Option<HeaderValue> {
        basic_auth_value(&self.proxy_username, &self.proxy_password)
    }

    fn value(&self, key: &str) -> &str {
        match key {
            "webdav_hostname" => &self.webdav_hostname,
            "webdav_root" => &self.webdav_root,
            "webdav_username" => &self.webdav_username,
            "webdav_password" => &self.webdav_password,
            "proxy_hostname" => &self.proxy_hostname,
            "proxy_username" => &self.proxy_username,
            "proxy_password" => &self.proxy_password,
            "cert_path" => &self.cert_path,
            "key_path" => &self.key_path,
            _ => "",
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut String> {
        Some(match key {
            "webdav_hostname" => &mut self.webdav_hostname,
            "webdav_root" => &mut self.webdav_root,
            "webdav_username" => &mut self.webdav_username,
            "webdav_password" => &mut self.webdav_password,
            "proxy_hostname" => &mut self.proxy_hostname,
            "proxy_username" => &mut self.proxy_username,
            "proxy_password" => &mut self.proxy_password,
            "cert_path" => &mut self.cert_path,
            "key_path" => &mut self.key_path,
            _ => return None,
        })
    }
}

fn basic_auth_value(user: &str, pass: &str) -> Option<HeaderValue> {
    if user.is_empty() {
        return None;
    }
    let token = format!("{}:{}", user, pass);
    HeaderValue::from_str(&format!("Basic {}", B64.encode(token))).ok()
}
