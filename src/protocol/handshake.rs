//! INFO / CONNECT handshake payloads.
//!
//! The server opens every connection with `INFO <json>`; the client answers
//! with `CONNECT <json>`. Both payloads are plain JSON objects, mapped here
//! with serde. Optional fields that are absent stay `None` and are omitted
//! again when serializing.

use serde::{Deserialize, Serialize};

/// Language tag sent in CONNECT.
pub const CLIENT_LANG: &str = "rust";

/// Crate version sent in CONNECT.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server capabilities announced in INFO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Unique identifier of the server.
    pub server_id: String,
    /// Name of the server.
    pub server_name: String,
    /// Server version.
    pub version: String,
    /// Host the server listens on.
    pub host: String,
    /// Port the server listens on.
    pub port: u16,
    /// Maximum payload size the server accepts.
    pub max_payload: u64,
    /// Protocol version.
    pub proto: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_connect_urls: Option<Vec<String>>,
    /// Lame duck mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jetstream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Nonce to sign in CONNECT when using nkeys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xkey: Option<String>,
}

impl ServerInfo {
    /// Server info with the required fields set and every optional one absent.
    pub fn new(
        server_id: impl Into<String>,
        server_name: impl Into<String>,
        version: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        max_payload: u64,
        proto: i32,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            server_name: server_name.into(),
            version: version.into(),
            host: host.into(),
            port,
            max_payload,
            proto,
            go: None,
            headers: None,
            client_id: None,
            auth_required: None,
            tls_required: None,
            tls_verify: None,
            tls_available: None,
            connect_urls: None,
            ws_connect_urls: None,
            ldm: None,
            git_commit: None,
            jetstream: None,
            ip: None,
            client_ip: None,
            nonce: None,
            cluster: None,
            domain: None,
            xkey: None,
        }
    }
}

/// Client options sent in CONNECT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectInfo {
    /// Turns on `+OK` acknowledgements.
    pub verbose: bool,
    /// Turns on strict subject checking on the server.
    pub pedantic: bool,
    /// Whether the client requires TLS.
    pub tls_required: bool,
    /// Implementation language of the client.
    pub lang: String,
    /// Version of the client.
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    /// Client name shown in server monitoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 1 = client accepts async INFO updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<i32>,
    /// `false` stops the server echoing our own publishes back to us.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,
    /// Signed server nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_responders: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nkey: Option<String>,
}

impl ConnectInfo {
    /// Connect options with every optional field absent.
    pub fn new(lang: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            verbose: false,
            pedantic: false,
            tls_required: false,
            lang: lang.into(),
            version: version.into(),
            auth_token: None,
            user: None,
            pass: None,
            name: None,
            protocol: None,
            echo: None,
            sig: None,
            jwt: None,
            no_responders: None,
            headers: None,
            nkey: None,
        }
    }
}

/// This client's options: header support and no-responders statuses enabled.
impl Default for ConnectInfo {
    fn default() -> Self {
        Self {
            headers: Some(true),
            no_responders: Some(true),
            ..Self::new(CLIENT_LANG, CLIENT_VERSION)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_INFO: &str = r#"{"server_id":"NABGLAPI2AJEVYIPG54HIEUXZ5O7PEM5ZV5RFAJAECKG6T4BUPMWXLHY","server_name":"us-south-nats-demo","version":"2.10.20","proto":1,"git_commit":"7140387","go":"go1.22.6","host":"0.0.0.0","port":4222,"headers":true,"tls_available":true,"max_payload":1048576,"jetstream":true,"client_id":450394,"client_ip":"94.67.65.87","nonce":"FP8SuWGPDUB73U4","xkey":"XBERSHAJDGJM3KTAXZEFG7FNJ45ABPXF5IS2OHOKS3FHXADSY65XEQIV"}"#;

    #[test]
    fn test_parse_server_info() {
        let info: ServerInfo = serde_json::from_str(SAMPLE_INFO).unwrap();

        assert_eq!(info.server_name, "us-south-nats-demo");
        assert_eq!(info.port, 4222);
        assert_eq!(info.max_payload, 1_048_576);
        assert_eq!(info.proto, 1);
        assert_eq!(info.client_id, Some(450394));
        assert_eq!(info.jetstream, Some(true));
        assert_eq!(info.nonce.as_deref(), Some("FP8SuWGPDUB73U4"));
        assert_eq!(info.tls_required, None);
        assert_eq!(info.connect_urls, None);
    }

    #[test]
    fn test_server_info_missing_required_field() {
        let result = serde_json::from_str::<ServerInfo>(r#"{"server_id":"x","version":"2"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_info_ignores_unknown_fields() {
        let json = r#"{"server_id":"a","server_name":"b","version":"c","host":"h","port":1,"max_payload":2,"proto":1,"brand_new":42}"#;
        let info: ServerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info, ServerInfo::new("a", "b", "c", "h", 1, 2, 1));
    }

    #[test]
    fn test_connect_info_omits_absent_fields() {
        let info = ConnectInfo::new(CLIENT_LANG, CLIENT_VERSION);
        let json = serde_json::to_string(&info).unwrap();

        assert_eq!(
            json,
            format!(
                r#"{{"verbose":false,"pedantic":false,"tls_required":false,"lang":"rust","version":"{}"}}"#,
                CLIENT_VERSION
            )
        );
    }

    #[test]
    fn test_default_connect_info_declares_headers() {
        let json = serde_json::to_value(ConnectInfo::default()).unwrap();

        assert_eq!(json["headers"], true);
        assert_eq!(json["no_responders"], true);
        assert_eq!(json["lang"], "rust");
    }

    #[test]
    fn test_connect_info_with_credentials() {
        let mut info = ConnectInfo::default();
        info.user = Some("alice".into());
        info.pass = Some("secret".into());
        info.echo = Some(false);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["user"], "alice");
        assert_eq!(json["pass"], "secret");
        assert_eq!(json["echo"], false);
        assert!(json.get("jwt").is_none());
    }
}
