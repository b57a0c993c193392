//! Typed protocol messages and their wire encoding.
//!
//! Every record validates its fields on construction and derives its size
//! fields from content, so a constructed message always serializes to a
//! well-formed line.
//!
//! ```text
//! INFO <json>\r\n
//! CONNECT <json>\r\n
//! PUB <subject> [reply-to] <#payload>\r\n<payload>\r\n
//! HPUB <subject> [reply-to] <#headers> <#total>\r\n<headers>\r\n\r\n<payload>\r\n
//! SUB <subject> [queue-group] <sid>\r\n
//! UNSUB <sid> [max-msgs]\r\n
//! MSG <subject> <sid> [reply-to] <#payload>\r\n<payload>\r\n
//! HMSG <subject> <sid> [reply-to] <#headers> <#total>\r\n<headers>\r\n\r\n<payload>\r\n
//! PING\r\n  PONG\r\n  +OK\r\n  -ERR <text>\r\n
//! ```
//!
//! # Example
//!
//! ```
//! use natswire_client::protocol::{Message, Pub};
//!
//! let msg: Message = Pub::new("greet", "hello").unwrap().into();
//! assert_eq!(&msg.serialize()[..], b"PUB greet 5\r\nhello\r\n");
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::handshake::{ConnectInfo, ServerInfo};
use super::header::HeaderBag;
use super::subject::{is_valid_queue_group, is_valid_sid, is_valid_subject};
use crate::error::{NatsError, Result};

/// Line delimiter.
pub const CRLF: &[u8] = b"\r\n";

/// Bytes between the header block and the payload (`\r\n\r\n`).
pub const HEADER_DELIMITER_LEN: usize = 4;

/// Message kind, one per protocol verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Info,
    Connect,
    Pub,
    HPub,
    Sub,
    Unsub,
    Msg,
    HMsg,
    Ping,
    Pong,
    Ok,
    Err,
}

impl MessageType {
    /// Wire verb for this kind.
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Connect => "CONNECT",
            Self::Pub => "PUB",
            Self::HPub => "HPUB",
            Self::Sub => "SUB",
            Self::Unsub => "UNSUB",
            Self::Msg => "MSG",
            Self::HMsg => "HMSG",
            Self::Ping => "PING",
            Self::Pong => "PONG",
            Self::Ok => "+OK",
            Self::Err => "-ERR",
        }
    }

    /// Classify a verb token (ASCII case-insensitive).
    pub fn from_verb(token: &[u8]) -> Option<Self> {
        const ALL: [MessageType; 12] = [
            MessageType::Info,
            MessageType::Connect,
            MessageType::Pub,
            MessageType::HPub,
            MessageType::Sub,
            MessageType::Unsub,
            MessageType::Msg,
            MessageType::HMsg,
            MessageType::Ping,
            MessageType::Pong,
            MessageType::Ok,
            MessageType::Err,
        ];

        ALL.into_iter()
            .find(|kind| kind.verb().as_bytes().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

fn check_subject(subject: String) -> Result<String> {
    if is_valid_subject(&subject) {
        Ok(subject)
    } else {
        Err(NatsError::InvalidSubject(subject))
    }
}

fn check_reply_to(reply_to: String) -> Result<String> {
    if is_valid_subject(&reply_to) {
        Ok(reply_to)
    } else {
        Err(NatsError::InvalidReplyTo(reply_to))
    }
}

fn check_sid(sid: String) -> Result<String> {
    if is_valid_sid(&sid) {
        Ok(sid)
    } else {
        Err(NatsError::InvalidSid(sid))
    }
}

fn check_headers(headers: HeaderBag) -> Result<HeaderBag> {
    if headers.is_empty() {
        Err(NatsError::EmptyHeaders)
    } else {
        Ok(headers)
    }
}

/// Append `parts` joined by single spaces, then CRLF.
fn put_control_line(buf: &mut BytesMut, parts: &[&str]) {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            buf.put_u8(b' ');
        }
        buf.put_slice(part.as_bytes());
    }
    buf.put_slice(CRLF);
}

fn put_header_block(buf: &mut BytesMut, headers: &HeaderBag, payload: &[u8]) {
    buf.put_slice(headers.to_string().as_bytes());
    buf.put_slice(CRLF);
    buf.put_slice(CRLF);
    buf.put_slice(payload);
    buf.put_slice(CRLF);
}

/// Server handshake (`INFO`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    payload: String,
    server_info: ServerInfo,
}

impl Info {
    /// Parse an INFO JSON payload.
    pub fn new(payload: impl Into<String>) -> Result<Self> {
        let payload = payload.into();
        let server_info = serde_json::from_str(&payload)?;
        Ok(Self {
            payload,
            server_info,
        })
    }

    /// Build an INFO message from typed server info.
    pub fn from_server_info(server_info: ServerInfo) -> Result<Self> {
        let payload = serde_json::to_string(&server_info)?;
        Ok(Self {
            payload,
            server_info,
        })
    }

    /// Raw JSON as received.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        put_control_line(buf, &[MessageType::Info.verb(), &self.payload]);
    }
}

/// Client handshake (`CONNECT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    payload: String,
    connect_info: ConnectInfo,
}

impl Connect {
    pub fn new(connect_info: ConnectInfo) -> Result<Self> {
        let payload = serde_json::to_string(&connect_info)?;
        Ok(Self {
            payload,
            connect_info,
        })
    }

    /// Parse a CONNECT JSON payload.
    pub fn from_json(payload: impl Into<String>) -> Result<Self> {
        let payload = payload.into();
        let connect_info = serde_json::from_str(&payload)?;
        Ok(Self {
            payload,
            connect_info,
        })
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn connect_info(&self) -> &ConnectInfo {
        &self.connect_info
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        put_control_line(buf, &[MessageType::Connect.verb(), &self.payload]);
    }
}

/// Outbound publish (`PUB`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pub {
    subject: String,
    reply_to: Option<String>,
    payload: Bytes,
}

impl Pub {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Result<Self> {
        Ok(Self {
            subject: check_subject(subject.into())?,
            reply_to: None,
            payload: payload.into(),
        })
    }

    /// Set the subject a responder should answer on.
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Result<Self> {
        self.reply_to = Some(check_reply_to(reply_to.into())?);
        Ok(self)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        let size = self.payload_size().to_string();
        match &self.reply_to {
            Some(reply_to) => put_control_line(
                buf,
                &[MessageType::Pub.verb(), &self.subject, reply_to, &size],
            ),
            None => put_control_line(buf, &[MessageType::Pub.verb(), &self.subject, &size]),
        }
        buf.put_slice(&self.payload);
        buf.put_slice(CRLF);
    }
}

/// Outbound publish with headers (`HPUB`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HPub {
    subject: String,
    reply_to: Option<String>,
    headers: HeaderBag,
    payload: Bytes,
    headers_size: usize,
}

impl HPub {
    pub fn new(
        subject: impl Into<String>,
        headers: HeaderBag,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let headers = check_headers(headers)?;
        let subject = check_subject(subject.into())?;
        Ok(Self {
            headers_size: headers.encoded_len() + HEADER_DELIMITER_LEN,
            subject,
            reply_to: None,
            headers,
            payload: payload.into(),
        })
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Result<Self> {
        self.reply_to = Some(check_reply_to(reply_to.into())?);
        Ok(self)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn headers(&self) -> &HeaderBag {
        &self.headers
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    /// Header block size including the blank-line delimiter.
    pub fn headers_size(&self) -> usize {
        self.headers_size
    }

    pub fn total_size(&self) -> usize {
        self.headers_size + self.payload_size()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        let headers_size = self.headers_size.to_string();
        let total_size = self.total_size().to_string();
        let verb = MessageType::HPub.verb();
        match &self.reply_to {
            Some(reply_to) => put_control_line(
                buf,
                &[verb, &self.subject, reply_to, &headers_size, &total_size],
            ),
            None => put_control_line(buf, &[verb, &self.subject, &headers_size, &total_size]),
        }
        put_header_block(buf, &self.headers, &self.payload);
    }
}

/// Subscribe request (`SUB`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sub {
    subject: String,
    sid: String,
    queue_group: Option<String>,
}

impl Sub {
    pub fn new(subject: impl Into<String>, sid: impl Into<String>) -> Result<Self> {
        Ok(Self {
            subject: check_subject(subject.into())?,
            sid: check_sid(sid.into())?,
            queue_group: None,
        })
    }

    /// Join a queue group; the server load-balances deliveries across members.
    pub fn with_queue_group(mut self, queue_group: impl Into<String>) -> Result<Self> {
        let queue_group = queue_group.into();
        if !is_valid_queue_group(&queue_group) {
            return Err(NatsError::InvalidQueueGroup(queue_group));
        }
        self.queue_group = Some(queue_group);
        Ok(self)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn queue_group(&self) -> Option<&str> {
        self.queue_group.as_deref()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        let verb = MessageType::Sub.verb();
        match &self.queue_group {
            Some(group) => put_control_line(buf, &[verb, &self.subject, group, &self.sid]),
            None => put_control_line(buf, &[verb, &self.subject, &self.sid]),
        }
    }
}

/// Unsubscribe request (`UNSUB`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsub {
    sid: String,
    max_messages: Option<u64>,
}

impl Unsub {
    pub fn new(sid: impl Into<String>) -> Result<Self> {
        Ok(Self {
            sid: check_sid(sid.into())?,
            max_messages: None,
        })
    }

    /// Let the server auto-unsubscribe after `max` more deliveries.
    pub fn with_max_messages(mut self, max: u64) -> Result<Self> {
        if max == 0 {
            return Err(NatsError::InvalidMaxMessages(max));
        }
        self.max_messages = Some(max);
        Ok(self)
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn max_messages(&self) -> Option<u64> {
        self.max_messages
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        let verb = MessageType::Unsub.verb();
        match self.max_messages {
            Some(max) => put_control_line(buf, &[verb, &self.sid, &max.to_string()]),
            None => put_control_line(buf, &[verb, &self.sid]),
        }
    }
}

/// Inbound delivery (`MSG`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    subject: String,
    sid: String,
    reply_to: Option<String>,
    payload: Bytes,
}

impl Msg {
    pub fn new(
        subject: impl Into<String>,
        sid: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        Ok(Self {
            subject: check_subject(subject.into())?,
            sid: check_sid(sid.into())?,
            reply_to: None,
            payload: payload.into(),
        })
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Result<Self> {
        self.reply_to = Some(check_reply_to(reply_to.into())?);
        Ok(self)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        let size = self.payload_size().to_string();
        let verb = MessageType::Msg.verb();
        match &self.reply_to {
            Some(reply_to) => {
                put_control_line(buf, &[verb, &self.subject, &self.sid, reply_to, &size])
            }
            None => put_control_line(buf, &[verb, &self.subject, &self.sid, &size]),
        }
        buf.put_slice(&self.payload);
        buf.put_slice(CRLF);
    }
}

/// Inbound delivery with headers (`HMSG`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HMsg {
    subject: String,
    sid: String,
    reply_to: Option<String>,
    headers: HeaderBag,
    payload: Bytes,
    headers_size: usize,
}

impl HMsg {
    pub fn new(
        subject: impl Into<String>,
        sid: impl Into<String>,
        headers: HeaderBag,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let headers = check_headers(headers)?;
        let subject = check_subject(subject.into())?;
        let sid = check_sid(sid.into())?;
        Ok(Self {
            headers_size: headers.encoded_len() + HEADER_DELIMITER_LEN,
            subject,
            sid,
            reply_to: None,
            headers,
            payload: payload.into(),
        })
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Result<Self> {
        self.reply_to = Some(check_reply_to(reply_to.into())?);
        Ok(self)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn headers(&self) -> &HeaderBag {
        &self.headers
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    pub fn headers_size(&self) -> usize {
        self.headers_size
    }

    pub fn total_size(&self) -> usize {
        self.headers_size + self.payload_size()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        let headers_size = self.headers_size.to_string();
        let total_size = self.total_size().to_string();
        let verb = MessageType::HMsg.verb();
        match &self.reply_to {
            Some(reply_to) => put_control_line(
                buf,
                &[verb, &self.subject, &self.sid, reply_to, &headers_size, &total_size],
            ),
            None => put_control_line(
                buf,
                &[verb, &self.subject, &self.sid, &headers_size, &total_size],
            ),
        }
        put_header_block(buf, &self.headers, &self.payload);
    }
}

/// Protocol error reported by the server (`-ERR`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrMessage {
    text: String,
}

impl ErrMessage {
    pub fn new(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            text: text.replace(['\r', '\n'], "").trim().to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Any protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Info(Info),
    Connect(Connect),
    Pub(Pub),
    HPub(HPub),
    Sub(Sub),
    Unsub(Unsub),
    Msg(Msg),
    HMsg(HMsg),
    Ping,
    Pong,
    Ok,
    Err(ErrMessage),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Info(_) => MessageType::Info,
            Self::Connect(_) => MessageType::Connect,
            Self::Pub(_) => MessageType::Pub,
            Self::HPub(_) => MessageType::HPub,
            Self::Sub(_) => MessageType::Sub,
            Self::Unsub(_) => MessageType::Unsub,
            Self::Msg(_) => MessageType::Msg,
            Self::HMsg(_) => MessageType::HMsg,
            Self::Ping => MessageType::Ping,
            Self::Pong => MessageType::Pong,
            Self::Ok => MessageType::Ok,
            Self::Err(_) => MessageType::Err,
        }
    }

    /// Encode to wire bytes.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the wire encoding to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Self::Info(m) => m.encode_into(buf),
            Self::Connect(m) => m.encode_into(buf),
            Self::Pub(m) => m.encode_into(buf),
            Self::HPub(m) => m.encode_into(buf),
            Self::Sub(m) => m.encode_into(buf),
            Self::Unsub(m) => m.encode_into(buf),
            Self::Msg(m) => m.encode_into(buf),
            Self::HMsg(m) => m.encode_into(buf),
            Self::Ping | Self::Pong | Self::Ok => {
                put_control_line(buf, &[self.message_type().verb()])
            }
            Self::Err(m) => put_control_line(buf, &[MessageType::Err.verb(), &m.text]),
        }
    }

    /// Subscription id of a delivery.
    pub fn sid(&self) -> Option<&str> {
        match self {
            Self::Msg(m) => Some(m.sid()),
            Self::HMsg(m) => Some(m.sid()),
            Self::Sub(m) => Some(m.sid()),
            Self::Unsub(m) => Some(m.sid()),
            _ => None,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Pub(m) => Some(m.subject()),
            Self::HPub(m) => Some(m.subject()),
            Self::Sub(m) => Some(m.subject()),
            Self::Msg(m) => Some(m.subject()),
            Self::HMsg(m) => Some(m.subject()),
            _ => None,
        }
    }

    pub fn reply_to(&self) -> Option<&str> {
        match self {
            Self::Pub(m) => m.reply_to(),
            Self::HPub(m) => m.reply_to(),
            Self::Msg(m) => m.reply_to(),
            Self::HMsg(m) => m.reply_to(),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::Pub(m) => Some(m.payload()),
            Self::HPub(m) => Some(m.payload()),
            Self::Msg(m) => Some(m.payload()),
            Self::HMsg(m) => Some(m.payload()),
            _ => None,
        }
    }

    pub fn headers(&self) -> Option<&HeaderBag> {
        match self {
            Self::HPub(m) => Some(m.headers()),
            Self::HMsg(m) => Some(m.headers()),
            _ => None,
        }
    }

    /// PUB or HPUB.
    pub fn is_publish(&self) -> bool {
        matches!(self, Self::Pub(_) | Self::HPub(_))
    }

    /// MSG or HMSG.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Msg(_) | Self::HMsg(_))
    }
}

macro_rules! impl_from_record {
    ($($record:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$record> for Message {
                fn from(record: $record) -> Self {
                    Self::$variant(record)
                }
            }
        )*
    };
}

impl_from_record! {
    Info => Info,
    Connect => Connect,
    Pub => Pub,
    HPub => HPub,
    Sub => Sub,
    Unsub => Unsub,
    Msg => Msg,
    HMsg => HMsg,
    ErrMessage => Err,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> HeaderBag {
        let mut h = HeaderBag::new();
        h.insert("X-A", "1").unwrap();
        h
    }

    fn wire(message: impl Into<Message>) -> String {
        String::from_utf8(message.into().serialize().to_vec()).unwrap()
    }

    #[test]
    fn test_verb_lookup() {
        assert_eq!(MessageType::from_verb(b"MSG"), Some(MessageType::Msg));
        assert_eq!(MessageType::from_verb(b"hmsg"), Some(MessageType::HMsg));
        assert_eq!(MessageType::from_verb(b"+OK"), Some(MessageType::Ok));
        assert_eq!(MessageType::from_verb(b"-err"), Some(MessageType::Err));
        assert_eq!(MessageType::from_verb(b"NOPE"), None);
    }

    #[test]
    fn test_pub_encoding() {
        assert_eq!(wire(Pub::new("a.b", "hi").unwrap()), "PUB a.b 2\r\nhi\r\n");
        assert_eq!(
            wire(Pub::new("a.b", "hi").unwrap().with_reply_to("r.1").unwrap()),
            "PUB a.b r.1 2\r\nhi\r\n"
        );
        assert_eq!(wire(Pub::new("a", "").unwrap()), "PUB a 0\r\n\r\n");
    }

    #[test]
    fn test_hpub_sizes_and_encoding() {
        let msg = HPub::new("a", headers(), "hello").unwrap();

        // "NATS/1.0\r\nX-A: 1" = 16 bytes, plus "\r\n\r\n"
        assert_eq!(msg.headers_size(), 20);
        assert_eq!(msg.payload_size(), 5);
        assert_eq!(msg.total_size(), 25);
        assert_eq!(
            wire(msg),
            "HPUB a 20 25\r\nNATS/1.0\r\nX-A: 1\r\n\r\nhello\r\n"
        );
    }

    #[test]
    fn test_sub_unsub_encoding() {
        assert_eq!(wire(Sub::new("a.*", "7").unwrap()), "SUB a.* 7\r\n");
        assert_eq!(
            wire(Sub::new("a", "7").unwrap().with_queue_group("q").unwrap()),
            "SUB a q 7\r\n"
        );
        assert_eq!(wire(Unsub::new("7").unwrap()), "UNSUB 7\r\n");
        assert_eq!(
            wire(Unsub::new("7").unwrap().with_max_messages(3).unwrap()),
            "UNSUB 7 3\r\n"
        );
    }

    #[test]
    fn test_msg_hmsg_encoding() {
        assert_eq!(wire(Msg::new("a", "1", "x").unwrap()), "MSG a 1 1\r\nx\r\n");
        assert_eq!(
            wire(Msg::new("a", "1", "x").unwrap().with_reply_to("b").unwrap()),
            "MSG a 1 b 1\r\nx\r\n"
        );
        assert_eq!(
            wire(HMsg::new("a", "1", headers(), "").unwrap().with_reply_to("b").unwrap()),
            "HMSG a 1 b 20 20\r\nNATS/1.0\r\nX-A: 1\r\n\r\n\r\n"
        );
    }

    #[test]
    fn test_simple_encoding() {
        assert_eq!(wire(Message::Ping), "PING\r\n");
        assert_eq!(wire(Message::Pong), "PONG\r\n");
        assert_eq!(wire(Message::Ok), "+OK\r\n");
        assert_eq!(
            wire(ErrMessage::new("'Unknown Protocol Operation'")),
            "-ERR 'Unknown Protocol Operation'\r\n"
        );
    }

    #[test]
    fn test_connect_encoding() {
        let connect = Connect::new(ConnectInfo::new("rust", "1.0.0")).unwrap();
        assert_eq!(
            wire(connect),
            "CONNECT {\"verbose\":false,\"pedantic\":false,\"tls_required\":false,\"lang\":\"rust\",\"version\":\"1.0.0\"}\r\n"
        );
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            Pub::new("a..b", ""),
            Err(NatsError::InvalidSubject(s)) if s == "a..b"
        ));
        assert!(matches!(
            Pub::new("a", "").unwrap().with_reply_to("r*"),
            Err(NatsError::InvalidReplyTo(s)) if s == "r*"
        ));
        assert!(matches!(
            Msg::new("a", "s 1", ""),
            Err(NatsError::InvalidSid(s)) if s == "s 1"
        ));
        assert!(matches!(
            Sub::new("a", "1").unwrap().with_queue_group("q.1"),
            Err(NatsError::InvalidQueueGroup(_))
        ));
        assert!(matches!(
            Unsub::new("1").unwrap().with_max_messages(0),
            Err(NatsError::InvalidMaxMessages(0))
        ));
        assert!(matches!(
            HPub::new("a", HeaderBag::new(), ""),
            Err(NatsError::EmptyHeaders)
        ));
        assert!(matches!(
            HMsg::new("a", "1", HeaderBag::new(), ""),
            Err(NatsError::EmptyHeaders)
        ));
    }

    #[test]
    fn test_info_requires_fields() {
        assert!(matches!(Info::new("{}"), Err(NatsError::Json(_))));
        assert!(matches!(Info::new("not json"), Err(NatsError::Json(_))));
    }

    #[test]
    fn test_accessors() {
        let message: Message = Msg::new("a", "9", "p").unwrap().with_reply_to("r").unwrap().into();

        assert_eq!(message.message_type(), MessageType::Msg);
        assert_eq!(message.sid(), Some("9"));
        assert_eq!(message.subject(), Some("a"));
        assert_eq!(message.reply_to(), Some("r"));
        assert_eq!(message.payload().map(|p| &p[..]), Some(&b"p"[..]));
        assert!(message.is_delivery());
        assert!(!message.is_publish());
        assert_eq!(Message::Ping.sid(), None);
    }
}
