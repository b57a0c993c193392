//! Incremental protocol parser.
//!
//! Bytes are pushed in arbitrary chunks; the parser keeps only the
//! unconsumed remainder and a state tag between pushes:
//! - `AwaitVerb`: need a verb token terminated by space, tab or CR
//! - `AwaitMetadataLine`: verb known, need the rest of the control line
//! - `AwaitPayload`: control line parsed, need N body bytes
//! - `AwaitTrailingCrlf`: body read, need the 2 closing bytes
//!
//! Any parse failure closes the parser; it never resynchronizes mid-stream.
//!
//! # Example
//!
//! ```
//! use natswire_client::protocol::{Message, ProtocolParser};
//!
//! let mut parser = ProtocolParser::new();
//!
//! // A chunk may end anywhere, even inside a verb
//! assert!(parser.push(b"PI").unwrap().is_empty());
//! let messages = parser.push(b"NG\r\nMSG greet 1 5\r\nhello\r\n").unwrap();
//!
//! assert_eq!(messages.len(), 2);
//! assert_eq!(messages[0], Message::Ping);
//! ```

use bytes::{Buf, Bytes, BytesMut};

use super::header::HeaderBag;
use super::message::{
    Connect, ErrMessage, HMsg, HPub, Info, Message, MessageType, Msg, Pub, Sub, Unsub, CRLF,
};
use crate::error::{NatsError, Result};

/// Longest verb (`CONNECT`); a longer undelimited token cannot be valid.
const MAX_VERB_LEN: usize = 7;

/// Control line parsed, body still to read.
#[derive(Debug)]
enum Pending {
    Pub {
        subject: String,
        reply_to: Option<String>,
        payload_size: usize,
    },
    HPub {
        subject: String,
        reply_to: Option<String>,
        header_size: usize,
        total_size: usize,
    },
    Msg {
        subject: String,
        sid: String,
        reply_to: Option<String>,
        payload_size: usize,
    },
    HMsg {
        subject: String,
        sid: String,
        reply_to: Option<String>,
        header_size: usize,
        total_size: usize,
    },
}

impl Pending {
    fn body_len(&self) -> usize {
        match self {
            Self::Pub { payload_size, .. } | Self::Msg { payload_size, .. } => *payload_size,
            Self::HPub { total_size, .. } | Self::HMsg { total_size, .. } => *total_size,
        }
    }

    fn into_message(self, body: Bytes) -> Result<Message> {
        let message = match self {
            Self::Pub {
                subject, reply_to, ..
            } => {
                let mut record = Pub::new(subject, body)?;
                if let Some(reply_to) = reply_to {
                    record = record.with_reply_to(reply_to)?;
                }
                record.into()
            }
            Self::HPub {
                subject,
                reply_to,
                header_size,
                ..
            } => {
                let (headers, payload) = split_header_block(&body, header_size);
                let mut record = HPub::new(subject, headers, payload)?;
                if let Some(reply_to) = reply_to {
                    record = record.with_reply_to(reply_to)?;
                }
                record.into()
            }
            Self::Msg {
                subject,
                sid,
                reply_to,
                ..
            } => {
                let mut record = Msg::new(subject, sid, body)?;
                if let Some(reply_to) = reply_to {
                    record = record.with_reply_to(reply_to)?;
                }
                record.into()
            }
            Self::HMsg {
                subject,
                sid,
                reply_to,
                header_size,
                ..
            } => {
                let (headers, payload) = split_header_block(&body, header_size);
                let mut record = HMsg::new(subject, sid, headers, payload)?;
                if let Some(reply_to) = reply_to {
                    record = record.with_reply_to(reply_to)?;
                }
                record.into()
            }
        };
        Ok(message)
    }
}

fn split_header_block(body: &Bytes, header_size: usize) -> (HeaderBag, Bytes) {
    let headers = HeaderBag::parse(&body[..header_size]);
    (headers, body.slice(header_size..))
}

/// Result of reading one control line.
enum Metadata {
    /// The line alone forms the message.
    Complete(Message),
    /// A body follows.
    Body(Pending),
}

/// State machine for message parsing.
#[derive(Debug)]
enum State {
    AwaitVerb,
    AwaitMetadataLine { kind: MessageType },
    AwaitPayload { pending: Pending },
    AwaitTrailingCrlf { message: Message },
    /// Cancelled or failed; every further push is rejected.
    Closed,
}

/// Chunk-agnostic parser turning a byte stream into [`Message`]s.
pub struct ProtocolParser {
    /// Bytes received but not yet consumed.
    buffer: BytesMut,
    state: State,
}

impl ProtocolParser {
    /// Create a parser waiting for the first verb.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::AwaitVerb,
        }
    }

    /// Push a chunk and collect every message it completes.
    ///
    /// # Errors
    ///
    /// Fails on an unknown verb, a control line with the wrong number of
    /// fields, a bad size field or an invalid field value. The parser is
    /// closed afterwards and later pushes fail with `ParserClosed`.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        self.push_with(data, |message| messages.push(message))?;
        Ok(messages)
    }

    /// Push a chunk, invoking `on_message` for each completed message in
    /// wire order.
    ///
    /// Messages completed before a parse failure are still delivered.
    pub fn push_with<F>(&mut self, data: &[u8], mut on_message: F) -> Result<()>
    where
        F: FnMut(Message),
    {
        self.extend(data)?;
        while let Some(message) = self.try_extract()? {
            on_message(message);
        }
        Ok(())
    }

    /// Buffer a chunk without parsing it.
    pub fn extend(&mut self, data: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(NatsError::ParserClosed);
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Parse the next complete message out of the buffered bytes.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Lets a caller hand
    /// messages on one at a time instead of materializing a whole chunk.
    pub fn try_extract(&mut self) -> Result<Option<Message>> {
        match self.try_extract_one() {
            Err(e) => {
                self.close();
                Err(e)
            }
            ok => ok,
        }
    }

    /// Abort any in-flight message without emitting it.
    pub fn cancel(&mut self) {
        self.close();
    }

    /// Whether the parser was cancelled or hit a parse failure.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Number of buffered, unconsumed bytes.
    #[inline]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn close(&mut self) {
        self.buffer.clear();
        self.state = State::Closed;
    }

    /// Advance the state machine as far as the buffer allows.
    ///
    /// The state is `Closed` while a step runs, so an early `?` return
    /// leaves the parser closed.
    fn try_extract_one(&mut self) -> Result<Option<Message>> {
        loop {
            match std::mem::replace(&mut self.state, State::Closed) {
                State::AwaitVerb => {
                    let Some(kind) = self.take_verb()? else {
                        self.state = State::AwaitVerb;
                        return Ok(None);
                    };
                    self.state = State::AwaitMetadataLine { kind };
                }

                State::AwaitMetadataLine { kind } => {
                    let Some(line) = self.take_line() else {
                        self.state = State::AwaitMetadataLine { kind };
                        return Ok(None);
                    };
                    match parse_metadata(kind, &line)? {
                        Metadata::Complete(message) => {
                            self.state = State::AwaitVerb;
                            return Ok(Some(message));
                        }
                        Metadata::Body(pending) => {
                            self.state = State::AwaitPayload { pending };
                        }
                    }
                }

                State::AwaitPayload { pending } => {
                    let len = pending.body_len();
                    if self.buffer.len() < len {
                        self.state = State::AwaitPayload { pending };
                        return Ok(None);
                    }
                    let body = self.buffer.split_to(len).freeze();
                    let message = pending.into_message(body)?;
                    self.state = State::AwaitTrailingCrlf { message };
                }

                State::AwaitTrailingCrlf { message } => {
                    if self.buffer.len() < CRLF.len() {
                        self.state = State::AwaitTrailingCrlf { message };
                        return Ok(None);
                    }
                    self.buffer.advance(CRLF.len());
                    self.state = State::AwaitVerb;
                    return Ok(Some(message));
                }

                State::Closed => return Err(NatsError::ParserClosed),
            }
        }
    }

    /// Consume a delimited verb token, leaving the delimiter in place.
    fn take_verb(&mut self) -> Result<Option<MessageType>> {
        let leading = self
            .buffer
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .count();
        self.buffer.advance(leading);

        let Some(end) = self
            .buffer
            .iter()
            .position(|b| matches!(b, b' ' | b'\t' | b'\r'))
        else {
            if self.buffer.len() > MAX_VERB_LEN {
                let token = String::from_utf8_lossy(&self.buffer).into_owned();
                return Err(NatsError::UnknownMessageType(token));
            }
            return Ok(None);
        };

        let token = self.buffer.split_to(end);
        MessageType::from_verb(&token)
            .map(Some)
            .ok_or_else(|| NatsError::UnknownMessageType(String::from_utf8_lossy(&token).into_owned()))
    }

    /// Consume up to and including the next CRLF, returning the line without it.
    fn take_line(&mut self) -> Option<String> {
        let end = self.buffer.windows(2).position(|w| w == CRLF)?;
        let line = self.buffer.split_to(end);
        self.buffer.advance(CRLF.len());
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

impl Default for ProtocolParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_size(kind: MessageType, token: &str) -> Result<usize> {
    token.parse().map_err(|_| NatsError::InvalidSize {
        kind,
        value: token.to_string(),
    })
}

fn header_sizes(kind: MessageType, header: &str, total: &str) -> Result<(usize, usize)> {
    let header_size = parse_size(kind, header)?;
    let total_size = parse_size(kind, total)?;
    if header_size > total_size {
        return Err(NatsError::MalformedMessage(kind));
    }
    Ok((header_size, total_size))
}

fn parse_metadata(kind: MessageType, line: &str) -> Result<Metadata> {
    let rest = line.trim();
    let fields: Vec<&str> = rest.split_ascii_whitespace().collect();

    let metadata = match (kind, fields.as_slice()) {
        (MessageType::Info, _) => Metadata::Complete(Info::new(rest)?.into()),
        (MessageType::Connect, _) => Metadata::Complete(Connect::from_json(rest)?.into()),
        (MessageType::Err, _) => Metadata::Complete(ErrMessage::new(rest).into()),
        (MessageType::Ping, _) => Metadata::Complete(Message::Ping),
        (MessageType::Pong, _) => Metadata::Complete(Message::Pong),
        (MessageType::Ok, _) => Metadata::Complete(Message::Ok),

        (MessageType::Pub, [subject, size]) => Metadata::Body(Pending::Pub {
            subject: subject.to_string(),
            reply_to: None,
            payload_size: parse_size(kind, size)?,
        }),
        (MessageType::Pub, [subject, reply_to, size]) => Metadata::Body(Pending::Pub {
            subject: subject.to_string(),
            reply_to: Some(reply_to.to_string()),
            payload_size: parse_size(kind, size)?,
        }),

        (MessageType::HPub, [subject, header, total]) => {
            let (header_size, total_size) = header_sizes(kind, header, total)?;
            Metadata::Body(Pending::HPub {
                subject: subject.to_string(),
                reply_to: None,
                header_size,
                total_size,
            })
        }
        (MessageType::HPub, [subject, reply_to, header, total]) => {
            let (header_size, total_size) = header_sizes(kind, header, total)?;
            Metadata::Body(Pending::HPub {
                subject: subject.to_string(),
                reply_to: Some(reply_to.to_string()),
                header_size,
                total_size,
            })
        }

        (MessageType::Sub, [subject, sid]) => Metadata::Complete(Sub::new(*subject, *sid)?.into()),
        (MessageType::Sub, [subject, queue_group, sid]) => Metadata::Complete(
            Sub::new(*subject, *sid)?
                .with_queue_group(*queue_group)?
                .into(),
        ),

        (MessageType::Unsub, [sid]) => Metadata::Complete(Unsub::new(*sid)?.into()),
        (MessageType::Unsub, [sid, max]) => {
            let max = max.parse::<u64>().map_err(|_| NatsError::InvalidSize {
                kind,
                value: max.to_string(),
            })?;
            Metadata::Complete(Unsub::new(*sid)?.with_max_messages(max)?.into())
        }

        (MessageType::Msg, [subject, sid, size]) => Metadata::Body(Pending::Msg {
            subject: subject.to_string(),
            sid: sid.to_string(),
            reply_to: None,
            payload_size: parse_size(kind, size)?,
        }),
        (MessageType::Msg, [subject, sid, reply_to, size]) => Metadata::Body(Pending::Msg {
            subject: subject.to_string(),
            sid: sid.to_string(),
            reply_to: Some(reply_to.to_string()),
            payload_size: parse_size(kind, size)?,
        }),

        (MessageType::HMsg, [subject, sid, header, total]) => {
            let (header_size, total_size) = header_sizes(kind, header, total)?;
            Metadata::Body(Pending::HMsg {
                subject: subject.to_string(),
                sid: sid.to_string(),
                reply_to: None,
                header_size,
                total_size,
            })
        }
        (MessageType::HMsg, [subject, sid, reply_to, header, total]) => {
            let (header_size, total_size) = header_sizes(kind, header, total)?;
            Metadata::Body(Pending::HMsg {
                subject: subject.to_string(),
                sid: sid.to_string(),
                reply_to: Some(reply_to.to_string()),
                header_size,
                total_size,
            })
        }

        _ => return Err(NatsError::MalformedMessage(kind)),
    };

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ConnectInfo, ServerInfo};

    fn headers() -> HeaderBag {
        let mut h = HeaderBag::new();
        h.insert("X-A", "1").unwrap();
        h.insert_all("X-B", ["2", "3"]).unwrap();
        h
    }

    /// One message of every kind, with and without optional fields.
    fn samples() -> Vec<Message> {
        vec![
            Info::from_server_info(ServerInfo::new("id", "srv", "2.10.0", "0.0.0.0", 4222, 1024, 1))
                .unwrap()
                .into(),
            Connect::new(ConnectInfo::default()).unwrap().into(),
            Pub::new("a.b", "hello").unwrap().into(),
            Pub::new("a.b", "").unwrap().with_reply_to("r.1").unwrap().into(),
            HPub::new("a", headers(), "payload").unwrap().into(),
            HPub::new("a", headers(), "").unwrap().with_reply_to("r").unwrap().into(),
            Sub::new("a.*", "sid1").unwrap().into(),
            Sub::new("a.>", "sid2").unwrap().with_queue_group("q").unwrap().into(),
            Unsub::new("sid1").unwrap().into(),
            Unsub::new("sid1").unwrap().with_max_messages(5).unwrap().into(),
            Msg::new("a", "1", "x\r\ny").unwrap().into(),
            Msg::new("a", "1", "").unwrap().with_reply_to("_INBOX.z").unwrap().into(),
            HMsg::new("a", "1", headers(), "data").unwrap().into(),
            HMsg::new("a", "1", headers(), "data").unwrap().with_reply_to("b").unwrap().into(),
            Message::Ping,
            Message::Pong,
            Message::Ok,
            ErrMessage::new("'Authorization Violation'").into(),
        ]
    }

    fn parse_one(bytes: &[u8]) -> Message {
        let mut messages = ProtocolParser::new().push(bytes).unwrap();
        assert_eq!(messages.len(), 1, "expected one message from {bytes:?}");
        messages.remove(0)
    }

    #[test]
    fn test_round_trip_every_kind() {
        for message in samples() {
            let parsed = parse_one(&message.serialize());
            assert_eq!(parsed, message);
        }
    }

    #[test]
    fn test_round_trip_keeps_derived_sizes() {
        let message = HMsg::new("a", "1", headers(), "data").unwrap();
        let Message::HMsg(parsed) = parse_one(&Message::from(message.clone()).serialize()) else {
            panic!("expected HMSG");
        };

        assert_eq!(parsed.headers_size(), message.headers_size());
        assert_eq!(parsed.total_size(), message.total_size());
        assert_eq!(parsed.headers().get_all("X-B").unwrap(), ["2", "3"]);
    }

    #[test]
    fn test_every_split_point() {
        for message in samples() {
            let bytes = message.serialize();
            for cut in 1..bytes.len() {
                let mut parser = ProtocolParser::new();
                let mut parsed = parser.push(&bytes[..cut]).unwrap();
                parsed.extend(parser.push(&bytes[cut..]).unwrap());

                assert_eq!(parsed, vec![message.clone()], "split at {cut}");
                assert_eq!(parser.buffered_len(), 0);
            }
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let stream: Vec<u8> = samples().iter().flat_map(|m| m.serialize().to_vec()).collect();
        let mut parser = ProtocolParser::new();
        let mut parsed = Vec::new();

        for byte in &stream {
            parsed.extend(parser.push(std::slice::from_ref(byte)).unwrap());
        }

        assert_eq!(parsed, samples());
    }

    #[test]
    fn test_many_messages_in_one_push() {
        let messages = ProtocolParser::new()
            .push(b"PING\r\nPONG\r\n+OK\r\nMSG a 1 2\r\nhi\r\n")
            .unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].payload().map(|p| &p[..]), Some(&b"hi"[..]));
    }

    #[test]
    fn test_irregular_whitespace_and_case() {
        let message = parse_one(b"msg   greet\t 7  _INBOX.r   5\r\nhello\r\n");
        let expected: Message = Msg::new("greet", "7", "hello")
            .unwrap()
            .with_reply_to("_INBOX.r")
            .unwrap()
            .into();
        assert_eq!(message, expected);

        assert_eq!(parse_one(b"ping\r\n"), Message::Ping);
        assert_eq!(parse_one(b"\r\n  PONG\r\n"), Message::Pong);
    }

    #[test]
    fn test_payload_may_contain_crlf() {
        let message = parse_one(b"MSG a 1 6\r\n\r\nPING\r\n");
        assert_eq!(message.payload().map(|p| &p[..]), Some(&b"\r\nPING"[..]));
    }

    #[test]
    fn test_callback_form() {
        let mut parser = ProtocolParser::new();
        let mut seen = Vec::new();

        parser
            .push_with(b"PING\r\n-ERR 'Stale Connection'\r\n", |m| seen.push(m))
            .unwrap();

        assert_eq!(seen[0], Message::Ping);
        let Message::Err(err) = &seen[1] else {
            panic!("expected -ERR");
        };
        assert_eq!(err.text(), "'Stale Connection'");
    }

    #[test]
    fn test_hmsg_with_status_only() {
        let message = parse_one(b"HMSG _INBOX.x 1 16 16\r\nNATS/1.0 503\r\n\r\n\r\n");
        let headers = message.headers().unwrap();

        assert_eq!(headers.status_code(), Some(503));
        assert!(message.payload().unwrap().is_empty());
    }

    #[test]
    fn test_lenient_header_block() {
        let block = "NATS/1.0\r\nX-A: 1\r\ngarbage\r\n\r\n";
        let wire = format!("HMSG a 1 {} {}\r\n{}ok\r\n", block.len(), block.len() + 2, block);
        let message = parse_one(wire.as_bytes());

        let headers = message.headers().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-A"), Some("1"));
        assert_eq!(message.payload().map(|p| &p[..]), Some(&b"ok"[..]));
    }

    #[test]
    fn test_unknown_verb() {
        let err = ProtocolParser::new().push(b"HELLO world\r\n").unwrap_err();
        assert!(matches!(err, NatsError::UnknownMessageType(ref t) if t == "HELLO"));

        let err = ProtocolParser::new().push(b"GARBAGEWITHOUTDELIMITER").unwrap_err();
        assert!(matches!(err, NatsError::UnknownMessageType(_)));
    }

    #[test]
    fn test_wrong_arity() {
        for (wire, kind) in [
            (&b"MSG a 5\r\n"[..], MessageType::Msg),
            (&b"MSG a 1 b c 5\r\n"[..], MessageType::Msg),
            (&b"PUB a\r\n"[..], MessageType::Pub),
            (&b"HMSG a 1 5\r\n"[..], MessageType::HMsg),
            (&b"SUB a\r\n"[..], MessageType::Sub),
            (&b"UNSUB\r\n"[..], MessageType::Unsub),
        ] {
            let err = ProtocolParser::new().push(wire).unwrap_err();
            assert!(
                matches!(err, NatsError::MalformedMessage(k) if k == kind),
                "{wire:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_bad_size_fields() {
        let err = ProtocolParser::new().push(b"MSG a 1 five\r\n").unwrap_err();
        assert!(matches!(err, NatsError::InvalidSize { kind: MessageType::Msg, ref value } if value == "five"));

        let err = ProtocolParser::new().push(b"HMSG a 1 10 5\r\n").unwrap_err();
        assert!(matches!(err, NatsError::MalformedMessage(MessageType::HMsg)));
    }

    #[test]
    fn test_invalid_field_is_fatal() {
        let err = ProtocolParser::new().push(b"MSG a..b 1 0\r\n\r\n").unwrap_err();
        assert!(matches!(err, NatsError::InvalidSubject(_)));
    }

    #[test]
    fn test_closed_after_error() {
        let mut parser = ProtocolParser::new();

        assert!(parser.push(b"BOGUS \r\n").is_err());
        assert!(parser.is_closed());
        assert!(matches!(parser.push(b"PING\r\n"), Err(NatsError::ParserClosed)));
    }

    #[test]
    fn test_messages_before_error_are_delivered() {
        let mut parser = ProtocolParser::new();
        let mut seen = Vec::new();

        let result = parser.push_with(b"PING\r\nBOGUS\r\n", |m| seen.push(m));

        assert!(result.is_err());
        assert_eq!(seen, vec![Message::Ping]);
    }

    #[test]
    fn test_cancel_drops_partial_message() {
        let mut parser = ProtocolParser::new();

        assert!(parser.push(b"MSG a 1 10\r\nhal").unwrap().is_empty());
        parser.cancel();

        assert!(parser.is_closed());
        assert_eq!(parser.buffered_len(), 0);
        assert!(matches!(parser.push(b"f\r\n"), Err(NatsError::ParserClosed)));
    }

    #[test]
    fn test_extract_one_message_at_a_time() {
        let mut parser = ProtocolParser::new();
        parser.extend(b"PING\r\nMSG a 1 2\r\nhi\r\nPONG\r\nPI").unwrap();

        assert_eq!(parser.try_extract().unwrap(), Some(Message::Ping));
        let remaining = parser.buffered_len();
        assert!(remaining > 0);

        let delivery = parser.try_extract().unwrap().unwrap();
        assert_eq!(delivery.payload().map(|p| &p[..]), Some(&b"hi"[..]));
        assert!(parser.buffered_len() < remaining);

        assert_eq!(parser.try_extract().unwrap(), Some(Message::Pong));
        assert_eq!(parser.try_extract().unwrap(), None);
        assert_eq!(parser.buffered_len(), 2);

        parser.extend(b"NG\r\n").unwrap();
        assert_eq!(parser.try_extract().unwrap(), Some(Message::Ping));
    }

    #[test]
    fn test_extract_error_closes_parser() {
        let mut parser = ProtocolParser::new();
        parser.extend(b"PING\r\nBOGUS\r\n").unwrap();

        assert_eq!(parser.try_extract().unwrap(), Some(Message::Ping));
        assert!(parser.try_extract().is_err());
        assert!(parser.is_closed());
        assert!(matches!(parser.extend(b"PING\r\n"), Err(NatsError::ParserClosed)));
    }
}
