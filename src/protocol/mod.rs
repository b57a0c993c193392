//! Protocol module - message model, wire encoding and incremental parsing.
//!
//! This module implements the text protocol spoken over the connection:
//! - Typed messages with validated fields and derived sizes
//! - Header blocks for HPUB/HMSG
//! - INFO/CONNECT handshake payloads
//! - Chunk-agnostic parser for the inbound byte stream

mod handshake;
mod header;
mod message;
mod parser;
mod subject;

pub use handshake::{ConnectInfo, ServerInfo, CLIENT_LANG, CLIENT_VERSION};
pub use header::{HeaderBag, HEADER_BANNER};
pub use message::{
    Connect, ErrMessage, HMsg, HPub, Info, Message, MessageType, Msg, Pub, Sub, Unsub, CRLF,
    HEADER_DELIMITER_LEN,
};
pub use parser::ProtocolParser;
pub use subject::{is_valid_queue_group, is_valid_sid, is_valid_subject};
