use std::fmt;

use crate::messages::Reason;

use super::{ErrorType, Message, ID};

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug)]
pub enum ErrorKind {
    /// The transport failed to deliver a frame or tear down a connection.
    Transport(String),
    HandshakeError(Reason),
    /// A peer sent something other than HELLO before the session was established.
    UnexpectedMessage(&'static str),
    JSONError(serde_json::Error),
    MsgPackDecodeError(rmp_serde::decode::Error),
    MsgPackEncodeError(rmp_serde::encode::Error),
    MalformedData,
    InvalidMessageType(Message),
    /// Developer error: a handler ran in a state the dispatcher should never
    /// have allowed, or an internal map lost an invariant.
    InvalidState(&'static str),
    /// A domain or protocol error tied to a specific request id, to be sent
    /// back to the peer as ERROR or ABORT rather than silently dropped.
    ErrorReason(ErrorType, ID, Reason),
}

impl Error {
    #[inline]
    pub fn new(kind: ErrorKind) -> Error {
        Error { kind }
    }

    fn get_description(&self) -> String {
        format!("WAMP Error: {}", self.kind.description())
    }

    #[inline]
    pub fn get_kind(self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_description())
    }
}

impl std::error::Error for Error {}

impl ErrorKind {
    pub fn description(&self) -> String {
        match *self {
            ErrorKind::Transport(ref s) => s.clone(),
            ErrorKind::HandshakeError(ref r) => r.to_string(),
            ErrorKind::JSONError(ref e) => e.to_string(),
            ErrorKind::MsgPackDecodeError(ref e) => e.to_string(),
            ErrorKind::MsgPackEncodeError(ref e) => e.to_string(),
            ErrorKind::ErrorReason(_, _, ref s) => s.to_string(),
            ErrorKind::UnexpectedMessage(s) | ErrorKind::InvalidState(s) => s.to_string(),
            ErrorKind::MalformedData => "Malformed Data".to_string(),
            ErrorKind::InvalidMessageType(ref t) => format!("Invalid Message Type: {:?}", t),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::new(ErrorKind::JSONError(e))
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Error {
        Error::new(ErrorKind::MsgPackDecodeError(e))
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Error {
        Error::new(ErrorKind::MsgPackEncodeError(e))
    }
}
