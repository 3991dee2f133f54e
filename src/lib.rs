//! Core broker/dealer for a WAMPv2 router.
//!
//! This crate implements the message-layer logic of a WAMP router — the
//! session state machine, the per-realm pub/sub broker and RPC dealer, and
//! the trie-based URI pattern index that backs both — without committing to
//! any particular transport or wire encoding. A host process supplies a
//! [`router::Transport`] implementation per connection and feeds decoded
//! frames into the session; this crate worries about what those frames mean.

#[macro_use]
extern crate log;

mod error;
mod messages;
pub mod router;
mod utils;

pub use error::{Error, ErrorKind};
pub use messages::{
    CallOptions, ClientRoles, Dict, ErrorDetails, ErrorType, EventDetails, HelloDetails,
    InvocationDetails, List, MatchingPolicy, Message, PublishOptions, Reason, RegisterOptions,
    ResultDetails, RouterRoles, SubscribeOptions, Value, WelcomeDetails, YieldOptions, URI,
};
pub use router::{RealmEvent, Router, RouterConfig, Session, Transport};

pub type WampResult<T> = Result<T, Error>;
pub type ID = u64;
