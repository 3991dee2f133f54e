//! The boundary between a session and whatever physical connection carries
//! its frames. The router core never encodes a byte or opens a socket; it
//! only calls through this trait, and is called back via
//! [`ConnectionHandler::handle_message`](super::ConnectionHandler) once a
//! host process has decoded an inbound frame into a [`Message`](crate::Message).

use crate::WampResult;
use crate::messages::Message;

/// Host-supplied connection handle, bound one-to-one with a session.
///
/// Implementors own the wire encoding (JSON, MsgPack, or anything else) and
/// the physical transport (WebSocket, a pipe, an in-process channel for
/// tests). The router calls `send` for every outbound message it produces
/// and `close_session` exactly once, when the session reaches the `CLOSED`
/// state.
pub trait Transport: Send {
    /// Deliver one outbound message to the peer.
    fn send(&mut self, message: &Message) -> WampResult<()>;

    /// Authorization gate consulted on HELLO. Returning `false` causes the
    /// router to ABORT the session with `wamp.error.no_such_realm` without
    /// ever looking the realm up.
    fn realm_allowed(&self, realm: &str) -> bool;

    /// Tear down the underlying connection. This must actually sever it;
    /// treating it as a no-op leaves a session the router considers closed
    /// still reachable by its peer.
    fn close_session(&mut self);
}
