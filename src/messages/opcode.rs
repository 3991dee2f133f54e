//! Numeric WAMP message type codes, as they appear in the first element of
//! every encoded message array.

pub const HELLO: u64 = 1;
pub const WELCOME: u64 = 2;
pub const ABORT: u64 = 3;
pub const GOODBYE: u64 = 6;
pub const ERROR: u64 = 8;
pub const PUBLISH: u64 = 16;
pub const PUBLISHED: u64 = 17;
pub const SUBSCRIBE: u64 = 32;
pub const SUBSCRIBED: u64 = 33;
pub const UNSUBSCRIBE: u64 = 34;
pub const UNSUBSCRIBED: u64 = 35;
pub const EVENT: u64 = 36;
pub const CALL: u64 = 48;
pub const RESULT: u64 = 50;
pub const REGISTER: u64 = 64;
pub const REGISTERED: u64 = 65;
pub const UNREGISTER: u64 = 66;
pub const UNREGISTERED: u64 = 67;
pub const INVOCATION: u64 = 68;
pub const YIELD: u64 = 70;

pub fn is_known(opcode: u64) -> bool {
    match opcode {
        HELLO | WELCOME | ABORT | GOODBYE | ERROR | PUBLISH | PUBLISHED | SUBSCRIBE
        | SUBSCRIBED | UNSUBSCRIBE | UNSUBSCRIBED | EVENT | CALL | RESULT | REGISTER
        | REGISTERED | UNREGISTER | UNREGISTERED | INVOCATION | YIELD => true,
        _ => false,
    }
}

/// Opcodes a session may legally receive from a peer. WELCOME, SUBSCRIBED,
/// PUBLISHED, EVENT, REGISTERED, UNREGISTERED, INVOCATION and RESULT only
/// ever flow router-to-client and are never dispatched through here.
pub fn is_inbound(opcode: u64) -> bool {
    match opcode {
        HELLO | ABORT | GOODBYE | ERROR | PUBLISH | SUBSCRIBE | UNSUBSCRIBE | REGISTER
        | UNREGISTER | CALL | YIELD => true,
        _ => false,
    }
}
