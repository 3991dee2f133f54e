//! Cross-check for the argument shape each opcode is allowed to carry on the
//! wire, independent of the typed `Message` parse. `Message::from_values`
//! already rejects anything that does not fit one of its variants, but this
//! module keeps the descriptor table explicit and testable on its own, the
//! way the reference router keeps its `Pattern` class separate from message
//! construction.

use crate::messages::opcode;
use crate::messages::Value;

/// The kind of value a single argument position accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Uri,
    Id,
    Opcode,
    Dict,
    List,
}

/// One position in an argument pattern.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    base: Base,
    optional: bool,
    system: bool,
}

impl Token {
    pub const fn new(base: Base) -> Token {
        Token {
            base,
            optional: false,
            system: false,
        }
    }

    pub const fn optional(self) -> Token {
        Token {
            optional: true,
            ..self
        }
    }

    pub const fn system(self) -> Token {
        Token {
            system: true,
            ..self
        }
    }
}

const MIN_ID: u64 = 1;
const MAX_ID: u64 = 1 << 53;

/// `true` if `uri` is a dot-separated sequence of `[0-9a-z_]+` components.
pub fn is_valid_uri_string(uri: &str) -> bool {
    if uri.is_empty() {
        return false;
    }
    uri.split('.').all(|component| {
        !component.is_empty()
            && component
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    })
}

fn matches(token: Token, value: &Value) -> bool {
    match token.base {
        Base::Uri => match value {
            Value::String(s) => {
                if !is_valid_uri_string(s) {
                    return false;
                }
                token.system || s.split('.').next() != Some("wamp")
            }
            _ => false,
        },
        Base::Id => match *value {
            Value::UnsignedInteger(i) => (MIN_ID..=MAX_ID).contains(&i),
            Value::Integer(i) => i >= 0 && (MIN_ID..=MAX_ID).contains(&(i as u64)),
            _ => false,
        },
        Base::Opcode => match *value {
            Value::UnsignedInteger(i) => opcode::is_known(i),
            Value::Integer(i) => i >= 0 && opcode::is_known(i as u64),
            _ => false,
        },
        Base::Dict => matches!(value, Value::Dict(_)),
        Base::List => matches!(value, Value::List(_)),
    }
}

/// Validate `args` against `pattern`. More arguments than the pattern has
/// tokens is always a rejection; a missing optional tail is accepted.
pub fn validate(pattern: &[Token], args: &[Value]) -> bool {
    if args.len() > pattern.len() {
        return false;
    }

    for (i, token) in pattern.iter().enumerate() {
        match args.get(i) {
            None => {
                if !token.optional {
                    return false;
                }
            }
            Some(value) => {
                if !matches(*token, value) {
                    return false;
                }
            }
        }
    }
    true
}
