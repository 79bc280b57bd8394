//! # Codec - text tokens for keys and values
//!
//! Every record the engine persists (WAL lines, segment data lines, index
//! lines) is plain text:
//!
//! ```text
//! <key token>;;<value token>\n
//! ```
//!
//! Keys and values become tokens through the [`Codec`] trait. A deleted value
//! is written as the reserved [`TOMBSTONE`] token, which decodes back to
//! `None` regardless of the value type.
//!
//! Tokens may not contain the [`SEPARATOR`] or a line terminator, nor start
//! or end with a separator character (`k;` followed by `;;` would read back
//! as `k`). A real value may not encode to the tombstone token. Such payloads are rejected
//! with a [`CodecError`] before anything is written.

use thiserror::Error;

/// Field separator between the key token and the value token.
pub const SEPARATOR: &str = ";;";

/// The character [`SEPARATOR`] is made of.
pub const SEPARATOR_CHAR: char = ';';

/// Token written in place of a value to mark a deletion. Matched
/// case-insensitively when decoding.
pub const TOMBSTONE: &str = "<TOMBSTONE>";

/// Terminator appended after every encoded line.
pub const LINE_TERMINATOR: &str = "\n";

/// Errors produced while encoding or decoding tokens and lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The token contains the field separator.
    #[error("token {token:?} contains the field separator {SEPARATOR:?}")]
    SeparatorInPayload { token: String },

    /// The token starts or ends with a separator character, which would
    /// run into the separator once the line is joined.
    #[error("token {token:?} starts or ends with {SEPARATOR_CHAR:?}")]
    SeparatorAtEdge { token: String },

    /// The token contains a line terminator.
    #[error("token {token:?} contains a line terminator")]
    LineBreakInPayload { token: String },

    /// A real value encodes to the tombstone token and would read back as deleted.
    #[error("token {token:?} is reserved for tombstones")]
    ReservedToken { token: String },

    /// The token could not be parsed into the target type.
    #[error("cannot parse {token:?}: {reason}")]
    Parse { token: String, reason: String },

    /// A line did not split into exactly a key and a value.
    #[error("expected 2 fields, found {found} in line {line:?}")]
    FieldCount { line: String, found: usize },
}

/// Conversion between a typed key or value and its text token.
///
/// Implementations only deal with real values; tombstones are handled by
/// [`serialize`] and [`deserialize`].
pub trait Codec: Sized {
    /// Renders `self` as a token.
    fn to_token(&self) -> String;

    /// Parses a token produced by [`to_token`](Codec::to_token).
    fn from_token(token: &str) -> Result<Self, CodecError>;
}

impl Codec for String {
    fn to_token(&self) -> String {
        self.clone()
    }

    fn from_token(token: &str) -> Result<Self, CodecError> {
        Ok(token.to_string())
    }
}

macro_rules! impl_codec_from_str {
    ($($t:ty),* $(,)?) => {
        $(
            impl Codec for $t {
                fn to_token(&self) -> String {
                    self.to_string()
                }

                fn from_token(token: &str) -> Result<Self, CodecError> {
                    token.parse::<$t>().map_err(|e| CodecError::Parse {
                        token: token.to_string(),
                        reason: e.to_string(),
                    })
                }
            }
        )*
    };
}

impl_codec_from_str!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

fn is_tombstone(token: &str) -> bool {
    token.eq_ignore_ascii_case(TOMBSTONE)
}

fn check_payload(token: String) -> Result<String, CodecError> {
    if token.contains(SEPARATOR) {
        return Err(CodecError::SeparatorInPayload { token });
    }
    if token.starts_with(SEPARATOR_CHAR) || token.ends_with(SEPARATOR_CHAR) {
        return Err(CodecError::SeparatorAtEdge { token });
    }
    if token.contains(['\n', '\r']) {
        return Err(CodecError::LineBreakInPayload { token });
    }
    Ok(token)
}

/// Serializes a value, or the tombstone token when `value` is `None`.
pub fn serialize<T: Codec>(value: Option<&T>) -> Result<String, CodecError> {
    match value {
        None => Ok(TOMBSTONE.to_string()),
        Some(v) => {
            let token = check_payload(v.to_token())?;
            if is_tombstone(&token) {
                return Err(CodecError::ReservedToken { token });
            }
            Ok(token)
        }
    }
}

/// Serializes a key. Keys are never tombstones.
pub fn serialize_key<K: Codec>(key: &K) -> Result<String, CodecError> {
    serialize(Some(key))
}

/// Deserializes a token; the tombstone token yields `None` without
/// consulting `T`'s decoder.
pub fn deserialize<T: Codec>(token: &str) -> Result<Option<T>, CodecError> {
    if is_tombstone(token) {
        return Ok(None);
    }
    T::from_token(token).map(Some)
}

/// A key together with its value, `None` meaning deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<K, V> {
    pub key: K,
    pub value: Option<V>,
}

impl<K, V> Record<K, V> {
    pub fn new(key: K, value: Option<V>) -> Self {
        Self { key, value }
    }

    pub fn live(key: K, value: V) -> Self {
        Self::new(key, Some(value))
    }

    pub fn tombstone(key: K) -> Self {
        Self::new(key, None)
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// Encodes one line: `key SEPARATOR value LINE_TERMINATOR`.
pub fn encode_line<K: Codec, V: Codec>(key: &K, value: Option<&V>) -> Result<String, CodecError> {
    let key = serialize_key(key)?;
    let value = serialize(value)?;
    Ok(format!("{key}{SEPARATOR}{value}{LINE_TERMINATOR}"))
}

/// Splits a line (without terminator) into exactly two tokens.
pub fn split_fields(line: &str) -> Result<(&str, &str), CodecError> {
    let fields: Vec<&str> = line.split(SEPARATOR).collect();
    match fields.as_slice() {
        [key, value] => Ok((key, value)),
        _ => Err(CodecError::FieldCount {
            line: line.to_string(),
            found: fields.len(),
        }),
    }
}

/// Decodes a line produced by [`encode_line`] (terminator already stripped).
pub fn decode_line<K: Codec, V: Codec>(line: &str) -> Result<Record<K, V>, CodecError> {
    let (key, value) = split_fields(line)?;
    let key = K::from_token(key)?;
    let value = deserialize::<V>(value)?;
    Ok(Record { key, value })
}
