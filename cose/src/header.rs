//! Protected and unprotected header buckets.
//!
//! Labels are kept in deterministic CBOR order (RFC 8949 §4.2.1: bytewise
//! order of the encoded keys), so encoding a [`HeaderMap`] never depends on
//! insertion order.

use crate::{algorithm::Algorithm, error::MalformedMessage};
use minicbor::{
    data::{Tag, Type},
    encode::{self, Write},
    Decoder, Encoder,
};
use std::{
    cmp::Ordering,
    collections::{btree_map, BTreeMap},
    convert::Infallible,
    hash::{Hash, Hasher},
};

/// Maximum nesting of arrays, maps and tags inside a header value.
pub const MAX_VALUE_DEPTH: usize = 16;

/// The canonical encoding of an empty map.
pub const EMPTY_MAP: [u8; 1] = [0xa0];

/// A header parameter label.
///
/// The registered labels have their own variants; anything else falls
/// through to [`Label::Int`] or [`Label::Text`]. Integer labels are
/// normalized, so `Label::from(1)` is [`Label::Algorithm`] and compares
/// equal to it.
#[derive(Debug, Clone)]
pub enum Label {
    /// `alg` (1)
    Algorithm,

    /// `crit` (2)
    Critical,

    /// `content type` (3)
    ContentType,

    /// `kid` (4)
    KeyId,

    /// `IV` (5)
    Iv,

    /// `Partial IV` (6)
    PartialIv,

    /// `counter signature` (7)
    CounterSignature,

    /// Any other integer label.
    Int(i64),

    /// Any text label.
    Text(String),
}

enum LabelKey<'a> {
    Int(i64),
    Text(&'a str),
}

impl Label {
    /// Build a label from its integer form, picking the named variant if registered.
    #[must_use]
    pub fn from_int(label: i64) -> Self {
        match label {
            1 => Label::Algorithm,
            2 => Label::Critical,
            3 => Label::ContentType,
            4 => Label::KeyId,
            5 => Label::Iv,
            6 => Label::PartialIv,
            7 => Label::CounterSignature,
            other => Label::Int(other),
        }
    }

    /// The integer form of the label, if it has one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.key() {
            LabelKey::Int(i) => Some(i),
            LabelKey::Text(_) => None,
        }
    }

    fn key(&self) -> LabelKey<'_> {
        match self {
            Label::Algorithm => LabelKey::Int(1),
            Label::Critical => LabelKey::Int(2),
            Label::ContentType => LabelKey::Int(3),
            Label::KeyId => LabelKey::Int(4),
            Label::Iv => LabelKey::Int(5),
            Label::PartialIv => LabelKey::Int(6),
            Label::CounterSignature => LabelKey::Int(7),
            Label::Int(i) => LabelKey::Int(*i),
            Label::Text(s) => LabelKey::Text(s),
        }
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, MalformedMessage> {
        match d.datatype()? {
            Type::String => Ok(Label::Text(d.str()?.to_owned())),
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::I8 | Type::I16 | Type::I32
            | Type::I64 => Ok(Label::from_int(d.i64()?)),
            other => Err(MalformedMessage::InvalidLabel(format!("{other:?}"))),
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.key() {
            LabelKey::Int(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            LabelKey::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.key(), other.key()) {
            // Unsigned (major type 0) before negative (major type 1);
            // negatives encode their magnitude, so -1 sorts before -2.
            (LabelKey::Int(a), LabelKey::Int(b)) => match (a >= 0, b >= 0) {
                (true, true) => a.cmp(&b),
                (false, false) => b.cmp(&a),
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
            },
            (LabelKey::Int(_), LabelKey::Text(_)) => Ordering::Less,
            (LabelKey::Text(_), LabelKey::Int(_)) => Ordering::Greater,
            (LabelKey::Text(a), LabelKey::Text(b)) => a
                .len()
                .cmp(&b.len())
                .then_with(|| a.as_bytes().cmp(b.as_bytes())),
        }
    }
}

impl From<i64> for Label {
    fn from(label: i64) -> Self {
        Label::from_int(label)
    }
}

impl From<i32> for Label {
    fn from(label: i32) -> Self {
        Label::from_int(label.into())
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        Label::Text(label.to_owned())
    }
}

impl From<String> for Label {
    fn from(label: String) -> Self {
        Label::Text(label)
    }
}

impl<C> minicbor::Encode<C> for Label {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        match self.key() {
            LabelKey::Int(i) => e.i64(i)?,
            LabelKey::Text(s) => e.str(s)?,
        };
        Ok(())
    }
}

/// A header parameter value.
///
/// Floating point and `undefined` are not representable; they are rejected
/// when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integer.
    Int(i64),

    /// Byte string.
    Bytes(Vec<u8>),

    /// Text string.
    Text(String),

    /// Boolean.
    Bool(bool),

    /// `null`
    Null,

    /// Array.
    Array(Vec<Value>),

    /// Map. Entries are written in deterministic key order regardless of
    /// their order here.
    Map(Vec<(Value, Value)>),

    /// Tagged value.
    Tag(u64, Box<Value>),
}

impl Value {
    fn decode(d: &mut Decoder<'_>, depth: usize) -> Result<Self, MalformedMessage> {
        if depth > MAX_VALUE_DEPTH {
            return Err(MalformedMessage::TooDeep);
        }

        match d.datatype()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 | Type::I8 | Type::I16 | Type::I32
            | Type::I64 => Ok(Value::Int(d.i64()?)),
            Type::Bytes => Ok(Value::Bytes(d.bytes()?.to_vec())),
            Type::String => Ok(Value::Text(d.str()?.to_owned())),
            Type::Bool => Ok(Value::Bool(d.bool()?)),
            Type::Null => {
                d.null()?;
                Ok(Value::Null)
            }
            Type::Array => {
                let len = d.array()?.ok_or(MalformedMessage::IndefiniteLength)?;
                let mut items = Vec::new();
                for _ in 0..len {
                    items.push(Value::decode(d, depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            Type::Map => {
                let len = d.map()?.ok_or(MalformedMessage::IndefiniteLength)?;
                let mut entries = Vec::new();
                for _ in 0..len {
                    let k = Value::decode(d, depth + 1)?;
                    let v = Value::decode(d, depth + 1)?;
                    entries.push((k, v));
                }
                Ok(Value::Map(entries))
            }
            Type::Tag => {
                let tag = d.tag()?;
                let inner = Value::decode(d, depth + 1)?;
                Ok(Value::Tag(tag.as_u64(), Box::new(inner)))
            }
            Type::ArrayIndef | Type::MapIndef | Type::BytesIndef | Type::StringIndef => {
                Err(MalformedMessage::IndefiniteLength)
            }
            other => Err(MalformedMessage::UnsupportedValue(format!("{other:?}"))),
        }
    }
}

impl<C> minicbor::Encode<C> for Value {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            Value::Int(i) => {
                e.i64(*i)?;
            }
            Value::Bytes(b) => {
                e.bytes(b)?;
            }
            Value::Text(s) => {
                e.str(s)?;
            }
            Value::Bool(b) => {
                e.bool(*b)?;
            }
            Value::Null => {
                e.null()?;
            }
            Value::Array(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    item.encode(e, ctx)?;
                }
            }
            Value::Map(entries) => {
                let mut keyed = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    let key = minicbor::to_vec(k)
                        .map_err(|_| encode::Error::message("unencodable map key"))?;
                    keyed.push((key, v));
                }
                keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

                e.map(keyed.len() as u64)?;
                for (key, v) in keyed {
                    e.writer_mut()
                        .write_all(&key)
                        .map_err(encode::Error::write)?;
                    v.encode(e, ctx)?;
                }
            }
            Value::Tag(tag, inner) => {
                e.tag(Tag::new(*tag))?;
                inner.encode(e, ctx)?;
            }
        }
        Ok(())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

/// One header bucket: an open label → value map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap(BTreeMap<Label, Value>);

impl HeaderMap {
    /// An empty bucket.
    #[must_use]
    pub const fn new() -> Self {
        HeaderMap(BTreeMap::new())
    }

    /// Set a parameter, returning the previous value for that label.
    pub fn insert(&mut self, label: impl Into<Label>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(label.into(), value.into())
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, label: &Label) -> Option<&Value> {
        self.0.get(label)
    }

    /// Remove a parameter.
    pub fn remove(&mut self, label: &Label) -> Option<Value> {
        self.0.remove(label)
    }

    /// Whether a parameter is set for `label`.
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.0.contains_key(label)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bucket has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parameters in deterministic encoding order.
    pub fn iter(&self) -> btree_map::Iter<'_, Label, Value> {
        self.0.iter()
    }

    /// Deterministic CBOR encoding of this bucket.
    ///
    /// An empty bucket encodes as [`EMPTY_MAP`], never as zero bytes.
    ///
    /// # Errors
    ///
    /// Only fails if a value cannot be encoded at all.
    pub fn to_cbor(&self) -> Result<Vec<u8>, encode::Error<Infallible>> {
        minicbor::to_vec(self)
    }

    pub(crate) fn decode(d: &mut Decoder<'_>) -> Result<Self, MalformedMessage> {
        let len = d.map()?.ok_or(MalformedMessage::IndefiniteLength)?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let label = Label::decode(d)?;
            let value = Value::decode(d, 0)?;
            if let Some(label) = map.insert(label.clone(), value).map(|_| label) {
                return Err(MalformedMessage::DuplicateLabel(label));
            }
        }
        Ok(HeaderMap(map))
    }
}

impl<C> minicbor::Encode<C> for HeaderMap {
    fn encode<W: Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (label, value) in &self.0 {
            label.encode(e, ctx)?;
            value.encode(e, ctx)?;
        }
        Ok(())
    }
}

impl<L: Into<Label>, V: Into<Value>> FromIterator<(L, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        HeaderMap(
            iter.into_iter()
                .map(|(l, v)| (l.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a Label, &'a Value);
    type IntoIter = btree_map::Iter<'a, Label, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Both header buckets of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    /// Covered by the signature. Must not change after signing.
    pub protected: HeaderMap,

    /// Not covered by the signature.
    pub unprotected: HeaderMap,
}

impl Headers {
    /// Empty buckets.
    #[must_use]
    pub const fn new() -> Self {
        Headers {
            protected: HeaderMap::new(),
            unprotected: HeaderMap::new(),
        }
    }

    /// Headers with `alg` set in the protected bucket.
    #[must_use]
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        let mut headers = Headers::new();
        headers.set_algorithm(algorithm);
        headers
    }

    /// Declare the algorithm in the protected bucket.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.protected
            .insert(Label::Algorithm, Value::Int(algorithm.id()));
    }

    /// The bytes that stand for the protected bucket in the Sig-Structure
    /// and on the wire.
    ///
    /// # Errors
    ///
    /// Only fails if a value cannot be encoded at all.
    pub fn encode_protected(&self) -> Result<Vec<u8>, encode::Error<Infallible>> {
        self.protected.to_cbor()
    }
}
