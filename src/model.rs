//! Core data types: quad terms, directions, and the single on-disk record
//! shape ([`Primitive`]) used for both interned nodes and stored links.

use std::cmp::Ordering;

/// Unique identifier assigned to every primitive (node or link). `0` is
/// reserved to mean "absent" in a direction field.
pub type PrimaryKey = u64;

/// A quad term. Variants cover the RDF value space the store needs to hash
/// and round-trip; ordering of variants is insignificant, only equality and
/// hashing are load-bearing.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Opaque bytes, hashed and stored as-is.
    Raw(Vec<u8>),
    /// A plain string literal with no datatype or language tag.
    String(String),
    /// An IRI reference; the only variant cached by the value cache.
    Iri(String),
    /// A blank node identifier, scoped to the store.
    BlankNode(String),
    /// A literal with an explicit datatype IRI.
    TypedLiteral {
        /// Lexical value.
        value: String,
        /// Datatype IRI, e.g. `xsd:dateTime`.
        datatype: String,
    },
    /// A literal with a BCP-47 language tag.
    LangLiteral {
        /// Lexical value.
        value: String,
        /// BCP-47 language tag, e.g. `"en"`.
        lang: String,
    },
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// A timestamp, seconds since epoch plus nanosecond remainder.
    Timestamp {
        /// Seconds since the Unix epoch.
        secs: i64,
        /// Nanosecond remainder, `0..1_000_000_000`.
        nanos: u32,
    },
    /// A value tagged with a byte this build doesn't recognize. Carries the
    /// tag and raw payload through unchanged so a store written by a newer
    /// version round-trips under an older one instead of failing to decode.
    Unknown {
        /// The unrecognized tag byte.
        tag: u8,
        /// The tag's payload, opaque to this build.
        payload: Vec<u8>,
    },
}

impl Value {
    /// Returns the IRI string if this value is an [`Value::Iri`], for use as
    /// a value-cache key.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Value::Iri(s) => Some(s),
            _ => None,
        }
    }
}

/// The four fixed quad directions, each with a single-byte key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Subject position.
    Subject,
    /// Predicate position.
    Predicate,
    /// Object position.
    Object,
    /// Optional graph label position.
    Label,
}

impl Direction {
    /// All four directions, in the canonical order used to lay out a
    /// [`Primitive`]'s fields and to build composite index keys.
    pub const ALL: [Direction; 4] = [
        Direction::Subject,
        Direction::Predicate,
        Direction::Object,
        Direction::Label,
    ];

    /// Single-byte prefix used in on-disk key layouts.
    pub fn prefix(self) -> u8 {
        match self {
            Direction::Subject => b's',
            Direction::Predicate => b'p',
            Direction::Object => b'o',
            Direction::Label => b'c',
        }
    }
}

/// A quad of terms. `label` is optional per the RDF convention of an
/// optional named graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    /// Subject term.
    pub subject: Value,
    /// Predicate term.
    pub predicate: Value,
    /// Object term.
    pub object: Value,
    /// Optional graph label term.
    pub label: Option<Value>,
}

impl Quad {
    /// Builds a quad with no graph label.
    pub fn new(subject: Value, predicate: Value, object: Value) -> Self {
        Self {
            subject,
            predicate,
            object,
            label: None,
        }
    }

    /// Returns the term occupying `dir`, if the quad has one (only `Label`
    /// can be absent).
    pub fn direction(&self, dir: Direction) -> Option<&Value> {
        match dir {
            Direction::Subject => Some(&self.subject),
            Direction::Predicate => Some(&self.predicate),
            Direction::Object => Some(&self.object),
            Direction::Label => self.label.as_ref(),
        }
    }
}

/// The single record shape stored in the log: either an interned node
/// (`value` non-empty) or a link (`value` empty, direction ids non-zero).
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    /// Monotonically assigned id, 1-based.
    pub id: PrimaryKey,
    /// Subject direction id, `0` if absent (always non-zero for a link).
    pub subject: PrimaryKey,
    /// Predicate direction id, `0` if absent.
    pub predicate: PrimaryKey,
    /// Object direction id, `0` if absent.
    pub object: PrimaryKey,
    /// Label direction id, `0` if this link (or node) has no graph label.
    pub label: PrimaryKey,
    /// Serialized [`Value`] bytes; non-empty iff this primitive is a node.
    pub value: Vec<u8>,
    /// Wall-clock nanoseconds at creation.
    pub timestamp: i64,
    /// Tombstone flag; `true` only for links, never for nodes (deleted nodes
    /// are removed from the log entirely).
    pub deleted: bool,
}

impl Primitive {
    /// A primitive is a node iff it carries a non-empty encoded value.
    pub fn is_node(&self) -> bool {
        !self.value.is_empty()
    }

    /// A primitive is a link iff it is not a node.
    pub fn is_link(&self) -> bool {
        !self.is_node()
    }

    /// Returns the id stored in the given direction, or `0` if absent.
    pub fn direction_id(&self, dir: Direction) -> PrimaryKey {
        match dir {
            Direction::Subject => self.subject,
            Direction::Predicate => self.predicate,
            Direction::Object => self.object,
            Direction::Label => self.label,
        }
    }

    /// Whether two link primitives reference the same quad, ignoring id and
    /// timestamp. Used by `has_primitive` to disambiguate bloom-filter hits.
    pub fn is_same_link(&self, other: &Primitive) -> bool {
        self.subject == other.subject
            && self.predicate == other.predicate
            && self.object == other.object
            && self.label == other.label
    }
}

/// Opaque handle returned by iterators: either a node id or a full link
/// primitive. Modeled as a tagged sum rather than a trait object so
/// callers can match on the concrete shape without a dynamic dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Ref {
    /// A node, identified by id.
    Node(PrimaryKey),
    /// A link, carried in full so `Contains` can compare direction ids
    /// without a further log fetch.
    Link(Primitive),
}

impl Ref {
    /// The id of the underlying primitive, regardless of variant.
    pub fn id(&self) -> PrimaryKey {
        match self {
            Ref::Node(id) => *id,
            Ref::Link(p) => p.id,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Ref {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.id().cmp(&other.id()))
    }
}
