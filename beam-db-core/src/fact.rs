//! Fact - the fundamental data unit in the store
//!
//! A Fact is an immutable assertion with 5 components:
//! - `subject`: subject entity id
//! - `predicate`: predicate id
//! - `object`: typed object value ([`KGObject`])
//! - `id`: fact id
//! - `index`: the log index at which the fact was introduced (assigned by
//!   the ingest pipeline, never by the client)
//!
//! ## Ordering
//!
//! [`KGObject`] carries a total order that is exactly the lexicographic
//! order of its order-preserving key encoding: type tag first, then the
//! unit qualifier for unit-qualified variants, then the value. Facts
//! themselves are ordered per index family by the key codec in [`crate::keys`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Timestamp precision qualifier, coarsest to finest.
///
/// The discriminant doubles as the encoding tag byte, so deriving `Ord`
/// keeps byte order and semantic order aligned.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum Precision {
    Year = 1,
    Month = 2,
    Day = 3,
    Hour = 4,
    Minute = 5,
    Second = 6,
    Millisecond = 7,
    Microsecond = 8,
    #[default]
    Nanosecond = 9,
}

impl Precision {
    /// Single-byte encoding tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Reverse of [`Precision::tag`]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Precision::Year),
            2 => Some(Precision::Month),
            3 => Some(Precision::Day),
            4 => Some(Precision::Hour),
            5 => Some(Precision::Minute),
            6 => Some(Precision::Second),
            7 => Some(Precision::Millisecond),
            8 => Some(Precision::Microsecond),
            9 => Some(Precision::Nanosecond),
            _ => None,
        }
    }
}

/// Polymorphic object value for facts
///
/// Each variant has a single-byte type tag used by the key encoding.
/// `lang_id` / `unit_id` qualifiers are optional `u64`s where 0 = absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum KGObject {
    /// UTF-8 string with language qualifier
    String(String, u64),
    /// 64-bit float with unit qualifier
    Float64(f64, u64),
    /// 64-bit signed integer with unit qualifier
    Int64(i64, u64),
    /// UTC instant with precision and unit qualifier
    Timestamp(DateTime<Utc>, Precision, u64),
    /// Boolean with unit qualifier
    Bool(bool, u64),
    /// Reference to another entity
    KID(u64),
}

impl KGObject {
    /// A string object with a language id (0 = none)
    pub fn string(s: impl Into<String>, lang_id: u64) -> Self {
        KGObject::String(s.into(), lang_id)
    }

    /// A float object with a unit id (0 = none)
    pub fn float64(f: f64, unit_id: u64) -> Self {
        KGObject::Float64(f, unit_id)
    }

    /// An integer object with a unit id (0 = none)
    pub fn int64(n: i64, unit_id: u64) -> Self {
        KGObject::Int64(n, unit_id)
    }

    /// A timestamp object with precision and a unit id (0 = none)
    pub fn timestamp(t: DateTime<Utc>, precision: Precision, unit_id: u64) -> Self {
        KGObject::Timestamp(t, precision, unit_id)
    }

    /// A boolean object with a unit id (0 = none)
    pub fn boolean(b: bool, unit_id: u64) -> Self {
        KGObject::Bool(b, unit_id)
    }

    /// A reference to another entity
    pub fn kid(entity_id: u64) -> Self {
        KGObject::KID(entity_id)
    }

    /// Single-byte type tag, shared by both key encodings
    pub fn type_tag(&self) -> u8 {
        match self {
            KGObject::String(..) => 0x01,
            KGObject::Float64(..) => 0x02,
            KGObject::Int64(..) => 0x03,
            KGObject::Timestamp(..) => 0x04,
            KGObject::Bool(..) => 0x05,
            KGObject::KID(..) => 0x06,
        }
    }

    /// The language qualifier, for strings only
    pub fn lang_id(&self) -> u64 {
        match self {
            KGObject::String(_, lang) => *lang,
            _ => 0,
        }
    }

    /// The unit qualifier, for unit-qualified variants
    pub fn unit_id(&self) -> u64 {
        match self {
            KGObject::Float64(_, unit)
            | KGObject::Int64(_, unit)
            | KGObject::Bool(_, unit)
            | KGObject::Timestamp(_, _, unit) => *unit,
            KGObject::String(..) | KGObject::KID(..) => 0,
        }
    }
}

/// Map an f64 onto u64 bits whose unsigned order is IEEE total order.
///
/// Non-negative values get the sign bit set; negative values are fully
/// inverted. Also used by the key encoding.
pub(crate) fn f64_order_bits(f: f64) -> u64 {
    let bits = f.to_bits();
    if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000_0000_0000
    }
}

impl PartialEq for KGObject {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KGObject {}

impl PartialOrd for KGObject {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KGObject {
    fn cmp(&self, other: &Self) -> Ordering {
        use KGObject::*;
        match (self, other) {
            (String(a, la), String(b, lb)) => a.cmp(b).then(la.cmp(lb)),
            (Float64(a, ua), Float64(b, ub)) => ua
                .cmp(ub)
                .then_with(|| f64_order_bits(*a).cmp(&f64_order_bits(*b))),
            (Int64(a, ua), Int64(b, ub)) => ua.cmp(ub).then(a.cmp(b)),
            (Timestamp(a, pa, ua), Timestamp(b, pb, ub)) => {
                ua.cmp(ub).then(a.cmp(b)).then(pa.cmp(pb))
            }
            (Bool(a, ua), Bool(b, ub)) => ua.cmp(ub).then(a.cmp(b)),
            (KID(a), KID(b)) => a.cmp(b),
            _ => self.type_tag().cmp(&other.type_tag()),
        }
    }
}

impl Hash for KGObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_tag().hash(state);
        match self {
            KGObject::String(s, lang) => {
                s.hash(state);
                lang.hash(state);
            }
            KGObject::Float64(f, unit) => {
                f64_order_bits(*f).hash(state);
                unit.hash(state);
            }
            KGObject::Int64(n, unit) => {
                n.hash(state);
                unit.hash(state);
            }
            KGObject::Timestamp(t, p, unit) => {
                t.hash(state);
                p.hash(state);
                unit.hash(state);
            }
            KGObject::Bool(b, unit) => {
                b.hash(state);
                unit.hash(state);
            }
            KGObject::KID(id) => id.hash(state),
        }
    }
}

impl fmt::Display for KGObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KGObject::String(s, 0) => write!(f, "{s:?}"),
            KGObject::String(s, lang) => write!(f, "{s:?}@{lang}"),
            KGObject::Float64(v, _) => write!(f, "{v}"),
            KGObject::Int64(v, _) => write!(f, "{v}"),
            KGObject::Timestamp(t, p, _) => write!(f, "{t}/{p:?}"),
            KGObject::Bool(b, _) => write!(f, "{b}"),
            KGObject::KID(id) => write!(f, "#{id}"),
        }
    }
}

/// An immutable fact
///
/// `subject`, `predicate`, and `id` are positive identifiers; `index` is the
/// log index that introduced the fact. Identifier fields must stay below
/// 10^19 so they fit the fixed-width key fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    /// Subject entity id
    pub subject: u64,
    /// Predicate id
    pub predicate: u64,
    /// Object value
    pub object: KGObject,
    /// Fact id
    pub id: u64,
    /// Log index that introduced this fact (0 = not yet assigned)
    pub index: u64,
}

impl Fact {
    /// Create a new fact
    pub fn new(subject: u64, predicate: u64, object: KGObject, id: u64, index: u64) -> Self {
        Self {
            subject,
            predicate,
            object,
            id,
            index,
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} id:{} idx:{}]",
            self.subject, self.predicate, self.object, self.id, self.index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_type_tags() {
        assert_eq!(KGObject::string("x", 0).type_tag(), 0x01);
        assert_eq!(KGObject::float64(1.0, 0).type_tag(), 0x02);
        assert_eq!(KGObject::int64(1, 0).type_tag(), 0x03);
        assert_eq!(
            KGObject::timestamp(Utc::now(), Precision::Second, 0).type_tag(),
            0x04
        );
        assert_eq!(KGObject::boolean(true, 0).type_tag(), 0x05);
        assert_eq!(KGObject::kid(1).type_tag(), 0x06);
    }

    #[test]
    fn test_string_order_ignores_qualifier_until_content_equal() {
        let a = KGObject::string("bob", 99);
        let b = KGObject::string("bobb", 1);
        assert!(a < b);

        let c = KGObject::string("bob", 1);
        let d = KGObject::string("bob", 2);
        assert!(c < d);
    }

    #[test]
    fn test_numeric_order_within_unit() {
        assert!(KGObject::int64(-5, 0) < KGObject::int64(3, 0));
        assert!(KGObject::float64(-0.5, 0) < KGObject::float64(0.25, 0));
        // unit is the leading discriminator
        assert!(KGObject::int64(100, 1) < KGObject::int64(-100, 2));
    }

    #[test]
    fn test_float_total_order() {
        assert!(KGObject::float64(f64::NEG_INFINITY, 0) < KGObject::float64(-1.0, 0));
        assert!(KGObject::float64(-1.0, 0) < KGObject::float64(-0.0, 0));
        assert!(KGObject::float64(-0.0, 0) < KGObject::float64(0.0, 0));
        assert!(KGObject::float64(1.0, 0) < KGObject::float64(f64::INFINITY, 0));
    }

    #[test]
    fn test_cross_type_order_follows_tags() {
        let ordered = [
            KGObject::string("zzz", 9),
            KGObject::float64(-1e300, 0),
            KGObject::int64(i64::MIN, 0),
            KGObject::timestamp(
                Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap(),
                Precision::Second,
                0,
            ),
            KGObject::boolean(false, 0),
            KGObject::kid(1),
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_timestamp_order() {
        let earlier = Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2019, 5, 1, 12, 0, 1).unwrap();
        assert!(
            KGObject::timestamp(earlier, Precision::Nanosecond, 0)
                < KGObject::timestamp(later, Precision::Year, 0)
        );
        // same instant: precision breaks the tie
        assert!(
            KGObject::timestamp(earlier, Precision::Day, 0)
                < KGObject::timestamp(earlier, Precision::Second, 0)
        );
    }
}
