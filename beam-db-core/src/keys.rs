//! Order-preserving fact-key codec
//!
//! Facts are written into two parallel byte-key indexes used for range
//! scans:
//!
//! - SPO: `fspo^` S `^` P `^` objEnc `^` Id `^` Index
//! - POS: `fpos^` P `^` objEnc `^` S `^` Id `^` Index
//!
//! Numeric fields are fixed-width 19-digit zero-padded decimals, so
//! lexicographic comparison of two keys equals the semantic ordering of the
//! underlying facts. Object values are bracketed by a type tag byte and are
//! order-preserving within their type; string content is separated from its
//! trailing language qualifier by a NUL so `"bob"` sorts before `"bobb"`
//! regardless of qualifiers.
//!
//! Each index has five nested prefix families ([`SpoPrefix`], [`PosPrefix`]),
//! each a strict byte prefix of the next, used to scan by subject, by
//! subject+predicate, and so on.
//!
//! Identifier fields must be below 10^19 to fit the fixed width.

use crate::error::{Error, Result};
use crate::fact::{f64_order_bits, Fact, KGObject, Precision};
use chrono::{DateTime, TimeZone, Timelike, Utc};

/// Leading bytes of every SPO fact key
pub const SPO_KEY_PREFIX: &[u8] = b"fspo^";
/// Leading bytes of every POS fact key
pub const POS_KEY_PREFIX: &[u8] = b"fpos^";

const SEP: u8 = b'^';
const FIELD_WIDTH: usize = 19;

// Reserved non-fact keys. Process-global and read-only; all accessors hand
// out fresh copies.
static META_KEY_BYTES: [u8; 8] = *b"beammeta";
static STATS_KEY_BYTES: [u8; 9] = *b"beamstats";

/// Bytes of the reserved partition-metadata key (fresh copy)
pub fn meta_key_bytes() -> Vec<u8> {
    META_KEY_BYTES.to_vec()
}

/// Bytes of the reserved statistics key (fresh copy)
pub fn stats_key_bytes() -> Vec<u8> {
    STATS_KEY_BYTES.to_vec()
}

/// Whether `key` is one of the reserved non-fact keys
pub fn is_reserved(key: &[u8]) -> bool {
    key == &META_KEY_BYTES[..] || key == &STATS_KEY_BYTES[..]
}

/// Which index family a fact key belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyEncoding {
    Spo,
    Pos,
}

/// Prefix levels of the SPO index, coarsest to full
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpoPrefix {
    Subject,
    SubjectPredicate,
    SubjectPredicateObjectNoLang,
    SubjectPredicateObject,
    Full,
}

/// Prefix levels of the POS index, coarsest to full
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PosPrefix {
    Predicate,
    PredicateObjectType,
    PredicateObjectNoLang,
    PredicateObjectSubject,
    Full,
}

/// Parsed form of a key, discriminated by key family
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Spec {
    /// The reserved `beammeta` key
    Meta,
    /// The reserved `beamstats` key
    Stats,
    /// A fact key in one of the two index encodings
    Fact { fact: Fact, encoding: KeyEncoding },
}

impl Spec {
    /// Re-encode this spec to its canonical key bytes
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Spec::Meta => meta_key_bytes(),
            Spec::Stats => stats_key_bytes(),
            Spec::Fact { fact, encoding } => match encoding {
                KeyEncoding::Spo => encode_spo(fact, SpoPrefix::Full),
                KeyEncoding::Pos => encode_pos(fact, PosPrefix::Full),
            },
        }
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(format!("{v:019}").as_bytes());
}

fn push_timestamp(buf: &mut Vec<u8>, t: &DateTime<Utc>, precision: Precision) {
    buf.extend_from_slice(t.format("%Y%m%d%H%M%S").to_string().as_bytes());
    buf.extend_from_slice(format!("{:09}", t.nanosecond()).as_bytes());
    buf.push(precision.tag());
}

/// Append the full order-preserving encoding of `obj`
fn push_object(buf: &mut Vec<u8>, obj: &KGObject) {
    buf.push(obj.type_tag());
    match obj {
        KGObject::String(s, lang) => {
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
            push_u64(buf, *lang);
        }
        KGObject::Float64(f, unit) => {
            push_u64(buf, *unit);
            buf.extend_from_slice(&f64_order_bits(*f).to_be_bytes());
        }
        KGObject::Int64(n, unit) => {
            push_u64(buf, *unit);
            buf.extend_from_slice(&((*n as u64) ^ 0x8000_0000_0000_0000).to_be_bytes());
        }
        KGObject::Timestamp(t, precision, unit) => {
            push_u64(buf, *unit);
            push_timestamp(buf, t, *precision);
        }
        KGObject::Bool(b, unit) => {
            push_u64(buf, *unit);
            buf.push(u8::from(*b));
        }
        KGObject::KID(id) => push_u64(buf, *id),
    }
}

/// Append the encoding of `obj` without the trailing language qualifier.
///
/// Only strings carry a trailing qualifier; for every other variant this is
/// the full encoding.
fn push_object_no_lang(buf: &mut Vec<u8>, obj: &KGObject) {
    match obj {
        KGObject::String(s, _) => {
            buf.push(obj.type_tag());
            buf.extend_from_slice(s.as_bytes());
        }
        _ => push_object(buf, obj),
    }
}

/// Append the type-level prefix of `obj`: the tag byte plus, for
/// unit-qualified variants, the leading unit field.
fn push_object_type(buf: &mut Vec<u8>, obj: &KGObject) {
    buf.push(obj.type_tag());
    match obj {
        KGObject::Float64(_, unit)
        | KGObject::Int64(_, unit)
        | KGObject::Bool(_, unit)
        | KGObject::Timestamp(_, _, unit) => push_u64(buf, *unit),
        KGObject::String(..) | KGObject::KID(..) => {}
    }
}

/// Encode `fact` into the SPO index at the requested prefix level.
///
/// The returned buffer is freshly allocated; each level is a strict byte
/// prefix of every deeper level.
pub fn encode_spo(fact: &Fact, prefix: SpoPrefix) -> Vec<u8> {
    let mut buf = Vec::with_capacity(112);
    buf.extend_from_slice(SPO_KEY_PREFIX);
    push_u64(&mut buf, fact.subject);
    buf.push(SEP);
    if prefix == SpoPrefix::Subject {
        return buf;
    }
    push_u64(&mut buf, fact.predicate);
    buf.push(SEP);
    if prefix == SpoPrefix::SubjectPredicate {
        return buf;
    }
    if prefix == SpoPrefix::SubjectPredicateObjectNoLang {
        push_object_no_lang(&mut buf, &fact.object);
        return buf;
    }
    push_object(&mut buf, &fact.object);
    buf.push(SEP);
    if prefix == SpoPrefix::SubjectPredicateObject {
        return buf;
    }
    push_u64(&mut buf, fact.id);
    buf.push(SEP);
    push_u64(&mut buf, fact.index);
    buf
}

/// Encode `fact` into the POS index at the requested prefix level.
pub fn encode_pos(fact: &Fact, prefix: PosPrefix) -> Vec<u8> {
    let mut buf = Vec::with_capacity(112);
    buf.extend_from_slice(POS_KEY_PREFIX);
    push_u64(&mut buf, fact.predicate);
    buf.push(SEP);
    match prefix {
        PosPrefix::Predicate => return buf,
        PosPrefix::PredicateObjectType => {
            push_object_type(&mut buf, &fact.object);
            return buf;
        }
        PosPrefix::PredicateObjectNoLang => {
            push_object_no_lang(&mut buf, &fact.object);
            return buf;
        }
        PosPrefix::PredicateObjectSubject | PosPrefix::Full => {}
    }
    push_object(&mut buf, &fact.object);
    buf.push(SEP);
    push_u64(&mut buf, fact.subject);
    buf.push(SEP);
    if prefix == PosPrefix::PredicateObjectSubject {
        return buf;
    }
    push_u64(&mut buf, fact.id);
    buf.push(SEP);
    push_u64(&mut buf, fact.index);
    buf
}

// === Standalone prefix constructors for range scans ===

/// SPO scan prefix: all facts for a subject
pub fn key_prefix_subject(subject: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(25);
    buf.extend_from_slice(SPO_KEY_PREFIX);
    push_u64(&mut buf, subject);
    buf.push(SEP);
    buf
}

/// SPO scan prefix: all facts for a subject + predicate
pub fn key_prefix_subject_predicate(subject: u64, predicate: u64) -> Vec<u8> {
    let mut buf = key_prefix_subject(subject);
    push_u64(&mut buf, predicate);
    buf.push(SEP);
    buf
}

/// SPO scan prefix: subject + predicate + object, any language qualifier
pub fn key_prefix_subject_predicate_object_no_lang(
    subject: u64,
    predicate: u64,
    object: &KGObject,
) -> Vec<u8> {
    let mut buf = key_prefix_subject_predicate(subject, predicate);
    push_object_no_lang(&mut buf, object);
    buf
}

/// SPO scan prefix: subject + predicate + exact object
pub fn key_prefix_subject_predicate_object(
    subject: u64,
    predicate: u64,
    object: &KGObject,
) -> Vec<u8> {
    let mut buf = key_prefix_subject_predicate(subject, predicate);
    push_object(&mut buf, object);
    buf.push(SEP);
    buf
}

/// POS scan prefix: all facts for a predicate
pub fn key_prefix_predicate(predicate: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(25);
    buf.extend_from_slice(POS_KEY_PREFIX);
    push_u64(&mut buf, predicate);
    buf.push(SEP);
    buf
}

/// POS scan prefix: predicate + object type (and unit where leading)
pub fn key_prefix_predicate_object_type(predicate: u64, object: &KGObject) -> Vec<u8> {
    let mut buf = key_prefix_predicate(predicate);
    push_object_type(&mut buf, object);
    buf
}

/// POS scan prefix: predicate + object, any language qualifier
pub fn key_prefix_predicate_object_no_lang(predicate: u64, object: &KGObject) -> Vec<u8> {
    let mut buf = key_prefix_predicate(predicate);
    push_object_no_lang(&mut buf, object);
    buf
}

/// POS scan prefix: predicate + exact object + subject
pub fn key_prefix_predicate_object_subject(
    predicate: u64,
    object: &KGObject,
    subject: u64,
) -> Vec<u8> {
    let mut buf = key_prefix_predicate(predicate);
    push_object(&mut buf, object);
    buf.push(SEP);
    push_u64(&mut buf, subject);
    buf.push(SEP);
    buf
}

// ============================================================================
// Parsing
// ============================================================================

fn read_u64_field(data: &[u8], pos: &mut usize) -> Result<u64> {
    if *pos + FIELD_WIDTH > data.len() {
        return Err(Error::UnexpectedEof);
    }
    let field = &data[*pos..*pos + FIELD_WIDTH];
    if !field.iter().all(u8::is_ascii_digit) {
        return Err(Error::decode(format!(
            "non-decimal key field: {}",
            String::from_utf8_lossy(field)
        )));
    }
    // 19 decimal digits always fit a u64
    let v = std::str::from_utf8(field)
        .expect("ascii digits")
        .parse::<u64>()
        .expect("19 digits fit u64");
    *pos += FIELD_WIDTH;
    Ok(v)
}

fn expect_sep(data: &[u8], pos: &mut usize) -> Result<()> {
    if *pos >= data.len() {
        return Err(Error::UnexpectedEof);
    }
    if data[*pos] != SEP {
        return Err(Error::decode(format!(
            "expected '^' at byte {}, found 0x{:02x}",
            *pos, data[*pos]
        )));
    }
    *pos += 1;
    Ok(())
}

fn take_byte(data: &[u8], pos: &mut usize) -> Result<u8> {
    if *pos >= data.len() {
        return Err(Error::UnexpectedEof);
    }
    let b = data[*pos];
    *pos += 1;
    Ok(b)
}

fn read_fixed_digits(data: &[u8], pos: &mut usize, n: usize) -> Result<u32> {
    if *pos + n > data.len() {
        return Err(Error::UnexpectedEof);
    }
    let field = &data[*pos..*pos + n];
    if !field.iter().all(u8::is_ascii_digit) {
        return Err(Error::decode("non-decimal timestamp field"));
    }
    *pos += n;
    Ok(std::str::from_utf8(field)
        .expect("ascii digits")
        .parse::<u32>()
        .expect("short digit run fits u32"))
}

fn parse_timestamp(data: &[u8], pos: &mut usize) -> Result<(DateTime<Utc>, Precision)> {
    let year = read_fixed_digits(data, pos, 4)?;
    let month = read_fixed_digits(data, pos, 2)?;
    let day = read_fixed_digits(data, pos, 2)?;
    let hour = read_fixed_digits(data, pos, 2)?;
    let minute = read_fixed_digits(data, pos, 2)?;
    let second = read_fixed_digits(data, pos, 2)?;
    let nanos = read_fixed_digits(data, pos, 9)?;
    let precision = Precision::from_tag(take_byte(data, pos)?)
        .ok_or_else(|| Error::decode("invalid timestamp precision tag"))?;
    let t = Utc
        .with_ymd_and_hms(year as i32, month, day, hour, minute, second)
        .single()
        .and_then(|t| t.with_nanosecond(nanos))
        .ok_or_else(|| Error::decode("timestamp fields out of range"))?;
    Ok((t, precision))
}

fn parse_object(data: &[u8], pos: &mut usize) -> Result<KGObject> {
    let tag = take_byte(data, pos)?;
    match tag {
        0x01 => {
            let nul = data[*pos..]
                .iter()
                .position(|&b| b == 0)
                .ok_or(Error::UnexpectedEof)?;
            let content = std::str::from_utf8(&data[*pos..*pos + nul])
                .map_err(|e| Error::decode(format!("string object is not UTF-8: {e}")))?
                .to_string();
            *pos += nul + 1;
            let lang = read_u64_field(data, pos)?;
            Ok(KGObject::String(content, lang))
        }
        0x02 => {
            let unit = read_u64_field(data, pos)?;
            let raw = read_be_u64(data, pos)?;
            let bits = if raw & 0x8000_0000_0000_0000 != 0 {
                raw & 0x7fff_ffff_ffff_ffff
            } else {
                !raw
            };
            Ok(KGObject::Float64(f64::from_bits(bits), unit))
        }
        0x03 => {
            let unit = read_u64_field(data, pos)?;
            let raw = read_be_u64(data, pos)?;
            Ok(KGObject::Int64((raw ^ 0x8000_0000_0000_0000) as i64, unit))
        }
        0x04 => {
            let unit = read_u64_field(data, pos)?;
            let (t, precision) = parse_timestamp(data, pos)?;
            Ok(KGObject::Timestamp(t, precision, unit))
        }
        0x05 => {
            let unit = read_u64_field(data, pos)?;
            match take_byte(data, pos)? {
                0 => Ok(KGObject::Bool(false, unit)),
                1 => Ok(KGObject::Bool(true, unit)),
                b => Err(Error::decode(format!("invalid bool byte 0x{b:02x}"))),
            }
        }
        0x06 => Ok(KGObject::KID(read_u64_field(data, pos)?)),
        _ => Err(Error::decode(format!("unknown object type tag 0x{tag:02x}"))),
    }
}

fn read_be_u64(data: &[u8], pos: &mut usize) -> Result<u64> {
    if *pos + 8 > data.len() {
        return Err(Error::UnexpectedEof);
    }
    let bytes: [u8; 8] = data[*pos..*pos + 8].try_into().expect("8 bytes");
    *pos += 8;
    Ok(u64::from_be_bytes(bytes))
}

/// Parse a full key into its [`Spec`].
///
/// Accepts the two reserved keys and full SPO/POS fact keys. Fails with
/// [`Error::UnknownKeyType`] when the leading bytes name no key family.
pub fn parse_key(key: &[u8]) -> Result<Spec> {
    if key == &META_KEY_BYTES[..] {
        return Ok(Spec::Meta);
    }
    if key == &STATS_KEY_BYTES[..] {
        return Ok(Spec::Stats);
    }
    if key.starts_with(SPO_KEY_PREFIX) {
        let mut pos = SPO_KEY_PREFIX.len();
        let subject = read_u64_field(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let predicate = read_u64_field(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let object = parse_object(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let id = read_u64_field(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let index = read_u64_field(key, &mut pos)?;
        expect_end(key, pos)?;
        return Ok(Spec::Fact {
            fact: Fact::new(subject, predicate, object, id, index),
            encoding: KeyEncoding::Spo,
        });
    }
    if key.starts_with(POS_KEY_PREFIX) {
        let mut pos = POS_KEY_PREFIX.len();
        let predicate = read_u64_field(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let object = parse_object(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let subject = read_u64_field(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let id = read_u64_field(key, &mut pos)?;
        expect_sep(key, &mut pos)?;
        let index = read_u64_field(key, &mut pos)?;
        expect_end(key, pos)?;
        return Ok(Spec::Fact {
            fact: Fact::new(subject, predicate, object, id, index),
            encoding: KeyEncoding::Pos,
        });
    }
    Err(Error::unknown_key_type(key))
}

fn expect_end(data: &[u8], pos: usize) -> Result<()> {
    if pos != data.len() {
        return Err(Error::decode(format!(
            "trailing bytes: consumed {} of {}",
            pos,
            data.len()
        )));
    }
    Ok(())
}

/// Extract the trailing log index from a full fact key.
///
/// Returns 0 on any malformed tail; never fails.
pub fn parse_index(key: &[u8]) -> u64 {
    if key.len() < FIELD_WIDTH {
        return 0;
    }
    let tail = &key[key.len() - FIELD_WIDTH..];
    if !tail.iter().all(u8::is_ascii_digit) {
        return 0;
    }
    std::str::from_utf8(tail)
        .expect("ascii digits")
        .parse::<u64>()
        .expect("19 digits fit u64")
}

/// The bytes of a full fact key up to (and excluding) its trailing index,
/// or None if the bytes are not shaped like a full fact key.
fn fact_key_body(key: &[u8]) -> Option<&[u8]> {
    if !(key.starts_with(SPO_KEY_PREFIX) || key.starts_with(POS_KEY_PREFIX)) {
        return None;
    }
    if key.len() < SPO_KEY_PREFIX.len() + FIELD_WIDTH + 1 {
        return None;
    }
    let tail = &key[key.len() - FIELD_WIDTH..];
    if !tail.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if key[key.len() - FIELD_WIDTH - 1] != SEP {
        return None;
    }
    Some(&key[..key.len() - FIELD_WIDTH])
}

/// Compare two full fact keys for equality ignoring their trailing index
/// field. Returns false if either key is not a well-formed fact key.
pub fn keys_equal_ignore_index(a: &[u8], b: &[u8]) -> bool {
    match (fact_key_body(a), fact_key_body(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_fact_string(index: u64) -> Fact {
        Fact::new(
            22222222222222222,
            33333333333333,
            KGObject::string("Hello Knowledge Graph", 0),
            111111111111111111,
            index,
        )
    }

    fn make_facts(index: u64) -> Vec<Fact> {
        vec![
            make_fact_string(index),
            Fact::new(
                22222222222222222,
                33333333333333,
                KGObject::float64(3.1415926535, 0),
                111111111111111112,
                index,
            ),
            Fact::new(
                22222222222222222,
                33333333333333,
                KGObject::int64(33, 0),
                111111111111111113,
                index,
            ),
            Fact::new(
                22222222222222222,
                33333333333333,
                KGObject::timestamp(
                    Utc.with_ymd_and_hms(2019, 8, 29, 13, 14, 15).unwrap(),
                    Precision::Nanosecond,
                    0,
                ),
                111111111111111114,
                index,
            ),
            Fact::new(
                22222222222222222,
                33333333333333,
                KGObject::boolean(true, 0),
                111111111111111115,
                index,
            ),
            Fact::new(
                22222222222222222,
                33333333333333,
                KGObject::kid(22222222222222222),
                111111111111111116,
                index,
            ),
        ]
    }

    #[test]
    fn test_fact_key_bytes() {
        let f = Fact::new(12345, 54321, KGObject::string("Bob", 1), 77777, 66666);

        let pos = encode_pos(&f, PosPrefix::Full);
        assert_eq!(
            pos,
            b"fpos^0000000000000054321^\
              \x01Bob\x000000000000000000001^\
              0000000000000012345^\
              0000000000000077777^\
              0000000000000066666"
                .to_vec()
        );

        let spo = encode_spo(&f, SpoPrefix::Full);
        assert_eq!(
            spo,
            b"fspo^0000000000000012345^\
              0000000000000054321^\
              \x01Bob\x000000000000000000001^\
              0000000000000077777^\
              0000000000000066666"
                .to_vec()
        );
    }

    #[test]
    fn test_spo_prefix_growth() {
        let levels = [
            SpoPrefix::Subject,
            SpoPrefix::SubjectPredicate,
            SpoPrefix::SubjectPredicateObjectNoLang,
            SpoPrefix::SubjectPredicateObject,
            SpoPrefix::Full,
        ];
        for fact in make_facts(12345) {
            let mut prev: Vec<u8> = Vec::new();
            for level in levels {
                let key = encode_spo(&fact, level);
                assert!(!key.is_empty());
                assert!(key.len() > prev.len(), "{level:?} not longer for {fact}");
                assert!(key.starts_with(&prev), "{level:?} broke prefix for {fact}");
                prev = key;
            }
        }
    }

    #[test]
    fn test_pos_prefix_growth() {
        let levels = [
            PosPrefix::Predicate,
            PosPrefix::PredicateObjectType,
            PosPrefix::PredicateObjectNoLang,
            PosPrefix::PredicateObjectSubject,
            PosPrefix::Full,
        ];
        for fact in make_facts(12345) {
            let mut prev: Vec<u8> = Vec::new();
            for level in levels {
                let key = encode_pos(&fact, level);
                assert!(!key.is_empty());
                assert!(key.len() > prev.len(), "{level:?} not longer for {fact}");
                assert!(key.starts_with(&prev), "{level:?} broke prefix for {fact}");
                prev = key;
            }
        }
    }

    #[test]
    fn test_spo_key_order() {
        // Facts in increasing (S, P, O, Id, Index) order produce strictly
        // increasing SPO keys.
        let facts = [
            Fact::new(1, 1, KGObject::string("Bob", 11), 1, 1),
            Fact::new(12345, 56789, KGObject::string("Bob", 11), 6666, 7777),
            Fact::new(12345, 56789, KGObject::string("Bob", 11), 6666, 7778),
            Fact::new(12345, 56789, KGObject::string("Bob", 12), 6666, 7778),
            Fact::new(12345, 56789, KGObject::string("Eve", 1), 6666, 7778),
            Fact::new(12345, 56790, KGObject::string("Eve", 1), 6666, 7778),
            Fact::new(12346, 1, KGObject::string("Eve", 1), 6666, 7778),
        ];
        let mut prev: Vec<u8> = Vec::new();
        for f in &facts {
            let k = encode_spo(f, SpoPrefix::Full);
            assert!(k > prev, "{f} key should sort after previous");
            prev = k;
        }
    }

    #[test]
    fn test_pos_key_order() {
        let facts = [
            Fact::new(1, 1, KGObject::string("Bob", 11), 1, 1),
            Fact::new(12345, 56789, KGObject::string("Bob", 11), 6666, 7777),
            Fact::new(12345, 56789, KGObject::string("Bob", 11), 6666, 7778),
            Fact::new(12345, 56789, KGObject::string("Bob", 12), 6666, 7778),
            Fact::new(10000, 56789, KGObject::string("Eve", 1), 6666, 7778),
            Fact::new(12345, 56790, KGObject::string("Eve", 1), 6666, 7778),
            Fact::new(12346, 56790, KGObject::string("Eve", 1), 6666, 7778),
        ];
        let mut prev: Vec<u8> = Vec::new();
        for f in &facts {
            let k = encode_pos(f, PosPrefix::Full);
            assert!(k > prev, "{f} key should sort after previous");
            prev = k;
        }
    }

    #[test]
    fn test_object_order_matches_key_order() {
        // Byte order of encoded objects must equal KGObject's Ord.
        let objects = [
            KGObject::string("", 0),
            KGObject::string("bob", 0),
            KGObject::string("bob", 7),
            KGObject::string("bobb", 1),
            KGObject::float64(f64::NEG_INFINITY, 0),
            KGObject::float64(-2.5, 0),
            KGObject::float64(0.0, 0),
            KGObject::float64(1e300, 0),
            KGObject::float64(0.0, 3),
            KGObject::int64(i64::MIN, 0),
            KGObject::int64(-1, 0),
            KGObject::int64(0, 0),
            KGObject::int64(i64::MAX, 0),
            KGObject::boolean(false, 0),
            KGObject::boolean(true, 0),
            KGObject::kid(5),
            KGObject::kid(500),
        ];
        for a in &objects {
            for b in &objects {
                let fa = Fact::new(1, 1, a.clone(), 1, 1);
                let fb = Fact::new(1, 1, b.clone(), 1, 1);
                let ka = encode_spo(&fa, SpoPrefix::SubjectPredicateObject);
                let kb = encode_spo(&fb, SpoPrefix::SubjectPredicateObject);
                assert_eq!(a.cmp(b), ka.cmp(&kb), "byte order diverged for {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_pos_prefix_constructors() {
        assert_eq!(key_prefix_predicate(54321), b"fpos^0000000000000054321^");

        assert_eq!(
            key_prefix_predicate_object_type(54321, &KGObject::string("Bob", 11)),
            b"fpos^0000000000000054321^\x01"
        );
        assert_eq!(
            key_prefix_predicate_object_type(54321, &KGObject::int64(5, 11)),
            b"fpos^0000000000000054321^\x030000000000000000011"
        );

        assert_eq!(
            key_prefix_predicate_object_no_lang(54321, &KGObject::string("Bob", 11)),
            b"fpos^0000000000000054321^\x01Bob"
        );
        assert_eq!(
            key_prefix_predicate_object_no_lang(54321, &KGObject::int64(5, 11)),
            b"fpos^0000000000000054321^\x030000000000000000011\x80\x00\x00\x00\x00\x00\x00\x05"
        );
    }

    #[test]
    fn test_spo_prefix_constructors() {
        assert_eq!(key_prefix_subject(12345), b"fspo^0000000000000012345^");
        assert_eq!(
            key_prefix_subject_predicate(12345, 54321),
            b"fspo^0000000000000012345^0000000000000054321^"
        );
        assert_eq!(
            key_prefix_subject_predicate_object_no_lang(12345, 54321, &KGObject::string("Bob", 1)),
            b"fspo^0000000000000012345^0000000000000054321^\x01Bob"
        );
        assert_eq!(
            key_prefix_subject_predicate_object_no_lang(12345, 54321, &KGObject::boolean(true, 1)),
            b"fspo^0000000000000012345^0000000000000054321^\x050000000000000000001\x01"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let mut specs = vec![Spec::Meta, Spec::Stats];
        for fact in make_facts(12345) {
            specs.push(Spec::Fact {
                fact: fact.clone(),
                encoding: KeyEncoding::Spo,
            });
            specs.push(Spec::Fact {
                fact,
                encoding: KeyEncoding::Pos,
            });
        }
        for spec in specs {
            let key = spec.bytes();
            let parsed = parse_key(&key)
                .unwrap_or_else(|e| panic!("parse failed for {spec:?}: {e}"));
            assert_eq!(parsed, spec);
            assert_eq!(parsed.bytes(), key);
        }
    }

    #[test]
    fn test_parse_key_unknown_type() {
        assert!(matches!(parse_key(b""), Err(Error::UnknownKeyType(_))));
        assert!(matches!(parse_key(b"bob"), Err(Error::UnknownKeyType(_))));
    }

    #[test]
    fn test_parse_index() {
        for fact in make_facts(12345) {
            assert_eq!(parse_index(&encode_spo(&fact, SpoPrefix::Full)), 12345);
            assert_eq!(parse_index(&encode_pos(&fact, PosPrefix::Full)), 12345);
        }

        // Corrupted trailer parses to 0, never fails
        let f = Fact::new(1, 1, KGObject::kid(12345), 12345, 99999);
        let key = encode_pos(&f, PosPrefix::Full);
        let mut corrupted = key.clone();
        let at = corrupted.len() - 3;
        corrupted[at..].copy_from_slice(b"ABC");
        assert_eq!(parse_index(&corrupted), 0);
        assert_eq!(parse_index(&[]), 0);
        assert_eq!(parse_index(b"short"), 0);
    }

    #[test]
    fn test_keys_equal_ignore_index() {
        let f1 = Fact::new(1, 1, KGObject::string("bob", 0), 7, 12);
        let mut f2 = f1.clone();
        f2.index = 13;
        let k1 = encode_spo(&f1, SpoPrefix::Full);
        let k2 = encode_spo(&f2, SpoPrefix::Full);
        assert!(keys_equal_ignore_index(&k1, &k2));
        assert!(!keys_equal_ignore_index(&k1, &k2[1..]));

        let mut f3 = f1.clone();
        f3.object = KGObject::string("bobb", 0);
        let k3 = encode_spo(&f3, SpoPrefix::Full);
        assert!(!keys_equal_ignore_index(&k1, &k3));

        let garbage = [1u8, 2, 3];
        assert!(!keys_equal_ignore_index(&garbage, &garbage));
    }

    #[test]
    fn test_static_keys_are_immutable() {
        let mut m = meta_key_bytes();
        assert_eq!(m, b"beammeta");
        m[0] = b'x';
        assert_eq!(meta_key_bytes(), b"beammeta");

        let mut s = stats_key_bytes();
        assert_eq!(s, b"beamstats");
        s[0] = b'x';
        assert_eq!(stats_key_bytes(), b"beamstats");
    }

    #[test]
    fn test_parse_truncated_fact_key() {
        let f = make_fact_string(7);
        let key = encode_spo(&f, SpoPrefix::Full);
        for cut in [6, 20, 30, key.len() - 1] {
            assert!(parse_key(&key[..cut]).is_err(), "cut at {cut} should fail");
        }
    }
}
