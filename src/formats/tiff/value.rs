//! Typed directory values
//!
//! A directory maps tag ids to [`TagValue`]s. Scalars and arrays are distinct
//! variants; [`TagValue::coerce`] is the single place where one shape is
//! converted into another.

use std::fmt;

use super::entry::IFDEntry;
use super::on_demand::OnDemandOffsetArray;
use super::rational::Rational;
use crate::error::{Error, Result};

/// A value stored under one tag
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(u8),
    Short(u16),
    Long(u64),
    Rational(Rational),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Shorts(Vec<u16>),
    Longs(Vec<u64>),
    Rationals(Vec<Rational>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    SBytes(Vec<i8>),
    SShorts(Vec<i16>),
    SLongs(Vec<i32>),
    SLong8s(Vec<i64>),
    SRationals(Vec<Rational>),
    /// Opaque bytes (UNDEFINED)
    Undefined(Vec<u8>),
    /// ASCII text, without the terminating NUL
    Text(String),
    /// A large 8-byte offset table left on disk
    OnDemand(OnDemandOffsetArray),
    /// An entry whose field type could not be decoded
    Unresolved(IFDEntry),
}

/// The shape a caller expects from [`TagValue::coerce`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Byte,
    Short,
    Long,
    Rational,
    Float,
    Double,
    Bytes,
    Shorts,
    Longs,
    Rationals,
    Floats,
    Doubles,
    Text,
    /// Any numeric scalar
    Number,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Byte => "Byte",
            ValueKind::Short => "Short",
            ValueKind::Long => "Long",
            ValueKind::Rational => "Rational",
            ValueKind::Float => "Float",
            ValueKind::Double => "Double",
            ValueKind::Bytes => "Bytes",
            ValueKind::Shorts => "Shorts",
            ValueKind::Longs => "Longs",
            ValueKind::Rationals => "Rationals",
            ValueKind::Floats => "Floats",
            ValueKind::Doubles => "Doubles",
            ValueKind::Text => "Text",
            ValueKind::Number => "Number",
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl TagValue {
    /// Variant name, used in error messages and listings
    pub fn kind_name(&self) -> &'static str {
        match self {
            TagValue::Byte(_) => "Byte",
            TagValue::Short(_) => "Short",
            TagValue::Long(_) => "Long",
            TagValue::Rational(_) => "Rational",
            TagValue::Float(_) => "Float",
            TagValue::Double(_) => "Double",
            TagValue::Bytes(_) => "Bytes",
            TagValue::Shorts(_) => "Shorts",
            TagValue::Longs(_) => "Longs",
            TagValue::Rationals(_) => "Rationals",
            TagValue::Floats(_) => "Floats",
            TagValue::Doubles(_) => "Doubles",
            TagValue::SBytes(_) => "SBytes",
            TagValue::SShorts(_) => "SShorts",
            TagValue::SLongs(_) => "SLongs",
            TagValue::SLong8s(_) => "SLong8s",
            TagValue::SRationals(_) => "SRationals",
            TagValue::Undefined(_) => "Undefined",
            TagValue::Text(_) => "Text",
            TagValue::OnDemand(_) => "OnDemand",
            TagValue::Unresolved(_) => "Unresolved",
        }
    }

    /// Returns whether this is a single value rather than an array or text
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TagValue::Byte(_)
                | TagValue::Short(_)
                | TagValue::Long(_)
                | TagValue::Rational(_)
                | TagValue::Float(_)
                | TagValue::Double(_)
        )
    }

    /// Wraps a scalar into a one-element array of the same kind
    ///
    /// Non-scalars are returned unchanged.
    pub fn promoted(&self) -> TagValue {
        match self {
            TagValue::Byte(v) => TagValue::Bytes(vec![*v]),
            TagValue::Short(v) => TagValue::Shorts(vec![*v]),
            TagValue::Long(v) => TagValue::Longs(vec![*v]),
            TagValue::Rational(v) => TagValue::Rationals(vec![*v]),
            TagValue::Float(v) => TagValue::Floats(vec![*v]),
            TagValue::Double(v) => TagValue::Doubles(vec![*v]),
            other => other.clone(),
        }
    }

    /// Numeric scalar as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Byte(v) => Some(*v as f64),
            TagValue::Short(v) => Some(*v as f64),
            TagValue::Long(v) => Some(*v as f64),
            TagValue::Rational(r) => Some(r.value()),
            TagValue::Float(v) => Some(*v as f64),
            TagValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// First element of an array as a scalar of the same kind
    ///
    /// `Ok(None)` for an empty array.
    fn first(&self) -> Result<Option<TagValue>> {
        Ok(match self {
            TagValue::Bytes(v) => v.first().map(|x| TagValue::Byte(*x)),
            TagValue::Shorts(v) => v.first().map(|x| TagValue::Short(*x)),
            TagValue::Longs(v) => v.first().map(|x| TagValue::Long(*x)),
            TagValue::Rationals(v) => v.first().map(|x| TagValue::Rational(*x)),
            TagValue::Floats(v) => v.first().map(|x| TagValue::Float(*x)),
            TagValue::Doubles(v) => v.first().map(|x| TagValue::Double(*x)),
            TagValue::OnDemand(a) if a.is_empty() => None,
            TagValue::OnDemand(a) => Some(TagValue::Long(a.get(0)?)),
            _ => None,
        })
    }

    /// Space-joined rendering of an array's elements
    fn joined(&self) -> Option<String> {
        Some(match self {
            TagValue::Bytes(v) | TagValue::Undefined(v) => join(v),
            TagValue::Shorts(v) => join(v),
            TagValue::Longs(v) => join(v),
            TagValue::Rationals(v) | TagValue::SRationals(v) => join(v),
            TagValue::Floats(v) => join(v),
            TagValue::Doubles(v) => join(v),
            TagValue::SBytes(v) => join(v),
            TagValue::SShorts(v) => join(v),
            TagValue::SLongs(v) => join(v),
            TagValue::SLong8s(v) => join(v),
            _ => return None,
        })
    }

    /// Converts this value into the requested shape
    ///
    /// A scalar requested as an array is wrapped in a one-element array; an
    /// array requested as a scalar yields its first element; an array
    /// requested as text is joined with single spaces. `Ok(None)` is returned
    /// when an empty array is asked for its first element. Any other
    /// combination is a [`Error::TypeMismatch`] naming `tag`.
    pub fn coerce(&self, kind: ValueKind, tag: u16) -> Result<Option<TagValue>> {
        let mismatch = || Error::type_mismatch(tag, self.kind_name(), kind.name());
        let same = matches!(
            (kind, self),
            (ValueKind::Byte, TagValue::Byte(_))
                | (ValueKind::Short, TagValue::Short(_))
                | (ValueKind::Long, TagValue::Long(_))
                | (ValueKind::Rational, TagValue::Rational(_))
                | (ValueKind::Float, TagValue::Float(_))
                | (ValueKind::Double, TagValue::Double(_))
                | (ValueKind::Bytes, TagValue::Bytes(_))
                | (ValueKind::Shorts, TagValue::Shorts(_))
                | (ValueKind::Longs, TagValue::Longs(_))
                | (ValueKind::Rationals, TagValue::Rationals(_))
                | (ValueKind::Floats, TagValue::Floats(_))
                | (ValueKind::Doubles, TagValue::Doubles(_))
                | (ValueKind::Text, TagValue::Text(_))
        );
        if same || (kind == ValueKind::Number && self.is_scalar()) {
            return Ok(Some(self.clone()));
        }

        match kind {
            ValueKind::Bytes
            | ValueKind::Shorts
            | ValueKind::Longs
            | ValueKind::Rationals
            | ValueKind::Floats
            | ValueKind::Doubles => {
                let wrapped = self.promoted();
                if let (ValueKind::Longs, TagValue::OnDemand(a)) = (kind, self) {
                    return Ok(Some(TagValue::Longs(a.to_array()?)));
                }
                if self.is_scalar() && wrapped.coerce_kind() == Some(kind) {
                    Ok(Some(wrapped))
                } else {
                    Err(mismatch())
                }
            }
            ValueKind::Text => self.joined().map(|s| Some(TagValue::Text(s))).ok_or_else(mismatch),
            ValueKind::Number => match self.first()? {
                Some(v) => Ok(Some(v)),
                None if self.coerce_kind().and_then(array_of).is_some()
                    || matches!(self, TagValue::OnDemand(_)) =>
                {
                    Ok(None)
                }
                None => Err(mismatch()),
            },
            scalar => match self.first()? {
                Some(v) if v.coerce_kind() == Some(scalar) => Ok(Some(v)),
                None if self.coerce_kind().map(array_of) == Some(Some(scalar)) => Ok(None),
                _ => Err(mismatch()),
            },
        }
    }

    /// The [`ValueKind`] naming this exact variant, where one exists
    fn coerce_kind(&self) -> Option<ValueKind> {
        Some(match self {
            TagValue::Byte(_) => ValueKind::Byte,
            TagValue::Short(_) => ValueKind::Short,
            TagValue::Long(_) => ValueKind::Long,
            TagValue::Rational(_) => ValueKind::Rational,
            TagValue::Float(_) => ValueKind::Float,
            TagValue::Double(_) => ValueKind::Double,
            TagValue::Bytes(_) => ValueKind::Bytes,
            TagValue::Shorts(_) => ValueKind::Shorts,
            TagValue::Longs(_) => ValueKind::Longs,
            TagValue::Rationals(_) => ValueKind::Rationals,
            TagValue::Floats(_) => ValueKind::Floats,
            TagValue::Doubles(_) => ValueKind::Doubles,
            TagValue::Text(_) => ValueKind::Text,
            _ => return None,
        })
    }
}

/// Scalar kind held by an array kind
fn array_of(kind: ValueKind) -> Option<ValueKind> {
    Some(match kind {
        ValueKind::Bytes => ValueKind::Byte,
        ValueKind::Shorts => ValueKind::Short,
        ValueKind::Longs => ValueKind::Long,
        ValueKind::Rationals => ValueKind::Rational,
        ValueKind::Floats => ValueKind::Float,
        ValueKind::Doubles => ValueKind::Double,
        _ => return None,
    })
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Byte(v) => write!(f, "{}", v),
            TagValue::Short(v) => write!(f, "{}", v),
            TagValue::Long(v) => write!(f, "{}", v),
            TagValue::Rational(v) => write!(f, "{}", v),
            TagValue::Float(v) => write!(f, "{}", v),
            TagValue::Double(v) => write!(f, "{}", v),
            TagValue::Text(s) => write!(f, "{:?}", s),
            TagValue::OnDemand(a) => write!(f, "<{} offsets at {}>", a.len(), a.base()),
            TagValue::Unresolved(e) => write!(f, "<unresolved {}>", e),
            other => {
                let text = other.joined().unwrap_or_default();
                if text.len() > 64 {
                    let cut = text.char_indices().nth(64).map_or(text.len(), |(i, _)| i);
                    write!(f, "[{} ...]", &text[..cut])
                } else {
                    write!(f, "[{}]", text)
                }
            }
        }
    }
}

impl From<u8> for TagValue {
    fn from(v: u8) -> Self {
        TagValue::Byte(v)
    }
}

impl From<u16> for TagValue {
    fn from(v: u16) -> Self {
        TagValue::Short(v)
    }
}

impl From<u32> for TagValue {
    fn from(v: u32) -> Self {
        TagValue::Long(v as u64)
    }
}

impl From<u64> for TagValue {
    fn from(v: u64) -> Self {
        TagValue::Long(v)
    }
}

impl From<Rational> for TagValue {
    fn from(v: Rational) -> Self {
        TagValue::Rational(v)
    }
}

impl From<f32> for TagValue {
    fn from(v: f32) -> Self {
        TagValue::Float(v)
    }
}

impl From<f64> for TagValue {
    fn from(v: f64) -> Self {
        TagValue::Double(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Text(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Text(v)
    }
}

impl From<Vec<u8>> for TagValue {
    fn from(v: Vec<u8>) -> Self {
        TagValue::Bytes(v)
    }
}

impl From<Vec<u16>> for TagValue {
    fn from(v: Vec<u16>) -> Self {
        TagValue::Shorts(v)
    }
}

impl From<Vec<u64>> for TagValue {
    fn from(v: Vec<u64>) -> Self {
        TagValue::Longs(v)
    }
}

impl From<Vec<Rational>> for TagValue {
    fn from(v: Vec<Rational>) -> Self {
        TagValue::Rationals(v)
    }
}

impl From<Vec<f32>> for TagValue {
    fn from(v: Vec<f32>) -> Self {
        TagValue::Floats(v)
    }
}

impl From<Vec<f64>> for TagValue {
    fn from(v: Vec<f64>) -> Self {
        TagValue::Doubles(v)
    }
}

impl From<OnDemandOffsetArray> for TagValue {
    fn from(v: OnDemandOffsetArray) -> Self {
        TagValue::OnDemand(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tiff::tags;

    #[test]
    fn test_scalar_wraps_into_array() {
        let v = TagValue::Short(8);
        assert_eq!(
            v.coerce(ValueKind::Shorts, tags::BITS_PER_SAMPLE).unwrap(),
            Some(TagValue::Shorts(vec![8]))
        );
        let v = TagValue::Long(1024);
        assert_eq!(
            v.coerce(ValueKind::Longs, tags::STRIP_OFFSETS).unwrap(),
            Some(TagValue::Longs(vec![1024]))
        );
    }

    #[test]
    fn test_array_joins_into_text() {
        let v = TagValue::Shorts(vec![1, 2, 3]);
        assert_eq!(
            v.coerce(ValueKind::Text, tags::BITS_PER_SAMPLE).unwrap(),
            Some(TagValue::Text("1 2 3".to_string()))
        );
    }

    #[test]
    fn test_array_first_element_as_scalar() {
        let v = TagValue::Longs(vec![7, 8]);
        assert_eq!(v.coerce(ValueKind::Long, tags::ROWS_PER_STRIP).unwrap(), Some(TagValue::Long(7)));
        assert_eq!(v.coerce(ValueKind::Number, tags::ROWS_PER_STRIP).unwrap(), Some(TagValue::Long(7)));

        let empty = TagValue::Longs(vec![]);
        assert_eq!(empty.coerce(ValueKind::Long, tags::ROWS_PER_STRIP).unwrap(), None);
    }

    #[test]
    fn test_mismatch_names_tag() {
        let v = TagValue::Text("abc".to_string());
        let err = v.coerce(ValueKind::Rational, tags::X_RESOLUTION).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { name: "XResolution", found: "Text", expected: "Rational" }
        ));

        let v = TagValue::Short(3);
        assert!(v.coerce(ValueKind::Longs, tags::IMAGE_WIDTH).is_err());
        assert!(v.coerce(ValueKind::Text, tags::IMAGE_WIDTH).is_err());
    }

    #[test]
    fn test_number_accepts_any_scalar() {
        let r = TagValue::Rational(Rational::new(3, 2));
        assert_eq!(r.coerce(ValueKind::Number, tags::X_RESOLUTION).unwrap(), Some(r.clone()));
        assert_eq!(r.as_f64(), Some(1.5));
    }

    #[test]
    fn test_promoted() {
        assert_eq!(TagValue::Double(1.0).promoted(), TagValue::Doubles(vec![1.0]));
        assert_eq!(TagValue::Text("x".into()).promoted(), TagValue::Text("x".into()));
    }

    #[test]
    fn test_display_truncates_long_arrays() {
        let v = TagValue::Longs((0..100).collect());
        let s = v.to_string();
        assert!(s.starts_with("[0 1 2"));
        assert!(s.ends_with("...]"));
    }
}
