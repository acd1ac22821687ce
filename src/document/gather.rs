//! Gather: columnar projection of heterogeneous documents into typed
//! columns with validity/conversion/collision bitmaps (spec §4.4.4).

use super::path::{self};
use super::value::Node;
use crate::request::{bitmap_bytes_for, bitmap_set};

/// The scalar or text type a gather column projects its field into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// UTF-8 text tape.
    String,
    /// Raw byte tape.
    Binary,
}

impl DesiredType {
    fn scalar_width(self) -> Option<usize> {
        match self {
            DesiredType::Bool | DesiredType::I8 | DesiredType::U8 => Some(1),
            DesiredType::I16 | DesiredType::U16 => Some(2),
            DesiredType::I32 | DesiredType::U32 | DesiredType::F32 => Some(4),
            DesiredType::I64 | DesiredType::U64 | DesiredType::F64 => Some(8),
            DesiredType::String | DesiredType::Binary => None,
        }
    }

    fn is_signed(self) -> bool {
        matches!(self, DesiredType::I8 | DesiredType::I16 | DesiredType::I32 | DesiredType::I64)
    }

    fn is_float(self) -> bool {
        matches!(self, DesiredType::F32 | DesiredType::F64)
    }

    fn is_text(self) -> bool {
        matches!(self, DesiredType::String | DesiredType::Binary)
    }
}

/// One column of a gather header: the field path to project and the
/// desired output type.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub field: String,
    pub desired: DesiredType,
}

/// One gathered column's output.
#[derive(Debug, Clone, Default)]
pub struct GatherColumn {
    pub validity: Vec<u8>,
    pub conversion: Vec<u8>,
    pub collision: Vec<u8>,
    /// Dense `rows * width` bytes, present for every non-text column.
    pub scalar: Option<Vec<u8>>,
    /// Present for text (string/binary) columns: `offsets.len() == rows + 1`.
    pub offsets: Option<Vec<u32>>,
    pub tape: Option<Vec<u8>>,
}

enum Stored<'a> {
    Missing,
    Null,
    Bool(bool),
    /// `signed` is the stored value's own category (its `Node` variant),
    /// kept so `coerce` can tell a same-category integer target (exact if
    /// fits, else truncate) from a cross-category one (signed/unsigned
    /// reinterpretation is always a conversion when valid).
    Integer { value: i128, signed: bool },
    Float(f64),
    Text(&'a str),
    Binary(&'a [u8]),
    Compound,
}

fn classify(value: Option<&Node>) -> Stored<'_> {
    match value {
        None => Stored::Missing,
        Some(Node::Null) => Stored::Null,
        Some(Node::Bool(b)) => Stored::Bool(*b),
        Some(Node::I8(v)) => Stored::Integer { value: *v as i128, signed: true },
        Some(Node::I16(v)) => Stored::Integer { value: *v as i128, signed: true },
        Some(Node::I32(v)) => Stored::Integer { value: *v as i128, signed: true },
        Some(Node::I64(v)) => Stored::Integer { value: *v as i128, signed: true },
        Some(Node::U8(v)) => Stored::Integer { value: *v as i128, signed: false },
        Some(Node::U16(v)) => Stored::Integer { value: *v as i128, signed: false },
        Some(Node::U32(v)) => Stored::Integer { value: *v as i128, signed: false },
        Some(Node::U64(v)) => Stored::Integer { value: *v as i128, signed: false },
        Some(Node::F32(v)) => Stored::Float(*v as f64),
        Some(Node::F64(v)) => Stored::Float(*v),
        Some(Node::String(s)) => Stored::Text(s),
        Some(Node::Binary(b)) => Stored::Binary(b),
        Some(Node::Array(_)) | Some(Node::Object(_)) => Stored::Compound,
    }
}

fn integer_fits(value: i128, desired: DesiredType) -> bool {
    let (lo, hi): (i128, i128) = match desired {
        DesiredType::I8 => (i8::MIN as i128, i8::MAX as i128),
        DesiredType::I16 => (i16::MIN as i128, i16::MAX as i128),
        DesiredType::I32 => (i32::MIN as i128, i32::MAX as i128),
        DesiredType::I64 => (i64::MIN as i128, i64::MAX as i128),
        DesiredType::U8 => (0, u8::MAX as i128),
        DesiredType::U16 => (0, u16::MAX as i128),
        DesiredType::U32 => (0, u32::MAX as i128),
        DesiredType::U64 => (0, u64::MAX as i128),
        _ => return false,
    };
    value >= lo && value <= hi
}

/// Outcome of coercing one stored value toward one column's desired type.
struct Coercion {
    valid: bool,
    converted: bool,
    collided: bool,
    /// Numeric value to bake into the dense scalar slot, always written
    /// even when invalid (defaults to 0).
    numeric: i128,
    /// Text to bake into the tape, for text columns only.
    text: Option<Vec<u8>>,
}

fn invalid() -> Coercion {
    Coercion { valid: false, converted: false, collided: false, numeric: 0, text: None }
}

fn collision() -> Coercion {
    Coercion { valid: false, converted: false, collided: true, numeric: 0, text: None }
}

fn coerce(stored: &Stored<'_>, desired: DesiredType) -> Coercion {
    if desired.is_text() {
        return coerce_to_text(stored);
    }
    match stored {
        Stored::Missing | Stored::Null => invalid(),
        Stored::Compound => collision(),
        Stored::Bool(b) => {
            let v = *b as i128;
            if desired == DesiredType::Bool {
                Coercion { valid: true, converted: false, collided: false, numeric: v, text: None }
            } else if desired.is_float() {
                let bits = (v as f64).to_bits() as i128;
                Coercion { valid: true, converted: true, collided: false, numeric: bits, text: None }
            } else {
                Coercion { valid: true, converted: true, collided: false, numeric: v, text: None }
            }
        }
        Stored::Integer { value: v, signed } => {
            let v = *v;
            if desired == DesiredType::Bool {
                let valid = v == 0 || v == 1;
                Coercion { valid, converted: valid, collided: false, numeric: if valid { v } else { 0 }, text: None }
            } else if desired.is_float() {
                let bits = (v as f64).to_bits() as i128;
                Coercion { valid: true, converted: true, collided: false, numeric: bits, text: None }
            } else if *signed == desired.is_signed() {
                // Same category: exact if it fits, else truncate into the
                // requested width (spec §4.4.4: "exact if fits, else convert").
                let fits = integer_fits(v, desired);
                Coercion { valid: true, converted: !fits, collided: false, numeric: v, text: None }
            } else {
                // Cross category: signed<->unsigned reinterpretation is
                // itself a conversion whenever the value lands in range
                // (spec §4.4.4: "convert iff ≥0" / "convert iff fits").
                let fits = integer_fits(v, desired);
                Coercion { valid: fits, converted: fits, collided: false, numeric: if fits { v } else { 0 }, text: None }
            }
        }
        Stored::Float(v) => {
            if desired == DesiredType::Bool {
                let valid = *v == 0.0 || *v == 1.0;
                Coercion { valid, converted: valid, collided: false, numeric: if valid { *v as i128 } else { 0 }, text: None }
            } else if desired.is_float() {
                Coercion { valid: true, converted: false, collided: false, numeric: v.to_bits() as i128, text: None }
            } else {
                let whole = v.fract() == 0.0;
                let as_int = *v as i128;
                let valid = whole && integer_fits(as_int, desired);
                Coercion { valid, converted: valid, collided: false, numeric: if valid { as_int } else { 0 }, text: None }
            }
        }
        Stored::Text(s) => {
            if desired == DesiredType::Bool {
                match *s {
                    "true" => Coercion { valid: true, converted: true, collided: false, numeric: 1, text: None },
                    "false" => Coercion { valid: true, converted: true, collided: false, numeric: 0, text: None },
                    _ => collision(),
                }
            } else if desired.is_float() {
                match s.parse::<f64>() {
                    Ok(v) => Coercion { valid: true, converted: true, collided: false, numeric: v.to_bits() as i128, text: None },
                    Err(_) => collision(),
                }
            } else {
                match s.parse::<i128>() {
                    Ok(v) if integer_fits(v, desired) => {
                        Coercion { valid: true, converted: true, collided: false, numeric: v, text: None }
                    }
                    Ok(_) => collision(),
                    Err(_) => collision(),
                }
            }
        }
        Stored::Binary(bytes) => {
            let width = desired.scalar_width().unwrap_or(0);
            if bytes.len() != width {
                return invalid();
            }
            let numeric: i128 = if desired.is_float() {
                if width == 4 {
                    f32::from_le_bytes(bytes[..4].try_into().unwrap()) as f64
                } else {
                    f64::from_le_bytes(bytes[..8].try_into().unwrap())
                }
                .to_bits() as i128
            } else if desired == DesiredType::Bool {
                (bytes[0] != 0) as i128
            } else if desired.is_signed() {
                match width {
                    1 => bytes[0] as i8 as i128,
                    2 => i16::from_le_bytes(bytes[..2].try_into().unwrap()) as i128,
                    4 => i32::from_le_bytes(bytes[..4].try_into().unwrap()) as i128,
                    _ => i64::from_le_bytes(bytes[..8].try_into().unwrap()) as i128,
                }
            } else {
                match width {
                    1 => bytes[0] as i128,
                    2 => u16::from_le_bytes(bytes[..2].try_into().unwrap()) as i128,
                    4 => u32::from_le_bytes(bytes[..4].try_into().unwrap()) as i128,
                    _ => u64::from_le_bytes(bytes[..8].try_into().unwrap()) as i128,
                }
            };
            Coercion { valid: true, converted: true, collided: false, numeric, text: None }
        }
    }
}

fn coerce_to_text(stored: &Stored<'_>) -> Coercion {
    match stored {
        Stored::Missing | Stored::Null => invalid(),
        Stored::Compound => collision(),
        Stored::Bool(b) => Coercion {
            valid: true,
            converted: true,
            collided: false,
            numeric: 0,
            text: Some(if *b { b"true".to_vec() } else { b"false".to_vec() }),
        },
        Stored::Integer { value: v, .. } => Coercion { valid: true, converted: true, collided: false, numeric: 0, text: Some(v.to_string().into_bytes()) },
        Stored::Float(v) => Coercion { valid: true, converted: true, collided: false, numeric: 0, text: Some(v.to_string().into_bytes()) },
        Stored::Text(s) => Coercion { valid: true, converted: false, collided: false, numeric: 0, text: Some(s.as_bytes().to_vec()) },
        Stored::Binary(b) => Coercion { valid: true, converted: false, collided: false, numeric: 0, text: Some(b.to_vec()) },
    }
}

fn write_scalar_slot(scalar: &mut [u8], row: usize, width: usize, desired: DesiredType, numeric: i128) {
    let slot = &mut scalar[row * width..(row + 1) * width];
    match desired {
        DesiredType::Bool | DesiredType::U8 => slot.copy_from_slice(&[(numeric & 0xff) as u8]),
        DesiredType::I8 => slot.copy_from_slice(&(numeric as i8).to_le_bytes()),
        DesiredType::I16 => slot.copy_from_slice(&(numeric as i16).to_le_bytes()),
        DesiredType::I32 => slot.copy_from_slice(&(numeric as i32).to_le_bytes()),
        DesiredType::I64 => slot.copy_from_slice(&(numeric as i64).to_le_bytes()),
        DesiredType::U16 => slot.copy_from_slice(&(numeric as u16).to_le_bytes()),
        DesiredType::U32 => slot.copy_from_slice(&(numeric as u32).to_le_bytes()),
        DesiredType::U64 => slot.copy_from_slice(&(numeric as u64).to_le_bytes()),
        DesiredType::F32 => slot.copy_from_slice(&(f64::from_bits(numeric as u64) as f32).to_le_bytes()),
        DesiredType::F64 => slot.copy_from_slice(&f64::from_bits(numeric as u64).to_le_bytes()),
        DesiredType::String | DesiredType::Binary => unreachable!("text columns have no scalar slot"),
    }
}

/// Project `documents` through `headers`, one [`GatherColumn`] per header
/// entry, row-aligned with `documents`.
pub fn gather(documents: &[Node], headers: &[ColumnSpec]) -> Vec<GatherColumn> {
    let rows = documents.len();
    headers
        .iter()
        .map(|header| {
            let parsed_path = path::parse(&header.field).unwrap_or_default();
            let mut validity = vec![0u8; bitmap_bytes_for(rows)];
            let mut conversion = vec![0u8; bitmap_bytes_for(rows)];
            let mut collision_bits = vec![0u8; bitmap_bytes_for(rows)];

            if let Some(width) = header.desired.scalar_width() {
                let mut scalar = vec![0u8; rows * width];
                for (row, doc) in documents.iter().enumerate() {
                    let value = path::get(doc, &parsed_path);
                    let stored = classify(value);
                    let outcome = coerce(&stored, header.desired);
                    write_scalar_slot(&mut scalar, row, width, header.desired, outcome.numeric);
                    if outcome.valid {
                        bitmap_set(&mut validity, row);
                    }
                    if outcome.converted {
                        bitmap_set(&mut conversion, row);
                    }
                    if outcome.collided {
                        bitmap_set(&mut collision_bits, row);
                    }
                }
                GatherColumn { validity, conversion, collision: collision_bits, scalar: Some(scalar), offsets: None, tape: None }
            } else {
                let mut offsets = Vec::with_capacity(rows + 1);
                let mut tape = Vec::new();
                offsets.push(0u32);
                for (row, doc) in documents.iter().enumerate() {
                    let value = path::get(doc, &parsed_path);
                    let stored = classify(value);
                    let outcome = coerce(&stored, header.desired);
                    if let Some(text) = &outcome.text {
                        tape.extend_from_slice(text);
                    }
                    offsets.push(tape.len() as u32);
                    if outcome.valid {
                        bitmap_set(&mut validity, row);
                    }
                    if outcome.converted {
                        bitmap_set(&mut conversion, row);
                    }
                    if outcome.collided {
                        bitmap_set(&mut collision_bits, row);
                    }
                }
                GatherColumn {
                    validity,
                    conversion,
                    collision: collision_bits,
                    scalar: None,
                    offsets: Some(offsets),
                    tape: Some(tape),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::bitmap_get;

    fn sample() -> Node {
        Node::Object(vec![(
            "a".to_string(),
            Node::Object(vec![("b".to_string(), Node::U8(1)), ("c".to_string(), Node::String("3.5".to_string()))]),
        )])
    }

    #[test]
    fn concrete_scenario_six() {
        let docs = vec![sample()];
        let headers = vec![
            ColumnSpec { field: "/a/b".to_string(), desired: DesiredType::I32 },
            ColumnSpec { field: "/a/c".to_string(), desired: DesiredType::F64 },
            ColumnSpec { field: "/missing".to_string(), desired: DesiredType::Bool },
        ];
        let columns = gather(&docs, &headers);

        assert!(bitmap_get(&columns[0].validity, 0));
        // u8 -> i32 crosses signedness, so it's a conversion even though it fits.
        assert!(bitmap_get(&columns[0].conversion, 0));
        assert!(!bitmap_get(&columns[0].collision, 0));
        assert_eq!(i32::from_le_bytes(columns[0].scalar.as_ref().unwrap()[0..4].try_into().unwrap()), 1);

        assert!(bitmap_get(&columns[1].validity, 0));
        assert!(bitmap_get(&columns[1].conversion, 0));
        assert!(!bitmap_get(&columns[1].collision, 0));
        assert_eq!(f64::from_le_bytes(columns[1].scalar.as_ref().unwrap()[0..8].try_into().unwrap()), 3.5);

        assert!(!bitmap_get(&columns[2].validity, 0));
        assert!(!bitmap_get(&columns[2].conversion, 0));
        assert!(!bitmap_get(&columns[2].collision, 0));
    }

    #[test]
    fn object_requested_as_scalar_collides() {
        let docs = vec![Node::Object(vec![("a".to_string(), Node::Object(vec![]))])];
        let headers = vec![ColumnSpec { field: "/a".to_string(), desired: DesiredType::U64 }];
        let columns = gather(&docs, &headers);
        assert!(bitmap_get(&columns[0].collision, 0));
        assert!(!bitmap_get(&columns[0].validity, 0));
    }

    #[test]
    fn same_category_overflow_truncates_instead_of_invalidating() {
        let docs = vec![Node::Object(vec![("n".to_string(), Node::I32(300))])];
        let headers = vec![ColumnSpec { field: "/n".to_string(), desired: DesiredType::I8 }];
        let columns = gather(&docs, &headers);
        assert!(bitmap_get(&columns[0].validity, 0));
        assert!(bitmap_get(&columns[0].conversion, 0));
        assert!(!bitmap_get(&columns[0].collision, 0));
        assert_eq!(columns[0].scalar.as_ref().unwrap()[0] as i8, 300i32 as i8);
    }

    #[test]
    fn cross_signedness_conversion_bit_set_even_when_value_fits() {
        let docs = vec![Node::Object(vec![("n".to_string(), Node::U64(5))])];
        let headers = vec![ColumnSpec { field: "/n".to_string(), desired: DesiredType::I32 }];
        let columns = gather(&docs, &headers);
        assert!(bitmap_get(&columns[0].validity, 0));
        assert!(bitmap_get(&columns[0].conversion, 0));
        assert_eq!(i32::from_le_bytes(columns[0].scalar.as_ref().unwrap()[0..4].try_into().unwrap()), 5);
    }

    #[test]
    fn cross_signedness_out_of_range_is_invalid() {
        let docs = vec![Node::Object(vec![("n".to_string(), Node::I32(-1))])];
        let headers = vec![ColumnSpec { field: "/n".to_string(), desired: DesiredType::U32 }];
        let columns = gather(&docs, &headers);
        assert!(!bitmap_get(&columns[0].validity, 0));
        assert!(!bitmap_get(&columns[0].conversion, 0));
        assert!(!bitmap_get(&columns[0].collision, 0));
    }

    #[test]
    fn gather_is_idempotent() {
        let docs = vec![sample()];
        let headers = vec![ColumnSpec { field: "/a/c".to_string(), desired: DesiredType::String }];
        let first = gather(&docs, &headers);
        let second = gather(&docs, &headers);
        assert_eq!(first[0].tape, second[0].tape);
        assert_eq!(first[0].validity, second[0].validity);
    }
}
