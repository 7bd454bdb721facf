//! Fixed-layout binary records exchanged with the device.
//!
//! Every command declares its request and response layout as a [`Schema`]:
//! an ordered list of named fields with a fixed total width. Integers are
//! little-endian, char arrays are ASCII padded with a fill byte.
//!
//! ```
//! use ledger_iota_wallet::codec::{Schema, Value};
//!
//! let schema = Schema::new().u8("finalized").chars("bundle_hash", 81, b'9');
//! assert_eq!(schema.width(), 82);
//!
//! let bytes = schema.encode(&[Value::from(1u8), Value::from("ABC")]);
//! let record = schema.decode(&bytes).unwrap();
//! assert_eq!(record.uint("finalized").unwrap(), 1);
//! assert!(record.chars("bundle_hash").unwrap().starts_with("ABC999"));
//! ```

use byteorder::{ByteOrder, LittleEndian};

use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    U8,
    I8,
    U16,
    U32,
    I64,
    /// Tryte string (`9A-Z`) of exactly `len` bytes, right-padded with
    /// `fill`.
    Chars { len: usize, fill: u8 },
    /// `len` consecutive items of the same kind.
    Array { len: usize, item: Box<Kind> },
    Record(Schema),
}

impl Kind {
    pub fn width(&self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::I64 => 8,
            Self::Chars { len, .. } => *len,
            Self::Array { len, item } => len * item.width(),
            Self::Record(schema) => schema.width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
}

/// Ordered field layout of one binary record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

/// A field value. Unsigned kinds take [`Value::Uint`], signed kinds
/// [`Value::Int`], arrays and sub-records [`Value::List`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(u64),
    Int(i64),
    Chars(String),
    List(Vec<Value>),
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::Uint(v.into())
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::Uint(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(v.into())
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Chars(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Chars(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, kind: Kind) -> Self {
        self.fields.push(Field { name, kind });
        self
    }

    pub fn u8(self, name: &'static str) -> Self {
        self.field(name, Kind::U8)
    }

    pub fn i8(self, name: &'static str) -> Self {
        self.field(name, Kind::I8)
    }

    pub fn u16(self, name: &'static str) -> Self {
        self.field(name, Kind::U16)
    }

    pub fn u32(self, name: &'static str) -> Self {
        self.field(name, Kind::U32)
    }

    pub fn i64(self, name: &'static str) -> Self {
        self.field(name, Kind::I64)
    }

    pub fn chars(self, name: &'static str, len: usize, fill: u8) -> Self {
        self.field(name, Kind::Chars { len, fill })
    }

    pub fn array(self, name: &'static str, len: usize, item: Kind) -> Self {
        self.field(
            name,
            Kind::Array {
                len,
                item: Box::new(item),
            },
        )
    }

    pub fn record(self, name: &'static str, schema: Schema) -> Self {
        self.field(name, Kind::Record(schema))
    }

    /// Append all fields of `other` after the fields of `self`.
    pub fn extend(mut self, other: Schema) -> Self {
        self.fields.extend(other.fields);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Total encoded size in bytes.
    pub fn width(&self) -> usize {
        self.fields.iter().map(|f| f.kind.width()).sum()
    }

    /// Encode `values` (one per field, in field order).
    ///
    /// # Panics
    ///
    /// Panics if the number of values does not match the fields, or a value
    /// does not fit its field (wrong kind, integer out of range, char value
    /// longer than the field or outside the tryte alphabet). Callers
    /// validate first.
    pub fn encode(&self, values: &[Value]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.width());
        self.encode_into(values, &mut buf);
        debug_assert_eq!(buf.len(), self.width());
        buf
    }

    fn encode_into(&self, values: &[Value], buf: &mut Vec<u8>) {
        assert_eq!(
            values.len(),
            self.fields.len(),
            "expected {} values, got {}",
            self.fields.len(),
            values.len()
        );
        for (field, value) in self.fields.iter().zip(values) {
            encode_value(field.name, &field.kind, value, buf);
        }
    }

    /// Decode a record. Bytes beyond [`width()`](Schema::width) are ignored.
    pub fn decode(&self, bytes: &[u8]) -> Result<Record, LedgerError> {
        if bytes.len() < self.width() {
            return Err(LedgerError::MalformedResponse(format!(
                "expected at least {} bytes, got {}",
                self.width(),
                bytes.len()
            )));
        }
        let mut offset = 0;
        let fields = self.decode_fields(bytes, &mut offset)?;
        Ok(Record { fields })
    }

    fn decode_fields(
        &self,
        bytes: &[u8],
        offset: &mut usize,
    ) -> Result<Vec<(&'static str, Value)>, LedgerError> {
        self.fields
            .iter()
            .map(|f| Ok((f.name, decode_value(f.name, &f.kind, bytes, offset)?)))
            .collect()
    }
}

fn encode_value(name: &str, kind: &Kind, value: &Value, buf: &mut Vec<u8>) {
    match (kind, value) {
        (Kind::U8, Value::Uint(v)) => {
            let v = u8::try_from(*v).unwrap_or_else(|_| out_of_range(name, v));
            buf.push(v);
        }
        (Kind::I8, Value::Int(v)) => {
            let v = i8::try_from(*v).unwrap_or_else(|_| out_of_range(name, v));
            buf.push(v as u8);
        }
        (Kind::U16, Value::Uint(v)) => {
            let v = u16::try_from(*v).unwrap_or_else(|_| out_of_range(name, v));
            let mut b = [0u8; 2];
            LittleEndian::write_u16(&mut b, v);
            buf.extend_from_slice(&b);
        }
        (Kind::U32, Value::Uint(v)) => {
            let v = u32::try_from(*v).unwrap_or_else(|_| out_of_range(name, v));
            let mut b = [0u8; 4];
            LittleEndian::write_u32(&mut b, v);
            buf.extend_from_slice(&b);
        }
        (Kind::I64, Value::Int(v)) => {
            let mut b = [0u8; 8];
            LittleEndian::write_i64(&mut b, *v);
            buf.extend_from_slice(&b);
        }
        (Kind::Chars { len, fill }, Value::Chars(s)) => {
            assert!(
                s.len() <= *len && s.bytes().all(is_tryte),
                "field `{name}` takes at most {len} trytes, got {s:?}"
            );
            buf.extend_from_slice(s.as_bytes());
            buf.resize(buf.len() + (len - s.len()), *fill);
        }
        (Kind::Array { len, item }, Value::List(items)) => {
            assert_eq!(
                items.len(),
                *len,
                "field `{name}` takes {len} items, got {}",
                items.len()
            );
            for v in items {
                encode_value(name, item, v, buf);
            }
        }
        (Kind::Record(schema), Value::List(values)) => schema.encode_into(values, buf),
        (kind, value) => panic!("field `{name}` of kind {kind:?} cannot hold {value:?}"),
    }
}

fn is_tryte(b: u8) -> bool {
    b == b'9' || b.is_ascii_uppercase()
}

fn out_of_range<T: std::fmt::Display, R>(name: &str, v: T) -> R {
    panic!("value {v} out of range for field `{name}`")
}

fn decode_value(
    name: &str,
    kind: &Kind,
    bytes: &[u8],
    offset: &mut usize,
) -> Result<Value, LedgerError> {
    let start = *offset;
    let end = start + kind.width();
    let chunk = &bytes[start..end];

    let value = match kind {
        Kind::U8 => Value::Uint(chunk[0].into()),
        Kind::I8 => Value::Int((chunk[0] as i8).into()),
        Kind::U16 => Value::Uint(LittleEndian::read_u16(chunk).into()),
        Kind::U32 => Value::Uint(LittleEndian::read_u32(chunk).into()),
        Kind::I64 => Value::Int(LittleEndian::read_i64(chunk)),
        Kind::Chars { .. } => {
            if !chunk.is_ascii() {
                return Err(LedgerError::MalformedResponse(format!(
                    "field `{name}` is not ASCII"
                )));
            }
            Value::Chars(String::from_utf8_lossy(chunk).into_owned())
        }
        Kind::Array { len, item } => {
            let mut items = Vec::with_capacity(*len);
            for _ in 0..*len {
                items.push(decode_value(name, item, bytes, offset)?);
            }
            *offset = end;
            return Ok(Value::List(items));
        }
        Kind::Record(schema) => {
            let fields = schema.decode_fields(bytes, offset)?;
            *offset = end;
            return Ok(Value::List(fields.into_iter().map(|(_, v)| v).collect()));
        }
    };

    *offset = end;
    Ok(value)
}

/// A decoded record with typed access by field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(&'static str, Value)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn uint(&self, name: &str) -> Result<u64, LedgerError> {
        match self.get(name) {
            Some(Value::Uint(v)) => Ok(*v),
            _ => Err(missing(name, "unsigned integer")),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, LedgerError> {
        match self.get(name) {
            Some(Value::Int(v)) => Ok(*v),
            _ => Err(missing(name, "signed integer")),
        }
    }

    pub fn chars(&self, name: &str) -> Result<&str, LedgerError> {
        match self.get(name) {
            Some(Value::Chars(s)) => Ok(s),
            _ => Err(missing(name, "char array")),
        }
    }

    pub fn list(&self, name: &str) -> Result<&[Value], LedgerError> {
        match self.get(name) {
            Some(Value::List(items)) => Ok(items),
            _ => Err(missing(name, "array")),
        }
    }

    /// All values in field order.
    pub fn into_values(self) -> Vec<Value> {
        self.fields.into_iter().map(|(_, v)| v).collect()
    }
}

fn missing(name: &str, what: &str) -> LedgerError {
    LedgerError::MalformedResponse(format!("no {what} field `{name}` in record"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_schema() -> Schema {
        Schema::new()
            .chars("address", 81, b'9')
            .u32("address_idx")
            .i64("value")
            .chars("tag", 27, b'9')
            .u32("tx_idx")
            .u32("tx_len")
            .u32("time")
    }

    #[test]
    fn widths_are_summed() {
        assert_eq!(tx_schema().width(), 81 + 4 + 8 + 27 + 4 + 4 + 4);
        let nested = Schema::new()
            .array("paths", 5, Kind::Record(Schema::new().i64("path")))
            .i64("security");
        assert_eq!(nested.width(), 5 * 8 + 8);
    }

    #[test]
    fn integers_are_little_endian() {
        let schema = Schema::new().u16("a").u32("b").i64("c").i8("d");
        let bytes = schema.encode(&[
            Value::from(0x0102u16),
            Value::from(0x0A0B0C0Du32),
            Value::from(-2i64),
            Value::from(-1i8),
        ]);
        assert_eq!(
            bytes,
            vec![
                0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
                0xFF, 0xFF
            ]
        );
    }

    #[test]
    fn chars_are_padded_with_fill() {
        let schema = Schema::new().chars("tag", 5, b'9');
        assert_eq!(schema.encode(&[Value::from("AB")]), b"AB999".to_vec());
    }

    #[test]
    fn tx_round_trip() {
        let schema = tx_schema();
        let values = vec![
            Value::from("A".repeat(81)),
            Value::from(7u32),
            Value::from(-2_779_530_283_277_761i64),
            Value::from("TAG".to_string() + &"9".repeat(24)),
            Value::from(3u32),
            Value::from(5u32),
            Value::from(u32::MAX),
        ];
        let bytes = schema.encode(&values);
        assert_eq!(bytes.len(), schema.width());
        assert_eq!(schema.decode(&bytes).unwrap().into_values(), values);
    }

    #[test]
    fn nested_round_trip() {
        let schema = Schema::new()
            .u8("security")
            .u32("path_len")
            .array("path", 3, Kind::U32)
            .record("inner", Schema::new().i8("remaining").u16("len"));
        let values = vec![
            Value::from(2u8),
            Value::from(3u32),
            Value::from(vec![0x8000_002Cu32, 0x8000_107A, 0]),
            Value::List(vec![Value::from(-5i8), Value::from(513u16)]),
        ];
        let record = schema.decode(&schema.encode(&values)).unwrap();
        assert_eq!(record.list("path").unwrap().len(), 3);
        assert_eq!(record.into_values(), values);
    }

    #[test]
    fn decode_short_buffer_is_malformed() {
        let schema = Schema::new().u8("finalized").chars("bundle_hash", 81, b'9');
        let err = schema.decode(&[1u8; 81]).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedResponse(_)));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let schema = Schema::new().u8("a");
        let record = schema.decode(&[4, 5, 6]).unwrap();
        assert_eq!(record.uint("a").unwrap(), 4);
    }

    #[test]
    fn decode_non_ascii_chars_is_malformed() {
        let schema = Schema::new().chars("address", 2, b'9');
        assert!(matches!(
            schema.decode(&[0x41, 0xFF]),
            Err(LedgerError::MalformedResponse(_))
        ));
    }

    #[test]
    fn typed_getter_mismatch_is_malformed() {
        let record = Schema::new().u8("a").decode(&[1]).unwrap();
        assert!(matches!(record.int("a"), Err(LedgerError::MalformedResponse(_))));
        assert!(matches!(record.uint("b"), Err(LedgerError::MalformedResponse(_))));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn u8_out_of_range_panics() {
        Schema::new().u8("security").encode(&[Value::Uint(256)]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn i8_out_of_range_panics() {
        Schema::new().i8("remaining").encode(&[Value::Int(-129)]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn u32_out_of_range_panics() {
        Schema::new().u32("index").encode(&[Value::Uint(1 << 32)]);
    }

    #[test]
    #[should_panic(expected = "at most 3 trytes")]
    fn chars_too_long_panics() {
        Schema::new().chars("tag", 3, b'9').encode(&[Value::from("ABCD")]);
    }

    #[test]
    #[should_panic(expected = "cannot hold")]
    fn wrong_kind_panics() {
        Schema::new().u32("index").encode(&[Value::Int(1)]);
    }

    #[test]
    #[should_panic(expected = "expected 2 values")]
    fn wrong_value_count_panics() {
        Schema::new().u8("a").u8("b").encode(&[Value::from(1u8)]);
    }

    #[test]
    #[should_panic(expected = "trytes")]
    fn chars_outside_tryte_alphabet_panic() {
        Schema::new().chars("address", 3, b'9').encode(&[Value::from("A\0B")]);
    }

    #[test]
    #[should_panic(expected = "trytes")]
    fn lowercase_chars_panic() {
        Schema::new().chars("tag", 5, b'9').encode(&[Value::from("abc")]);
    }
}
