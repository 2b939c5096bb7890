//! Schema-driven header field mapping.
//!
//! A [`Schema`] describes one fixed-size header block as a list of
//! [`FieldDescriptor`]s. It is validated once, when it is built, so that a
//! bad layout is rejected before any trace is processed. Decoding turns a
//! raw block into a [`HeaderMap`]; encoding is the reverse and writes zero
//! for every field the map does not contain.
//!
//! Layouts can be supplied as `(offset, name, type)` tuples or loaded from
//! JSON:
//!
//! ```
//! use seg_rs::Schema;
//!
//! let schema = Schema::from_json(r#"{
//!     "block_len": 240,
//!     "fields": [
//!         {"offset": 0, "name": "trace_sequence_line", "type": "i32"},
//!         {"offset": 188, "name": "inline", "type": "i32"},
//!         {"offset": 192, "name": "crossline", "type": "i32"}
//!     ]
//! }"#).unwrap();
//! assert_eq!(schema.fields().len(), 3);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::raw::{BCD_MAX_DIGITS, RawCodec};
use crate::types::FieldType;
use crate::value::{FieldValue, HeaderMap};
use crate::{Result, SegError};

/// One named field inside a header block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Byte offset from the start of the block.
    pub offset: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

impl FieldDescriptor {
    pub fn new(offset: usize, name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            offset,
            name: name.into(),
            ty,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.ty.width()
    }

    /// Nibble range covered by the field; BCD fields may start or end mid-byte.
    fn nibble_span(&self) -> (usize, usize) {
        match self.ty {
            FieldType::Bcd { digits, skip_first } => {
                let start = self.offset * 2 + skip_first as usize;
                (start, start + digits as usize)
            }
            _ => (self.offset * 2, self.end() * 2),
        }
    }
}

/// Validated layout of one fixed-size header block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SchemaConfig", into = "SchemaConfig")]
pub struct Schema {
    block_len: usize,
    reserved_tail: usize,
    fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaConfig {
    block_len: usize,
    #[serde(default)]
    reserved_tail: usize,
    fields: Vec<FieldDescriptor>,
}

impl TryFrom<SchemaConfig> for Schema {
    type Error = SegError;

    fn try_from(config: SchemaConfig) -> Result<Self> {
        Schema::with_reserved_tail(config.block_len, config.reserved_tail, config.fields)
    }
}

impl From<Schema> for SchemaConfig {
    fn from(schema: Schema) -> Self {
        Self {
            block_len: schema.block_len,
            reserved_tail: schema.reserved_tail,
            fields: schema.fields,
        }
    }
}

impl Schema {
    /// Bytes an additional trace header keeps free for its name tag.
    pub const NAME_TAG_LEN: usize = 8;

    /// Build a schema covering a whole `block_len`-byte block.
    pub fn new(block_len: usize, fields: Vec<FieldDescriptor>) -> Result<Self> {
        Self::with_reserved_tail(block_len, 0, fields)
    }

    /// Build a schema for an additional header block whose last
    /// [`Schema::NAME_TAG_LEN`] bytes hold the block name.
    pub fn additional(block_len: usize, fields: Vec<FieldDescriptor>) -> Result<Self> {
        Self::with_reserved_tail(block_len, Self::NAME_TAG_LEN, fields)
    }

    /// Build a schema whose last `reserved_tail` bytes no field may touch.
    pub fn with_reserved_tail(
        block_len: usize,
        reserved_tail: usize,
        mut fields: Vec<FieldDescriptor>,
    ) -> Result<Self> {
        if block_len == 0 {
            return Err(SegError::InvalidSchema("block length must be non-zero".into()));
        }
        if reserved_tail > block_len {
            return Err(SegError::InvalidSchema(format!(
                "reserved tail of {reserved_tail} bytes exceeds block length {block_len}"
            )));
        }

        let mut names = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !names.insert(field.name.as_str()) {
                return Err(SegError::DuplicateField(field.name.clone()));
            }
            if let FieldType::Bcd { digits, .. } = field.ty {
                if digits == 0 || digits as usize > BCD_MAX_DIGITS {
                    return Err(SegError::InvalidSchema(format!(
                        "field `{}` declares {digits} BCD digits",
                        field.name
                    )));
                }
            }
        }

        fields.sort_by_key(|f| f.nibble_span());
        let limit = block_len - reserved_tail;
        for (i, field) in fields.iter().enumerate() {
            if field.end() > limit {
                return Err(SegError::SchemaOutOfBlock {
                    name: field.name.clone(),
                    end: field.end(),
                    limit,
                });
            }
            if i > 0 {
                let previous = &fields[i - 1];
                if previous.nibble_span().1 > field.nibble_span().0 {
                    return Err(SegError::SchemaOverlap {
                        name: field.name.clone(),
                        offset: field.offset,
                        previous: previous.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            block_len,
            reserved_tail,
            fields,
        })
    }

    /// Build a schema from `(offset, name, type)` tuples.
    pub fn from_tuples(block_len: usize, tuples: &[(usize, &str, FieldType)]) -> Result<Self> {
        Self::new(block_len, Self::descriptors(tuples))
    }

    /// Build an additional-header schema from `(offset, name, type)` tuples.
    pub fn additional_from_tuples(
        block_len: usize,
        tuples: &[(usize, &str, FieldType)],
    ) -> Result<Self> {
        Self::additional(block_len, Self::descriptors(tuples))
    }

    fn descriptors(tuples: &[(usize, &str, FieldType)]) -> Vec<FieldDescriptor> {
        tuples
            .iter()
            .map(|&(offset, name, ty)| FieldDescriptor::new(offset, name, ty))
            .collect()
    }

    /// Parse and validate a schema from its JSON configuration form.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchemaConfig = serde_json::from_str(json)
            .map_err(|e| SegError::InvalidSchema(format!("bad schema configuration: {e}")))?;
        Self::try_from(config)
    }

    /// Serialize the schema to its JSON configuration form.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&SchemaConfig::from(self.clone()))
            .unwrap_or_else(|_| String::from("{}"))
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn reserved_tail(&self) -> usize {
        self.reserved_tail
    }

    /// Fields sorted by offset.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    fn check_len(&self, block: &[u8]) -> Result<()> {
        if block.len() < self.block_len {
            return Err(SegError::BlockTooShort {
                expected: self.block_len,
                actual: block.len(),
            });
        }
        Ok(())
    }

    /// Decode every field of `block` into a fresh map.
    pub fn decode(&self, codec: &RawCodec, block: &[u8]) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        self.decode_into(codec, block, &mut map)?;
        Ok(map)
    }

    /// Decode every field of `block` and add them to `map`.
    ///
    /// `map` is left untouched if any field fails to decode.
    pub fn decode_into(&self, codec: &RawCodec, block: &[u8], map: &mut HeaderMap) -> Result<()> {
        self.check_len(block)?;
        let mut decoded = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            decoded.push((field.name.clone(), codec.read_field(block, field.offset, field.ty)?));
        }
        map.extend(decoded);
        Ok(())
    }

    /// Decode a single named field.
    pub fn decode_field(&self, codec: &RawCodec, block: &[u8], name: &str) -> Result<FieldValue> {
        self.check_len(block)?;
        let field = self
            .field(name)
            .ok_or_else(|| SegError::UnknownField(name.to_string()))?;
        codec.read_field(block, field.offset, field.ty)
    }

    /// Encode `map` into a new zeroed block.
    pub fn encode(&self, codec: &RawCodec, map: &HeaderMap) -> Result<Vec<u8>> {
        let mut block = vec![0u8; self.block_len];
        self.encode_into(codec, map, &mut block)?;
        Ok(block)
    }

    /// Encode `map` over the fields of `block`.
    ///
    /// Fields absent from `map` are written as zero; bytes outside every
    /// field are left as they are. Keys the schema does not name are ignored.
    pub fn encode_into(&self, codec: &RawCodec, map: &HeaderMap, block: &mut [u8]) -> Result<()> {
        self.check_len(block)?;
        let zero = FieldValue::U8(0);
        for field in &self.fields {
            let value = map.get(&field.name).unwrap_or(&zero);
            codec.write_field(block, field.offset, field.ty, value)?;
        }
        Ok(())
    }
}

/// A primary header schema followed by the schemas of chained blocks.
///
/// Field names are unique across the whole chain so that all blocks of a
/// trace decode into one [`HeaderMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChain {
    primary: Schema,
    additional: Vec<Schema>,
}

impl SchemaChain {
    pub fn new(primary: Schema, additional: Vec<Schema>) -> Result<Self> {
        let mut names = HashSet::new();
        for schema in std::iter::once(&primary).chain(&additional) {
            for field in schema.fields() {
                if !names.insert(field.name.as_str()) {
                    return Err(SegError::DuplicateField(field.name.clone()));
                }
            }
        }
        Ok(Self {
            primary,
            additional,
        })
    }

    pub fn primary(&self) -> &Schema {
        &self.primary
    }

    /// Schemas for the chained blocks, in block order.
    pub fn additional(&self) -> &[Schema] {
        &self.additional
    }

    /// Schema for chained block `index` (0 = first block after the primary).
    pub fn additional_at(&self, index: usize) -> Option<&Schema> {
        self.additional.get(index)
    }

    /// Locate a field anywhere in the chain: `None` for the primary block,
    /// `Some(i)` for chained block `i`.
    pub fn locate(&self, name: &str) -> Option<(Option<usize>, &FieldDescriptor)> {
        if let Some(field) = self.primary.field(name) {
            return Some((None, field));
        }
        self.additional
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.field(name).map(|f| (Some(i), f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn simple() -> Schema {
        Schema::from_tuples(
            16,
            &[
                (0, "a", FieldType::I32),
                (4, "b", FieldType::U16),
                (6, "c", FieldType::I24),
                (9, "d", FieldType::Ibm32),
                (13, "e", FieldType::Bcd { digits: 4, skip_first: false }),
            ],
        )
        .unwrap()
    }

    #[test]
    fn overlap_rejected() {
        let err = Schema::from_tuples(
            16,
            &[(0, "a", FieldType::I32), (2, "b", FieldType::I16)],
        )
        .unwrap_err();
        match err {
            SegError::SchemaOverlap {
                name,
                offset,
                previous,
            } => {
                assert_eq!(name, "b");
                assert_eq!(offset, 2);
                assert_eq!(previous, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reserved_tail_rejected() {
        let err = Schema::additional_from_tuples(240, &[(230, "x", FieldType::I32)]).unwrap_err();
        assert!(matches!(
            err,
            SegError::SchemaOutOfBlock {
                end: 234,
                limit: 232,
                ..
            }
        ));
        assert!(Schema::additional_from_tuples(240, &[(228, "x", FieldType::I32)]).is_ok());
    }

    #[test]
    fn field_past_block_rejected() {
        assert!(Schema::from_tuples(8, &[(6, "x", FieldType::I32)]).is_err());
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = Schema::from_tuples(8, &[(0, "x", FieldType::I16), (4, "x", FieldType::I16)])
            .unwrap_err();
        assert!(matches!(err, SegError::DuplicateField(n) if n == "x"));
    }

    #[test]
    fn bcd_nibbles_may_share_a_byte() {
        Schema::from_tuples(
            4,
            &[
                (0, "first", FieldType::Bcd { digits: 3, skip_first: false }),
                (1, "second", FieldType::Bcd { digits: 3, skip_first: true }),
            ],
        )
        .unwrap();
    }

    #[test]
    fn absent_fields_encode_as_zero() {
        let schema = simple();
        let mut map = HeaderMap::new();
        map.insert("b".into(), FieldValue::U16(0xBEEF));
        let block = schema.encode(&RawCodec::BIG, &map).unwrap();
        assert_eq!(&block[4..6], &[0xBE, 0xEF]);
        assert!(block[..4].iter().all(|&b| b == 0));
        let decoded = schema.decode(&RawCodec::BIG, &block).unwrap();
        assert_eq!(decoded["a"], FieldValue::I32(0));
        assert_eq!(decoded.len(), 5);
    }

    #[test]
    fn short_block_is_an_error() {
        assert!(matches!(
            simple().decode(&RawCodec::BIG, &[0u8; 4]),
            Err(SegError::BlockTooShort { expected: 16, actual: 4 })
        ));
    }

    #[test]
    fn json_config_roundtrip() {
        let schema = simple();
        let parsed = Schema::from_json(&schema.to_json()).unwrap();
        assert_eq!(parsed, schema);
        assert!(Schema::from_json(
            r#"{"block_len": 8, "fields": [{"offset": 6, "name": "x", "type": "i32"}]}"#
        )
        .is_err());
    }

    #[test]
    fn chain_names_unique() {
        let a = Schema::from_tuples(4, &[(0, "x", FieldType::I32)]).unwrap();
        let b = Schema::additional_from_tuples(12, &[(0, "x", FieldType::I32)]).unwrap();
        assert!(SchemaChain::new(a, vec![b]).is_err());
    }

    proptest! {
        #[test]
        fn header_roundtrip(
            a in any::<i32>(),
            b in any::<u16>(),
            c in -0x80_0000i32..0x80_0000,
            d in any::<u32>(),
            e in 0u64..10_000,
            little in any::<bool>(),
        ) {
            let codec = if little { RawCodec::LITTLE } else { RawCodec::BIG };
            let mut map = HeaderMap::new();
            map.insert("a".into(), FieldValue::I32(a));
            map.insert("b".into(), FieldValue::U16(b));
            map.insert("c".into(), FieldValue::I32(c));
            map.insert("d".into(), FieldValue::F64(crate::raw::ibm_to_f64(d)));
            map.insert("e".into(), FieldValue::U64(e));
            let schema = simple();
            let block = schema.encode(&codec, &map).unwrap();
            prop_assert_eq!(schema.decode(&codec, &block).unwrap(), map);
        }
    }
}
