use crate::{
    TYPE_BOOL, TYPE_BYTE, TYPE_SHORT, TYPE_USHORT, TYPE_INT, TYPE_UINT, TYPE_LONG, TYPE_ULONG,
    TYPE_FLOAT, TYPE_DOUBLE, TYPE_STRING, TYPE_DATE,
    bb::{ByteBuffer, ByteBufferMut},
    error::WireError,
    schema::{Def, DefKind, EnumValue, Field, FieldKind, Schema},
};

use serde_json::{Map, Value as Json};
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

/// This type holds dynamic Helium data.
///
/// Values can represent anything in a Helium schema and can be converted to and
/// from byte arrays or JSON using the corresponding [Schema](struct.Schema.html).
/// Enums and field names are stored using string slices from their Schema
/// for efficiency. This means that a Value can outlive the buffer it was parsed
/// from but can't outlive the schema.
///
/// A message that extends another message is a single flat
/// [Object](#variant.Object) holding the fields of every level.
#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    String(String),
    Date(i64),
    Array(Vec<Value<'a>>),
    Enum(&'a str, &'a str),
    Object(&'a str, HashMap<&'a str, Value<'a>>),

    /// The active member of a `oneof` group.
    Variant(&'a str, Box<Value<'a>>),
}

impl<'a> Value<'a> {
    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// A convenience method to extract the value out of a [Byte](#variant.Byte).
    /// Returns `0` for other value kinds.
    pub fn as_byte(&self) -> u8 {
        match *self {
            Value::Byte(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract any signed or unsigned integer up to
    /// 32 bits as an `i64`. Returns `0` for other value kinds.
    pub fn as_int(&self) -> i64 {
        match *self {
            Value::Byte(value) => value as i64,
            Value::Short(value) => value as i64,
            Value::UShort(value) => value as i64,
            Value::Int(value) => value as i64,
            Value::UInt(value) => value as i64,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Long](#variant.Long)
    /// or a [Date](#variant.Date). Returns `0` for other value kinds.
    pub fn as_long(&self) -> i64 {
        match *self {
            Value::Long(value) | Value::Date(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [ULong](#variant.ULong).
    /// Returns `0` for other value kinds.
    pub fn as_ulong(&self) -> u64 {
        match *self {
            Value::ULong(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract a [Float](#variant.Float) or a
    /// [Double](#variant.Double). Returns `0.0` for other value kinds.
    pub fn as_double(&self) -> f64 {
        match *self {
            Value::Float(value) => value as f64,
            Value::Double(value) => value,
            _ => 0.0,
        }
    }

    /// A convenience method to extract the value out of a [String](#variant.String).
    /// Returns `""` for other value kinds.
    pub fn as_string(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            Value::Enum(_, value) => value,
            _ => "",
        }
    }

    /// A convenience method to get an array of values out of an [Array](#variant.Array).
    /// Returns an empty array for other value kinds.
    pub fn as_array(&self) -> &[Value<'a>] {
        match *self {
            Value::Array(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to extract the value out of an [Enum](#variant.Enum).
    /// Returns `("", "")` for other value kinds.
    pub fn as_enum(&self) -> (&str, &str) {
        match *self {
            Value::Enum(name, value) => (name, value),
            _ => ("", ""),
        }
    }

    /// A convenience method to extract the length out of an [Array](#variant.Array).
    /// Returns `0` for other value kinds.
    pub fn len(&self) -> usize {
        match *self {
            Value::Array(ref values) => values.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to an [Array](#variant.Array). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value<'a>) {
        if let Value::Array(ref mut values) = *self {
            values.push(value);
        }
    }

    /// A convenience method to extract a field out of an [Object](#variant.Object).
    /// Returns `None` for other value kinds or if the field isn't present.
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        match *self {
            Value::Object(_, ref fields) => fields.get(name),
            _ => None,
        }
    }

    /// A convenience method to update a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn set(&mut self, name: &'a str, value: Value<'a>) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.insert(name, value);
        }
    }

    /// A convenience method to remove a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn remove(&mut self, name: &'a str) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.remove(name);
        }
    }

    /// Decodes the type specified by `type_id` and `schema` from `bytes`.
    pub fn decode(schema: &'a Schema, type_id: i32, bytes: &[u8]) -> Result<Value<'a>, WireError> {
        Value::decode_bb(schema, type_id, &mut ByteBuffer::new(bytes))
    }

    /// Encodes this value into an array of bytes using the provided `schema`.
    pub fn encode(&self, schema: &Schema) -> Result<Vec<u8>, WireError> {
        let mut bb = ByteBufferMut::new();
        self.encode_bb(schema, &mut bb)?;
        Ok(bb.data())
    }

    /// Decodes the type specified by `type_id` and `schema` from `bb` starting
    /// at the current index. After this function returns, the current index will
    /// be advanced by the amount of data that was successfully parsed. This is
    /// mainly useful as a helper routine for [decode](#method.decode), which you
    /// probably want to use instead.
    pub fn decode_bb(
        schema: &'a Schema,
        type_id: i32,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, WireError> {
        match type_id {
            TYPE_BOOL => Ok(Value::Bool(bb.read_bool()?)),
            TYPE_BYTE => Ok(Value::Byte(bb.read_byte()?)),
            TYPE_SHORT => Ok(Value::Short(bb.read_int16()?)),
            TYPE_USHORT => Ok(Value::UShort(bb.read_uint16()?)),
            TYPE_INT => Ok(Value::Int(bb.read_int32()?)),
            TYPE_UINT => Ok(Value::UInt(bb.read_uint32()?)),
            TYPE_LONG => Ok(Value::Long(bb.read_int64()?)),
            TYPE_ULONG => Ok(Value::ULong(bb.read_uint64()?)),
            TYPE_FLOAT => Ok(Value::Float(bb.read_float32()?)),
            TYPE_DOUBLE => Ok(Value::Double(bb.read_float64()?)),
            TYPE_STRING => Ok(Value::String(bb.read_string()?)),
            TYPE_DATE => Ok(Value::Date(bb.read_date()?)),

            _ => {
                let def = lookup_def(schema, type_id)?;

                match def.kind {
                    DefKind::Enum => {
                        let value = if def.has_string_values() {
                            EnumValue::String(bb.read_string()?)
                        } else {
                            EnumValue::Int(bb.read_int32()?)
                        };
                        match def.variant_by_value(&value) {
                            Some(variant) => Ok(Value::Enum(def.name.as_str(), variant.name.as_str())),
                            None => Err(WireError::InvalidEnumValue(def.name.clone())),
                        }
                    }

                    DefKind::Message => {
                        let mut fields = HashMap::new();
                        bb.read_nested(|bb| Value::decode_message_bb(schema, def, bb, &mut fields))?;
                        Ok(Value::Object(def.name.as_str(), fields))
                    }
                }
            }
        }
    }

    /// Reads the fields of `def` followed by its continuation marker, and the
    /// fields of each base message after that, into one flat field map.
    fn decode_message_bb(
        schema: &'a Schema,
        def: &'a Def,
        bb: &mut ByteBuffer,
        fields: &mut HashMap<&'a str, Value<'a>>,
    ) -> Result<(), WireError> {
        for field in &def.fields {
            // oneof groups have no binary representation
            if let FieldKind::Value { type_id, is_array } = field.kind {
                if field.is_optional && !bb.read_presence()? {
                    continue;
                }
                fields.insert(
                    field.name.as_str(),
                    Value::decode_field_bb(schema, type_id, is_array, bb)?,
                );
            }
        }

        if !bb.read_continuation()? {
            return Ok(());
        }
        match def.extends {
            Some(base) => Value::decode_message_bb(schema, &schema.defs[base], bb, fields),
            None => Err(WireError::UnexpectedContinuation(def.name.clone())),
        }
    }

    /// Decodes a single field value, which is an array when `is_array` is set.
    pub fn decode_field_bb(
        schema: &'a Schema,
        type_id: i32,
        is_array: bool,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, WireError> {
        if is_array {
            let len = bb.read_len()?;
            let mut array = Vec::with_capacity(len.min(bb.remaining()));
            for _ in 0..len {
                array.push(Value::decode_bb(schema, type_id, bb)?);
            }
            Ok(Value::Array(array))
        } else {
            Value::decode_bb(schema, type_id, bb)
        }
    }

    /// Encodes the current value to the end of `bb` using the provided `schema`.
    /// This is mainly useful as a helper routine for [encode](#method.encode),
    /// which you probably want to use instead.
    pub fn encode_bb(&self, schema: &Schema, bb: &mut ByteBufferMut) -> Result<(), WireError> {
        match *self {
            Value::Bool(value) => bb.write_bool(value),
            Value::Byte(value) => bb.write_byte(value),
            Value::Short(value) => bb.write_int16(value),
            Value::UShort(value) => bb.write_uint16(value),
            Value::Int(value) => bb.write_int32(value),
            Value::UInt(value) => bb.write_uint32(value),
            Value::Long(value) => bb.write_int64(value),
            Value::ULong(value) => bb.write_uint64(value),
            Value::Float(value) => bb.write_float32(value),
            Value::Double(value) => bb.write_float64(value),
            Value::String(ref value) => bb.write_string(value)?,
            Value::Date(value) => bb.write_date(value),

            Value::Array(ref values) => {
                bb.write_len(values.len())?;
                for value in values {
                    value.encode_bb(schema, bb)?;
                }
            }

            Value::Enum(name, value) => {
                let def = schema.def(name).ok_or_else(|| WireError::UnknownType(name.to_owned()))?;
                let variant = def
                    .variant_by_name(value)
                    .ok_or_else(|| WireError::InvalidEnumValue(name.to_owned()))?;
                match variant.value {
                    EnumValue::Int(value) => bb.write_int32(value),
                    EnumValue::String(ref value) => bb.write_string(value)?,
                }
            }

            Value::Object(name, ref fields) => {
                let def = schema.def(name).ok_or_else(|| WireError::UnknownType(name.to_owned()))?;
                if def.kind != DefKind::Message {
                    return Err(WireError::TypeMismatch {
                        name:     name.to_owned(),
                        expected: "enum member".to_owned(),
                    });
                }
                encode_message_bb(schema, def, fields, bb)?;
            }

            // oneof groups have no binary representation
            Value::Variant(..) => {}
        }
        Ok(())
    }

    /// Converts this value to JSON. Enums become their member name and a
    /// `oneof` value becomes a single-key object.
    pub fn to_json(&self) -> Json {
        match *self {
            Value::Bool(value) => Json::Bool(value),
            Value::Byte(value) => Json::from(value),
            Value::Short(value) => Json::from(value),
            Value::UShort(value) => Json::from(value),
            Value::Int(value) => Json::from(value),
            Value::UInt(value) => Json::from(value),
            Value::Long(value) | Value::Date(value) => Json::from(value),
            Value::ULong(value) => Json::from(value),
            Value::Float(value) => Json::from(value),
            Value::Double(value) => Json::from(value),
            Value::String(ref value) => Json::String(value.clone()),
            Value::Array(ref values) => Json::Array(values.iter().map(Value::to_json).collect()),
            Value::Enum(_, value) => Json::String(value.to_owned()),

            Value::Object(_, ref fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert((*key).to_owned(), value.to_json());
                }
                Json::Object(map)
            }

            Value::Variant(name, ref value) => {
                let mut map = Map::new();
                map.insert(name.to_owned(), value.to_json());
                Json::Object(map)
            }
        }
    }

    /// Builds a value of the type `type_id` from JSON, checking it against the
    /// schema.
    pub fn from_json(schema: &'a Schema, type_id: i32, json: &Json) -> Result<Value<'a>, WireError> {
        Value::from_json_named(schema, type_id, json, "value")
    }

    fn from_json_named(
        schema: &'a Schema,
        type_id: i32,
        json: &Json,
        name: &str,
    ) -> Result<Value<'a>, WireError> {
        let mismatch = || WireError::TypeMismatch {
            name:     name.to_owned(),
            expected: type_name(schema, type_id),
        };

        let value = match type_id {
            TYPE_BOOL => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
            TYPE_BYTE => Value::Byte(json_int(json).ok_or_else(mismatch)?),
            TYPE_SHORT => Value::Short(json_int(json).ok_or_else(mismatch)?),
            TYPE_USHORT => Value::UShort(json_int(json).ok_or_else(mismatch)?),
            TYPE_INT => Value::Int(json_int(json).ok_or_else(mismatch)?),
            TYPE_UINT => Value::UInt(json_int(json).ok_or_else(mismatch)?),
            TYPE_LONG => Value::Long(json.as_i64().ok_or_else(mismatch)?),
            TYPE_ULONG => Value::ULong(json.as_u64().ok_or_else(mismatch)?),
            TYPE_FLOAT => Value::Float(json.as_f64().ok_or_else(mismatch)? as f32),
            TYPE_DOUBLE => Value::Double(json.as_f64().ok_or_else(mismatch)?),
            TYPE_STRING => Value::String(json.as_str().ok_or_else(mismatch)?.to_owned()),
            TYPE_DATE => Value::Date(json.as_i64().ok_or_else(mismatch)?),

            _ => {
                let def = lookup_def(schema, type_id)?;
                match def.kind {
                    DefKind::Enum => {
                        let member = json.as_str().ok_or_else(mismatch)?;
                        let variant = def
                            .variant_by_name(member)
                            .ok_or_else(|| WireError::InvalidEnumValue(def.name.clone()))?;
                        Value::Enum(def.name.as_str(), variant.name.as_str())
                    }
                    DefKind::Message => {
                        let object = json.as_object().ok_or_else(mismatch)?;
                        let mut fields = HashMap::new();
                        Value::message_from_json(schema, def, object, &mut fields)?;
                        Value::Object(def.name.as_str(), fields)
                    }
                }
            }
        };
        Ok(value)
    }

    fn message_from_json(
        schema: &'a Schema,
        def: &'a Def,
        object: &Map<String, Json>,
        fields: &mut HashMap<&'a str, Value<'a>>,
    ) -> Result<(), WireError> {
        for field in &def.fields {
            let json = match object.get(&field.name) {
                Some(Json::Null) | None => {
                    if field.is_optional {
                        continue;
                    }
                    return Err(WireError::MissingField(field.name.clone()));
                }
                Some(json) => json,
            };
            fields.insert(field.name.as_str(), Value::field_from_json(schema, field, json)?);
        }
        match def.extends {
            Some(base) => Value::message_from_json(schema, &schema.defs[base], object, fields),
            None => Ok(()),
        }
    }

    fn field_from_json(schema: &'a Schema, field: &'a Field, json: &Json) -> Result<Value<'a>, WireError> {
        match field.kind {
            FieldKind::Value { type_id, is_array: false } => {
                Value::from_json_named(schema, type_id, json, &field.name)
            }

            FieldKind::Value { type_id, is_array: true } => {
                let items = json.as_array().ok_or_else(|| WireError::TypeMismatch {
                    name:     field.name.clone(),
                    expected: format!("{}[]", type_name(schema, type_id)),
                })?;
                let mut array = Vec::with_capacity(items.len());
                for item in items {
                    array.push(Value::from_json_named(schema, type_id, item, &field.name)?);
                }
                Ok(Value::Array(array))
            }

            FieldKind::OneOf(ref members) => {
                let object = json.as_object().filter(|object| object.len() == 1);
                let (key, inner) = match object.and_then(|object| object.iter().next()) {
                    Some(entry) => entry,
                    None => {
                        return Err(WireError::TypeMismatch {
                            name:     field.name.clone(),
                            expected: "an object with exactly one member".to_owned(),
                        })
                    }
                };
                let member = members
                    .iter()
                    .find(|member| &member.name == key)
                    .ok_or_else(|| WireError::UnknownType(key.clone()))?;
                let value = Value::field_from_json(schema, member, inner)?;
                Ok(Value::Variant(member.name.as_str(), Box::new(value)))
            }
        }
    }
}

fn encode_message_bb(
    schema: &Schema,
    def: &Def,
    fields: &HashMap<&str, Value>,
    bb: &mut ByteBufferMut,
) -> Result<(), WireError> {
    for field in &def.fields {
        let (type_id, is_array) = match field.kind {
            FieldKind::Value { type_id, is_array } => (type_id, is_array),
            FieldKind::OneOf(_) => continue,
        };

        match fields.get(field.name.as_str()) {
            Some(value) => {
                if field.is_optional {
                    bb.write_presence(true);
                }
                encode_field_bb(schema, field, type_id, is_array, value, bb)?;
            }
            None if field.is_optional => bb.write_presence(false),
            None => return Err(WireError::MissingField(field.name.clone())),
        }
    }

    match def.extends {
        Some(base) => {
            bb.write_continuation(true);
            encode_message_bb(schema, &schema.defs[base], fields, bb)
        }
        None => {
            bb.write_continuation(false);
            Ok(())
        }
    }
}

fn encode_field_bb(
    schema: &Schema,
    field: &Field,
    type_id: i32,
    is_array: bool,
    value: &Value,
    bb: &mut ByteBufferMut,
) -> Result<(), WireError> {
    if !is_array {
        return encode_typed_bb(schema, field, type_id, value, bb);
    }
    match *value {
        Value::Array(ref values) => {
            bb.write_len(values.len())?;
            for value in values {
                encode_typed_bb(schema, field, type_id, value, bb)?;
            }
            Ok(())
        }
        _ => Err(WireError::TypeMismatch {
            name:     field.name.clone(),
            expected: format!("{}[]", type_name(schema, type_id)),
        }),
    }
}

/// Checks `value` against `type_id` before writing it, so a value of the
/// wrong kind can't produce bytes the other side would misread.
fn encode_typed_bb(
    schema: &Schema,
    field: &Field,
    type_id: i32,
    value: &Value,
    bb: &mut ByteBufferMut,
) -> Result<(), WireError> {
    let matches = match (type_id, value) {
        (TYPE_BOOL, Value::Bool(_))
        | (TYPE_BYTE, Value::Byte(_))
        | (TYPE_SHORT, Value::Short(_))
        | (TYPE_USHORT, Value::UShort(_))
        | (TYPE_INT, Value::Int(_))
        | (TYPE_UINT, Value::UInt(_))
        | (TYPE_LONG, Value::Long(_))
        | (TYPE_ULONG, Value::ULong(_))
        | (TYPE_FLOAT, Value::Float(_))
        | (TYPE_DOUBLE, Value::Double(_))
        | (TYPE_STRING, Value::String(_))
        | (TYPE_DATE, Value::Date(_)) => true,
        (_, Value::Enum(name, _)) | (_, Value::Object(name, _)) if type_id >= 0 => {
            schema.type_id(name) == Some(type_id)
        }
        _ => false,
    };
    if !matches {
        return Err(WireError::TypeMismatch {
            name:     field.name.clone(),
            expected: type_name(schema, type_id),
        });
    }
    value.encode_bb(schema, bb)
}

fn lookup_def(schema: &Schema, type_id: i32) -> Result<&Def, WireError> {
    usize::try_from(type_id)
        .ok()
        .and_then(|index| schema.defs.get(index))
        .ok_or_else(|| WireError::UnknownType(type_id.to_string()))
}

fn json_int<T: TryFrom<i64>>(json: &Json) -> Option<T> {
    json.as_i64().and_then(|value| T::try_from(value).ok())
}

/// Returns the schema spelling of a type id, for error messages.
pub fn type_name(schema: &Schema, type_id: i32) -> String {
    let name = match type_id {
        TYPE_BOOL => "boolean",
        TYPE_BYTE => "byte",
        TYPE_SHORT => "short",
        TYPE_USHORT => "ushort",
        TYPE_INT => "int",
        TYPE_UINT => "uint",
        TYPE_LONG => "long",
        TYPE_ULONG => "ulong",
        TYPE_FLOAT => "float",
        TYPE_DOUBLE => "double",
        TYPE_STRING => "string",
        TYPE_DATE => "date",
        _ => {
            return match lookup_def(schema, type_id) {
                Ok(def) => def.name.clone(),
                Err(_) => type_id.to_string(),
            }
        }
    };
    name.to_owned()
}

impl<'a> Index<usize> for Value<'a> {
    type Output = Value<'a>;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't an [Array](#variant.Array) or if the
    /// provided index is out of bounds. Decoded values come from untrusted
    /// bytes, so prefer `as_array().get(index)` and [get](#method.get) for them.
    fn index(&self, index: usize) -> &Value<'a> {
        match *self {
            Value::Array(ref values) => &values[index],
            _ => panic!("cannot index a non-array value"),
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::Byte(value) => value.fmt(f),
            Value::Short(value) => value.fmt(f),
            Value::UShort(value) => value.fmt(f),
            Value::Int(value) => value.fmt(f),
            Value::UInt(value) => value.fmt(f),
            Value::Long(value) => value.fmt(f),
            Value::ULong(value) => value.fmt(f),
            Value::Float(value) => value.fmt(f),
            Value::Double(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Date(value) => write!(f, "date({})", value),
            Value::Array(ref values) => values.fmt(f),
            Value::Enum(name, ref value) => write!(f, "{}::{}", name, value),
            Value::Variant(name, ref value) => write!(f, "{}({:?})", name, value),

            Value::Object(name, ref fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                let mut first = true;
                keys.sort();
                write!(f, "{} {{", name)?;

                for key in keys {
                    if first {
                        first = false;
                    } else {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, fields[key])?;
                }

                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumVariant, Field};

    fn object<'a>(name: &'a str, entries: Vec<(&'a str, Value<'a>)>) -> Value<'a> {
        Value::Object(name, entries.into_iter().collect())
    }

    fn scenario_schema() -> Schema {
        Schema::new(vec![Def::message(
            "M".to_owned(),
            vec![
                Field::new("a", 1, TYPE_INT, false, false),
                Field::new("b", 2, TYPE_STRING, false, true),
            ],
            None,
        )])
    }

    fn inheritance_schema() -> Schema {
        Schema::new(vec![
            Def::message("A".to_owned(), vec![Field::new("x", 1, TYPE_BYTE, false, false)], None),
            Def::message("B".to_owned(), vec![Field::new("y", 1, TYPE_SHORT, false, false)], Some(0)),
        ])
    }

    fn kitchen_sink_schema() -> Schema {
        Schema::new(vec![
            Def::enumeration(
                "Shape".to_owned(),
                vec![
                    EnumVariant { name: "FLAT".to_owned(), value: EnumValue::Int(10) },
                    EnumVariant { name: "ROUND".to_owned(), value: EnumValue::Int(20) },
                ],
            ),
            Def::enumeration(
                "Mood".to_owned(),
                vec![EnumVariant { name: "HAPPY".to_owned(), value: EnumValue::String("happy".to_owned()) }],
            ),
            Def::message("Point".to_owned(), vec![Field::new("x", 1, TYPE_FLOAT, false, false)], None),
            Def::message(
                "Sink".to_owned(),
                vec![
                    Field::new("flag", 1, TYPE_BOOL, false, false),
                    Field::new("count", 2, TYPE_ULONG, false, false),
                    Field::new("ratio", 3, TYPE_DOUBLE, false, false),
                    Field::new("when", 4, TYPE_DATE, false, true),
                    Field::new("shape", 5, 0, false, false),
                    Field::new("mood", 6, 1, false, true),
                    Field::new("points", 7, 2, true, false),
                    Field::new("data", 8, TYPE_BYTE, true, false),
                    Field::one_of("choice", 9, vec![
                        Field::new("small", 1, TYPE_USHORT, false, false),
                        Field::new("names", 2, TYPE_STRING, true, false),
                    ]),
                ],
                None,
            ),
        ])
    }

    #[test]
    fn value_basic() {
        let value = Value::Array(vec![
            Value::Bool(true),
            Value::Byte(255),
            Value::Int(-1),
            Value::UInt(1),
            Value::Float(0.5),
            Value::String("abc".to_owned()),
            Value::Enum("Foo", "FOO"),
            object("Obj", vec![
                ("key1", Value::String("value1".to_owned())),
                ("key2", Value::String("value2".to_owned())),
            ]),
        ]);

        assert_eq!(value.len(), 8);
        assert_eq!(value[0].as_bool(), true);
        assert_eq!(value[1].as_byte(), 255);
        assert_eq!(value[2].as_int(), -1);
        assert_eq!(value[3].as_int(), 1);
        assert_eq!(value[4].as_double(), 0.5);
        assert_eq!(value[5].as_string(), "abc");
        assert_eq!(value[6].as_enum(), ("Foo", "FOO"));
        assert_eq!(value.get("key1"), None);
        assert_eq!(
            value[7].get("key1"),
            Some(&Value::String("value1".to_owned()))
        );

        assert_eq!(
            format!("{:?}", value),
            "[true, 255, -1, 1, 0.5, \"abc\", Foo::FOO, Obj {key1: \"value1\", key2: \"value2\"}]"
        );
    }

    #[test]
    fn decode_nesting_limit() {
        use crate::bb::{ABSENT, END, MAX_NESTING_DEPTH, PRESENT};

        let schema = Schema::new(vec![Def::message(
            "Node".to_owned(),
            vec![Field::new("next", 1, 0, false, true)],
            None,
        )]);

        // Every present marker opens another Node.
        assert_eq!(
            Value::decode(&schema, 0, &vec![PRESENT; 2_000_000]),
            Err(WireError::NestingTooDeep(MAX_NESTING_DEPTH))
        );

        let mut bytes = vec![PRESENT; MAX_NESTING_DEPTH - 1];
        bytes.push(ABSENT);
        bytes.extend(vec![END; MAX_NESTING_DEPTH]);
        let value = Value::decode(&schema, 0, &bytes).unwrap();
        assert_eq!(value.encode(&schema).unwrap(), bytes);

        let mut node = &value;
        for _ in 1..MAX_NESTING_DEPTH {
            node = node.get("next").unwrap();
        }
        assert_eq!(node.get("next"), None);
        assert_eq!(node.as_array().get(0), None);
    }

    #[test]
    fn value_push() {
        let mut value = Value::Array(vec![]);
        assert!(value.is_empty());

        value.push(Value::Int(123));
        value.push(Value::Int(456));
        assert_eq!(value.len(), 2);
        assert_eq!(value[0], Value::Int(123));
        assert_eq!(value[1], Value::Int(456));
    }

    #[test]
    fn value_set_and_remove() {
        let mut value = Value::Object("Foo", HashMap::new());
        assert_eq!(value.get("x"), None);

        value.set("x", Value::Int(123));
        value.set("y", Value::Int(456));
        assert_eq!(value.get("x"), Some(&Value::Int(123)));

        value.set("x", Value::Int(789));
        assert_eq!(value.get("x"), Some(&Value::Int(789)));

        value.remove("x");
        assert_eq!(value.get("x"), None);
        assert_eq!(value.get("y"), Some(&Value::Int(456)));
    }

    #[test]
    fn optional_field_present() {
        let schema = scenario_schema();
        let value = object("M", vec![("a", Value::Int(5)), ("b", Value::String("hi".to_owned()))]);
        let bytes = value.encode(&schema).unwrap();
        assert_eq!(bytes, [5, 0, 0, 0, 0, 2, 0, 0, 0, b'h', b'i', 0]);
        assert_eq!(Value::decode(&schema, 0, &bytes).unwrap(), value);
    }

    #[test]
    fn optional_field_absent() {
        let schema = scenario_schema();
        let value = object("M", vec![("a", Value::Int(5))]);
        let bytes = value.encode(&schema).unwrap();
        assert_eq!(bytes, [5, 0, 0, 0, 255, 0]);

        let decoded = Value::decode(&schema, 0, &bytes).unwrap();
        assert_eq!(decoded.get("b"), None);
        assert_eq!(decoded, value);
    }

    #[test]
    fn missing_required_field() {
        let schema = scenario_schema();
        let value = object("M", vec![("b", Value::String("hi".to_owned()))]);
        assert_eq!(value.encode(&schema), Err(WireError::MissingField("a".to_owned())));
    }

    #[test]
    fn wrong_value_kind() {
        let schema = scenario_schema();
        let value = object("M", vec![("a", Value::Long(5))]);
        assert!(matches!(
            value.encode(&schema),
            Err(WireError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn extension_chain() {
        let schema = inheritance_schema();
        let value = object("B", vec![("x", Value::Byte(7)), ("y", Value::Short(-2))]);
        let bytes = value.encode(&schema).unwrap();
        assert_eq!(bytes, [254, 255, 1, 7, 0]);

        let decoded = Value::decode(&schema, 1, &bytes).unwrap();
        assert_eq!(decoded.get("x"), Some(&Value::Byte(7)));
        assert_eq!(decoded.get("y"), Some(&Value::Short(-2)));
        assert_eq!(decoded, value);
    }

    #[test]
    fn older_sender_without_base() {
        let schema = inheritance_schema();
        let decoded = Value::decode(&schema, 1, &[3, 0, 0]).unwrap();
        assert_eq!(decoded.get("y"), Some(&Value::Short(3)));
        assert_eq!(decoded.get("x"), None);
    }

    #[test]
    fn continuation_without_base() {
        let schema = scenario_schema();
        assert_eq!(
            Value::decode(&schema, 0, &[5, 0, 0, 0, 255, 1]),
            Err(WireError::UnexpectedContinuation("M".to_owned()))
        );
        assert_eq!(
            Value::decode(&schema, 0, &[5, 0, 0, 0, 255, 9]),
            Err(WireError::InvalidContinuationMarker(9))
        );
    }

    #[test]
    fn kitchen_sink_binary() {
        let schema = kitchen_sink_schema();
        let value = object("Sink", vec![
            ("flag", Value::Bool(true)),
            ("count", Value::ULong(u64::MAX)),
            ("ratio", Value::Double(1.25)),
            ("when", Value::Date(1_700_000_000_000)),
            ("shape", Value::Enum("Shape", "ROUND")),
            ("mood", Value::Enum("Mood", "HAPPY")),
            ("points", Value::Array(vec![object("Point", vec![("x", Value::Float(0.5))])])),
            ("data", Value::Array(vec![Value::Byte(1), Value::Byte(2)])),
        ]);

        let bytes = value.encode(&schema).unwrap();
        let decoded = Value::decode(&schema, 3, &bytes).unwrap();
        assert_eq!(decoded, value);

        // shape is written as its int32 value, mood as its string value
        let shape_offset = 1 + 8 + 8 + 9;
        assert_eq!(bytes[shape_offset..shape_offset + 4], [20, 0, 0, 0]);
        assert_eq!(bytes[shape_offset + 4], 0);
        assert_eq!(bytes[shape_offset + 5..shape_offset + 14], [5, 0, 0, 0, b'h', b'a', b'p', b'p', b'y']);
    }

    #[test]
    fn oneof_is_not_encoded() {
        let schema = kitchen_sink_schema();
        let mut value = object("Sink", vec![
            ("flag", Value::Bool(false)),
            ("count", Value::ULong(0)),
            ("ratio", Value::Double(0.0)),
            ("shape", Value::Enum("Shape", "FLAT")),
            ("points", Value::Array(vec![])),
            ("data", Value::Array(vec![])),
        ]);
        let without = value.encode(&schema).unwrap();
        value.set("choice", Value::Variant("small", Box::new(Value::UShort(3))));
        let with = value.encode(&schema).unwrap();
        assert_eq!(without, with);
    }

    #[test]
    fn invalid_enum_value() {
        let schema = kitchen_sink_schema();
        assert_eq!(
            Value::decode(&schema, 0, &[30, 0, 0, 0]),
            Err(WireError::InvalidEnumValue("Shape".to_owned()))
        );
        assert_eq!(
            Value::decode(&schema, 99, &[]),
            Err(WireError::UnknownType("99".to_owned()))
        );
    }

    #[test]
    fn json_round_trip() {
        let schema = kitchen_sink_schema();
        let value = object("Sink", vec![
            ("flag", Value::Bool(true)),
            ("count", Value::ULong(42)),
            ("ratio", Value::Double(1.25)),
            ("shape", Value::Enum("Shape", "FLAT")),
            ("points", Value::Array(vec![object("Point", vec![("x", Value::Float(0.5))])])),
            ("data", Value::Array(vec![Value::Byte(9)])),
            ("choice", Value::Variant("names", Box::new(Value::Array(vec![Value::String("a".to_owned())])))),
        ]);

        let json = value.to_json();
        assert_eq!(json["shape"], Json::String("FLAT".to_owned()));
        assert_eq!(json["choice"]["names"][0], Json::String("a".to_owned()));
        assert!(json.get("when").is_none());

        let decoded = Value::from_json(&schema, 3, &json).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn json_inherited_fields() {
        let schema = inheritance_schema();
        let json: Json = serde_json::from_str(r#"{"x": 7, "y": -2}"#).unwrap();
        let value = Value::from_json(&schema, 1, &json).unwrap();
        assert_eq!(value, object("B", vec![("x", Value::Byte(7)), ("y", Value::Short(-2))]));

        let json: Json = serde_json::from_str(r#"{"y": -2}"#).unwrap();
        assert_eq!(
            Value::from_json(&schema, 1, &json),
            Err(WireError::MissingField("x".to_owned()))
        );
    }

    #[test]
    fn json_type_mismatch() {
        let schema = scenario_schema();
        let json: Json = serde_json::from_str(r#"{"a": "five"}"#).unwrap();
        assert_eq!(
            Value::from_json(&schema, 0, &json),
            Err(WireError::TypeMismatch { name: "a".to_owned(), expected: "int".to_owned() })
        );
    }
}
