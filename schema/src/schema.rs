use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DefKind {
    Enum,
    Message,
}

/// The wire value of an enum member. An enum is either all integers or all
/// strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EnumValue {
    Int(i32),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVariant {
    pub name:  String,
    pub value: EnumValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldKind {
    /// A plain field. `type_id` is one of the negative `TYPE_*` constants or
    /// an index into `Schema::defs`.
    Value { type_id: i32, is_array: bool },

    /// A `oneof` group. Groups are not part of the binary layout.
    OneOf(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:        String,
    pub value:       u32,
    pub is_optional: bool,
    pub kind:        FieldKind,
}

impl Field {
    pub fn new(name: &str, value: u32, type_id: i32, is_array: bool, is_optional: bool) -> Field {
        Field {
            name: name.to_owned(),
            value,
            is_optional,
            kind: FieldKind::Value { type_id, is_array },
        }
    }

    pub fn one_of(name: &str, value: u32, members: Vec<Field>) -> Field {
        Field {
            name: name.to_owned(),
            value,
            is_optional: true,
            kind: FieldKind::OneOf(members),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Def {
    pub name:     String,
    pub kind:     DefKind,
    pub fields:   Vec<Field>,
    pub variants: Vec<EnumVariant>,
    pub extends:  Option<usize>,

    #[serde(skip)]
    pub field_name_to_index: HashMap<String, usize>,
}

impl Def {
    /// Creates a message definition. Fields are stored in field-number order,
    /// which is the order they are written on the wire.
    pub fn message(name: String, mut fields: Vec<Field>, extends: Option<usize>) -> Def {
        fields.sort_by_key(|field| field.value);
        let field_name_to_index = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name.clone(), i))
            .collect();
        Def {
            name,
            kind: DefKind::Message,
            fields,
            variants: Vec::new(),
            extends,
            field_name_to_index,
        }
    }

    pub fn enumeration(name: String, variants: Vec<EnumVariant>) -> Def {
        Def {
            name,
            kind: DefKind::Enum,
            fields: Vec::new(),
            variants,
            extends: None,
            field_name_to_index: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_name_to_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn variant_by_name(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|variant| variant.name == name)
    }

    pub fn variant_by_value(&self, value: &EnumValue) -> Option<&EnumVariant> {
        self.variants.iter().find(|variant| &variant.value == value)
    }

    /// Returns `true` if the members of this enum are encoded as strings.
    pub fn has_string_values(&self) -> bool {
        matches!(self.variants.first(), Some(EnumVariant { value: EnumValue::String(_), .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub defs: Vec<Def>,

    #[serde(skip)]
    pub def_name_to_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(defs: Vec<Def>) -> Schema {
        let def_name_to_index = defs
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect();
        Schema { defs, def_name_to_index }
    }

    pub fn def(&self, name: &str) -> Option<&Def> {
        self.def_name_to_index.get(name).map(|&i| &self.defs[i])
    }

    pub fn type_id(&self, name: &str) -> Option<i32> {
        self.def_name_to_index.get(name).map(|&i| i as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TYPE_INT, TYPE_STRING};

    #[test]
    fn message_fields_are_sorted_by_number() {
        let def = Def::message(
            "M".to_owned(),
            vec![
                Field::new("b", 2, TYPE_STRING, false, true),
                Field::new("a", 1, TYPE_INT, false, false),
            ],
            None,
        );
        assert_eq!(def.fields[0].name, "a");
        assert_eq!(def.fields[1].name, "b");
        assert_eq!(def.field("b").map(|f| f.value), Some(2));
        assert!(def.field("c").is_none());
    }

    #[test]
    fn schema_lookup() {
        let schema = Schema::new(vec![
            Def::enumeration(
                "Color".to_owned(),
                vec![EnumVariant { name: "RED".to_owned(), value: EnumValue::String("red".to_owned()) }],
            ),
            Def::message("M".to_owned(), vec![], None),
        ]);
        assert_eq!(schema.type_id("M"), Some(1));
        assert_eq!(schema.type_id("N"), None);
        let color = schema.def("Color").unwrap();
        assert!(color.has_string_values());
        assert_eq!(
            color.variant_by_value(&EnumValue::String("red".to_owned())).map(|v| v.name.as_str()),
            Some("RED")
        );
    }
}
