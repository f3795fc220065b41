use std::rc::Rc;

use brine_helium_schema::EnumValue;
use log::debug;

use crate::{
    ast::{NodeId, NodeKind, Protocol},
    compiler::{lower_enum, EmitContext, Output},
    error::HeliumError,
    resolver::{ConstValue, DeclRef},
    session::ParsedFile,
    tokenizer::BuiltinType,
    traits::Emitter,
    types::{collect_declarations, inheritance_chain, resolve_call_type, resolve_field_type, resolve_type, sorted_members, ResolvedType},
    utils::{escape_rust_keyword, to_pascal_case, to_screaming_snake_case, to_snake_case},
};

const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generates a Rust crate for one output target: `Cargo.toml`,
/// `src/types.rs` with the data types and `src/lib.rs` with the wire
/// codec and, for client targets, the service clients.
#[derive(Debug, Clone, Copy)]
pub struct RustEmitter {
    client: bool,
}

impl RustEmitter {
    pub fn new(client: bool) -> RustEmitter {
        RustEmitter { client }
    }
}

impl Emitter for RustEmitter {
    fn emit(&self, ctx: &EmitContext) -> Result<Vec<Output>, HeliumError> {
        let client = self.client;
        let decls = collect_declarations(&ctx.files, |kind| client || !matches!(kind, NodeKind::Service { .. }))?;
        let dir = ctx.output_dir();
        debug!("Generating {} declaration(s) into {}", decls.len(), dir.display());
        Ok(vec![
            Output { file_path: dir.join("Cargo.toml"), file_content: generate_manifest(ctx) },
            Output { file_path: dir.join("src").join("types.rs"), file_content: generate_types(ctx, &decls)? },
            Output { file_path: dir.join("src").join("lib.rs"), file_content: generate_runtime(ctx, &decls)? },
        ])
    }
}

/// A message field as the generated code sees it.
struct FieldInfo {
    schema_name: String,
    rust_name:   String,
    shape:       FieldShape,
}

enum FieldShape {
    Value { ty: ResolvedType, is_optional: bool },
    OneOf { enum_name: String, variants: Vec<Variant> },
}

struct Variant {
    schema_name: String,
    rust_name:   String,
    ty:          ResolvedType,
}

/// The own fields of one message in an inheritance chain.
struct Level {
    name:   String,
    fields: Vec<FieldInfo>,
}

fn unsupported(file: &ParsedFile, node: NodeId, message: impl Into<String>) -> HeliumError {
    HeliumError::Unsupported(file.ast.error_at(node, message))
}

fn header(ctx: &EmitContext, comment: &str) -> String {
    format!(
        "{} Generated by bhelium {} for namespace `{}`. Do not edit.\n",
        comment, SDK_VERSION, ctx.target.namespace
    )
}

/// Returns the Rust name of a message, enum, alias or service.
fn type_name(decl: &DeclRef) -> String {
    to_pascal_case(decl.name())
}

fn field_name(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Maps a resolved element type to its Rust type.
fn rust_type(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Builtin(builtin) => builtin_rust_type(*builtin).to_owned(),
        ResolvedType::Message(decl) | ResolvedType::Enum(decl) => type_name(decl),
        ResolvedType::Array(inner) => format!("Vec<{}>", rust_type(inner)),
    }
}

fn builtin_rust_type(ty: BuiltinType) -> &'static str {
    match ty {
        BuiltinType::Boolean => "bool",
        BuiltinType::Byte    => "u8",
        BuiltinType::Short   => "i16",
        BuiltinType::UShort  => "u16",
        BuiltinType::Int     => "i32",
        BuiltinType::UInt    => "u32",
        BuiltinType::Long    => "i64",
        BuiltinType::ULong   => "u64",
        BuiltinType::Float   => "f32",
        BuiltinType::Double  => "f64",
        BuiltinType::String  => "String",
        BuiltinType::Date    => "i64",
        BuiltinType::Map | BuiltinType::Set | BuiltinType::Void | BuiltinType::Null => "()",
    }
}

/// The Rust type of a field. Optional messages are boxed so that a message
/// may hold an optional instance of itself.
fn field_type(ty: &ResolvedType, is_optional: bool) -> String {
    match (ty, is_optional) {
        (ResolvedType::Message(_), true) => format!("Option<Box<{}>>", rust_type(ty)),
        (_, true) => format!("Option<{}>", rust_type(ty)),
        (_, false) => rust_type(ty),
    }
}

fn variant_type(ty: &ResolvedType) -> String {
    match ty {
        ResolvedType::Message(_) => format!("Box<{}>", rust_type(ty)),
        _ => rust_type(ty),
    }
}

fn message_fields(ctx: &EmitContext, decl: &DeclRef) -> Result<Vec<FieldInfo>, HeliumError> {
    let ast = decl.ast();
    let mut fields = Vec::new();
    for member in sorted_members(decl) {
        let schema_name = ast.name_of(member).to_owned();
        let shape = match ast.kind(member) {
            NodeKind::MessageMember { type_expr, default, .. } => FieldShape::Value {
                ty: resolve_field_type(&ctx.resolver, &decl.file, *type_expr)?,
                is_optional: default.is_some(),
            },
            NodeKind::OneOfMember { .. } => {
                let group = DeclRef::new(decl.file.clone(), member);
                let mut variants = Vec::new();
                for sub in sorted_members(&group) {
                    let type_expr = match ast.kind(sub) {
                        NodeKind::MessageMember { type_expr, .. } => *type_expr,
                        _ => return Err(unsupported(&decl.file, sub, "Nested oneof groups are not yet implemented")),
                    };
                    let name = ast.name_of(sub);
                    variants.push(Variant {
                        schema_name: name.to_owned(),
                        rust_name: escape_rust_keyword(&to_pascal_case(name)),
                        ty: resolve_field_type(&ctx.resolver, &decl.file, type_expr)?,
                    });
                }
                FieldShape::OneOf {
                    enum_name: format!("{}{}", type_name(decl), to_pascal_case(&schema_name)),
                    variants,
                }
            }
            _ => continue,
        };
        fields.push(FieldInfo { rust_name: field_name(&schema_name), schema_name, shape });
    }
    Ok(fields)
}

/// The levels of a message: its own fields first, then those of its base,
/// and so on.
fn message_levels(ctx: &EmitContext, decl: &DeclRef) -> Result<Vec<Level>, HeliumError> {
    inheritance_chain(&ctx.resolver, decl)?
        .iter()
        .map(|level| {
            Ok(Level {
                name: level.name().to_owned(),
                fields: message_fields(ctx, level)?,
            })
        })
        .collect()
}

/// Generates the module manifest.
fn generate_manifest(ctx: &EmitContext) -> String {
    let version = if ctx.config.version.is_empty() { "0.1.0" } else { ctx.config.version.as_str() };
    let mut lines = Vec::new();
    lines.push(header(ctx, "#"));
    lines.push("[package]".to_owned());
    lines.push(format!("name = \"{}\"", ctx.target.namespace));
    lines.push(format!("version = \"{}\"", version));
    lines.push("edition = \"2021\"".to_owned());
    lines.push(String::new());
    lines.push("[dependencies]".to_owned());
    lines.push(format!("brine-helium = \"{}\"", SDK_VERSION));
    lines.push("serde = { version = \"1.0\", features = [\"derive\"] }".to_owned());
    lines.push("serde_json = \"1.0\"".to_owned());
    lines.push(String::new());
    lines.join("\n")
}

/// Generates `types.rs`: one struct per message, one enum per oneof group
/// and per enum, type aliases and constants.
fn generate_types(ctx: &EmitContext, decls: &[DeclRef]) -> Result<String, HeliumError> {
    let mut code = Vec::new();
    code.push(header(ctx, "//"));
    code.push("use serde::{Deserialize, Serialize};\n".to_owned());

    for decl in decls {
        match decl.kind() {
            NodeKind::Message { .. } => code.push(generate_struct(ctx, decl)?),
            NodeKind::Enum { .. } => code.push(generate_enum(ctx, decl)?),
            NodeKind::TypeAlias { .. } => code.push(generate_alias(ctx, decl)?),
            NodeKind::Const { .. } => code.push(generate_const(ctx, decl)?),
            _ => {}
        }
    }
    Ok(code.join("\n"))
}

fn serde_attributes(field: &FieldInfo) -> Vec<String> {
    let mut attributes = Vec::new();
    if field.rust_name != field.schema_name {
        attributes.push(format!("    #[serde(rename = \"{}\")]", field.schema_name));
    }
    let is_optional = match &field.shape {
        FieldShape::Value { is_optional, .. } => *is_optional,
        FieldShape::OneOf { .. } => true,
    };
    if is_optional {
        attributes.push("    #[serde(default, skip_serializing_if = \"Option::is_none\")]".to_owned());
    }
    attributes
}

/// Generates the struct of a message. Fields of base messages follow the
/// message's own fields.
fn generate_struct(ctx: &EmitContext, decl: &DeclRef) -> Result<String, HeliumError> {
    let levels = message_levels(ctx, decl)?;
    let mut lines = Vec::new();

    lines.push("#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]".to_owned());
    lines.push(format!("pub struct {} {{", type_name(decl)));
    for level in &levels {
        for field in &level.fields {
            lines.extend(serde_attributes(field));
            let ty = match &field.shape {
                FieldShape::Value { ty, is_optional } => field_type(ty, *is_optional),
                FieldShape::OneOf { enum_name, .. } => format!("Option<{}>", enum_name),
            };
            lines.push(format!("    pub {}: {},", field.rust_name, ty));
        }
    }
    lines.push("}\n".to_owned());

    // Groups are declared by the message that owns them.
    for field in levels.first().map(|level| level.fields.as_slice()).unwrap_or(&[]) {
        if let FieldShape::OneOf { enum_name, variants } = &field.shape {
            lines.push("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]".to_owned());
            lines.push(format!("pub enum {} {{", enum_name));
            for variant in variants {
                if variant.rust_name != variant.schema_name {
                    lines.push(format!("    #[serde(rename = \"{}\")]", variant.schema_name));
                }
                lines.push(format!("    {}({}),", variant.rust_name, variant_type(&variant.ty)));
            }
            lines.push("}\n".to_owned());
        }
    }
    Ok(lines.join("\n"))
}

/// Generates an enum. The first member is the default.
fn generate_enum(ctx: &EmitContext, decl: &DeclRef) -> Result<String, HeliumError> {
    let def = lower_enum(&ctx.resolver, decl)?;
    let mut lines = Vec::new();
    lines.push("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]".to_owned());
    lines.push(format!("pub enum {} {{", type_name(decl)));
    for (i, variant) in def.variants.iter().enumerate() {
        if i == 0 {
            lines.push("    #[default]".to_owned());
        }
        let rust_name = escape_rust_keyword(&to_pascal_case(&variant.name));
        if rust_name != variant.name {
            lines.push(format!("    #[serde(rename = \"{}\")]", variant.name));
        }
        lines.push(format!("    {},", rust_name));
    }
    lines.push("}\n".to_owned());
    Ok(lines.join("\n"))
}

fn generate_alias(ctx: &EmitContext, decl: &DeclRef) -> Result<String, HeliumError> {
    let type_expr = match decl.kind() {
        NodeKind::TypeAlias { type_expr, .. } => *type_expr,
        _ => return Ok(String::new()),
    };
    let ty = resolve_type(&ctx.resolver, &decl.file, type_expr)?;
    if let ResolvedType::Builtin(builtin @ (BuiltinType::Map | BuiltinType::Set | BuiltinType::Null)) = ty.element() {
        return Err(unsupported(
            &decl.file,
            type_expr,
            format!("Type {} is not supported in type aliases", builtin.as_str()),
        ));
    }
    Ok(format!("pub type {} = {};\n", type_name(decl), rust_type(&ty)))
}

fn generate_const(ctx: &EmitContext, decl: &DeclRef) -> Result<String, HeliumError> {
    Ok(format!("{}\n", const_item(ctx, &decl.file, decl.node, "pub const", "&")?))
}

/// Renders `<prefix> NAME: Type = value;` for a const declaration, with the
/// value folded at compile time. `reference` is the reference prefix used for
/// string and slice types.
fn const_item(
    ctx: &EmitContext,
    file: &Rc<ParsedFile>,
    node: NodeId,
    prefix: &str,
    reference: &str,
) -> Result<String, HeliumError> {
    let ast = &file.ast;
    let (type_expr, value) = match ast.kind(node) {
        NodeKind::Const { type_expr, value, .. } => (*type_expr, *value),
        _ => return Ok(String::new()),
    };
    let name = ast.name_of(node);
    let ty = resolve_type(&ctx.resolver, file, type_expr)?;
    let folded = ctx.resolver.evaluate_constant(file, value)?;
    let (rust_ty, literal) = const_literal(&ty, &folded, reference).map_err(|message| {
        unsupported(file, value, format!("Constant {} {}", name, message))
    })?;
    Ok(format!("{} {}: {} = {};", prefix, to_screaming_snake_case(name), rust_ty, literal))
}

/// The Rust type and literal for a folded value of type `ty`, or the reason
/// the value does not fit.
fn const_literal(ty: &ResolvedType, value: &ConstValue, reference: &str) -> Result<(String, String), String> {
    let mismatch = || format!("of type {} cannot hold a {} value", ty.describe(), value.type_name());
    match ty {
        ResolvedType::Array(element) => {
            let items = match value {
                ConstValue::Array(items) => items,
                _ => return Err(mismatch()),
            };
            let mut element_type = String::new();
            let mut literals = Vec::with_capacity(items.len());
            for item in items {
                let (item_type, literal) = const_literal(element, item, reference)?;
                element_type = item_type;
                literals.push(literal);
            }
            if items.is_empty() {
                element_type = const_literal(element, &empty_value(element), reference)?.0;
            }
            Ok((format!("{}[{}]", reference, element_type), format!("&[{}]", literals.join(", "))))
        }
        ResolvedType::Builtin(builtin) => {
            let rust_ty = match builtin {
                BuiltinType::String => format!("{}str", reference),
                other => builtin_rust_type(*other).to_owned(),
            };
            let literal = match (builtin, value) {
                (BuiltinType::Boolean, ConstValue::Bool(b)) => b.to_string(),
                (BuiltinType::String, ConstValue::String(s)) => format!("{:?}", s),
                (BuiltinType::Float | BuiltinType::Double, ConstValue::Int(v)) => format!("{:?}", *v as f64),
                (BuiltinType::Float | BuiltinType::Double, ConstValue::Float(v)) if v.is_finite() => format!("{:?}", v),
                (_, ConstValue::Int(v)) if is_integer(*builtin) => int_literal(*builtin, *v).ok_or_else(|| format!("value {} does not fit in {}", v, builtin.as_str()))?,
                (_, ConstValue::Float(v)) if is_integer(*builtin) && v.fract() == 0.0 && v.abs() < 9.2e18 => {
                    int_literal(*builtin, *v as i64).ok_or_else(|| format!("value {} does not fit in {}", v, builtin.as_str()))?
                }
                _ => return Err(mismatch()),
            };
            Ok((rust_ty, literal))
        }
        _ => Err(format!("of type {} is not supported", ty.describe())),
    }
}

/// A placeholder value used to name the element type of an empty array.
fn empty_value(element: &ResolvedType) -> ConstValue {
    match element {
        ResolvedType::Builtin(BuiltinType::Boolean) => ConstValue::Bool(false),
        ResolvedType::Builtin(BuiltinType::String) => ConstValue::String(String::new()),
        ResolvedType::Array(_) => ConstValue::Array(Vec::new()),
        _ => ConstValue::Int(0),
    }
}

fn is_integer(ty: BuiltinType) -> bool {
    matches!(
        ty,
        BuiltinType::Byte
            | BuiltinType::Short
            | BuiltinType::UShort
            | BuiltinType::Int
            | BuiltinType::UInt
            | BuiltinType::Long
            | BuiltinType::ULong
            | BuiltinType::Date
    )
}

fn int_literal(ty: BuiltinType, v: i64) -> Option<String> {
    let fits = match ty {
        BuiltinType::Byte => u8::try_from(v).is_ok(),
        BuiltinType::Short => i16::try_from(v).is_ok(),
        BuiltinType::UShort => u16::try_from(v).is_ok(),
        BuiltinType::Int => i32::try_from(v).is_ok(),
        BuiltinType::UInt => u32::try_from(v).is_ok(),
        BuiltinType::Long | BuiltinType::Date => true,
        BuiltinType::ULong => v >= 0,
        _ => false,
    };
    if fits {
        Some(v.to_string())
    } else {
        None
    }
}

/// Generates `lib.rs`: the binary codec of every message, wire values of
/// enums, field defaults and the service clients.
fn generate_runtime(ctx: &EmitContext, decls: &[DeclRef]) -> Result<String, HeliumError> {
    let has_services = decls.iter().any(|decl| matches!(decl.kind(), NodeKind::Service { .. }));
    let mut code = Vec::new();
    code.push(header(ctx, "//"));
    code.push("pub mod types;\n".to_owned());
    code.push("#[allow(unused_imports)]".to_owned());
    code.push("use brine_helium::{ByteBuffer, ByteBufferMut, HeliumMessage, WireError};".to_owned());
    if has_services {
        code.push("use brine_helium::{CallError, Endpoint, Protocol, ServiceContext, Transport};".to_owned());
    }
    code.push("#[allow(unused_imports)]".to_owned());
    code.push("use self::types::*;\n".to_owned());

    let exported: Vec<String> = decls
        .iter()
        .filter(|decl| decl.ast().is_exported(decl.node))
        .filter_map(|decl| match decl.kind() {
            NodeKind::Message { .. } | NodeKind::Enum { .. } | NodeKind::TypeAlias { .. } => Some(type_name(decl)),
            NodeKind::Const { .. } => Some(to_screaming_snake_case(decl.name())),
            _ => None,
        })
        .collect();
    if !exported.is_empty() {
        code.push(format!("pub use self::types::{{{}}};\n", exported.join(", ")));
    }

    code.push("/// The namespace the services of this module are served under.".to_owned());
    code.push(format!("pub const NAMESPACE: &str = \"{}\";\n", ctx.target.namespace));

    for decl in decls {
        match decl.kind() {
            NodeKind::Message { .. } => {
                code.push(generate_message_impl(ctx, decl)?);
                if let Some(defaults) = generate_field_defaults(ctx, decl)? {
                    code.push(defaults);
                }
            }
            NodeKind::Enum { .. } => code.push(generate_enum_impl(ctx, decl)?),
            NodeKind::Service { .. } => code.push(generate_service(ctx, decl)?),
            _ => {}
        }
    }
    Ok(code.join("\n"))
}

fn read_builtin(ty: BuiltinType) -> &'static str {
    match ty {
        BuiltinType::Boolean => "read_bool",
        BuiltinType::Byte    => "read_byte",
        BuiltinType::Short   => "read_int16",
        BuiltinType::UShort  => "read_uint16",
        BuiltinType::Int     => "read_int32",
        BuiltinType::UInt    => "read_uint32",
        BuiltinType::Long    => "read_int64",
        BuiltinType::ULong   => "read_uint64",
        BuiltinType::Float   => "read_float32",
        BuiltinType::Double  => "read_float64",
        BuiltinType::Date    => "read_date",
        _                    => "read_string",
    }
}

fn write_builtin(ty: BuiltinType) -> &'static str {
    match ty {
        BuiltinType::Boolean => "write_bool",
        BuiltinType::Byte    => "write_byte",
        BuiltinType::Short   => "write_int16",
        BuiltinType::UShort  => "write_uint16",
        BuiltinType::Int     => "write_int32",
        BuiltinType::UInt    => "write_uint32",
        BuiltinType::Long    => "write_int64",
        BuiltinType::ULong   => "write_uint64",
        BuiltinType::Float   => "write_float32",
        BuiltinType::Double  => "write_float64",
        BuiltinType::Date    => "write_date",
        _                    => "write_string",
    }
}

fn is_byte_array(ty: &ResolvedType) -> bool {
    matches!(ty, ResolvedType::Array(inner) if **inner == ResolvedType::Builtin(BuiltinType::Byte))
}

/// An expression reading one value of type `ty`. Array reads span several
/// lines, indented by `indent`.
fn read_expr(ty: &ResolvedType, boxed: bool, indent: &str) -> String {
    match ty {
        _ if is_byte_array(ty) => "reader.read_byte_array()?".to_owned(),
        ResolvedType::Array(inner) => [
            "{".to_owned(),
            format!("{}    let len = reader.read_len()?;", indent),
            format!("{}    let mut items = Vec::with_capacity(len.min(reader.remaining()));", indent),
            format!("{}    for _ in 0..len {{", indent),
            format!("{}        items.push({});", indent, read_expr(inner, false, &format!("{}        ", indent))),
            format!("{}    }}", indent),
            format!("{}    items", indent),
            format!("{}}}", indent),
        ]
        .join("\n"),
        ResolvedType::Builtin(builtin) => format!("reader.{}()?", read_builtin(*builtin)),
        ResolvedType::Message(decl) if boxed => format!("Box::new(reader.read_nested({}::read_binary)?)", type_name(decl)),
        ResolvedType::Message(decl) => format!("reader.read_nested({}::read_binary)?", type_name(decl)),
        ResolvedType::Enum(decl) => format!("{}::read_binary(reader)?", type_name(decl)),
    }
}

/// Statements writing `expr`. When `by_ref` is set `expr` is a reference,
/// otherwise a place expression.
fn write_value(ty: &ResolvedType, expr: &str, by_ref: bool, indent: &str, lines: &mut Vec<String>) {
    let borrowed = if by_ref { expr.to_owned() } else { format!("&{}", expr) };
    match ty {
        _ if is_byte_array(ty) => lines.push(format!("{}writer.write_byte_array({})?;", indent, borrowed)),
        ResolvedType::Array(inner) => {
            lines.push(format!("{}writer.write_len({}.len())?;", indent, expr));
            lines.push(format!("{}for item in {} {{", indent, borrowed));
            write_value(inner, "item", true, &format!("{}    ", indent), lines);
            lines.push(format!("{}}}", indent));
        }
        ResolvedType::Builtin(BuiltinType::String) => {
            lines.push(format!("{}writer.write_string({})?;", indent, borrowed));
        }
        ResolvedType::Builtin(builtin) => {
            let deref = if by_ref { "*" } else { "" };
            lines.push(format!("{}writer.{}({}{});", indent, write_builtin(*builtin), deref, expr));
        }
        ResolvedType::Message(_) | ResolvedType::Enum(_) => {
            lines.push(format!("{}{}.write_binary(writer)?;", indent, expr));
        }
    }
}

/// Generates `impl HeliumMessage`. Each level writes its own fields followed
/// by a continuation marker; `1` means the fields of the base follow.
fn generate_message_impl(ctx: &EmitContext, decl: &DeclRef) -> Result<String, HeliumError> {
    let name = type_name(decl);
    let levels = message_levels(ctx, decl)?;
    let has_fields = levels.iter().any(|level| {
        level.fields.iter().any(|field| matches!(field.shape, FieldShape::Value { .. }))
    });

    let mut lines = Vec::new();
    lines.push(format!("impl HeliumMessage for {} {{", name));

    // read_binary
    lines.push("    fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {".to_owned());
    let binding = if has_fields { "let mut message" } else { "let message" };
    lines.push(format!("        {} = {}::default();", binding, name));
    for (i, level) in levels.iter().enumerate() {
        lines.push(format!("        // {}", level.name));
        for field in &level.fields {
            match &field.shape {
                FieldShape::Value { ty, is_optional: false } => {
                    lines.push(format!("        message.{} = {};", field.rust_name, read_expr(ty, false, "        ")));
                }
                FieldShape::Value { ty, is_optional: true } => {
                    lines.push("        if reader.read_presence()? {".to_owned());
                    lines.push(format!(
                        "            message.{} = Some({});",
                        field.rust_name,
                        read_expr(ty, true, "            ")
                    ));
                    lines.push("        }".to_owned());
                }
                FieldShape::OneOf { .. } => {
                    lines.push(format!("        // oneof {} has no binary representation", field.schema_name));
                }
            }
        }
        if i + 1 < levels.len() {
            lines.push("        if !reader.read_continuation()? {".to_owned());
            lines.push("            return Ok(message);".to_owned());
            lines.push("        }".to_owned());
        } else {
            lines.push("        if reader.read_continuation()? {".to_owned());
            lines.push(format!(
                "            return Err(WireError::UnexpectedContinuation(\"{}\".to_owned()));",
                level.name
            ));
            lines.push("        }".to_owned());
        }
    }
    lines.push("        Ok(message)".to_owned());
    lines.push("    }".to_owned());
    lines.push(String::new());

    // write_binary
    lines.push("    fn write_binary(&self, writer: &mut ByteBufferMut) -> Result<(), WireError> {".to_owned());
    for (i, level) in levels.iter().enumerate() {
        lines.push(format!("        // {}", level.name));
        for field in &level.fields {
            let place = format!("self.{}", field.rust_name);
            match &field.shape {
                FieldShape::Value { ty, is_optional: false } => write_value(ty, &place, false, "        ", &mut lines),
                FieldShape::Value { ty, is_optional: true } => {
                    lines.push(format!("        match &{} {{", place));
                    lines.push("            Some(value) => {".to_owned());
                    lines.push("                writer.write_presence(true);".to_owned());
                    write_value(ty, "value", true, "                ", &mut lines);
                    lines.push("            }".to_owned());
                    lines.push("            None => writer.write_presence(false),".to_owned());
                    lines.push("        }".to_owned());
                }
                FieldShape::OneOf { .. } => {
                    lines.push(format!("        // oneof {} has no binary representation", field.schema_name));
                }
            }
        }
        lines.push(format!("        writer.write_continuation({});", i + 1 < levels.len()));
    }
    lines.push("        Ok(())".to_owned());
    lines.push("    }".to_owned());

    let validation = generate_validate(&levels);
    if !validation.is_empty() {
        lines.push(String::new());
        lines.push("    fn validate(&self) -> Result<(), WireError> {".to_owned());
        lines.extend(validation);
        lines.push("        Ok(())".to_owned());
        lines.push("    }".to_owned());
    }
    lines.push("}\n".to_owned());
    Ok(lines.join("\n"))
}

/// Statements validating the nested messages of every level.
fn generate_validate(levels: &[Level]) -> Vec<String> {
    fn validate_value(ty: &ResolvedType, expr: &str, indent: &str, lines: &mut Vec<String>) {
        match ty {
            ResolvedType::Message(_) => lines.push(format!("{}{}.validate()?;", indent, expr)),
            ResolvedType::Array(inner) if matches!(**inner, ResolvedType::Message(_)) => {
                lines.push(format!("{}for item in {} {{", indent, expr));
                lines.push(format!("{}    item.validate()?;", indent));
                lines.push(format!("{}}}", indent));
            }
            _ => {}
        }
    }

    let mut lines = Vec::new();
    for field in levels.iter().flat_map(|level| level.fields.iter()) {
        match &field.shape {
            FieldShape::Value { ty, is_optional: false } => {
                let expr = match ty {
                    ResolvedType::Array(_) => format!("&self.{}", field.rust_name),
                    _ => format!("self.{}", field.rust_name),
                };
                validate_value(ty, &expr, "        ", &mut lines);
            }
            FieldShape::Value { ty, is_optional: true } => {
                let mut inner = Vec::new();
                validate_value(ty, "value", "            ", &mut inner);
                if !inner.is_empty() {
                    lines.push(format!("        if let Some(value) = &self.{} {{", field.rust_name));
                    lines.extend(inner);
                    lines.push("        }".to_owned());
                }
            }
            FieldShape::OneOf { enum_name, variants } => {
                let mut arms = Vec::new();
                for variant in variants {
                    let mut inner = Vec::new();
                    validate_value(&variant.ty, "value", "                ", &mut inner);
                    if !inner.is_empty() {
                        arms.push(format!("            Some({}::{}(value)) => {{", enum_name, variant.rust_name));
                        arms.extend(inner);
                        arms.push("            }".to_owned());
                    }
                }
                if !arms.is_empty() {
                    lines.push(format!("        match &self.{} {{", field.rust_name));
                    lines.extend(arms);
                    lines.push("            _ => {}".to_owned());
                    lines.push("        }".to_owned());
                }
            }
        }
    }
    lines
}

/// Generates `impl M { pub const FIELD_DEFAULT: T = value; }` for the own
/// optional fields whose default is a non-null scalar, string or array.
fn generate_field_defaults(ctx: &EmitContext, decl: &DeclRef) -> Result<Option<String>, HeliumError> {
    let ast = decl.ast();
    let mut consts = Vec::new();
    for member in sorted_members(decl) {
        let (type_expr, default) = match ast.kind(member) {
            NodeKind::MessageMember { type_expr, default: Some(default), .. } => (*type_expr, *default),
            _ => continue,
        };
        let ty = resolve_field_type(&ctx.resolver, &decl.file, type_expr)?;
        if matches!(ty.element(), ResolvedType::Message(_) | ResolvedType::Enum(_)) {
            continue;
        }
        let value = ctx.resolver.evaluate_constant(&decl.file, default)?;
        if value == ConstValue::Null {
            continue;
        }
        let name = ast.name_of(member);
        let (rust_ty, literal) = const_literal(&ty, &value, "&'static ").map_err(|message| {
            unsupported(&decl.file, default, format!("Default of field {} {}", name, message))
        })?;
        consts.push(format!("    pub const {}_DEFAULT: {} = {};", to_screaming_snake_case(name), rust_ty, literal));
    }
    if consts.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("impl {} {{\n{}\n}}\n", type_name(decl), consts.join("\n"))))
}

/// Generates the wire value conversions of an enum. Integer enums travel as
/// int32, string enums as strings.
fn generate_enum_impl(ctx: &EmitContext, decl: &DeclRef) -> Result<String, HeliumError> {
    let def = lower_enum(&ctx.resolver, decl)?;
    let name = type_name(decl);
    let strings = def.has_string_values();
    let (value_type, input_type, read, write) = if strings {
        ("&'static str", "&str", "&reader.read_string()?", "writer.write_string(self.wire_value())?;")
    } else {
        ("i32", "i32", "reader.read_int32()?", "writer.write_int32(self.wire_value());")
    };

    let mut to_wire = Vec::new();
    let mut from_wire = Vec::new();
    for variant in &def.variants {
        let rust_name = escape_rust_keyword(&to_pascal_case(&variant.name));
        let literal = match &variant.value {
            EnumValue::Int(v) => v.to_string(),
            EnumValue::String(s) => format!("{:?}", s),
        };
        to_wire.push(format!("            {}::{} => {},", name, rust_name, literal));
        from_wire.push(format!("            {} => Some({}::{}),", literal, name, rust_name));
    }

    let mut lines = Vec::new();
    lines.push(format!("impl {} {{", name));
    lines.push(format!("    pub fn wire_value(self) -> {} {{", value_type));
    lines.push("        match self {".to_owned());
    lines.extend(to_wire);
    lines.push("        }".to_owned());
    lines.push("    }".to_owned());
    lines.push(String::new());
    lines.push(format!("    pub fn from_wire_value(value: {}) -> Option<Self> {{", input_type));
    lines.push("        match value {".to_owned());
    lines.extend(from_wire);
    lines.push("            _ => None,".to_owned());
    lines.push("        }".to_owned());
    lines.push("    }".to_owned());
    lines.push(String::new());
    lines.push("    pub fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {".to_owned());
    lines.push(format!(
        "        {}::from_wire_value({}).ok_or_else(|| WireError::InvalidEnumValue(\"{}\".to_owned()))",
        name,
        read,
        decl.name()
    ));
    lines.push("    }".to_owned());
    lines.push(String::new());
    lines.push("    pub fn write_binary(self, writer: &mut ByteBufferMut) -> Result<(), WireError> {".to_owned());
    lines.push(format!("        {}", write));
    lines.push("        Ok(())".to_owned());
    lines.push("    }".to_owned());
    lines.push("}\n".to_owned());
    Ok(lines.join("\n"))
}

/// Generates the client of a service: a unit struct with the service
/// constants and one method per api call.
fn generate_service(ctx: &EmitContext, decl: &DeclRef) -> Result<String, HeliumError> {
    let ast = decl.ast();
    let (calls, constants) = match decl.kind() {
        NodeKind::Service { calls, constants, .. } => (calls, constants),
        _ => return Ok(String::new()),
    };
    let name = type_name(decl);

    let mut lines = Vec::new();
    lines.push(format!("/// Client of the `{}` service.", decl.name()));
    lines.push(format!("pub struct {};\n", name));
    lines.push(format!("impl {} {{", name));
    for &constant in constants {
        lines.push(const_item(ctx, &decl.file, constant, "    pub const", "&'static ")?);
    }

    for &call in calls {
        let (protocol, argument, returns, throws) = match ast.kind(call) {
            NodeKind::ServiceCall { protocol, argument, returns, throws, .. } => (*protocol, *argument, *returns, *throws),
            _ => continue,
        };
        let argument = match argument {
            Some(argument) => resolve_call_type(&ctx.resolver, &decl.file, argument)?,
            None => None,
        };
        let returns = match resolve_call_type(&ctx.resolver, &decl.file, returns)? {
            Some(message) => type_name(&message),
            None => "()".to_owned(),
        };
        let error = match throws {
            Some(throws) => resolve_call_type(&ctx.resolver, &decl.file, throws)?.map(|message| type_name(&message)),
            None => None,
        }
        .unwrap_or_else(|| "()".to_owned());
        let protocol = match protocol {
            Protocol::Http => "Http",
            Protocol::Tcp => "Tcp",
            Protocol::Ws => "Ws",
        };
        let call_name = ast.name_of(call);
        let endpoint = format!(
            "&Endpoint::new(\"{}\", \"{}\", NAMESPACE, Protocol::{})",
            decl.name(),
            call_name,
            protocol
        );

        if !lines.last().map_or(false, |line| line.ends_with('{')) {
            lines.push(String::new());
        }
        let method = field_name(call_name);
        match argument {
            Some(argument) => {
                lines.push(format!(
                    "    pub fn {}<T: Transport>(ctx: &ServiceContext<T>, body: &{}) -> Result<{}, CallError<{}>> {{",
                    method,
                    type_name(&argument),
                    returns,
                    error
                ));
                lines.push(format!("        brine_helium::http_post(ctx, {}, body)", endpoint));
            }
            None => {
                lines.push(format!(
                    "    pub fn {}<T: Transport>(ctx: &ServiceContext<T>) -> Result<{}, CallError<{}>> {{",
                    method, returns, error
                ));
                lines.push(format!("        brine_helium::http_get(ctx, {})", endpoint));
            }
        }
        lines.push("    }".to_owned());
    }
    lines.push("}\n".to_owned());
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{CompilerConfig, Platform, TargetOutput},
        resolver::Resolver,
        session::{MemoryLoader, Session},
        verifier::verify_session,
    };
    use std::path::Path;

    fn generate(text: &str, client: bool) -> Result<Vec<Output>, HeliumError> {
        let session = Session::new(Box::new(MemoryLoader::new()));
        session.add_source(Path::new("main.he"), text)?;
        verify_session(&session)?;
        let config = CompilerConfig {
            version: "2.0.0".to_owned(),
            ..CompilerConfig::default()
        };
        let target = TargetOutput {
            namespace: "demo".to_owned(),
            path: "out".to_owned(),
            platform: Platform::Rust,
        };
        let ctx = EmitContext {
            config: &config,
            target: &target,
            project_dir: Path::new("project"),
            files: session.files(),
            resolver: Resolver::new(&session),
        };
        RustEmitter::new(client).emit(&ctx)
    }

    fn file<'a>(outputs: &'a [Output], path: &str) -> &'a str {
        &outputs.iter().find(|output| output.file_path == Path::new(path)).unwrap().file_content
    }

    #[test]
    fn test_emit_files() {
        let outputs = generate("message M { 1 -> a: int; }", false).unwrap();
        let paths: Vec<_> = outputs.iter().map(|output| output.file_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("project/out/Cargo.toml").to_path_buf(),
                Path::new("project/out/src/types.rs").to_path_buf(),
                Path::new("project/out/src/lib.rs").to_path_buf(),
            ]
        );
        let manifest = file(&outputs, "project/out/Cargo.toml");
        assert!(manifest.contains("name = \"demo\"\nversion = \"2.0.0\""));
        assert!(manifest.contains(&format!("brine-helium = \"{}\"", SDK_VERSION)));
    }

    #[test]
    fn test_generate_struct() {
        let outputs = generate(
            "message Base { 1 -> id: ulong; }\n\
             message M extends Base {\n\
               2 -> clientID: uint;\n\
               3 -> type: string = \"x\";\n\
               4 -> next: M = null;\n\
               5 -> oneof extra { 1 -> note: string; 2 -> base: Base; }\n\
             }",
            false,
        )
        .unwrap();
        let types = file(&outputs, "project/out/src/types.rs");
        assert!(types.contains(
            "pub struct M {\n    \
             #[serde(rename = \"clientID\")]\n    \
             pub client_id: u32,\n    \
             #[serde(rename = \"type\")]\n    \
             #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    \
             pub type_: Option<String>,\n    \
             #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    \
             pub next: Option<Box<M>>,\n    \
             #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    \
             pub extra: Option<MExtra>,\n    \
             pub id: u64,\n}"
        ));
        assert!(types.contains(
            "pub enum MExtra {\n    \
             #[serde(rename = \"note\")]\n    \
             Note(String),\n    \
             #[serde(rename = \"base\")]\n    \
             Base(Box<Base>),\n}"
        ));
    }

    #[test]
    fn test_generate_message_impl() {
        let outputs = generate(
            "message Base { 1 -> id: ulong; }\n\
             message M extends Base { 2 -> a: int; 3 -> b: string = \"x\"; 4 -> c: Base[]; 5 -> d: byte[] = []; }",
            false,
        )
        .unwrap();
        let lib = file(&outputs, "project/out/src/lib.rs");
        assert!(lib.contains(
            "    fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {\n\
             \x20       let mut message = M::default();\n\
             \x20       // M\n\
             \x20       message.a = reader.read_int32()?;\n\
             \x20       if reader.read_presence()? {\n\
             \x20           message.b = Some(reader.read_string()?);\n\
             \x20       }\n\
             \x20       message.c = {\n\
             \x20           let len = reader.read_len()?;\n\
             \x20           let mut items = Vec::with_capacity(len.min(reader.remaining()));\n\
             \x20           for _ in 0..len {\n\
             \x20               items.push(reader.read_nested(Base::read_binary)?);\n\
             \x20           }\n\
             \x20           items\n\
             \x20       };\n\
             \x20       if reader.read_presence()? {\n\
             \x20           message.d = Some(reader.read_byte_array()?);\n\
             \x20       }\n\
             \x20       if !reader.read_continuation()? {\n\
             \x20           return Ok(message);\n\
             \x20       }\n\
             \x20       // Base\n\
             \x20       message.id = reader.read_uint64()?;\n\
             \x20       if reader.read_continuation()? {\n\
             \x20           return Err(WireError::UnexpectedContinuation(\"Base\".to_owned()));\n\
             \x20       }\n\
             \x20       Ok(message)\n"
        ));
        assert!(lib.contains(
            "        match &self.b {\n\
             \x20           Some(value) => {\n\
             \x20               writer.write_presence(true);\n\
             \x20               writer.write_string(value)?;\n\
             \x20           }\n\
             \x20           None => writer.write_presence(false),\n\
             \x20       }\n\
             \x20       writer.write_len(self.c.len())?;\n\
             \x20       for item in &self.c {\n\
             \x20           item.write_binary(writer)?;\n\
             \x20       }\n"
        ));
        assert!(lib.contains("        writer.write_continuation(true);\n        // Base\n        writer.write_uint64(self.id);\n        writer.write_continuation(false);\n"));
        assert!(lib.contains("        for item in &self.c {\n            item.validate()?;\n        }\n"));
        assert!(lib.contains("impl M {\n    pub const B_DEFAULT: &'static str = \"x\";\n    pub const D_DEFAULT: &'static [u8] = &[];\n}"));
    }

    #[test]
    fn test_generate_nested_reads() {
        let outputs = generate(
            "message Node { 1 -> next: Node = null; 2 -> children: Node[]; }",
            false,
        )
        .unwrap();
        let lib = file(&outputs, "project/out/src/lib.rs");
        assert!(lib.contains(
            "        if reader.read_presence()? {\n\
             \x20           message.next = Some(Box::new(reader.read_nested(Node::read_binary)?));\n\
             \x20       }\n"
        ));
        assert!(lib.contains("                items.push(reader.read_nested(Node::read_binary)?);\n"));
        assert!(!lib.contains("Node::read_binary(reader)"));
    }

    #[test]
    fn test_generate_enums_and_consts() {
        let outputs = generate(
            "export enum Shape { FLAT = 0; ROUND = 1; }\n\
             enum Mood { HAPPY = \"happy\", }\n\
             export const REFRESH: string = \"1m 30s\";\n\
             const REFRESH_SECONDS: int = timespan(REFRESH, \"s\");\n\
             const RATIO: double = 1;\n\
             const NAMES: string[] = [\"a\", \"b\"];\n\
             export type Shapes = Shape[];",
            false,
        )
        .unwrap();
        let types = file(&outputs, "project/out/src/types.rs");
        assert!(types.contains("pub enum Shape {\n    #[default]\n    #[serde(rename = \"FLAT\")]\n    Flat,\n    #[serde(rename = \"ROUND\")]\n    Round,\n}"));
        assert!(types.contains("pub const REFRESH: &str = \"1m 30s\";"));
        assert!(types.contains("pub const REFRESH_SECONDS: i32 = 90;"));
        assert!(types.contains("pub const RATIO: f64 = 1.0;"));
        assert!(types.contains("pub const NAMES: &[&str] = &[\"a\", \"b\"];"));
        assert!(types.contains("pub type Shapes = Vec<Shape>;"));

        let lib = file(&outputs, "project/out/src/lib.rs");
        assert!(lib.contains("pub use self::types::{Shape, REFRESH, Shapes};"));
        assert!(lib.contains("pub const NAMESPACE: &str = \"demo\";"));
        assert!(lib.contains("    pub fn wire_value(self) -> i32 {\n        match self {\n            Shape::Flat => 0,\n            Shape::Round => 1,\n        }\n    }"));
        assert!(lib.contains("    pub fn from_wire_value(value: &str) -> Option<Self> {\n        match value {\n            \"happy\" => Some(Mood::Happy),\n            _ => None,\n        }\n    }"));
        assert!(lib.contains("Mood::from_wire_value(&reader.read_string()?).ok_or_else(|| WireError::InvalidEnumValue(\"Mood\".to_owned()))"));
    }

    #[test]
    fn test_generate_service() {
        let text = "message Req { 1 -> q: string; }\n\
                    message Res { 1 -> ok: boolean; }\n\
                    message Oops { 1 -> reason: string; }\n\
                    export client service Search {\n\
                      const VERSION: string = \"1.0\";\n\
                      http find(Req): Res throws Oops;\n\
                      ws ping(): Res;\n\
                    }";
        let lib = generate(text, true).unwrap().remove(2).file_content;
        assert!(lib.contains("use brine_helium::{CallError, Endpoint, Protocol, ServiceContext, Transport};"));
        assert!(lib.contains("pub struct Search;\n\nimpl Search {\n    pub const VERSION: &'static str = \"1.0\";\n\n"));
        assert!(lib.contains(
            "    pub fn find<T: Transport>(ctx: &ServiceContext<T>, body: &Req) -> Result<Res, CallError<Oops>> {\n\
             \x20       brine_helium::http_post(ctx, &Endpoint::new(\"Search\", \"find\", NAMESPACE, Protocol::Http), body)\n\
             \x20   }"
        ));
        assert!(lib.contains(
            "    pub fn ping<T: Transport>(ctx: &ServiceContext<T>) -> Result<Res, CallError<()>> {\n\
             \x20       brine_helium::http_get(ctx, &Endpoint::new(\"Search\", \"ping\", NAMESPACE, Protocol::Ws))\n\
             \x20   }"
        ));

        // Server targets have no service clients.
        let server = generate(text, false).unwrap().remove(2).file_content;
        assert!(!server.contains("Search"));
    }

    #[test]
    fn test_generation_errors() {
        let err = |text: &str| generate(text, true).unwrap_err().to_string();
        assert_eq!(
            err("message M { 1 -> a: int | string; }"),
            "main.he:1:21 - error Union types are not yet implemented"
        );
        assert_eq!(
            err("const SMALL: byte = 256;"),
            "main.he:1:21 - error Constant SMALL value 256 does not fit in byte"
        );
        assert_eq!(
            err("message M { 1 -> a: int = \"x\"; }"),
            "main.he:1:27 - error Default of field a of type int cannot hold a string value"
        );
        assert_eq!(
            err("export client service S { http get(string): void; }"),
            "main.he:1:36 - error Service calls only accept messages or void, found string"
        );
    }
}
