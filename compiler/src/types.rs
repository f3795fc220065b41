use std::{collections::HashMap, rc::Rc};

use crate::{
    ast::{NodeId, NodeKind, TypeTarget},
    error::HeliumError,
    resolver::{DeclRef, Resolver},
    session::ParsedFile,
    tokenizer::BuiltinType,
};

/// Type aliases may refer to other aliases this deep.
const MAX_ALIAS_DEPTH: usize = 32;

/// A type expression after aliases have been followed.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    Builtin(BuiltinType),
    Message(DeclRef),
    Enum(DeclRef),
    Array(Box<ResolvedType>),
}

impl ResolvedType {
    pub fn is_array(&self) -> bool {
        matches!(self, ResolvedType::Array(_))
    }

    /// The element type of an array, or the type itself.
    pub fn element(&self) -> &ResolvedType {
        match self {
            ResolvedType::Array(inner) => inner,
            other => other,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ResolvedType::Builtin(ty) => ty.as_str().to_owned(),
            ResolvedType::Message(decl) | ResolvedType::Enum(decl) => decl.name().to_owned(),
            ResolvedType::Array(inner) => format!("{}[]", inner.describe()),
        }
    }
}

fn unsupported(file: &ParsedFile, node: NodeId, message: impl Into<String>) -> HeliumError {
    HeliumError::Unsupported(file.ast.error_at(node, message))
}

/// Resolves a type expression, following type aliases.
pub fn resolve_type(resolver: &Resolver, file: &Rc<ParsedFile>, type_expr: NodeId) -> Result<ResolvedType, HeliumError> {
    resolve_at(resolver, file, type_expr, 0)
}

fn resolve_at(resolver: &Resolver, file: &Rc<ParsedFile>, type_expr: NodeId, depth: usize) -> Result<ResolvedType, HeliumError> {
    let ast = &file.ast;
    match ast.kind(type_expr) {
        NodeKind::TypeUnion { .. } => Err(unsupported(file, type_expr, "Union types are not yet implemented")),
        NodeKind::ArrayType { element } => {
            let element = resolve_at(resolver, file, *element, depth)?;
            if element.is_array() {
                return Err(unsupported(file, type_expr, "Nested Array types are not yet implemented"));
            }
            Ok(ResolvedType::Array(Box::new(element)))
        }
        NodeKind::TypeReference { target, arguments } => {
            if !arguments.is_empty() {
                return Err(unsupported(file, type_expr, "Generic type arguments are not yet implemented"));
            }
            let name = match target {
                TypeTarget::Builtin(ty) => return Ok(ResolvedType::Builtin(*ty)),
                TypeTarget::Named(name) => *name,
            };
            let decl = resolver.expect_declaration(file, name)?;
            match decl.kind() {
                NodeKind::Message { .. } => Ok(ResolvedType::Message(decl)),
                NodeKind::Enum { .. } => Ok(ResolvedType::Enum(decl)),
                NodeKind::TypeAlias { type_expr: aliased, .. } => {
                    if depth >= MAX_ALIAS_DEPTH {
                        return Err(HeliumError::Validation(
                            ast.error_at(type_expr, format!("Type alias {} refers to itself", decl.name())),
                        ));
                    }
                    let aliased = *aliased;
                    resolve_at(resolver, &decl.file, aliased, depth + 1)
                }
                _ => Err(unsupported(file, type_expr, format!("{} is not a type", decl.name()))),
            }
        }
        other => Err(HeliumError::Validation(
            ast.error_at(type_expr, format!("Expecting a type but found {}", other.describe())),
        )),
    }
}

/// Resolves the type of a message field. Builtins without a wire
/// representation are rejected.
pub fn resolve_field_type(resolver: &Resolver, file: &Rc<ParsedFile>, type_expr: NodeId) -> Result<ResolvedType, HeliumError> {
    let ty = resolve_type(resolver, file, type_expr)?;
    if let ResolvedType::Builtin(builtin @ (BuiltinType::Map | BuiltinType::Set | BuiltinType::Void | BuiltinType::Null)) =
        ty.element()
    {
        return Err(unsupported(
            file,
            type_expr,
            format!("Type {} is not supported in message fields", builtin.as_str()),
        ));
    }
    Ok(ty)
}

/// Resolves the argument, return or error type of a service call. `None`
/// stands for `void`.
pub fn resolve_call_type(resolver: &Resolver, file: &Rc<ParsedFile>, type_expr: NodeId) -> Result<Option<DeclRef>, HeliumError> {
    match resolve_type(resolver, file, type_expr)? {
        ResolvedType::Builtin(BuiltinType::Void) => Ok(None),
        ResolvedType::Message(decl) => Ok(Some(decl)),
        other => Err(unsupported(
            file,
            type_expr,
            format!("Service calls only accept messages or void, found {}", other.describe()),
        )),
    }
}

/// The base message of `message`, if it extends one. The binary encoding has
/// room for a single base only.
pub fn resolve_base(resolver: &Resolver, message: &DeclRef) -> Result<Option<DeclRef>, HeliumError> {
    let extends = match message.kind() {
        NodeKind::Message { extends, .. } => extends,
        _ => return Ok(None),
    };
    match extends.as_slice() {
        [] => Ok(None),
        [base] => {
            let decl = resolver.expect_declaration(&message.file, *base)?;
            match decl.kind() {
                NodeKind::Message { .. } => Ok(Some(decl)),
                _ => Err(HeliumError::Validation(
                    message.ast().error_at(*base, format!("{} is not a message", decl.name())),
                )),
            }
        }
        [_, second, ..] => Err(unsupported(&message.file, *second, "Multiple inheritance is not supported in binary encoding")),
    }
}

/// `message` followed by its base, the base of its base, and so on.
pub fn inheritance_chain(resolver: &Resolver, message: &DeclRef) -> Result<Vec<DeclRef>, HeliumError> {
    let mut chain = vec![message.clone()];
    let mut current = message.clone();
    while let Some(base) = resolve_base(resolver, &current)? {
        if chain.contains(&base) {
            return Err(HeliumError::Validation(message.error(format!("Cyclic inheritance of {}", message.name()))));
        }
        chain.push(base.clone());
        current = base;
    }
    Ok(chain)
}

/// The members of a message, sorted by field number.
pub fn sorted_members(message: &DeclRef) -> Vec<NodeId> {
    let ast = message.ast();
    let mut members = match message.kind() {
        NodeKind::Message { members, .. } => members.clone(),
        NodeKind::OneOfMember { members, .. } => members.clone(),
        _ => Vec::new(),
    };
    members.sort_by_key(|&member| match ast.kind(member) {
        NodeKind::MessageMember { field_number, .. } | NodeKind::OneOfMember { field_number, .. } => *field_number,
        _ => 0,
    });
    members
}

/// The top-level declarations of every file that `include` accepts, in file
/// then statement order. Names must be unique across the session.
pub fn collect_declarations(
    files: &[Rc<ParsedFile>],
    include: impl Fn(&NodeKind) -> bool,
) -> Result<Vec<DeclRef>, HeliumError> {
    let mut seen: HashMap<String, DeclRef> = HashMap::new();
    let mut declarations = Vec::new();
    for file in files {
        for &statement in file.ast.statements() {
            if !file.ast.is_top_level_declaration(statement) || !include(file.ast.kind(statement)) {
                continue;
            }
            let decl = DeclRef::new(file.clone(), statement);
            if seen.contains_key(decl.name()) {
                return Err(unsupported(file, statement, format!("Duplicate declaration {}", decl.name())));
            }
            seen.insert(decl.name().to_owned(), decl.clone());
            declarations.push(decl);
        }
    }
    Ok(declarations)
}
