use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    rc::Rc,
};

use log::{debug, info};

use crate::{
    ast::{Ast, NodeId, NodeKind},
    error::HeliumError,
    resolver::{import_error, DeclRef, Resolver},
    session::{ParsedFile, Session},
    types::{resolve_type, ResolvedType},
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

fn validation(ast: &Ast, node: NodeId, message: impl Into<String>) -> HeliumError {
    HeliumError::Validation(ast.error_at(node, message))
}

/// Verifies every file of the session, including the files that get imported
/// while verifying. Stops at the first error.
pub fn verify_session(session: &Session) -> Result<(), HeliumError> {
    info!("Verifying {} schema file(s)", session.parse_count());
    let resolver = Resolver::new(session);
    let mut index = 0;
    while let Some(file) = session.files().get(index).cloned() {
        verify_file(&resolver, &file)?;
        index += 1;
    }
    Ok(())
}

/// Returns `Ok(())` if `file` passed verification, or the first problem found
/// otherwise.
pub fn verify_file(resolver: &Resolver, file: &Rc<ParsedFile>) -> Result<(), HeliumError> {
    debug!("Verifying {}", file.path.display());
    let ast = &file.ast;

    // 1) Check duplicate top-level names
    let mut declared = HashSet::new();
    for &statement in ast.statements() {
        if !ast.is_top_level_declaration(statement) {
            continue;
        }
        let name = ast.name_of(statement);
        if !declared.insert(name) {
            let at = ast.declared_name(statement).unwrap_or(statement);
            return Err(validation(ast, at, format!("{} is already declared", name)));
        }
    }

    // 2) Check that every identifier refers to a declaration
    for id in ast.preorder() {
        if ast.identifier(id).is_some() && !is_exempt(ast, id) {
            resolver.expect_declaration(file, id)?;
        }
    }

    // 3) Check field numbers, one level at a time
    for &statement in ast.statements() {
        if let NodeKind::Message { members, .. } = ast.kind(statement) {
            check_field_numbers(ast, members)?;
        }
    }

    // 4) Check base messages
    for &statement in ast.statements() {
        if let NodeKind::Message { .. } = ast.kind(statement) {
            check_inheritance(resolver, &DeclRef::new(file.clone(), statement))?;
        }
    }

    // 5) Check that messages do not contain themselves through required fields
    let mut state = HashMap::new();
    for &statement in ast.statements() {
        if let NodeKind::Message { .. } = ast.kind(statement) {
            check_recursion(resolver, &DeclRef::new(file.clone(), statement), &mut state)?;
        }
    }

    // 6) Check that imported names exist and are exported
    for &statement in ast.statements() {
        let (specifiers, path) = match ast.kind(statement) {
            NodeKind::Import { specifiers, path } | NodeKind::Reexport { specifiers, path } => (specifiers, path),
            _ => continue,
        };
        let target = resolver
            .imports()
            .resolve_import(file, path)
            .map_err(|e| import_error(ast, statement, e))?;
        for &specifier in specifiers {
            let original = match ast.specifier_names(specifier) {
                Some((original, _)) => original,
                None => continue,
            };
            let problem = match resolver
                .find_export(&target, original)
                .map_err(|e| import_error(ast, statement, e))?
            {
                None => format!("Could not find imported member {}", original),
                Some(export) if !export.is_exported => format!("{} is not exported", original),
                Some(_) => continue,
            };
            return Err(import_error(ast, statement, validation(ast, specifier, problem)));
        }
    }

    Ok(())
}

/// Identifiers that name something rather than refer to something.
fn is_exempt(ast: &Ast, id: NodeId) -> bool {
    let parent = match ast.parent(id) {
        Some(parent) => parent,
        None => return true,
    };
    let declares = match ast.kind(parent) {
        NodeKind::Call { callee, .. } => *callee == id,
        NodeKind::OneOfMember { name, .. } => *name == id,
        _ => ast.declared_name(parent) == Some(id),
    };
    if declares {
        return true;
    }

    let mut scope = Some(parent);
    while let Some(node) = scope {
        if matches!(ast.kind(node), NodeKind::ImportSpecifier { .. } | NodeKind::Annotation { .. }) {
            return true;
        }
        scope = ast.parent(node);
    }
    false
}

fn check_field_numbers(ast: &Ast, members: &[NodeId]) -> Result<(), HeliumError> {
    let mut used = HashSet::new();
    for &member in members {
        let (number, group) = match ast.kind(member) {
            NodeKind::MessageMember { field_number, .. } => (*field_number, None),
            NodeKind::OneOfMember { field_number, members, .. } => (*field_number, Some(members)),
            _ => continue,
        };
        if !used.insert(number) {
            return Err(validation(ast, member, format!("Field number {} is already used", number)));
        }
        // A oneof group numbers its members on its own.
        if let Some(group) = group {
            check_field_numbers(ast, group)?;
        }
    }
    Ok(())
}

/// The messages `message` extends directly.
fn direct_bases(resolver: &Resolver, message: &DeclRef) -> Result<Vec<DeclRef>, HeliumError> {
    let extends = match message.kind() {
        NodeKind::Message { extends, .. } => extends,
        _ => return Ok(Vec::new()),
    };
    let mut bases = Vec::with_capacity(extends.len());
    for &base in extends {
        let decl = resolver.expect_declaration(&message.file, base)?;
        if !matches!(decl.kind(), NodeKind::Message { .. }) {
            return Err(validation(message.ast(), base, format!("{} is not a message", decl.name())));
        }
        bases.push(decl);
    }
    Ok(bases)
}

/// Every message `message` inherits from, nearest first. Contains `message`
/// itself when the inheritance graph has a cycle through it.
fn ancestors(resolver: &Resolver, message: &DeclRef) -> Result<Vec<DeclRef>, HeliumError> {
    let mut found: Vec<DeclRef> = Vec::new();
    let mut pending = direct_bases(resolver, message)?;
    pending.reverse();
    while let Some(base) = pending.pop() {
        if found.contains(&base) {
            continue;
        }
        if base != *message {
            let mut next = direct_bases(resolver, &base)?;
            next.reverse();
            pending.extend(next);
        }
        found.push(base);
    }
    Ok(found)
}

fn field_numbers_and_names(message: &DeclRef) -> Vec<(NodeId, u32, &str)> {
    let ast = message.ast();
    let members = match message.kind() {
        NodeKind::Message { members, .. } => members,
        _ => return Vec::new(),
    };
    members
        .iter()
        .filter_map(|&member| match ast.kind(member) {
            NodeKind::MessageMember { field_number, .. } | NodeKind::OneOfMember { field_number, .. } => {
                Some((member, *field_number, ast.name_of(member)))
            }
            _ => None,
        })
        .collect()
}

fn check_inheritance(resolver: &Resolver, message: &DeclRef) -> Result<(), HeliumError> {
    let ancestors = ancestors(resolver, message)?;
    if ancestors.contains(message) {
        return Err(HeliumError::Validation(message.error(format!("Cyclic inheritance of {}", message.name()))));
    }

    let own = field_numbers_and_names(message);
    for base in &ancestors {
        for (_, number, name) in field_numbers_and_names(base) {
            if let Some(&(member, ..)) = own.iter().find(|(_, n, _)| *n == number) {
                return Err(validation(
                    message.ast(),
                    member,
                    format!("Field number {} of {} collides with base message {}", number, message.name(), base.name()),
                ));
            }
            if let Some(&(member, ..)) = own.iter().find(|(_, _, n)| *n == name) {
                return Err(validation(
                    message.ast(),
                    member,
                    format!("Field name {} of {} collides with base message {}", name, message.name(), base.name()),
                ));
            }
        }
    }
    Ok(())
}

fn check_recursion(
    resolver: &Resolver,
    message: &DeclRef,
    state: &mut HashMap<(PathBuf, NodeId), Visit>,
) -> Result<(), HeliumError> {
    match state.get(&message.key()) {
        Some(Visit::InProgress) => {
            return Err(HeliumError::Validation(
                message.error(format!("Recursive nesting of {} is not allowed", message.name())),
            ));
        }
        Some(Visit::Done) => return Ok(()),
        None => {}
    }
    state.insert(message.key(), Visit::InProgress);

    let mut levels = vec![message.clone()];
    levels.extend(ancestors(resolver, message)?.into_iter().filter(|base| base != message));
    for level in &levels {
        let ast = level.ast();
        let members = match level.kind() {
            NodeKind::Message { members, .. } => members,
            _ => continue,
        };
        for &member in members {
            if let NodeKind::MessageMember { type_expr, default: None, .. } = ast.kind(member) {
                // Unsupported types are reported by the generator.
                if let Ok(ResolvedType::Message(target)) = resolve_type(resolver, &level.file, *type_expr) {
                    check_recursion(resolver, &target, state)?;
                }
            }
        }
    }

    state.insert(message.key(), Visit::Done);
    Ok(())
}
