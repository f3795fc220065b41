use std::{cmp::Ordering, path::PathBuf, rc::Rc};

use crate::{
    ast::{Ast, LiteralValue, NodeId, NodeKind},
    error::{CompileError, HeliumError},
    session::ParsedFile,
    timespan::{timespan, TimeUnit},
    traits::ImportResolver,
};

/// Constants may refer to other constants this deep before evaluation gives up.
const MAX_DEPTH: usize = 64;

/// A declaration somewhere in the compile session.
#[derive(Debug, Clone)]
pub struct DeclRef {
    pub file: Rc<ParsedFile>,
    pub node: NodeId,
}

impl DeclRef {
    pub fn new(file: Rc<ParsedFile>, node: NodeId) -> DeclRef {
        DeclRef { file, node }
    }

    pub fn ast(&self) -> &Ast {
        &self.file.ast
    }

    pub fn kind(&self) -> &NodeKind {
        self.file.ast.kind(self.node)
    }

    pub fn name(&self) -> &str {
        self.file.ast.name_of(self.node)
    }

    /// Identifies the declaration across the whole session.
    pub fn key(&self) -> (PathBuf, NodeId) {
        (self.file.path.clone(), self.node)
    }

    pub fn error(&self, message: impl Into<String>) -> CompileError {
        self.file.ast.error_at(self.node, message)
    }
}

impl PartialEq for DeclRef {
    fn eq(&self, other: &DeclRef) -> bool {
        Rc::ptr_eq(&self.file, &other.file) && self.node == other.node
    }
}

/// A top-level name of a file, as importers see it.
#[derive(Debug, Clone)]
pub struct Export {
    pub decl:        DeclRef,
    pub is_exported: bool,
}

/// The result of folding a constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    Array(Vec<ConstValue>),
}

impl ConstValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstValue::Int(_)    => "integer",
            ConstValue::Float(_)  => "number",
            ConstValue::String(_) => "string",
            ConstValue::Bool(_)   => "boolean",
            ConstValue::Null      => "null",
            ConstValue::Array(_)  => "array",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&LiteralValue> for ConstValue {
    fn from(value: &LiteralValue) -> ConstValue {
        match value {
            LiteralValue::Int(v) | LiteralValue::Long(v) => ConstValue::Int(*v),
            LiteralValue::Float(v) | LiteralValue::Double(v) => ConstValue::Float(*v),
            LiteralValue::String(v) => ConstValue::String(v.clone()),
            LiteralValue::Boolean(v) => ConstValue::Bool(*v),
            LiteralValue::Null => ConstValue::Null,
        }
    }
}

/// Wraps a failure to load or read an imported file.
pub fn import_error(ast: &Ast, statement: NodeId, cause: HeliumError) -> HeliumError {
    HeliumError::Validation(ast.error_at(statement, "Failed to resolve import").with_cause(cause))
}

/// Resolves identifiers to declarations, across files, and folds constant
/// expressions.
pub struct Resolver<'a> {
    imports: &'a dyn ImportResolver,
}

impl<'a> Resolver<'a> {
    pub fn new(imports: &'a dyn ImportResolver) -> Resolver<'a> {
        Resolver { imports }
    }

    pub fn imports(&self) -> &'a dyn ImportResolver {
        self.imports
    }

    /// Finds the declaration an identifier refers to: first in the enclosing
    /// scopes of the identifier, then among the names the file imports.
    pub fn resolve_identifier(&self, file: &Rc<ParsedFile>, id: NodeId) -> Result<Option<DeclRef>, HeliumError> {
        let ast = &file.ast;
        let name = match ast.identifier(id) {
            Some(name) => name,
            None => return Ok(None),
        };

        let mut scope = ast.parent(id);
        while let Some(node) = scope {
            for &child in ast.children(node) {
                let declared = ast.declared_name(child).and_then(|n| ast.identifier(n));
                if declared == Some(name) {
                    return Ok(Some(DeclRef::new(file.clone(), child)));
                }
            }
            scope = ast.parent(node);
        }

        self.resolve_imported(file, name)
    }

    /// Like `resolve_identifier`, but a missing declaration is an error.
    pub fn expect_declaration(&self, file: &Rc<ParsedFile>, id: NodeId) -> Result<DeclRef, HeliumError> {
        match self.resolve_identifier(file, id)? {
            Some(decl) => Ok(decl),
            None => Err(HeliumError::Resolve(file.ast.error_at(
                id,
                format!("Could not find declaration for identifier {}", file.ast.identifier(id).unwrap_or("")),
            ))),
        }
    }

    fn resolve_imported(&self, file: &Rc<ParsedFile>, name: &str) -> Result<Option<DeclRef>, HeliumError> {
        let ast = &file.ast;
        for &statement in ast.statements() {
            let (specifiers, path) = match ast.kind(statement) {
                NodeKind::Import { specifiers, path } => (specifiers, path),
                _ => continue,
            };
            for &specifier in specifiers {
                let (original, local) = match ast.specifier_names(specifier) {
                    Some(names) => names,
                    None => continue,
                };
                if local != name {
                    continue;
                }
                let target = self
                    .imports
                    .resolve_import(file, path)
                    .map_err(|e| import_error(ast, statement, e))?;
                return Ok(self.find_export(&target, original)?.map(|export| export.decl));
            }
        }
        Ok(None)
    }

    /// Looks up a top-level name of `file` the way an importer sees it,
    /// following re-exports.
    pub fn find_export(&self, file: &Rc<ParsedFile>, name: &str) -> Result<Option<Export>, HeliumError> {
        self.find_export_guarded(file, name, &mut Vec::new())
    }

    fn find_export_guarded(
        &self,
        file: &Rc<ParsedFile>,
        name: &str,
        visiting: &mut Vec<(PathBuf, String)>,
    ) -> Result<Option<Export>, HeliumError> {
        let key = (file.path.clone(), name.to_owned());
        if visiting.contains(&key) {
            return Ok(None);
        }
        visiting.push(key);

        let ast = &file.ast;
        for &statement in ast.statements() {
            if ast.is_top_level_declaration(statement) && ast.name_of(statement) == name {
                return Ok(Some(Export {
                    decl: DeclRef::new(file.clone(), statement),
                    is_exported: ast.is_exported(statement),
                }));
            }
        }

        for &statement in ast.statements() {
            let (specifiers, path) = match ast.kind(statement) {
                NodeKind::Reexport { specifiers, path } => (specifiers, path),
                _ => continue,
            };
            for &specifier in specifiers {
                match ast.specifier_names(specifier) {
                    Some((original, local)) if local == name => {
                        let target = self
                            .imports
                            .resolve_import(file, path)
                            .map_err(|e| import_error(ast, statement, e))?;
                        return self.find_export_guarded(&target, original, visiting);
                    }
                    _ => {}
                }
            }
        }
        Ok(None)
    }

    /// Follows identifiers through `const` declarations until a literal is
    /// reached.
    pub fn resolve_expression_value(&self, file: &Rc<ParsedFile>, expr: NodeId) -> Result<LiteralValue, HeliumError> {
        self.resolve_value_at(file, expr, 0)
    }

    fn resolve_value_at(&self, file: &Rc<ParsedFile>, expr: NodeId, depth: usize) -> Result<LiteralValue, HeliumError> {
        let ast = &file.ast;
        match ast.kind(expr) {
            NodeKind::Literal(value) => Ok(value.clone()),
            NodeKind::Identifier(name) => {
                let decl = self.expect_declaration(file, expr)?;
                match decl.kind() {
                    NodeKind::Const { value, .. } => {
                        if depth >= MAX_DEPTH {
                            return Err(HeliumError::Resolve(ast.error_at(expr, format!("Constant {} refers to itself", name))));
                        }
                        self.resolve_value_at(&decl.file, *value, depth + 1)
                    }
                    _ => Err(HeliumError::Resolve(ast.error_at(expr, format!("{} is not a constant", name)))),
                }
            }
            other => Err(HeliumError::Resolve(ast.error_at(
                expr,
                format!("Value resolution for {} expression not implemented", other.describe()),
            ))),
        }
    }

    /// Folds a constant expression: literals, constants, arrays, binary
    /// operators and the `timespan` builtin.
    pub fn evaluate_constant(&self, file: &Rc<ParsedFile>, expr: NodeId) -> Result<ConstValue, HeliumError> {
        self.evaluate_at(file, expr, 0)
    }

    fn evaluate_at(&self, file: &Rc<ParsedFile>, expr: NodeId, depth: usize) -> Result<ConstValue, HeliumError> {
        let ast = &file.ast;
        match ast.kind(expr) {
            NodeKind::Literal(value) => Ok(ConstValue::from(value)),
            NodeKind::Identifier(name) => {
                let decl = self.expect_declaration(file, expr)?;
                let value = match decl.kind() {
                    NodeKind::Const { value, .. } | NodeKind::EnumMember { value, .. } => *value,
                    _ => return Err(HeliumError::Resolve(ast.error_at(expr, format!("{} is not a constant", name)))),
                };
                if depth >= MAX_DEPTH {
                    return Err(HeliumError::Resolve(ast.error_at(expr, format!("Constant {} refers to itself", name))));
                }
                self.evaluate_at(&decl.file, value, depth + 1)
            }
            NodeKind::Binary { left, operator, right } => {
                let left = self.evaluate_at(file, *left, depth)?;
                let right = self.evaluate_at(file, *right, depth)?;
                apply_operator(operator, left, right).map_err(|message| HeliumError::Validation(ast.error_at(expr, message)))
            }
            NodeKind::Array { elements } => elements
                .iter()
                .map(|&element| self.evaluate_at(file, element, depth))
                .collect::<Result<Vec<_>, _>>()
                .map(ConstValue::Array),
            NodeKind::Call { arguments, .. } => self.evaluate_timespan(file, expr, arguments, depth),
            other => Err(HeliumError::Resolve(ast.error_at(
                expr,
                format!("Value resolution for {} expression not implemented", other.describe()),
            ))),
        }
    }

    fn evaluate_timespan(
        &self,
        file: &Rc<ParsedFile>,
        call: NodeId,
        arguments: &[NodeId],
        depth: usize,
    ) -> Result<ConstValue, HeliumError> {
        let fail = |message: String| HeliumError::Validation(file.ast.error_at(call, message));

        let (&expression, unit) = match arguments {
            [] => return Err(fail("timespan requires at least one argument".to_owned())),
            [expression] => (expression, None),
            [expression, unit] => (expression, Some(*unit)),
            _ => return Err(fail("timespan uses at most two arguments".to_owned())),
        };

        let expression = match self.evaluate_at(file, expression, depth)? {
            ConstValue::String(expression) => expression,
            _ => return Err(fail("timespan only supports string for time expression".to_owned())),
        };

        let unit = match unit {
            None => TimeUnit::Milliseconds,
            Some(unit) => match self.evaluate_at(file, unit, depth)? {
                ConstValue::String(name) => TimeUnit::from_name(&name)
                    .ok_or_else(|| fail(format!("Unknown unit: {} in expression {}", name, expression)))?,
                _ => return Err(fail("timespan only supports string for time unit".to_owned())),
            },
        };

        timespan(&expression, unit).map(ConstValue::Float).map_err(fail)
    }
}

fn apply_operator(operator: &str, left: ConstValue, right: ConstValue) -> Result<ConstValue, String> {
    use ConstValue::*;

    let unsupported = |left: &ConstValue, right: &ConstValue| {
        format!("Operator {} is not supported for {} and {}", operator, left.type_name(), right.type_name())
    };
    let overflow = || "Integer overflow in constant expression".to_owned();

    match (operator, &left, &right) {
        ("+", String(a), String(b)) => return Ok(String(format!("{}{}", a, b))),
        ("&&", Bool(a), Bool(b)) => return Ok(Bool(*a && *b)),
        ("||", Bool(a), Bool(b)) => return Ok(Bool(*a || *b)),
        _ => {}
    }

    if let (Int(a), Int(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        let value = match operator {
            "+" => a.checked_add(b).ok_or_else(overflow)?,
            "-" => a.checked_sub(b).ok_or_else(overflow)?,
            "*" => a.checked_mul(b).ok_or_else(overflow)?,
            "/" if b == 0 => return Err("Division by zero".to_owned()),
            "/" => a.checked_div(b).ok_or_else(overflow)?,
            "%" if b == 0 => return Err("Division by zero".to_owned()),
            "%" => a.checked_rem(b).ok_or_else(overflow)?,
            "**" => {
                let exponent = u32::try_from(b).map_err(|_| overflow())?;
                a.checked_pow(exponent).ok_or_else(overflow)?
            }
            _ => return compare(operator, &left, &right).ok_or_else(|| unsupported(&left, &right)),
        };
        return Ok(Int(value));
    }

    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        let value = match operator {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" => a / b,
            "%" => a % b,
            "**" => a.powf(b),
            _ => return compare(operator, &left, &right).ok_or_else(|| unsupported(&left, &right)),
        };
        return Ok(Float(value));
    }

    compare(operator, &left, &right).ok_or_else(|| unsupported(&left, &right))
}

fn compare(operator: &str, left: &ConstValue, right: &ConstValue) -> Option<ConstValue> {
    let ordering = match (left, right) {
        (ConstValue::String(a), ConstValue::String(b)) => Some(a.cmp(b)),
        (ConstValue::Int(a), ConstValue::Int(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    let result = match operator {
        "==" => ordering.map_or(left == right, |o| o == Ordering::Equal),
        "!=" => ordering.map_or(left != right, |o| o != Ordering::Equal),
        "<" => ordering? == Ordering::Less,
        "<=" => ordering? != Ordering::Greater,
        ">" => ordering? == Ordering::Greater,
        ">=" => ordering? != Ordering::Less,
        _ => return None,
    };
    Some(ConstValue::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryLoader, Session};
    use std::path::Path;

    fn session(files: &[(&str, &str)]) -> Session {
        let mut loader = MemoryLoader::new();
        for (path, text) in files {
            loader.insert(path, text);
        }
        Session::new(Box::new(loader))
    }

    /// Finds the first identifier node named `name` that is not a declaring
    /// name.
    fn find_reference(file: &ParsedFile, name: &str) -> NodeId {
        let ast = &file.ast;
        ast.preorder()
            .into_iter()
            .find(|&id| {
                ast.identifier(id) == Some(name)
                    && ast.parent(id).and_then(|p| ast.declared_name(p)) != Some(id)
            })
            .unwrap()
    }

    fn const_value(file: &ParsedFile, name: &str) -> NodeId {
        let ast = &file.ast;
        ast.statements()
            .iter()
            .find_map(|&s| match ast.kind(s) {
                NodeKind::Const { value, .. } if ast.name_of(s) == name => Some(*value),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_lexical_scope() {
        let session = session(&[(
            "main.he",
            "message Inner {}\n\
             message Outer { 1 -> a: Inner; 2 -> b: a; }",
        )]);
        let resolver = Resolver::new(&session);
        let file = session.load(Path::new("main.he")).unwrap();

        let inner = resolver.resolve_identifier(&file, find_reference(&file, "Inner")).unwrap().unwrap();
        assert_eq!(inner.name(), "Inner");
        assert!(matches!(inner.kind(), NodeKind::Message { .. }));

        let member = resolver.resolve_identifier(&file, find_reference(&file, "a")).unwrap().unwrap();
        assert!(matches!(member.kind(), NodeKind::MessageMember { .. }));
    }

    #[test]
    fn test_aliased_import() {
        let session = session(&[
            ("main.he", "import { Color as Colour } from \"./lib/colors\"; message M { 1 -> c: Colour; }"),
            ("lib/colors.he", "export enum Color { RED = 1; }"),
        ]);
        let resolver = Resolver::new(&session);
        let file = session.load(Path::new("main.he")).unwrap();

        let decl = resolver.resolve_identifier(&file, find_reference(&file, "Colour")).unwrap().unwrap();
        assert_eq!(decl.name(), "Color");
        assert_eq!(decl.file.path, PathBuf::from("lib/colors.he"));
        assert_eq!(session.parse_count(), 2);
    }

    #[test]
    fn test_reexport_chain() {
        let session = session(&[
            ("main.he", "import { Shape } from \"./index\"; message M { 1 -> s: Shape; }"),
            ("index.he", "export { Form as Shape } from \"./shapes\";"),
            ("shapes.he", "export message Form {}"),
        ]);
        let resolver = Resolver::new(&session);
        let file = session.load(Path::new("main.he")).unwrap();

        let decl = resolver.resolve_identifier(&file, find_reference(&file, "Shape")).unwrap().unwrap();
        assert_eq!(decl.name(), "Form");

        let index = session.load(Path::new("index.he")).unwrap();
        let export = resolver.find_export(&index, "Shape").unwrap().unwrap();
        assert!(export.is_exported);
        assert!(resolver.find_export(&index, "Form").unwrap().is_none());
    }

    #[test]
    fn test_reexport_cycle() {
        let session = session(&[
            ("a.he", "export { X } from \"./b\";"),
            ("b.he", "export { X } from \"./a\";"),
        ]);
        let resolver = Resolver::new(&session);
        let a = session.load(Path::new("a.he")).unwrap();
        assert!(resolver.find_export(&a, "X").unwrap().is_none());
    }

    #[test]
    fn test_missing_import_file() {
        let session = session(&[("main.he", "import { A } from \"./gone\"; message M { 1 -> a: A; }")]);
        let resolver = Resolver::new(&session);
        let file = session.load(Path::new("main.he")).unwrap();
        let err = resolver.resolve_identifier(&file, find_reference(&file, "A")).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("main.he:1:1 - error Failed to resolve import\nCaused By: I/O error: gone.he"), "{}", message);
    }

    #[test]
    fn test_resolve_expression_value() {
        let session = session(&[
            ("main.he", "import { BASE } from \"./consts\"; const A: string = BASE; const B: int = 1 + 2;"),
            ("consts.he", "export const BASE: string = ROOT; const ROOT: string = \"1h\";"),
        ]);
        let resolver = Resolver::new(&session);
        let file = session.load(Path::new("main.he")).unwrap();

        assert_eq!(
            resolver.resolve_expression_value(&file, const_value(&file, "A")).unwrap(),
            LiteralValue::String("1h".to_owned())
        );
        let err = resolver.resolve_expression_value(&file, const_value(&file, "B")).unwrap_err();
        assert_eq!(err.to_string(), "main.he:1:73 - error Value resolution for binary expression not implemented");
    }

    #[test]
    fn test_evaluate_constant() {
        let session = session(&[(
            "main.he",
            "const REFRESH: string = \"1m 30s\";\n\
             const MS: long = timespan(REFRESH);\n\
             const SECS: long = timespan(REFRESH, \"SECONDS\");\n\
             const MATH: int = 10 - 4 - 3;\n\
             const NAME: string = \"he\" + \"lium\";\n\
             const FLAGS: boolean = (1 < 2) && (SECS == 90);\n\
             const LIST: int[] = [1, 2 * 3];\n\
             const BAD: int = 1 / 0;\n\
             const LOOP: int = LOOP;\n\
             const UNIT: long = timespan(\"1s\", \"fortnights\");",
        )]);
        let resolver = Resolver::new(&session);
        let file = session.load(Path::new("main.he")).unwrap();
        let eval = |name: &str| resolver.evaluate_constant(&file, const_value(&file, name));

        assert_eq!(eval("MS").unwrap(), ConstValue::Float(90_000.0));
        assert_eq!(eval("SECS").unwrap(), ConstValue::Float(90.0));
        assert_eq!(eval("MATH").unwrap(), ConstValue::Int(9));
        assert_eq!(eval("NAME").unwrap(), ConstValue::String("helium".to_owned()));
        assert_eq!(eval("FLAGS").unwrap(), ConstValue::Bool(true));
        assert_eq!(eval("LIST").unwrap(), ConstValue::Array(vec![ConstValue::Int(1), ConstValue::Int(6)]));
        assert_eq!(eval("BAD").unwrap_err().to_string(), "main.he:8:18 - error Division by zero");
        assert_eq!(eval("LOOP").unwrap_err().to_string(), "main.he:9:19 - error Constant LOOP refers to itself");
        assert_eq!(
            eval("UNIT").unwrap_err().to_string(),
            "main.he:10:20 - error Unknown unit: fortnights in expression 1s"
        );
    }

    #[test]
    fn test_timespan_arguments() {
        let session = session(&[(
            "main.he",
            "const NONE: long = timespan();\nconst NUM: long = timespan(5);\nconst MANY: long = timespan(\"1s\", \"s\", \"s\");",
        )]);
        let resolver = Resolver::new(&session);
        let file = session.load(Path::new("main.he")).unwrap();
        let eval = |name: &str| resolver.evaluate_constant(&file, const_value(&file, name)).unwrap_err().to_string();

        assert_eq!(eval("NONE"), "main.he:1:20 - error timespan requires at least one argument");
        assert_eq!(eval("NUM"), "main.he:2:19 - error timespan only supports string for time expression");
        assert_eq!(eval("MANY"), "main.he:3:20 - error timespan uses at most two arguments");
    }
}
