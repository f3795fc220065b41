use crate::{
    ast::{Ast, LiteralValue, NodeId, NodeKind, Protocol, Span, TypeTarget},
    error::{CompileError, HeliumError},
    tokenizer::{BuiltinType, Keyword, Lexer, Token, TokenKind, TokenStream},
};
use log::trace;

/// Lexes and parses one schema file.
pub fn parse_schema(file: &str, source: &str) -> Result<Ast, HeliumError> {
    parse(TokenStream::new(Lexer::new(file, source)))
}

/// Parses a whole program from a token stream.
pub fn parse(stream: TokenStream) -> Result<Ast, HeliumError> {
    let ast = Ast::new(stream.file(), stream.source());
    let mut parser = Parser { stream, ast };
    parser.parse_program()?;
    Ok(parser.ast)
}

struct Parser<'a> {
    stream: TokenStream<'a>,
    ast:    Ast,
}

fn error(token: &Token, file: &str, message: String) -> HeliumError {
    HeliumError::Parse(CompileError::new(file, token.line, token.column, message))
}

impl<'a> Parser<'a> {
    fn peek(&mut self) -> Result<Token, HeliumError> {
        self.stream.peek().cloned()
    }

    fn croak(&self, token: &Token, message: String) -> HeliumError {
        error(token, self.stream.file(), message)
    }

    fn unexpected(&self, token: &Token, what: &str, expected: &str) -> HeliumError {
        let what = if what.is_empty() { String::new() } else { format!(" {}", what) };
        self.croak(token, format!("Expecting{}: \"{}\" but found {}", what, expected, token.kind))
    }

    fn is_punctuation(&mut self, c: char) -> Result<bool, HeliumError> {
        Ok(self.stream.peek()?.kind == TokenKind::Punctuation(c))
    }

    fn eat_punctuation(&mut self, c: char) -> Result<bool, HeliumError> {
        let found = self.is_punctuation(c)?;
        if found {
            self.stream.next()?;
        }
        Ok(found)
    }

    fn expect_punctuation(&mut self, c: char) -> Result<Token, HeliumError> {
        let token = self.stream.next()?;
        if token.kind != TokenKind::Punctuation(c) {
            return Err(self.unexpected(&token, "punctuation", &c.to_string()));
        }
        Ok(token)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> Result<bool, HeliumError> {
        let found = self.stream.peek()?.kind == TokenKind::Keyword(keyword);
        if found {
            self.stream.next()?;
        }
        Ok(found)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token, HeliumError> {
        let token = self.stream.next()?;
        if token.kind != TokenKind::Keyword(keyword) {
            return Err(self.unexpected(&token, "keyword", keyword.as_str()));
        }
        Ok(token)
    }

    fn is_operator(&mut self, op: &str) -> Result<bool, HeliumError> {
        Ok(matches!(&self.stream.peek()?.kind, TokenKind::Operator(o) if o == op))
    }

    fn eat_operator(&mut self, op: &str) -> Result<bool, HeliumError> {
        let found = self.is_operator(op)?;
        if found {
            self.stream.next()?;
        }
        Ok(found)
    }

    fn expect_operator(&mut self, op: &str) -> Result<Token, HeliumError> {
        let token = self.stream.next()?;
        if !matches!(&token.kind, TokenKind::Operator(o) if o == op) {
            return Err(self.unexpected(&token, "operation", op));
        }
        Ok(token)
    }

    fn expect_arrow(&mut self) -> Result<(), HeliumError> {
        let token = self.stream.next()?;
        if token.kind != TokenKind::Arrow {
            return Err(self.unexpected(&token, "arrow", "->"));
        }
        Ok(())
    }

    fn expect_string(&mut self, what: &str) -> Result<String, HeliumError> {
        let token = self.stream.next()?;
        match token.kind {
            TokenKind::String(value) => Ok(value),
            _ => Err(self.unexpected(&token, what, "string")),
        }
    }

    /// Adds a node spanning from `start` to the end of the last consumed
    /// token.
    fn finish(&mut self, kind: NodeKind, children: Vec<NodeId>, start: &Token) -> NodeId {
        let span = Span { start: start.start, end: self.stream.previous_end().max(start.start) };
        self.ast.push(kind, children, span, start.line, start.column)
    }

    fn parse_program(&mut self) -> Result<(), HeliumError> {
        let mut statements = Vec::new();
        while self.peek()?.kind != TokenKind::Eof {
            statements.push(self.parse_statement()?);
        }
        let span = Span { start: 0, end: self.ast.source.len() };
        self.ast.root = self.ast.push(NodeKind::Program { statements: statements.clone() }, statements, span, 1, 1);
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<NodeId, HeliumError> {
        let token = self.peek()?;
        trace!("{}:{}:{} statement starting with {}", self.stream.file(), token.line, token.column, token.kind);
        match token.kind {
            TokenKind::Keyword(Keyword::Import) => {
                self.stream.next()?;
                let (specifiers, path) = self.parse_import_tail(true)?;
                Ok(self.finish(NodeKind::Import { specifiers: specifiers.clone(), path }, specifiers, &token))
            }
            TokenKind::Keyword(Keyword::Export) => {
                self.stream.next()?;
                if self.is_punctuation('{')? {
                    let (specifiers, path) = self.parse_import_tail(false)?;
                    Ok(self.finish(NodeKind::Reexport { specifiers: specifiers.clone(), path }, specifiers, &token))
                } else {
                    self.parse_declaration(true)
                }
            }
            _ => self.parse_declaration(false),
        }
    }

    /// Parses `{ specifiers } from "path"` followed by a `;`, which is
    /// optional for re-exports.
    fn parse_import_tail(&mut self, require_semicolon: bool) -> Result<(Vec<NodeId>, String), HeliumError> {
        self.expect_punctuation('{')?;
        let mut specifiers = Vec::new();
        while !self.eat_punctuation('}')? {
            specifiers.push(self.parse_import_specifier()?);
            if !self.eat_punctuation(',')? {
                self.expect_punctuation('}')?;
                break;
            }
        }
        self.expect_keyword(Keyword::From)?;
        let path = self.expect_string("file path")?;
        if require_semicolon {
            self.expect_punctuation(';')?;
        } else {
            self.eat_punctuation(';')?;
        }
        Ok((specifiers, path))
    }

    fn parse_import_specifier(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.peek()?;
        let name = self.parse_identifier()?;
        let alias = if self.eat_keyword(Keyword::As)? {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let children = std::iter::once(name).chain(alias).collect();
        Ok(self.finish(NodeKind::ImportSpecifier { name, alias }, children, &start))
    }

    fn parse_declaration(&mut self, is_exported: bool) -> Result<NodeId, HeliumError> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Keyword(Keyword::Message) => self.parse_message(is_exported),
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum(is_exported),
            TokenKind::Keyword(Keyword::Service) | TokenKind::Keyword(Keyword::Client) => self.parse_service(is_exported),
            TokenKind::Keyword(Keyword::Const) => self.parse_const(is_exported),
            TokenKind::Keyword(Keyword::Type) => self.parse_type_alias(is_exported),
            _ => Err(self.unexpected(&token, "", "const, message, service, enum or type")),
        }
    }

    fn parse_message(&mut self, is_exported: bool) -> Result<NodeId, HeliumError> {
        let start = self.expect_keyword(Keyword::Message)?;
        let name = self.parse_identifier()?;

        let mut extends = Vec::new();
        if self.eat_keyword(Keyword::Extends)? {
            loop {
                extends.push(self.parse_identifier()?);
                if !self.eat_punctuation(',')? {
                    break;
                }
            }
        }

        self.expect_punctuation('{')?;
        let members = self.parse_members()?;

        let children = std::iter::once(name).chain(extends.iter().copied()).chain(members.iter().copied()).collect();
        Ok(self.finish(NodeKind::Message { name, extends, members, is_exported }, children, &start))
    }

    /// Parses members up to and including the closing `}`.
    fn parse_members(&mut self) -> Result<Vec<NodeId>, HeliumError> {
        let mut members = Vec::new();
        while !self.eat_punctuation('}')? {
            members.push(self.parse_member()?);
        }
        Ok(members)
    }

    fn parse_member(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.peek()?;
        let annotations = self.parse_annotations()?;
        let field_number = self.parse_field_number()?;
        self.expect_arrow()?;

        if self.eat_keyword(Keyword::OneOf)? {
            let name = self.parse_identifier()?;
            self.expect_punctuation('{')?;
            let members = self.parse_members()?;
            let children = annotations.iter().copied().chain(std::iter::once(name)).chain(members.iter().copied()).collect();
            return Ok(self.finish(NodeKind::OneOfMember { annotations, field_number, name, members }, children, &start));
        }

        let name = self.parse_identifier()?;
        self.expect_punctuation(':')?;
        let type_expr = self.parse_type_expression()?;
        let default = if self.eat_operator("=")? {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_punctuation(';')?;

        let children = annotations
            .iter()
            .copied()
            .chain([name, type_expr])
            .chain(default)
            .collect();
        Ok(self.finish(NodeKind::MessageMember { annotations, field_number, name, type_expr, default }, children, &start))
    }

    fn parse_field_number(&mut self) -> Result<u32, HeliumError> {
        let token = self.stream.next()?;
        match token.kind {
            TokenKind::Int(n) if n >= 1 && n <= i32::MAX as i64 => Ok(n as u32),
            TokenKind::Int(n) => Err(self.croak(&token, format!("Field number must be a positive 32 bit integer. Found {}", n))),
            ref other => Err(self.croak(&token, format!("Expecting 32 bit integer but found type {}", other.type_name()))),
        }
    }

    fn parse_annotations(&mut self) -> Result<Vec<NodeId>, HeliumError> {
        let mut annotations = Vec::new();
        while self.is_punctuation('@')? {
            annotations.push(self.parse_annotation()?);
        }
        Ok(annotations)
    }

    fn parse_annotation(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.expect_punctuation('@')?;
        let name = self.parse_identifier()?;
        let arguments = if self.is_punctuation('(')? {
            self.parse_call_arguments()?
        } else {
            Vec::new()
        };
        let children = std::iter::once(name).chain(arguments.iter().copied()).collect();
        Ok(self.finish(NodeKind::Annotation { name, arguments }, children, &start))
    }

    fn parse_enum(&mut self, is_exported: bool) -> Result<NodeId, HeliumError> {
        let start = self.expect_keyword(Keyword::Enum)?;
        let name = self.parse_identifier()?;
        self.expect_punctuation('{')?;

        let mut members = Vec::new();
        while !self.eat_punctuation('}')? {
            let member_start = self.peek()?;
            let member_name = self.parse_identifier()?;
            self.expect_operator("=")?;
            let value = self.parse_literal()?;
            if !self.eat_punctuation(';')? && !self.eat_punctuation(',')? {
                let token = self.peek()?;
                return Err(self.unexpected(&token, "", "',' or ';'"));
            }
            members.push(self.finish(
                NodeKind::EnumMember { name: member_name, value },
                vec![member_name, value],
                &member_start,
            ));
        }

        let children = std::iter::once(name).chain(members.iter().copied()).collect();
        Ok(self.finish(NodeKind::Enum { name, members, is_exported }, children, &start))
    }

    fn parse_service(&mut self, is_exported: bool) -> Result<NodeId, HeliumError> {
        let start = self.peek()?;
        let is_client = self.eat_keyword(Keyword::Client)?;
        self.expect_keyword(Keyword::Service)?;
        let name = self.parse_identifier()?;
        self.expect_punctuation('{')?;

        let mut calls = Vec::new();
        let mut constants = Vec::new();
        let mut children = vec![name];
        while !self.eat_punctuation('}')? {
            let annotations = self.parse_annotations()?;
            let token = self.peek()?;
            if token.kind == TokenKind::Keyword(Keyword::Const) {
                if !annotations.is_empty() {
                    return Err(self.croak(&token, "Const declarations do not support annotations".to_owned()));
                }
                let constant = self.parse_const(false)?;
                constants.push(constant);
                children.push(constant);
            } else {
                let call = self.parse_service_call(annotations)?;
                calls.push(call);
                children.push(call);
            }
        }

        Ok(self.finish(NodeKind::Service { name, calls, constants, is_client, is_exported }, children, &start))
    }

    fn parse_service_call(&mut self, annotations: Vec<NodeId>) -> Result<NodeId, HeliumError> {
        let start = match annotations.first() {
            Some(&first) => {
                let node = self.ast.node(first);
                Token { kind: TokenKind::Punctuation('@'), line: node.line, column: node.column, start: node.span.start, end: node.span.end }
            }
            None => self.peek()?,
        };

        let token = self.stream.next()?;
        let protocol = match token.kind {
            TokenKind::Keyword(Keyword::Http) => Protocol::Http,
            TokenKind::Keyword(Keyword::Tcp) => Protocol::Tcp,
            TokenKind::Keyword(Keyword::Ws) => Protocol::Ws,
            _ => return Err(self.unexpected(&token, "", "http, tcp, or ws")),
        };

        let name = self.parse_identifier()?;
        self.expect_punctuation('(')?;
        let argument = if self.is_punctuation(')')? {
            None
        } else {
            Some(self.parse_type_expression()?)
        };
        self.expect_punctuation(')')?;
        self.expect_punctuation(':')?;
        let returns = self.parse_type_expression()?;
        let throws = if self.eat_keyword(Keyword::Throws)? {
            Some(self.parse_type_expression()?)
        } else {
            None
        };
        self.expect_punctuation(';')?;

        let children = annotations
            .iter()
            .copied()
            .chain(std::iter::once(name))
            .chain(argument)
            .chain(std::iter::once(returns))
            .chain(throws)
            .collect();
        Ok(self.finish(
            NodeKind::ServiceCall { annotations, protocol, name, argument, returns, throws },
            children,
            &start,
        ))
    }

    fn parse_const(&mut self, is_exported: bool) -> Result<NodeId, HeliumError> {
        let start = self.expect_keyword(Keyword::Const)?;
        let name = self.parse_identifier()?;
        self.expect_punctuation(':')?;
        let type_expr = self.parse_type_expression()?;
        self.expect_operator("=")?;
        let value = self.parse_expression()?;
        self.expect_punctuation(';')?;
        Ok(self.finish(NodeKind::Const { name, type_expr, value, is_exported }, vec![name, type_expr, value], &start))
    }

    fn parse_type_alias(&mut self, is_exported: bool) -> Result<NodeId, HeliumError> {
        let start = self.expect_keyword(Keyword::Type)?;
        let name = self.parse_identifier()?;
        self.expect_operator("=")?;
        let type_expr = self.parse_type_expression()?;
        self.expect_punctuation(';')?;
        Ok(self.finish(NodeKind::TypeAlias { name, type_expr, is_exported }, vec![name, type_expr], &start))
    }

    fn parse_identifier(&mut self) -> Result<NodeId, HeliumError> {
        let token = self.stream.next()?;
        match &token.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                Ok(self.finish(NodeKind::Identifier(name), Vec::new(), &token))
            }
            _ => Err(self.unexpected(&token, "identifier", "identifier")),
        }
    }

    fn parse_type_expression(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.peek()?;
        let mut types = vec![self.parse_type_literal()?];
        while self.eat_punctuation('|')? {
            types.push(self.parse_type_literal()?);
        }
        if types.len() == 1 {
            return Ok(types[0]);
        }
        Ok(self.finish(NodeKind::TypeUnion { types: types.clone() }, types, &start))
    }

    fn parse_type_literal(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.stream.next()?;
        let mut node = match start.kind {
            TokenKind::Type(ty) => self.finish(NodeKind::TypeReference { target: TypeTarget::Builtin(ty), arguments: Vec::new() }, Vec::new(), &start),
            TokenKind::Null => self.finish(NodeKind::TypeReference { target: TypeTarget::Builtin(BuiltinType::Null), arguments: Vec::new() }, Vec::new(), &start),
            TokenKind::Identifier(_) => {
                self.stream.backtrack();
                let name = self.parse_identifier()?;
                let arguments = if self.is_operator("<")? {
                    self.parse_type_arguments()?
                } else {
                    Vec::new()
                };
                let children = std::iter::once(name).chain(arguments.iter().copied()).collect();
                self.finish(NodeKind::TypeReference { target: TypeTarget::Named(name), arguments }, children, &start)
            }
            _ => return Err(self.unexpected(&start, "type", "type")),
        };

        while self.eat_punctuation('[')? {
            self.expect_punctuation(']')?;
            node = self.finish(NodeKind::ArrayType { element: node }, vec![node], &start);
        }
        Ok(node)
    }

    fn parse_type_arguments(&mut self) -> Result<Vec<NodeId>, HeliumError> {
        self.expect_operator("<")?;
        let mut arguments = Vec::new();
        while !self.eat_operator(">")? {
            arguments.push(self.parse_type_expression()?);
            if !self.eat_punctuation(',')? {
                self.expect_operator(">")?;
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_literal(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.stream.next()?;
        let negative = matches!(&start.kind, TokenKind::Operator(op) if op == "-");
        let token = if negative { self.stream.next()? } else { start.clone() };

        let value = match (&token.kind, negative) {
            (TokenKind::Int(v), _) => LiteralValue::Int(if negative { -v } else { *v }),
            (TokenKind::Long(v), _) => LiteralValue::Long(if negative { -v } else { *v }),
            (TokenKind::Float(v), _) => LiteralValue::Float(if negative { -v } else { *v }),
            (TokenKind::Double(v), _) => LiteralValue::Double(if negative { -v } else { *v }),
            (TokenKind::String(v), false) => LiteralValue::String(v.clone()),
            (TokenKind::Boolean(v), false) => LiteralValue::Boolean(*v),
            (TokenKind::Null, false) => LiteralValue::Null,
            _ => return Err(self.unexpected(&token, "", "literal")),
        };
        Ok(self.finish(NodeKind::Literal(value), Vec::new(), &start))
    }

    fn parse_expression(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.peek()?;
        let left = self.parse_primary()?;

        // Right-leaning: `a - b - c` is `a - (b - c)`.
        let is_binary = matches!(&self.stream.peek()?.kind, TokenKind::Operator(op) if op != "=");
        if !is_binary {
            return Ok(left);
        }
        let operator = match self.stream.next()?.kind {
            TokenKind::Operator(op) => op,
            _ => String::new(),
        };
        let right = self.parse_expression()?;
        Ok(self.finish(NodeKind::Binary { left, operator, right }, vec![left, right], &start))
    }

    fn parse_primary(&mut self) -> Result<NodeId, HeliumError> {
        let token = self.peek()?;
        match &token.kind {
            TokenKind::Punctuation('(') => {
                self.stream.next()?;
                let inner = self.parse_expression()?;
                self.expect_punctuation(')')?;
                Ok(inner)
            }
            TokenKind::Punctuation('[') => self.parse_array(),
            TokenKind::Identifier(_) => {
                self.stream.next()?;
                let is_call = self.is_punctuation('(')?;
                self.stream.backtrack();
                if is_call {
                    self.parse_call()
                } else {
                    self.parse_identifier()
                }
            }
            TokenKind::Operator(op) if op == "-" => self.parse_literal(),
            TokenKind::Int(_)
            | TokenKind::Long(_)
            | TokenKind::Float(_)
            | TokenKind::Double(_)
            | TokenKind::String(_)
            | TokenKind::Boolean(_)
            | TokenKind::Null => self.parse_literal(),
            _ => Err(self.unexpected(&token, "", "expression")),
        }
    }

    fn parse_array(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.expect_punctuation('[')?;
        let mut elements = Vec::new();
        while !self.eat_punctuation(']')? {
            elements.push(self.parse_expression()?);
            if !self.eat_punctuation(',')? {
                self.expect_punctuation(']')?;
                break;
            }
        }
        Ok(self.finish(NodeKind::Array { elements: elements.clone() }, elements, &start))
    }

    fn parse_call(&mut self) -> Result<NodeId, HeliumError> {
        let start = self.peek()?;
        let callee = self.parse_identifier()?;
        if self.ast.identifier(callee) != Some("timespan") {
            return Err(self.croak(&start, format!("Unknown function {}", start.kind)));
        }
        let arguments = self.parse_call_arguments()?;
        let children = std::iter::once(callee).chain(arguments.iter().copied()).collect();
        Ok(self.finish(NodeKind::Call { callee, arguments }, children, &start))
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<NodeId>, HeliumError> {
        self.expect_punctuation('(')?;
        let mut arguments = Vec::new();
        while !self.eat_punctuation(')')? {
            arguments.push(self.parse_expression()?);
            if !self.eat_punctuation(',')? {
                self.expect_punctuation(')')?;
                break;
            }
        }
        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Ast {
        parse_schema("test.he", text).unwrap()
    }

    fn parse_err(text: &str) -> String {
        parse_schema("test.he", text).unwrap_err().to_string()
    }

    #[test]
    fn test_parse_message() {
        let ast = parse_ok(
            "export message Foo extends Bar {\n\
             @tag 1 -> a: int;\n\
             2 -> b: string = \"x\";\n\
             3 -> c: Foo[];\n\
             }",
        );
        let statements = ast.statements();
        assert_eq!(statements.len(), 1);
        let message = statements[0];
        assert_eq!(ast.name_of(message), "Foo");
        assert!(ast.is_exported(message));

        let (extends, members) = match ast.kind(message) {
            NodeKind::Message { extends, members, .. } => (extends.clone(), members.clone()),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(ast.identifier(extends[0]), Some("Bar"));
        assert_eq!(members.len(), 3);

        match ast.kind(members[0]) {
            NodeKind::MessageMember { annotations, field_number, default, .. } => {
                assert_eq!(annotations.len(), 1);
                assert_eq!(*field_number, 1);
                assert!(default.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        match ast.kind(members[1]) {
            NodeKind::MessageMember { default: Some(default), .. } => {
                assert_eq!(ast.kind(*default), &NodeKind::Literal(LiteralValue::String("x".to_owned())));
            }
            other => panic!("unexpected {:?}", other),
        }
        match ast.kind(members[2]) {
            NodeKind::MessageMember { type_expr, .. } => {
                assert!(matches!(ast.kind(*type_expr), NodeKind::ArrayType { .. }));
                assert_eq!(ast.text(*type_expr), "Foo[]");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ast.text(members[1]), "2 -> b: string = \"x\";");
        assert_eq!(ast.parent(members[1]), Some(message));
    }

    #[test]
    fn test_parse_oneof() {
        let ast = parse_ok("message M { 1 -> oneof choice { 1 -> a: int; 2 -> b: string; } }");
        let members = match ast.kind(ast.statements()[0]) {
            NodeKind::Message { members, .. } => members.clone(),
            _ => unreachable!(),
        };
        match ast.kind(members[0]) {
            NodeKind::OneOfMember { field_number, members, .. } => {
                assert_eq!(*field_number, 1);
                assert_eq!(members.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ast.name_of(members[0]), "choice");
    }

    #[test]
    fn test_parse_enum_service_const_alias() {
        let ast = parse_ok(
            "enum Color { RED = 1; GREEN = -2, }\n\
             client service Api {\n\
               const VERSION: string = \"1\";\n\
               @auth(\"token\") http get(): Reply;\n\
               ws post(Request): Reply throws Failure;\n\
             }\n\
             const TIMEOUT: long = timespan(\"1m\") * 2;\n\
             type Ids = ulong[] | string;",
        );
        let statements = ast.statements();
        assert_eq!(statements.len(), 4);

        match ast.kind(statements[0]) {
            NodeKind::Enum { members, .. } => match ast.kind(members[1]) {
                NodeKind::EnumMember { value, .. } => {
                    assert_eq!(ast.kind(*value), &NodeKind::Literal(LiteralValue::Int(-2)))
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }

        match ast.kind(statements[1]) {
            NodeKind::Service { calls, constants, is_client, .. } => {
                assert!(*is_client);
                assert_eq!(constants.len(), 1);
                assert_eq!(calls.len(), 2);
                match ast.kind(calls[0]) {
                    NodeKind::ServiceCall { annotations, protocol, argument, throws, .. } => {
                        assert_eq!(annotations.len(), 1);
                        assert_eq!(*protocol, Protocol::Http);
                        assert!(argument.is_none());
                        assert!(throws.is_none());
                    }
                    other => panic!("unexpected {:?}", other),
                }
                assert_eq!(ast.text(calls[0]), "@auth(\"token\") http get(): Reply;");
                match ast.kind(calls[1]) {
                    NodeKind::ServiceCall { protocol, argument, throws, .. } => {
                        assert_eq!(*protocol, Protocol::Ws);
                        assert!(argument.is_some());
                        assert!(throws.is_some());
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }

        match ast.kind(statements[2]) {
            NodeKind::Const { value, .. } => match ast.kind(*value) {
                NodeKind::Binary { left, operator, .. } => {
                    assert_eq!(operator, "*");
                    assert!(matches!(ast.kind(*left), NodeKind::Call { .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }

        match ast.kind(statements[3]) {
            NodeKind::TypeAlias { type_expr, .. } => match ast.kind(*type_expr) {
                NodeKind::TypeUnion { types } => assert_eq!(types.len(), 2),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_imports() {
        let ast = parse_ok(
            "import { A, B as C } from \"./other\";\n\
             export { D as E, } from './more'",
        );
        match ast.kind(ast.statements()[0]) {
            NodeKind::Import { specifiers, path } => {
                assert_eq!(path, "./other");
                assert_eq!(ast.specifier_names(specifiers[0]), Some(("A", "A")));
                assert_eq!(ast.specifier_names(specifiers[1]), Some(("B", "C")));
            }
            other => panic!("unexpected {:?}", other),
        }
        match ast.kind(ast.statements()[1]) {
            NodeKind::Reexport { specifiers, path } => {
                assert_eq!(path, "./more");
                assert_eq!(ast.specifier_names(specifiers[0]), Some(("D", "E")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_generic_type_arguments() {
        let ast = parse_ok("type Lookup = Table<string, List<int>>;");
        match ast.kind(ast.statements()[0]) {
            NodeKind::TypeAlias { type_expr, .. } => match ast.kind(*type_expr) {
                NodeKind::TypeReference { arguments, .. } => assert_eq!(arguments.len(), 2),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_right_leaning_binary() {
        let ast = parse_ok("const X: int = 10 - 4 - 3;");
        let value = match ast.kind(ast.statements()[0]) {
            NodeKind::Const { value, .. } => *value,
            _ => unreachable!(),
        };
        match ast.kind(value) {
            NodeKind::Binary { left, right, .. } => {
                assert_eq!(ast.kind(*left), &NodeKind::Literal(LiteralValue::Int(10)));
                assert!(matches!(ast.kind(*right), NodeKind::Binary { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_err("export import { A } from \"a\";"),
            "test.he:1:8 - error Expecting: \"const, message, service, enum or type\" but found import"
        );
        assert_eq!(
            parse_err("message M { 0 -> a: int; }"),
            "test.he:1:13 - error Field number must be a positive 32 bit integer. Found 0"
        );
        assert_eq!(
            parse_err("message M { 2147483648 -> a: int; }"),
            "test.he:1:13 - error Field number must be a positive 32 bit integer. Found 2147483648"
        );
        assert_eq!(
            parse_err("message M { a -> a: int; }"),
            "test.he:1:13 - error Expecting 32 bit integer but found type identifier"
        );
        assert_eq!(
            parse_err("service S { @x const A: int = 1; }"),
            "test.he:1:16 - error Const declarations do not support annotations"
        );
        assert_eq!(
            parse_err("const A: int = parse(\"1\");"),
            "test.he:1:16 - error Unknown function parse"
        );
        assert_eq!(
            parse_err("message M { 1 -> a int; }"),
            "test.he:1:20 - error Expecting punctuation: \":\" but found int"
        );
        assert_eq!(
            parse_err("message M {"),
            "test.he:1:12 - error Expecting 32 bit integer but found type eof"
        );
    }
}
