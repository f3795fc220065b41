use crate::error::CompileError;
use crate::tokenizer::BuiltinType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end:   usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Tcp,
    Ws,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTarget {
    Builtin(BuiltinType),
    Named(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program {
        statements: Vec<NodeId>,
    },
    Import {
        specifiers: Vec<NodeId>,
        path:       String,
    },
    Reexport {
        specifiers: Vec<NodeId>,
        path:       String,
    },
    /// `name` is the name inside the imported file, `alias` the local one.
    ImportSpecifier {
        name:  NodeId,
        alias: Option<NodeId>,
    },
    Message {
        name:        NodeId,
        extends:     Vec<NodeId>,
        members:     Vec<NodeId>,
        is_exported: bool,
    },
    MessageMember {
        annotations:  Vec<NodeId>,
        field_number: u32,
        name:         NodeId,
        type_expr:    NodeId,
        default:      Option<NodeId>,
    },
    OneOfMember {
        annotations:  Vec<NodeId>,
        field_number: u32,
        name:         NodeId,
        members:      Vec<NodeId>,
    },
    Enum {
        name:        NodeId,
        members:     Vec<NodeId>,
        is_exported: bool,
    },
    EnumMember {
        name:  NodeId,
        value: NodeId,
    },
    Service {
        name:        NodeId,
        calls:       Vec<NodeId>,
        constants:   Vec<NodeId>,
        is_client:   bool,
        is_exported: bool,
    },
    /// A missing `argument` means the call takes no arguments.
    ServiceCall {
        annotations: Vec<NodeId>,
        protocol:    Protocol,
        name:        NodeId,
        argument:    Option<NodeId>,
        returns:     NodeId,
        throws:      Option<NodeId>,
    },
    Const {
        name:        NodeId,
        type_expr:   NodeId,
        value:       NodeId,
        is_exported: bool,
    },
    TypeAlias {
        name:        NodeId,
        type_expr:   NodeId,
        is_exported: bool,
    },
    Annotation {
        name:      NodeId,
        arguments: Vec<NodeId>,
    },
    Identifier(String),
    Literal(LiteralValue),
    Binary {
        left:     NodeId,
        operator: String,
        right:    NodeId,
    },
    Array {
        elements: Vec<NodeId>,
    },
    Call {
        callee:    NodeId,
        arguments: Vec<NodeId>,
    },
    TypeUnion {
        types: Vec<NodeId>,
    },
    TypeReference {
        target:    TypeTarget,
        arguments: Vec<NodeId>,
    },
    ArrayType {
        element: NodeId,
    },
}

impl NodeKind {
    /// A short human readable name, used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Program { .. }         => "program",
            NodeKind::Import { .. }          => "import",
            NodeKind::Reexport { .. }        => "export",
            NodeKind::ImportSpecifier { .. } => "import specifier",
            NodeKind::Message { .. }         => "message",
            NodeKind::MessageMember { .. }   => "message member",
            NodeKind::OneOfMember { .. }     => "oneof",
            NodeKind::Enum { .. }            => "enum",
            NodeKind::EnumMember { .. }      => "enum member",
            NodeKind::Service { .. }         => "service",
            NodeKind::ServiceCall { .. }     => "service call",
            NodeKind::Const { .. }           => "const",
            NodeKind::TypeAlias { .. }       => "type",
            NodeKind::Annotation { .. }      => "annotation",
            NodeKind::Identifier(_)          => "identifier",
            NodeKind::Literal(_)             => "literal",
            NodeKind::Binary { .. }          => "binary",
            NodeKind::Array { .. }           => "array",
            NodeKind::Call { .. }            => "call",
            NodeKind::TypeUnion { .. }       => "type union",
            NodeKind::TypeReference { .. }   => "type reference",
            NodeKind::ArrayType { .. }       => "array type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind:     NodeKind,
    pub parent:   Option<NodeId>,
    pub children: Vec<NodeId>,
    pub span:     Span,
    pub line:     usize,
    pub column:   usize,
}

/// The syntax tree of one schema file. Nodes live in a flat arena and refer
/// to each other by `NodeId`; every node except the root knows its parent.
#[derive(Debug, Clone)]
pub struct Ast {
    pub file:   String,
    pub source: String,
    pub nodes:  Vec<Node>,
    pub root:   NodeId,
}

impl Ast {
    pub fn new(file: &str, source: &str) -> Ast {
        Ast {
            file: file.to_owned(),
            source: source.to_owned(),
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Adds a node and makes it the parent of `children`.
    pub fn push(&mut self, kind: NodeKind, children: Vec<NodeId>, span: Span, line: usize, column: usize) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in &children {
            self.nodes[child.0 as usize].parent = Some(id);
        }
        self.nodes.push(Node { kind, parent: None, children, span, line, column });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// The source text a node was parsed from.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.node(id).span;
        self.source.get(span.start..span.end).unwrap_or("")
    }

    pub fn statements(&self) -> &[NodeId] {
        match self.kind(self.root) {
            NodeKind::Program { statements } => statements,
            _ => &[],
        }
    }

    pub fn identifier(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// The identifier a declaration-shaped node introduces. `oneof` groups
    /// are not declarations.
    pub fn declared_name(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Message { name, .. }
            | NodeKind::Enum { name, .. }
            | NodeKind::Service { name, .. }
            | NodeKind::Const { name, .. }
            | NodeKind::TypeAlias { name, .. }
            | NodeKind::MessageMember { name, .. }
            | NodeKind::EnumMember { name, .. }
            | NodeKind::ServiceCall { name, .. } => Some(*name),
            _ => None,
        }
    }

    /// The name of a declaration-shaped node, or of a `oneof` group.
    pub fn name_of(&self, id: NodeId) -> &str {
        let name = match self.kind(id) {
            NodeKind::OneOfMember { name, .. } => Some(*name),
            _ => self.declared_name(id),
        };
        name.and_then(|name| self.identifier(name)).unwrap_or("")
    }

    /// Returns `true` for the top-level statements that introduce a name.
    pub fn is_top_level_declaration(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::Message { .. }
                | NodeKind::Enum { .. }
                | NodeKind::Service { .. }
                | NodeKind::Const { .. }
                | NodeKind::TypeAlias { .. }
        )
    }

    pub fn is_exported(&self, id: NodeId) -> bool {
        match self.kind(id) {
            NodeKind::Message { is_exported, .. }
            | NodeKind::Enum { is_exported, .. }
            | NodeKind::Service { is_exported, .. }
            | NodeKind::Const { is_exported, .. }
            | NodeKind::TypeAlias { is_exported, .. } => *is_exported,
            _ => false,
        }
    }

    /// Returns the `(imported, local)` names of an import specifier.
    pub fn specifier_names(&self, id: NodeId) -> Option<(&str, &str)> {
        match self.kind(id) {
            NodeKind::ImportSpecifier { name, alias } => {
                let original = self.identifier(*name)?;
                let local = match alias {
                    Some(alias) => self.identifier(*alias)?,
                    None => original,
                };
                Some((original, local))
            }
            _ => None,
        }
    }

    /// All nodes reachable from the root, parents before children.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    pub fn error_at(&self, id: NodeId, message: impl Into<String>) -> CompileError {
        let node = self.node(id);
        CompileError::new(&self.file, node.line, node.column, message)
    }
}
