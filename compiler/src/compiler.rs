use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use brine_helium_schema::{
    Def, EnumValue, EnumVariant, Field, Schema, TYPE_BOOL, TYPE_BYTE, TYPE_DATE, TYPE_DOUBLE, TYPE_FLOAT, TYPE_INT,
    TYPE_LONG, TYPE_SHORT, TYPE_STRING, TYPE_UINT, TYPE_ULONG, TYPE_USHORT,
};
use log::{debug, info};

use crate::{
    ast::{NodeId, NodeKind},
    config::{discover_sources, CompilerConfig, Platform, TargetOutput},
    error::HeliumError,
    gen_rust::RustEmitter,
    resolver::{ConstValue, DeclRef, Resolver},
    session::{FsLoader, ParsedFile, Session},
    tokenizer::BuiltinType,
    traits::{Emitter, SourceLoader},
    types::{collect_declarations, resolve_base, resolve_field_type, ResolvedType},
    verifier::verify_session,
};

/// A generated file. Emitters never write to disk; the caller does once the
/// whole run succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub file_path:    PathBuf,
    pub file_content: String,
}

/// Everything an emitter sees of the compile run, for one output target.
pub struct EmitContext<'a> {
    pub config:      &'a CompilerConfig,
    pub target:      &'a TargetOutput,
    pub project_dir: &'a Path,
    pub files:       Vec<Rc<ParsedFile>>,
    pub resolver:    Resolver<'a>,
}

impl EmitContext<'_> {
    /// The directory the target's files go to.
    pub fn output_dir(&self) -> PathBuf {
        self.project_dir.join(&self.target.path)
    }
}

/// Returns the emitter for a target platform.
pub fn emitter_for(platform: Platform, client: bool) -> Box<dyn Emitter> {
    match platform {
        Platform::Rust => Box::new(RustEmitter::new(client)),
    }
}

/// The project pipeline: discovery, parsing, verification, lowering and code
/// generation over one compile session.
pub struct Compiler {
    project_dir: PathBuf,
    config:      CompilerConfig,
    session:     Session,
    sources:     Vec<PathBuf>,
}

impl Compiler {
    /// Creates a compiler for the project in `project_dir`, discovering the
    /// schema files its include patterns match.
    pub fn new(project_dir: &Path, config: CompilerConfig, loader: Box<dyn SourceLoader>) -> Result<Compiler, HeliumError> {
        let sources = discover_sources(project_dir, &config.include)?;
        info!("Found {} schema file(s) in {}", sources.len(), project_dir.display());
        Ok(Compiler::with_sources(project_dir, config, loader, sources))
    }

    /// Creates a compiler over an explicit list of schema files.
    pub fn with_sources(
        project_dir: &Path,
        config: CompilerConfig,
        loader: Box<dyn SourceLoader>,
        sources: Vec<PathBuf>,
    ) -> Compiler {
        let session = Session::new(loader).with_links(config.links.clone());
        Compiler {
            project_dir: project_dir.to_path_buf(),
            config,
            session,
            sources,
        }
    }

    /// A compiler for a single schema file on disk, with one client target
    /// that writes to `out_dir`.
    pub fn single_file(input: &Path, out_dir: &Path, namespace: &str) -> Compiler {
        let config = CompilerConfig {
            version: "0.1.0".to_owned(),
            client_out: vec![TargetOutput {
                namespace: namespace.to_owned(),
                path: out_dir.display().to_string(),
                platform: Platform::Rust,
            }],
            include: vec![input.display().to_string()],
            ..CompilerConfig::default()
        };
        Compiler::with_sources(Path::new(""), config, Box::new(FsLoader), vec![input.to_path_buf()])
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Parses every source file of the project.
    pub fn parse(&self) -> Result<Vec<Rc<ParsedFile>>, HeliumError> {
        info!("Parsing {} schema file(s)", self.sources.len());
        self.sources.iter().map(|path| self.session.load(path)).collect()
    }

    /// Parses and verifies the project, including every imported file.
    pub fn check(&self) -> Result<(), HeliumError> {
        self.parse()?;
        verify_session(&self.session)
    }

    /// Lowers every message and enum of the project to the wire schema.
    pub fn wire_schema(&self) -> Result<Schema, HeliumError> {
        self.check()?;
        lower_session(&self.session)
    }

    /// Verifies the project and runs every output target.
    pub fn emit(&self) -> Result<Vec<Output>, HeliumError> {
        self.check()?;
        let files = self.session.files();
        let mut outputs = Vec::new();
        for (target, client) in self.config.targets() {
            info!(
                "Generating {} target {} into {}",
                if client { "client" } else { "server" },
                target.namespace,
                target.path
            );
            let ctx = EmitContext {
                config: &self.config,
                target,
                project_dir: &self.project_dir,
                files: files.clone(),
                resolver: Resolver::new(&self.session),
            };
            for output in emitter_for(target.platform, client).emit(&ctx)? {
                debug!("Emitted {}", output.file_path.display());
                outputs.push(output);
            }
        }
        Ok(outputs)
    }
}

/// Parses, verifies and lowers a single schema. Imports are read from disk,
/// relative to `path`.
pub fn compile_schema(path: &Path, text: &str) -> Result<Schema, HeliumError> {
    let session = Session::new(Box::new(FsLoader));
    session.add_source(path, text)?;
    verify_session(&session)?;
    lower_session(&session)
}

/// Lowers every message and enum of a verified session to the wire schema.
pub fn lower_session(session: &Session) -> Result<Schema, HeliumError> {
    let resolver = Resolver::new(session);
    let files = session.files();
    let decls = collect_declarations(&files, |kind| matches!(kind, NodeKind::Message { .. } | NodeKind::Enum { .. }))?;
    let index: HashMap<(PathBuf, NodeId), usize> = decls.iter().enumerate().map(|(i, decl)| (decl.key(), i)).collect();

    let mut defs = Vec::with_capacity(decls.len());
    for decl in &decls {
        let def = match decl.kind() {
            NodeKind::Enum { .. } => lower_enum(&resolver, decl)?,
            _ => lower_message(&resolver, decl, &index)?,
        };
        debug!("Lowered {} with {} field(s)", def.name, def.fields.len());
        defs.push(def);
    }
    Ok(Schema::new(defs))
}

/// The wire type id of a builtin, if it has a wire representation.
pub fn builtin_type_id(ty: BuiltinType) -> Option<i32> {
    match ty {
        BuiltinType::Boolean => Some(TYPE_BOOL),
        BuiltinType::Byte    => Some(TYPE_BYTE),
        BuiltinType::Short   => Some(TYPE_SHORT),
        BuiltinType::UShort  => Some(TYPE_USHORT),
        BuiltinType::Int     => Some(TYPE_INT),
        BuiltinType::UInt    => Some(TYPE_UINT),
        BuiltinType::Long    => Some(TYPE_LONG),
        BuiltinType::ULong   => Some(TYPE_ULONG),
        BuiltinType::Float   => Some(TYPE_FLOAT),
        BuiltinType::Double  => Some(TYPE_DOUBLE),
        BuiltinType::String  => Some(TYPE_STRING),
        BuiltinType::Date    => Some(TYPE_DATE),
        BuiltinType::Map | BuiltinType::Set | BuiltinType::Void | BuiltinType::Null => None,
    }
}

fn lower_message(
    resolver: &Resolver,
    decl: &DeclRef,
    index: &HashMap<(PathBuf, NodeId), usize>,
) -> Result<Def, HeliumError> {
    let extends = match resolve_base(resolver, decl)? {
        Some(base) => Some(def_index(index, &base)?),
        None => None,
    };
    let members = match decl.kind() {
        NodeKind::Message { members, .. } => members.as_slice(),
        _ => &[],
    };
    let fields = members
        .iter()
        .map(|&member| lower_member(resolver, &decl.file, member, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Def::message(decl.name().to_owned(), fields, extends))
}

fn lower_member(
    resolver: &Resolver,
    file: &Rc<ParsedFile>,
    member: NodeId,
    index: &HashMap<(PathBuf, NodeId), usize>,
) -> Result<Field, HeliumError> {
    let ast = &file.ast;
    match ast.kind(member) {
        NodeKind::MessageMember { field_number, type_expr, default, .. } => {
            let ty = resolve_field_type(resolver, file, *type_expr)?;
            let type_id = match ty.element() {
                ResolvedType::Builtin(builtin) => builtin_type_id(*builtin).ok_or_else(|| {
                    HeliumError::Unsupported(ast.error_at(
                        *type_expr,
                        format!("Type {} is not supported in message fields", builtin.as_str()),
                    ))
                })?,
                ResolvedType::Message(target) | ResolvedType::Enum(target) => def_index(index, target)? as i32,
                ResolvedType::Array(_) => {
                    return Err(HeliumError::Unsupported(
                        ast.error_at(*type_expr, "Nested Array types are not yet implemented"),
                    ))
                }
            };
            Ok(Field::new(ast.name_of(member), *field_number, type_id, ty.is_array(), default.is_some()))
        }
        NodeKind::OneOfMember { field_number, members, .. } => {
            let group = members
                .iter()
                .map(|&sub| lower_member(resolver, file, sub, index))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Field::one_of(ast.name_of(member), *field_number, group))
        }
        other => Err(HeliumError::Validation(
            ast.error_at(member, format!("Expecting a message member but found {}", other.describe())),
        )),
    }
}

pub(crate) fn lower_enum(resolver: &Resolver, decl: &DeclRef) -> Result<Def, HeliumError> {
    let ast = decl.ast();
    let members = match decl.kind() {
        NodeKind::Enum { members, .. } => members.as_slice(),
        _ => &[],
    };
    if members.is_empty() {
        return Err(HeliumError::Unsupported(decl.error(format!("Enum {} has no members", decl.name()))));
    }

    let mut variants = Vec::with_capacity(members.len());
    for &member in members {
        let value = match ast.kind(member) {
            NodeKind::EnumMember { value, .. } => *value,
            _ => continue,
        };
        let value = match resolver.evaluate_constant(&decl.file, value)? {
            ConstValue::Int(v) => EnumValue::Int(i32::try_from(v).map_err(|_| {
                HeliumError::Unsupported(ast.error_at(member, format!("Enum value {} does not fit in 32 bits", v)))
            })?),
            ConstValue::String(v) => EnumValue::String(v),
            other => {
                return Err(HeliumError::Unsupported(ast.error_at(
                    member,
                    format!("Enum members must be integers or strings, found {}", other.type_name()),
                )))
            }
        };
        variants.push(EnumVariant { name: ast.name_of(member).to_owned(), value });
    }

    let strings = variants.iter().filter(|v| matches!(v.value, EnumValue::String(_))).count();
    if strings != 0 && strings != variants.len() {
        return Err(HeliumError::Unsupported(
            decl.error(format!("Enum {} mixes integer and string members", decl.name())),
        ));
    }
    Ok(Def::enumeration(decl.name().to_owned(), variants))
}

fn def_index(index: &HashMap<(PathBuf, NodeId), usize>, decl: &DeclRef) -> Result<usize, HeliumError> {
    index
        .get(&decl.key())
        .copied()
        .ok_or_else(|| HeliumError::Unsupported(decl.error(format!("{} is not part of the wire schema", decl.name()))))
}
