use std::{path::Path, rc::Rc};

use crate::{
    compiler::{EmitContext, Output},
    error::HeliumError,
    session::ParsedFile,
};

/// Supplies the text of schema files.
pub trait SourceLoader {
    fn load(&self, path: &Path) -> Result<String, HeliumError>;
}

/// Finds, parses and memoizes the file an import statement refers to.
/// Implementations may be called reentrantly while other files are being
/// validated or generated.
pub trait ImportResolver {
    fn resolve_import(&self, from: &ParsedFile, imported: &str) -> Result<Rc<ParsedFile>, HeliumError>;
}

/// A code generation target. Emitters return the files they would write and
/// never touch the file system themselves.
pub trait Emitter {
    fn emit(&self, ctx: &EmitContext) -> Result<Vec<Output>, HeliumError>;
}
