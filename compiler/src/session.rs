use std::{
    cell::RefCell,
    collections::HashMap,
    fs, io,
    path::{Component, Path, PathBuf},
    rc::Rc,
};

use log::debug;

use crate::{
    ast::Ast,
    error::HeliumError,
    parser::parse_schema,
    traits::{ImportResolver, SourceLoader},
};

pub const SCHEMA_EXTENSION: &str = "he";

/// A schema file and its syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub ast:  Ast,
}

/// Reads schema files from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<String, HeliumError> {
        fs::read_to_string(path)
            .map_err(|e| HeliumError::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e))))
    }
}

/// Serves schema files from memory, keyed by normalized path.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    sources: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> MemoryLoader {
        MemoryLoader::default()
    }

    pub fn with(mut self, path: impl AsRef<Path>, text: &str) -> MemoryLoader {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: &str) {
        self.sources.insert(normalize(path.as_ref()), text.to_owned());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<String, HeliumError> {
        self.sources.get(&normalize(path)).cloned().ok_or_else(|| {
            HeliumError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: file not found", path.display()),
            ))
        })
    }
}

/// The compile session: every file parsed during one run, keyed by
/// normalized path. Each file is lexed and parsed at most once, however
/// often it is discovered or imported.
pub struct Session {
    loader: Box<dyn SourceLoader>,
    links:  HashMap<String, String>,
    files:  RefCell<Vec<Rc<ParsedFile>>>,
    index:  RefCell<HashMap<PathBuf, usize>>,
}

impl Session {
    pub fn new(loader: Box<dyn SourceLoader>) -> Session {
        Session {
            loader,
            links: HashMap::new(),
            files: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
        }
    }

    /// Sets the import alias table. Keys are import paths (with the schema
    /// extension), values are the files they stand for.
    pub fn with_links(mut self, links: HashMap<String, String>) -> Session {
        self.links = links;
        self
    }

    fn lookup(&self, path: &Path) -> Option<Rc<ParsedFile>> {
        let index = self.index.borrow().get(path).copied()?;
        self.files.borrow().get(index).cloned()
    }

    fn insert(&self, file: ParsedFile) -> Rc<ParsedFile> {
        let file = Rc::new(file);
        let mut files = self.files.borrow_mut();
        self.index.borrow_mut().insert(file.path.clone(), files.len());
        files.push(file.clone());
        file
    }

    /// Returns the parsed file at `path`, loading and parsing it on first use.
    pub fn load(&self, path: &Path) -> Result<Rc<ParsedFile>, HeliumError> {
        let path = normalize(path);
        if let Some(file) = self.lookup(&path) {
            return Ok(file);
        }
        let text = self.loader.load(&path)?;
        self.parse(path, &text)
    }

    /// Parses `text` as the file at `path`, unless that path is already part
    /// of the session.
    pub fn add_source(&self, path: &Path, text: &str) -> Result<Rc<ParsedFile>, HeliumError> {
        let path = normalize(path);
        if let Some(file) = self.lookup(&path) {
            return Ok(file);
        }
        self.parse(path, text)
    }

    fn parse(&self, path: PathBuf, text: &str) -> Result<Rc<ParsedFile>, HeliumError> {
        debug!("Parsing {}", path.display());
        let ast = parse_schema(&path.display().to_string(), text)?;
        Ok(self.insert(ParsedFile { path, ast }))
    }

    /// Every file parsed so far, in the order they were parsed.
    pub fn files(&self) -> Vec<Rc<ParsedFile>> {
        self.files.borrow().clone()
    }

    /// How many files have been lexed and parsed in this session.
    pub fn parse_count(&self) -> usize {
        self.files.borrow().len()
    }

    /// Maps an import path, as written in `from`, to the file it names.
    pub fn import_path(&self, from: &Path, imported: &str) -> PathBuf {
        let dir = from.parent().unwrap_or_else(|| Path::new(""));

        let mut imported = imported.to_owned();
        let last = imported.rsplit('/').next().unwrap_or("");
        if !last.contains('.') {
            imported.push('.');
            imported.push_str(SCHEMA_EXTENSION);
        }

        let target = match self.links.get(&imported) {
            Some(link) if link.starts_with('.') => dir.join(link),
            Some(link) => PathBuf::from(link),
            None => dir.join(&imported),
        };
        normalize(&target)
    }
}

impl ImportResolver for Session {
    fn resolve_import(&self, from: &ParsedFile, imported: &str) -> Result<Rc<ParsedFile>, HeliumError> {
        let path = self.import_path(&from.path, imported);
        debug!("Resolved import \"{}\" of {} to {}", imported, from.path.display(), path.display());
        self.load(&path)
    }
}

/// Removes `.` and resolves `..` components without touching the file
/// system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => result.push(".."),
            },
            other => result.push(other.as_os_str()),
        }
    }
    result
}
