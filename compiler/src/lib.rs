//! brine-helium-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for `.he` IDL files,
//!  2) A compile session that resolves imports and parses each file once,
//!  3) A verifier (unknown identifiers, field numbers, inheritance, recursive messages, imports),
//!  4) Lowering to the runtime wire [`Schema`](brine_helium_schema::Schema) (`compile_schema`),
//!  5) Project builds driven by `heconfig.json` and Rust code generation (`Compiler`, `RustEmitter`),
//!  6) Error types (`HeliumError`, `CompileError`).

pub mod error;
pub mod utils;
pub mod tokenizer;
pub mod ast;
pub mod parser;
pub mod timespan;
pub mod session;
pub mod resolver;
pub mod types;
pub mod verifier;
pub mod config;
pub mod compiler;
pub mod gen_rust;
pub mod traits;

pub use compiler::{compile_schema, Compiler, Output};
pub use config::{CompilerConfig, Platform, TargetOutput, CONFIG_FILE};
pub use error::{CompileError, HeliumError};
pub use gen_rust::RustEmitter;
pub use parser::parse_schema;
pub use session::{FsLoader, MemoryLoader, Session};
pub use verifier::verify_session;
