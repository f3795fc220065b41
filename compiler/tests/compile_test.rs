#![cfg(test)]

use std::{fs, path::Path};

use brine_helium_compiler::{
    compile_schema, verify_session, Compiler, CompilerConfig, FsLoader, HeliumError, MemoryLoader, Session,
};
use brine_helium_schema::{DefKind, FieldKind, Value, WireError, MAX_NESTING_DEPTH, TYPE_INT};

#[test]
fn test_compile_and_decode_message() {
    let schema = compile_schema(
        Path::new("m.he"),
        "message M {\n  1 -> a: int;\n  2 -> b: string = null;\n}",
    )
    .expect("compile_schema failed");

    let type_id = schema.type_id("M").unwrap();
    let def = schema.def("M").unwrap();
    assert_eq!(def.kind, DefKind::Message);
    assert_eq!(def.fields.len(), 2);
    assert!(matches!(def.fields[0].kind, FieldKind::Value { type_id: TYPE_INT, is_array: false }));
    assert!(def.fields[1].is_optional);

    let present = [5, 0, 0, 0, 0, 2, 0, 0, 0, b'h', b'i', 0];
    let value = Value::decode(&schema, type_id, &present).unwrap();
    assert_eq!(format!("{:?}", value), "M {a: 5, b: \"hi\"}");
    assert_eq!(value.encode(&schema).unwrap(), present);

    let absent = [5, 0, 0, 0, 255, 0];
    let value = Value::decode(&schema, type_id, &absent).unwrap();
    assert_eq!(format!("{:?}", value), "M {a: 5}");
    assert_eq!(value.encode(&schema).unwrap(), absent);
}

#[test]
fn test_extension_chain_bytes() {
    let schema = compile_schema(
        Path::new("chain.he"),
        "message A { 1 -> x: int; }\n\
         message B extends A { 2 -> y: byte; }",
    )
    .unwrap();

    let bytes = [2, 1, 1, 0, 0, 0, 0];
    let value = Value::decode(&schema, schema.type_id("B").unwrap(), &bytes).unwrap();
    assert_eq!(format!("{:?}", value), "B {x: 1, y: 2}");
    assert_eq!(value.encode(&schema).unwrap(), bytes);

    // A reader of the base type stops at the end marker.
    assert!(Value::decode(&schema, schema.type_id("A").unwrap(), &[1, 0, 0, 0, 1]).is_err());
}

#[test]
fn test_decode_self_referencing_message() {
    let schema = compile_schema(Path::new("node.he"), "message Node {\n 1 -> next: Node = null;\n}").unwrap();
    let type_id = schema.type_id("Node").unwrap();

    assert_eq!(
        Value::decode(&schema, type_id, &vec![0u8; 2_000_000]),
        Err(WireError::NestingTooDeep(MAX_NESTING_DEPTH))
    );

    let value = Value::decode(&schema, type_id, &[0, 255, 0, 0]).unwrap();
    assert_eq!(format!("{:?}", value), "Node {next: Node {}}");
}

#[test]
fn test_unknown_identifier() {
    let err = compile_schema(Path::new("bad.he"), "message M {\n  1 -> a: int;\n  2 -> b: Missing;\n}").unwrap_err();
    assert!(matches!(err, HeliumError::Resolve(_)), "unexpected error {:?}", err);

    let position = err.compile_error().unwrap();
    assert_eq!((position.line, position.column), (3, 11));
    assert_eq!(
        err.to_string(),
        "bad.he:3:11 - error Could not find declaration for identifier Missing"
    );
}

#[test]
fn test_imports_are_parsed_once() {
    let session = Session::new(Box::new(
        MemoryLoader::new()
            .with("common.he", "export message Shared { 1 -> id: ulong; }")
            .with("a.he", "import { Shared } from \"./common\";\nmessage A { 1 -> s: Shared; }")
            .with("b.he", "import { Shared as S } from \"./common\";\nmessage B { 1 -> s: S; }"),
    ));
    session.load(Path::new("a.he")).unwrap();
    session.load(Path::new("b.he")).unwrap();
    verify_session(&session).unwrap();
    assert_eq!(session.parse_count(), 3);
}

#[test]
fn test_oneof_field_numbers() {
    let check = |text: &str| {
        let session = Session::new(Box::new(MemoryLoader::new()));
        session.add_source(Path::new("o.he"), text).unwrap();
        verify_session(&session).map_err(|e| e.to_string())
    };

    // Groups number their members independently of the message and of each other.
    assert_eq!(
        check(
            "message M {\n\
               1 -> id: int;\n\
               2 -> oneof first { 1 -> a: int; 2 -> b: string; }\n\
               3 -> oneof second { 1 -> c: int; 2 -> d: string; }\n\
             }"
        ),
        Ok(())
    );
    assert_eq!(
        check("message M {\n  1 -> oneof pick { 1 -> a: int; 1 -> b: string; }\n}"),
        Err("o.he:2:34 - error Field number 1 is already used".to_owned())
    );
}

#[test]
fn test_build_project() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("schema/shared")).unwrap();
    fs::write(
        root.join("schema/shared/common.he"),
        "export enum Color { RED = 0; GREEN = 1; }\n\
         export message Entity { 1 -> id: ulong; }",
    )
    .unwrap();
    fs::write(
        root.join("schema/app.he"),
        "import { Color, Entity } from \"./shared/common\";\n\
         export message Paint extends Entity { 2 -> color: Color; 3 -> label: string = \"none\"; }\n\
         export client service Painter { http paint(Paint): Entity; }",
    )
    .unwrap();

    let config = CompilerConfig::from_json(
        r#"{
            "version": "0.3.0",
            "clientOut": [{ "namespace": "paint_client", "path": "gen/client", "platform": "rust" }],
            "serverOut": [{ "namespace": "paint_server", "path": "gen/server", "platform": "rust" }],
            "include": ["schema/*.he"]
        }"#,
    )
    .unwrap();

    let compiler = Compiler::new(root, config, Box::new(FsLoader)).unwrap();
    assert_eq!(compiler.sources(), [root.join("schema/app.he")]);

    let schema = compiler.wire_schema().unwrap();
    let names: Vec<&str> = schema.defs.iter().map(|def| def.name.as_str()).collect();
    assert_eq!(names, vec!["Paint", "Color", "Entity"]);

    let outputs = compiler.emit().unwrap();
    let paths: Vec<_> = outputs.iter().map(|output| output.file_path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            root.join("gen/client/Cargo.toml"),
            root.join("gen/client/src/types.rs"),
            root.join("gen/client/src/lib.rs"),
            root.join("gen/server/Cargo.toml"),
            root.join("gen/server/src/types.rs"),
            root.join("gen/server/src/lib.rs"),
        ]
    );

    let client_lib = &outputs[2].file_content;
    assert!(client_lib.contains("pub const NAMESPACE: &str = \"paint_client\";"));
    assert!(client_lib.contains("pub use self::types::{Paint, Color, Entity};"));
    assert!(client_lib.contains("impl HeliumMessage for Paint {"));
    assert!(client_lib.contains("        // Entity\n        message.id = reader.read_uint64()?;"));
    assert!(client_lib.contains("        message.color = Color::read_binary(reader)?;"));
    assert!(client_lib.contains("    pub const LABEL_DEFAULT: &'static str = \"none\";"));
    assert!(client_lib.contains(
        "    pub fn paint<T: Transport>(ctx: &ServiceContext<T>, body: &Paint) -> Result<Entity, CallError<()>> {"
    ));

    let server_lib = &outputs[5].file_content;
    assert!(!server_lib.contains("Painter"));

    let types = &outputs[1].file_content;
    assert!(types.contains("pub struct Paint {\n    pub color: Color,\n"));
    assert!(types.contains("    pub id: u64,\n}"));
    assert!(outputs[0].file_content.contains("name = \"paint_client\"\nversion = \"0.3.0\""));
}

#[test]
fn test_build_reports_first_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.he"), "message M { 1 -> a: int; 1 -> b: int; }").unwrap();

    let config = CompilerConfig::from_json(
        r#"{ "clientOut": [{ "namespace": "x", "path": "out", "platform": "rust" }], "include": ["*.he"] }"#,
    )
    .unwrap();
    let compiler = Compiler::new(dir.path(), config, Box::new(FsLoader)).unwrap();
    let err = compiler.emit().unwrap_err();
    assert!(matches!(err, HeliumError::Validation(_)), "unexpected error {:?}", err);
    assert!(err.to_string().ends_with("broken.he:1:26 - error Field number 1 is already used"));
}
