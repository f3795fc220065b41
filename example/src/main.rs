// example/src/main.rs

mod generated;

use brine_helium::*;

// Bring the generated types into scope:
use generated::{types::ExampleExtra, Ack, Color, Example, ExampleService, Mood, Shape};

/// An in-process stand-in for the server side of `ExampleService`. It accepts
/// examples that carry at least one color.
struct LocalServer;

impl LocalServer {
    fn respond(success: bool, ack: &Ack) -> Result<Response, TransportError> {
        let mut body = vec![success as u8];
        body.extend(ack.to_binary()?);
        Ok(Response { content_type: "application/octet-stream".to_owned(), body })
    }
}

impl Transport for LocalServer {
    fn get(&self, _request: &Request) -> Result<Response, TransportError> {
        LocalServer::respond(true, &Ack { accepted: true, reason: None })
    }

    fn post(&self, request: &Request) -> Result<Response, TransportError> {
        let example = match request.content_type {
            "application/json" => Example::from_json(std::str::from_utf8(&request.body)?)?,
            _ => Example::from_binary(&request.body)?,
        };
        if example.colors.is_empty() {
            let ack = Ack { accepted: false, reason: Some("no colors".to_owned()) };
            return LocalServer::respond(false, &ack);
        }
        LocalServer::respond(true, &Ack { accepted: true, reason: None })
    }
}

fn sample() -> Example {
    Example {
        client_id: 123,
        shape: Shape::Round,
        colors: vec![
            Color { red: 10, green: 20, blue: 30, alpha: None },
            Color { red: 200, green: 100, blue: 50, alpha: Some(128) },
        ],
        mood: Some(Mood::Grumpy),
        tags: None,
        extra: Some(ExampleExtra::Note("hello".to_owned())),
        id: 7,
        created_at: 1_700_000_000_000,
    }
}

fn main() -> Result<(), CallError<Ack>> {
    let example = sample();

    let bytes = example.to_binary()?;
    println!("binary  = {} bytes", bytes.len());
    println!("json    = {}", example.to_json()?);

    let decoded = Example::from_binary(&bytes)?;
    println!("clientID = {}", decoded.client_id);
    println!("shape    = {:?} (wire value {})", decoded.shape, decoded.shape.wire_value());
    for (i, c) in decoded.colors.iter().enumerate() {
        println!(
            "  Color[{}] = (r={}, g={}, b={}, a={})",
            i,
            c.red,
            c.green,
            c.blue,
            c.alpha.unwrap_or(Color::ALPHA_DEFAULT)
        );
    }

    let ctx = ServiceContext::new(LocalServer, "http://localhost:8080");
    let endpoint = Endpoint::new("ExampleService", "submit", generated::NAMESPACE, Protocol::Http);
    println!("ExampleService v{} at {}", ExampleService::VERSION, ctx.url(&endpoint));
    let ack = ExampleService::submit(&ctx, &example)?;
    println!("accepted = {}", ack.accepted);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::Entity;
    use brine_helium_compiler::{Compiler, CompilerConfig, FsLoader};
    use std::path::Path;

    #[test]
    fn test_binary_layout() {
        let example = Example {
            client_id: 123,
            shape: Shape::Round,
            colors: vec![Color { red: 10, green: 20, blue: 30, alpha: None }],
            mood: Some(Mood::Grumpy),
            id: 7,
            ..Example::default()
        };

        let mut expected = vec![123, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 10, 20, 30, 255, 0, 0, 6, 0, 0, 0];
        expected.extend(b"grumpy");
        expected.extend([255, 1, 7, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let bytes = example.to_binary().unwrap();
        assert_eq!(bytes, expected);
        assert_eq!(Example::from_binary(&bytes).unwrap(), example);
    }

    #[test]
    fn test_oneof_is_not_encoded() {
        let example = sample();
        let decoded = Example::from_binary(&example.to_binary().unwrap()).unwrap();
        assert_eq!(decoded.extra, None);
        assert_eq!(decoded, Example { extra: None, ..example });
    }

    #[test]
    fn test_base_message_reads_own_fields() {
        let entity = Entity { id: 9, created_at: 5 };
        let bytes = entity.to_binary().unwrap();
        assert_eq!(bytes, [9, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0, 0]);

        // A continuation on a message without a base is rejected.
        let mut extended = bytes.clone();
        *extended.last_mut().unwrap() = 1;
        assert_eq!(
            Entity::from_binary(&extended),
            Err(WireError::UnexpectedContinuation("Entity".to_owned()))
        );
    }

    #[test]
    fn test_enums() {
        assert_eq!(Shape::from_wire_value(2), Some(Shape::Pointed));
        assert_eq!(Shape::from_wire_value(9), None);
        assert_eq!(Mood::Happy.wire_value(), "happy");
        assert_eq!(Mood::default(), Mood::Happy);

        let mut reader = ByteBuffer::new(&[9, 0, 0, 0]);
        assert_eq!(Shape::read_binary(&mut reader), Err(WireError::InvalidEnumValue("Shape".to_owned())));
    }

    #[test]
    fn test_json() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["clientID"], 123);
        assert_eq!(value["shape"], "ROUND");
        assert_eq!(value["extra"]["note"], "hello");
        assert_eq!(value["colors"][0].get("alpha"), None);
        assert_eq!(Example::from_json(&json).unwrap(), sample());
    }

    #[test]
    fn test_constants() {
        assert_eq!(generated::REFRESH, "1m 30s");
        assert_eq!(generated::REFRESH_MS, 90_000);
        assert_eq!(Color::ALPHA_DEFAULT, 255);
        assert!(Example::TAGS_DEFAULT.is_empty());
        assert_eq!(ExampleService::VERSION, "1.0");
    }

    #[test]
    fn test_service_calls() {
        let ctx = ServiceContext::new(LocalServer, "http://localhost");
        assert_eq!(ExampleService::submit(&ctx, &sample()).unwrap(), Ack { accepted: true, reason: None });
        assert_eq!(ExampleService::ping(&ctx).unwrap(), Ack { accepted: true, reason: None });

        let rejected = ExampleService::submit(&ctx, &Example::default());
        match rejected {
            Err(CallError::Remote(ack)) => assert_eq!(ack.reason.as_deref(), Some("no colors")),
            other => panic!("unexpected reply {:?}", other),
        }

        let json = ServiceContext::new(LocalServer, "http://localhost").with_encoding(Encoding::Json);
        assert!(ExampleService::submit(&json, &sample()).unwrap().accepted);
    }

    #[test]
    fn test_generated_code_is_current() {
        let project = Path::new(env!("CARGO_MANIFEST_DIR"));
        let config = CompilerConfig::load(&project.join("heconfig.json")).unwrap();
        let compiler = Compiler::new(project, config, Box::new(FsLoader)).unwrap();
        let outputs = compiler.emit().unwrap();

        let generated = |name: &str| {
            let path = project.join("gen/example/src").join(name);
            outputs.iter().find(|output| output.file_path == path).unwrap().file_content.clone()
        };
        assert_eq!(generated("lib.rs"), include_str!("generated/mod.rs"));
        assert_eq!(generated("types.rs"), include_str!("generated/types.rs"));
    }
}
