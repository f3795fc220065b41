// Generated by bhelium 0.1.0 for namespace `example`. Do not edit.

pub mod types;

#[allow(unused_imports)]
use brine_helium::{ByteBuffer, ByteBufferMut, HeliumMessage, WireError};
use brine_helium::{CallError, Endpoint, Protocol, ServiceContext, Transport};
#[allow(unused_imports)]
use self::types::*;

pub use self::types::{Shape, Mood, Entity, REFRESH, REFRESH_MS, Color, Example, Ack};

/// The namespace the services of this module are served under.
pub const NAMESPACE: &str = "example";

impl Shape {
    pub fn wire_value(self) -> i32 {
        match self {
            Shape::Flat => 0,
            Shape::Round => 1,
            Shape::Pointed => 2,
        }
    }

    pub fn from_wire_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Shape::Flat),
            1 => Some(Shape::Round),
            2 => Some(Shape::Pointed),
            _ => None,
        }
    }

    pub fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {
        Shape::from_wire_value(reader.read_int32()?).ok_or_else(|| WireError::InvalidEnumValue("Shape".to_owned()))
    }

    pub fn write_binary(self, writer: &mut ByteBufferMut) -> Result<(), WireError> {
        writer.write_int32(self.wire_value());
        Ok(())
    }
}

impl Mood {
    pub fn wire_value(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Grumpy => "grumpy",
        }
    }

    pub fn from_wire_value(value: &str) -> Option<Self> {
        match value {
            "happy" => Some(Mood::Happy),
            "grumpy" => Some(Mood::Grumpy),
            _ => None,
        }
    }

    pub fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {
        Mood::from_wire_value(&reader.read_string()?).ok_or_else(|| WireError::InvalidEnumValue("Mood".to_owned()))
    }

    pub fn write_binary(self, writer: &mut ByteBufferMut) -> Result<(), WireError> {
        writer.write_string(self.wire_value())?;
        Ok(())
    }
}

impl HeliumMessage for Entity {
    fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {
        let mut message = Entity::default();
        // Entity
        message.id = reader.read_uint64()?;
        message.created_at = reader.read_date()?;
        if reader.read_continuation()? {
            return Err(WireError::UnexpectedContinuation("Entity".to_owned()));
        }
        Ok(message)
    }

    fn write_binary(&self, writer: &mut ByteBufferMut) -> Result<(), WireError> {
        // Entity
        writer.write_uint64(self.id);
        writer.write_date(self.created_at);
        writer.write_continuation(false);
        Ok(())
    }
}

impl HeliumMessage for Color {
    fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {
        let mut message = Color::default();
        // Color
        message.red = reader.read_byte()?;
        message.green = reader.read_byte()?;
        message.blue = reader.read_byte()?;
        if reader.read_presence()? {
            message.alpha = Some(reader.read_byte()?);
        }
        if reader.read_continuation()? {
            return Err(WireError::UnexpectedContinuation("Color".to_owned()));
        }
        Ok(message)
    }

    fn write_binary(&self, writer: &mut ByteBufferMut) -> Result<(), WireError> {
        // Color
        writer.write_byte(self.red);
        writer.write_byte(self.green);
        writer.write_byte(self.blue);
        match &self.alpha {
            Some(value) => {
                writer.write_presence(true);
                writer.write_byte(*value);
            }
            None => writer.write_presence(false),
        }
        writer.write_continuation(false);
        Ok(())
    }
}

impl Color {
    pub const ALPHA_DEFAULT: u8 = 255;
}

impl HeliumMessage for Example {
    fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {
        let mut message = Example::default();
        // Example
        message.client_id = reader.read_uint32()?;
        message.shape = Shape::read_binary(reader)?;
        message.colors = {
            let len = reader.read_len()?;
            let mut items = Vec::with_capacity(len.min(reader.remaining()));
            for _ in 0..len {
                items.push(reader.read_nested(Color::read_binary)?);
            }
            items
        };
        if reader.read_presence()? {
            message.mood = Some(Mood::read_binary(reader)?);
        }
        if reader.read_presence()? {
            message.tags = Some({
                let len = reader.read_len()?;
                let mut items = Vec::with_capacity(len.min(reader.remaining()));
                for _ in 0..len {
                    items.push(reader.read_string()?);
                }
                items
            });
        }
        // oneof extra has no binary representation
        if !reader.read_continuation()? {
            return Ok(message);
        }
        // Entity
        message.id = reader.read_uint64()?;
        message.created_at = reader.read_date()?;
        if reader.read_continuation()? {
            return Err(WireError::UnexpectedContinuation("Entity".to_owned()));
        }
        Ok(message)
    }

    fn write_binary(&self, writer: &mut ByteBufferMut) -> Result<(), WireError> {
        // Example
        writer.write_uint32(self.client_id);
        self.shape.write_binary(writer)?;
        writer.write_len(self.colors.len())?;
        for item in &self.colors {
            item.write_binary(writer)?;
        }
        match &self.mood {
            Some(value) => {
                writer.write_presence(true);
                value.write_binary(writer)?;
            }
            None => writer.write_presence(false),
        }
        match &self.tags {
            Some(value) => {
                writer.write_presence(true);
                writer.write_len(value.len())?;
                for item in value {
                    writer.write_string(item)?;
                }
            }
            None => writer.write_presence(false),
        }
        // oneof extra has no binary representation
        writer.write_continuation(true);
        // Entity
        writer.write_uint64(self.id);
        writer.write_date(self.created_at);
        writer.write_continuation(false);
        Ok(())
    }

    fn validate(&self) -> Result<(), WireError> {
        for item in &self.colors {
            item.validate()?;
        }
        match &self.extra {
            Some(ExampleExtra::Color(value)) => {
                value.validate()?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl Example {
    pub const TAGS_DEFAULT: &'static [&'static str] = &[];
}

impl HeliumMessage for Ack {
    fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError> {
        let mut message = Ack::default();
        // Ack
        message.accepted = reader.read_bool()?;
        if reader.read_presence()? {
            message.reason = Some(reader.read_string()?);
        }
        if reader.read_continuation()? {
            return Err(WireError::UnexpectedContinuation("Ack".to_owned()));
        }
        Ok(message)
    }

    fn write_binary(&self, writer: &mut ByteBufferMut) -> Result<(), WireError> {
        // Ack
        writer.write_bool(self.accepted);
        match &self.reason {
            Some(value) => {
                writer.write_presence(true);
                writer.write_string(value)?;
            }
            None => writer.write_presence(false),
        }
        writer.write_continuation(false);
        Ok(())
    }
}

/// Client of the `ExampleService` service.
pub struct ExampleService;

impl ExampleService {
    pub const VERSION: &'static str = "1.0";

    pub fn submit<T: Transport>(ctx: &ServiceContext<T>, body: &Example) -> Result<Ack, CallError<Ack>> {
        brine_helium::http_post(ctx, &Endpoint::new("ExampleService", "submit", NAMESPACE, Protocol::Http), body)
    }

    pub fn ping<T: Transport>(ctx: &ServiceContext<T>) -> Result<Ack, CallError<()>> {
        brine_helium::http_get(ctx, &Endpoint::new("ExampleService", "ping", NAMESPACE, Protocol::Http))
    }
}
