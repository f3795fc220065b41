use brine_helium_schema::{ByteBuffer, ByteBufferMut, WireError};
use serde::{de::DeserializeOwned, Serialize};

/// Implemented by every generated message type.
///
/// Generated code provides `read_binary` and `write_binary`, and overrides
/// `validate` when the message holds nested messages. Everything else has a
/// default built on top of those.
pub trait HeliumMessage: Sized {
    /// Reads one message, including the fields of its base messages.
    fn read_binary(reader: &mut ByteBuffer) -> Result<Self, WireError>;

    fn write_binary(&self, writer: &mut ByteBufferMut) -> Result<(), WireError>;

    /// Checks the message and every nested message.
    fn validate(&self) -> Result<(), WireError> {
        Ok(())
    }

    /// Decodes and validates a message.
    fn from_binary(bytes: &[u8]) -> Result<Self, WireError> {
        let mut reader = ByteBuffer::new(bytes);
        let message = reader.read_nested(Self::read_binary)?;
        message.validate()?;
        Ok(message)
    }

    /// Validates and encodes a message.
    fn to_binary(&self) -> Result<Vec<u8>, WireError> {
        self.validate()?;
        let mut writer = ByteBufferMut::new();
        self.write_binary(&mut writer)?;
        Ok(writer.data())
    }

    fn from_json(text: &str) -> Result<Self, WireError>
    where
        Self: DeserializeOwned,
    {
        let message: Self = serde_json::from_str(text).map_err(|e| WireError::Json(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }

    fn to_json(&self) -> Result<String, WireError>
    where
        Self: Serialize,
    {
        self.validate()?;
        serde_json::to_string(self).map_err(|e| WireError::Json(e.to_string()))
    }

    /// A message with every field at its default.
    fn create_instance() -> Self
    where
        Self: Default,
    {
        Self::default()
    }
}

/// The empty message, used for calls that return `void` or declare no error.
impl HeliumMessage for () {
    fn read_binary(_reader: &mut ByteBuffer) -> Result<(), WireError> {
        Ok(())
    }

    fn write_binary(&self, _writer: &mut ByteBufferMut) -> Result<(), WireError> {
        Ok(())
    }
}
