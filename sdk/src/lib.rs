//! brine-helium
//!
//! Runtime support for code generated from Helium schemas.
//!
//! - `HeliumMessage`, implemented by every generated message
//! - `ServiceContext`, `Transport` and the `http_get`/`http_post` helpers
//!   behind generated service clients
//! - The wire primitives and dynamic `Value` codec, re-exported from
//!   `brine-helium-schema`

pub mod message;
pub mod service;

pub use brine_helium_schema::{ByteBuffer, ByteBufferMut, Def, EnumValue, Field, Schema, Value, WireError};
pub use message::HeliumMessage;
pub use service::{
    http_get, http_post, CallError, Encoding, Endpoint, Protocol, Request, Response, ServiceContext, Transport,
    TransportError, DEFAULT_MAX_MESSAGE_SIZE,
};
