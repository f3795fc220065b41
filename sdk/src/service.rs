use std::error::Error as StdError;

use brine_helium_schema::{ByteBuffer, WireError};
use log::debug;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::message::HeliumMessage;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Largest message body a context sends or accepts unless configured otherwise.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// The body encoding a context uses for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    Json,
    #[default]
    Binary,
}

impl Encoding {
    pub fn content_type(self) -> &'static str {
        match self {
            Encoding::Json => CONTENT_TYPE_JSON,
            Encoding::Binary => CONTENT_TYPE_BINARY,
        }
    }
}

/// The protocol a service call is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Tcp,
    Ws,
}

/// Identifies one service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub service:   String,
    pub method:    String,
    pub namespace: String,
    pub protocol:  Protocol,
}

impl Endpoint {
    pub fn new(service: &str, method: &str, namespace: &str, protocol: Protocol) -> Endpoint {
        Endpoint {
            service: service.to_owned(),
            method: method.to_owned(),
            namespace: namespace.to_owned(),
            protocol,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint:     Endpoint,
    pub url:          String,
    /// The encoding of `body`, and the encoding the caller expects back.
    pub content_type: &'static str,
    pub body:         Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub content_type: String,
    pub body:         Vec<u8>,
}

pub type TransportError = Box<dyn StdError + Send + Sync>;

/// Moves requests to a server. Hosts plug in their HTTP client, socket or
/// test double here.
pub trait Transport {
    fn get(&self, request: &Request) -> Result<Response, TransportError>;
    fn post(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Everything a generated client needs to reach its server. Created once by
/// the host and passed to every call.
pub struct ServiceContext<T: Transport> {
    pub transport:        T,
    pub base_url:         String,
    pub encoding:         Encoding,
    pub max_message_size: usize,
}

impl<T: Transport> ServiceContext<T> {
    pub fn new(transport: T, base_url: &str) -> ServiceContext<T> {
        ServiceContext {
            transport,
            base_url: base_url.trim_end_matches('/').to_owned(),
            encoding: Encoding::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> ServiceContext<T> {
        self.encoding = encoding;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> ServiceContext<T> {
        self.max_message_size = max_message_size;
        self
    }

    /// `<base_url>/<namespace>/<service>/<method>`
    pub fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}/{}/{}/{}", self.base_url, endpoint.namespace, endpoint.service, endpoint.method)
    }

    fn request(&self, endpoint: &Endpoint, body: Vec<u8>) -> Request {
        Request {
            endpoint: endpoint.clone(),
            url: self.url(endpoint),
            content_type: self.encoding.content_type(),
            body,
        }
    }
}

/// The ways a service call can fail. `Remote` carries the error message the
/// call declares with `throws`.
#[derive(Debug, Error)]
pub enum CallError<E> {
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message of {size} bytes exceeds the limit of {max} bytes")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Unsupported content type \"{0}\"")]
    UnsupportedContentType(String),

    #[error("Remote error: {0:?}")]
    Remote(E),
}

fn check_size<E>(size: usize, max: usize) -> Result<(), CallError<E>> {
    if size > max {
        return Err(CallError::MessageTooLarge { size, max });
    }
    Ok(())
}

fn decode_response<R, E>(response: Response, max: usize) -> Result<R, CallError<E>>
where
    R: HeliumMessage + DeserializeOwned,
    E: HeliumMessage,
{
    check_size(response.body.len(), max)?;
    let content_type = response.content_type.split(';').next().unwrap_or("").trim();
    match content_type {
        CONTENT_TYPE_JSON => {
            // An empty body is `null`, which is how void calls reply.
            let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) { b"null" } else { &response.body };
            let message: R = serde_json::from_slice(body)?;
            message.validate()?;
            Ok(message)
        }
        CONTENT_TYPE_BINARY => {
            let mut reader = ByteBuffer::new(&response.body);
            if reader.read_bool()? {
                let message = reader.read_nested(R::read_binary)?;
                message.validate()?;
                Ok(message)
            } else {
                Err(CallError::Remote(reader.read_nested(E::read_binary)?))
            }
        }
        other => Err(CallError::UnsupportedContentType(other.to_owned())),
    }
}

/// Performs a call that takes no argument.
pub fn http_get<T, R, E>(ctx: &ServiceContext<T>, endpoint: &Endpoint) -> Result<R, CallError<E>>
where
    T: Transport,
    R: HeliumMessage + DeserializeOwned,
    E: HeliumMessage,
{
    let request = ctx.request(endpoint, Vec::new());
    debug!("GET {}", request.url);
    let response = ctx.transport.get(&request).map_err(CallError::Transport)?;
    decode_response(response, ctx.max_message_size)
}

/// Performs a call with a message argument, encoded with the context's
/// encoding.
pub fn http_post<T, A, R, E>(ctx: &ServiceContext<T>, endpoint: &Endpoint, body: &A) -> Result<R, CallError<E>>
where
    T: Transport,
    A: HeliumMessage + Serialize,
    R: HeliumMessage + DeserializeOwned,
    E: HeliumMessage,
{
    let encoded = match ctx.encoding {
        Encoding::Json => body.to_json()?.into_bytes(),
        Encoding::Binary => body.to_binary()?,
    };
    check_size(encoded.len(), ctx.max_message_size)?;
    let request = ctx.request(endpoint, encoded);
    debug!("POST {} ({} bytes)", request.url, request.body.len());
    let response = ctx.transport.post(&request).map_err(CallError::Transport)?;
    decode_response(response, ctx.max_message_size)
}
