//! Error types for the node resource model, SDP codec, connection engine,
//! HTTP surface, and discovery agent.
//!
//! Each concern gets its own flat `thiserror` enum; [`NodeError`] composes
//! them with `#[from]` so callers can propagate with `?` regardless of which
//! layer raised the error.

use thiserror::Error;
use uuid::Uuid;

/// A type alias for handling `Result`s with [`NodeError`].
pub type Result<T> = std::result::Result<T, NodeError>;

/// Errors raised while parsing or emitting SDP.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdpError {
    /// The payload was not well-formed SDP (missing a mandatory line, bad
    /// ordering, truncated field list, etc).
    #[error("malformed SDP: {0}")]
    Malformed(String),

    /// A media description used a media type this node does not understand
    /// (§4.2 "Format detection" signals a hard error for these).
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A required custom attribute (`x-nvnmos-id`, `x-nvnmos-iface-ip`) was
    /// absent.
    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),

    /// An attribute value could not be parsed as the type it should have
    /// (e.g. a non-numeric port).
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },
}

/// Errors raised by [`crate::model::store::ResourceStore`] and
/// [`crate::model::node_model::NodeModel`].
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    /// No resource with this id and type exists.
    #[error("resource {0} not found")]
    NotFound(Uuid),

    /// A resource mutation would violate a cross-reference invariant
    /// (spec.md §3 invariants 1 and 4): the referenced parent does not
    /// exist.
    #[error("missing parent resource: {0}")]
    MissingParent(String),

    /// `add_sender`/`add_receiver` could not match a leg's `source_ip` /
    /// `interface_ip` to any configured host interface.
    #[error("no host interface matches address {0}")]
    NoMatchingInterface(String),

    /// An `internal_id` that is already bound to a sender or receiver was
    /// reused.
    #[error("duplicate internal id: {0}")]
    DuplicateInternalId(String),

    /// The SDP codec rejected the payload.
    #[error(transparent)]
    Sdp(#[from] SdpError),
}

/// Errors raised by [`crate::connection::engine::ConnectionEngine`].
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// `activate`/PATCH referenced an id with no connection-resource twin.
    #[error("unknown connection resource: {0}")]
    UnknownResource(String),

    /// A staged/active transport-params array did not conform to invariant 6
    /// (length must be 1 or 2 and match `interface_bindings[]`).
    #[error("transport params length {got} does not match {expected} leg(s)")]
    LegCountMismatch {
        /// Number of transport-param entries supplied.
        got: usize,
        /// Number of legs the sender/receiver actually has.
        expected: usize,
    },

    /// The SDP codec rejected a payload passed to `activate`.
    #[error(transparent)]
    Sdp(#[from] SdpError),
}

/// Errors surfaced by the IS-04/IS-05 HTTP surface.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// The requested resource does not exist; maps to HTTP 404.
    #[error("not found")]
    NotFound,

    /// The method is not permitted on this route (the `TRACE` ban from
    /// spec.md §4.6); maps to HTTP 405.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The PATCH body did not conform to the (schema-level only) validator.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A lower layer failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A lower layer failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Errors raised by [`crate::discovery::agent::DiscoveryAgent`].
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Neither mDNS browse nor unicast SRV lookup found a registry.
    #[error("no registry discovered for hostname {0}")]
    NoRegistryFound(String),

    /// The registry HTTP endpoint returned a non-2xx status or was
    /// unreachable; DiscoveryAgent retries per spec.md §5.
    #[error("registry request failed: {0}")]
    RegistryUnreachable(String),

    /// Transport-level failure from the HTTP client.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Top-level error composing every layer, for callers (including the
/// Facade) that cross multiple modules in one call.
#[derive(Error, Debug)]
pub enum NodeError {
    /// See [`SdpError`].
    #[error(transparent)]
    Sdp(#[from] SdpError),

    /// See [`ModelError`].
    #[error(transparent)]
    Model(#[from] ModelError),

    /// See [`ConnectionError`].
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// See [`ApiError`].
    #[error(transparent)]
    Api(#[from] ApiError),

    /// See [`DiscoveryError`].
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// A caller supplied a null/empty argument across the embedding
    /// boundary where one was required (spec.md §7 "Input validation").
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
