//! API object model
//!
//! Resource types served by the API server, the [`Object`] envelope that
//! travels over the wire, the JSON [`Codec`], per-kind field projection for
//! field selectors, and validation.

pub mod codec;
pub mod fields;
pub mod object;
pub mod types;
pub mod validation;

pub use codec::{decode_watch_event, encode_watch_event, Codec, CodecError, JsonCodec, WatchEvent};
pub use fields::FieldSource;
pub use object::Object;
pub use types::*;
pub use validation::{ErrorList, ValidationError, ValidationErrorKind};

/// API version stamped on every encoded object.
pub const API_VERSION: &str = "v1beta1";

/// Manifest versions accepted by validation.
pub const SUPPORTED_MANIFEST_VERSIONS: &[&str] = &["v1beta1"];

/// Name of the container whose network settings provide a pod's IP.
pub const NETWORK_CONTAINER_NAME: &str = "net";
