//! Manifest parsing: raw document bytes to a value tree plus identity.

pub mod identity;
pub mod value;

pub use identity::ResourceIdentity;
pub use value::{Map, Number, Value};

use crate::error::SliceError;
use crate::scan::RawDocument;
use serde::Deserialize;
use tracing::debug;

/// Parse one raw document into a mapping.
///
/// A document holding only comments parses to an empty map. Only the first
/// YAML document of the fragment is read, and it must be a mapping.
pub fn parse_manifest(doc: &RawDocument) -> Result<Value, SliceError> {
    let parse_err = |message: String| SliceError::Parse {
        ordinal: doc.ordinal,
        message,
    };

    let mut documents = serde_yaml::Deserializer::from_slice(&doc.content);
    let parsed = match documents.next() {
        Some(de) => serde_yaml::Value::deserialize(de).map_err(|e| parse_err(e.to_string()))?,
        None => serde_yaml::Value::Null,
    };
    if documents.next().is_some() {
        debug!(ordinal = doc.ordinal, "ignoring extra YAML documents after the first");
    }

    match Value::try_from(parsed).map_err(parse_err)? {
        Value::Null => Ok(Value::Map(Map::new())),
        map @ Value::Map(_) => Ok(map),
        other => Err(parse_err(format!(
            "expected a mapping at the top level, found {}",
            other.type_name()
        ))),
    }
}
