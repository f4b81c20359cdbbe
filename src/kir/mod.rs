//! KIR serialization.
//!
//! Two wire formats carry the same information: structured JSON
//! ([`json`], the serde tree *is* the format) and a little-endian
//! tag-length-value binary stream ([`binary`]). Both round-trip lossless.

pub mod binary;
pub mod json;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::component::Component;
use crate::ir::context::Metadata;
use crate::manifest::{ManifestWire, LogicBlock};
use crate::manifest::source::SourceStructures;
use crate::style::Stylesheet;

/// Codec faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KirError {
    #[error("JSON error: {0}")]
    Json(String),
    #[error("bad magic (not a KIR binary)")]
    BadMagic,
    #[error("unsupported KIR binary version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown tag {0:#04x}")]
    UnknownTag(u8),
    #[error("unexpected end of stream")]
    UnexpectedEnd,
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Provenance of a compiled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub source_language: String,
    pub compiler_version: String,
    /// Unix seconds at compile time, as a string.
    pub timestamp: String,
}

impl SourceMetadata {
    pub fn current(source_language: &str) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_default();
        Self {
            source_language: source_language.to_string(),
            compiler_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
        }
    }
}

/// A complete compiled document: the IR tree plus every side table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KirDocument {
    pub version: String,

    pub root: Component,

    #[serde(default)]
    pub reactive_manifest: ManifestWire,

    #[serde(default)]
    pub logic_block: LogicBlock,

    pub source_metadata: SourceMetadata,

    #[serde(default, skip_serializing_if = "SourceStructures::is_empty")]
    pub source_structures: SourceStructures,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<Stylesheet>,

    /// Window metadata written by `window*` properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl KirDocument {
    pub const FORMAT_VERSION: &'static str = "1.0";

    /// A minimal document around a root component (tests, embedding).
    pub fn new(root: Component) -> Self {
        Self {
            version: Self::FORMAT_VERSION.to_string(),
            root,
            reactive_manifest: ManifestWire::default(),
            logic_block: LogicBlock::default(),
            source_metadata: SourceMetadata::current("kry"),
            source_structures: SourceStructures::default(),
            stylesheet: None,
            metadata: None,
        }
    }

    /// Serialize to pretty-printed KIR JSON.
    pub fn to_json(&self) -> Result<String, KirError> {
        serde_json::to_string_pretty(self).map_err(|e| KirError::Json(e.to_string()))
    }

    /// Deserialize from KIR JSON.
    pub fn from_json(text: &str) -> Result<Self, KirError> {
        serde_json::from_str(text).map_err(|e| KirError::Json(e.to_string()))
    }

    /// Serialize to the binary KIR stream.
    pub fn to_binary(&self) -> Result<Vec<u8>, KirError> {
        binary::encode(self)
    }

    /// Deserialize from the binary KIR stream.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, KirError> {
        binary::decode(bytes)
    }
}
