//! Store configuration
//!
//! Loadable from JSON or YAML; every field has a default so partial
//! documents are accepted.

use crate::rdf::NamedNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Graph used when an operation names none
pub const DEFAULT_GRAPH_IRI: &str = "urn:samyama:graph:default";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported config file extension: {0}")]
    UnsupportedExtension(String),

    #[error("Invalid default graph IRI {iri}: {reason}")]
    InvalidDefaultGraph { iri: String, reason: String },

    #[error("Invalid IRI {iri} for prefix {prefix}")]
    InvalidPrefix { prefix: String, iri: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// IRI of the graph triples land in when no graph is given
    pub default_graph: String,
    /// Attach interval labels so hierarchy queries skip the rebuild
    pub interval_labels: bool,
    /// Log every committed type change at trace level
    pub trace_propagation: bool,
    /// Extra prefixes for compact IRIs, on top of rdf/rdfs/xsd/rdfg
    pub prefixes: BTreeMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_graph: DEFAULT_GRAPH_IRI.to_string(),
            interval_labels: false,
            trace_propagation: false,
            prefixes: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            other => Err(ConfigError::UnsupportedExtension(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject IRIs that would fail when the store maps them
    pub fn validate(&self) -> ConfigResult<()> {
        self.default_graph_node()?;
        for (prefix, iri) in &self.prefixes {
            if NamedNode::new(iri).is_err() {
                return Err(ConfigError::InvalidPrefix {
                    prefix: prefix.clone(),
                    iri: iri.clone(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn default_graph_node(&self) -> ConfigResult<NamedNode> {
        NamedNode::new(&self.default_graph).map_err(|e| ConfigError::InvalidDefaultGraph {
            iri: self.default_graph.clone(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.default_graph, DEFAULT_GRAPH_IRI);
        assert!(!config.interval_labels);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = StoreConfig::from_json_str(r#"{"interval_labels": true}"#).unwrap();
        assert!(config.interval_labels);
        assert_eq!(config.default_graph, DEFAULT_GRAPH_IRI);
    }

    #[test]
    fn test_yaml_with_prefixes() {
        let yaml = "default_graph: http://example.org/graphs/main\nprefixes:\n  ex: http://example.org/\n";
        let config = StoreConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.default_graph, "http://example.org/graphs/main");
        assert_eq!(config.prefixes.get("ex").map(String::as_str), Some("http://example.org/"));
    }

    #[test]
    fn test_invalid_default_graph() {
        let err = StoreConfig::from_json_str(r#"{"default_graph": "not an iri"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefaultGraph { .. }));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"trace_propagation": true}}"#).unwrap();
        let config = StoreConfig::from_path(file.path()).unwrap();
        assert!(config.trace_propagation);

        let round_trip = StoreConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }
}
