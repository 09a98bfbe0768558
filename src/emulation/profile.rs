use super::generator::{KeyGenerator, PeerIdGenerator, RoundingPolicy};
use crate::error::{Result, SpoofError};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Compiled-in profile documents, keyed by client code.
const CATALOG: &[(&str, &str)] = &[
    ("deluge-2.1.1", include_str!("profiles/deluge-2.1.1.json")),
    ("qbit-4.0.3", include_str!("profiles/qbit-4.0.3.json")),
    ("qbit-4.3.9", include_str!("profiles/qbit-4.3.9.json")),
    ("qbit-4.6.5", include_str!("profiles/qbit-4.6.5.json")),
    ("qbit-5.0.4", include_str!("profiles/qbit-5.0.4.json")),
    ("transmission-3.00", include_str!("profiles/transmission-3.00.json")),
];

pub const DEFAULT_CLIENT: &str = "qbit-5.0.4";

#[derive(Debug, Deserialize)]
struct GeneratorSpec {
    generator: String,
    #[serde(default)]
    pattern: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDocument {
    name: String,
    peer_id: GeneratorSpec,
    key: GeneratorSpec,
    rounding: GeneratorSpec,
    query: String,
    #[serde(default)]
    headers: HashMap<String, String>,
}

/// A client's wire fingerprint with its generators already resolved.
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub code: String,
    pub name: String,
    pub query_template: String,
    pub headers: HashMap<String, String>,
    pub peer_id: PeerIdGenerator,
    pub key: KeyGenerator,
    pub rounding: RoundingPolicy,
}

impl ClientProfile {
    fn from_document(code: &str, source: &str) -> Result<Self> {
        let malformed = |reason: String| SpoofError::Profile(format!("{}: {}", code, reason));
        let doc: ProfileDocument =
            serde_json::from_str(source).map_err(|e| malformed(e.to_string()))?;

        Ok(Self {
            code: code.to_string(),
            name: doc.name,
            peer_id: PeerIdGenerator::from_spec(&doc.peer_id.generator, &doc.peer_id.pattern)
                .map_err(malformed)?,
            key: KeyGenerator::from_spec(&doc.key.generator, &doc.key.pattern)
                .map_err(malformed)?,
            rounding: RoundingPolicy::from_spec(&doc.rounding.generator).map_err(malformed)?,
            query_template: doc.query,
            headers: doc.headers,
        })
    }
}

pub struct ProfileRegistry {
    profiles: BTreeMap<String, ClientProfile>,
}

impl ProfileRegistry {
    /// Parses every compiled-in document. Fails only if a shipped document is malformed.
    pub fn load() -> Result<Self> {
        let mut profiles = BTreeMap::new();
        for (code, source) in CATALOG {
            profiles.insert(code.to_string(), ClientProfile::from_document(code, source)?);
        }
        Ok(Self { profiles })
    }

    pub fn resolve(&self, code: &str) -> Result<ClientProfile> {
        self.profiles
            .get(code)
            .cloned()
            .ok_or_else(|| SpoofError::ProfileNotFound(code.to_string()))
    }

    pub fn list_codes(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}
