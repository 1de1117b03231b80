//! Asset metadata document
//!
//! The descriptive document attached to an issuance. Only its 32-byte content
//! hash ends up on chain; the document itself is stored elsewhere. Any change
//! to the serialized form changes the hash, so the fields are serialized in a
//! fixed order.

use bitcoin::hashes::{sha256, Hash};
use serde::{Deserialize, Serialize};

use crate::errors::{AssetError, AssetResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub name: String,
    pub url: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Descriptive document for an asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "assetName")]
    pub asset_name: String,
    pub description: String,
    pub urls: Vec<UrlEntry>,
    pub site: Site,
    pub issuer: String,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.asset_name = name.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn add_url(mut self, name: &str, url: &str, mime_type: &str) -> Self {
        self.urls.push(UrlEntry {
            name: name.to_string(),
            url: url.to_string(),
            mime_type: mime_type.to_string(),
        });
        self
    }

    pub fn site(mut self, url: &str, kind: &str) -> Self {
        self.site = Site {
            url: url.to_string(),
            kind: kind.to_string(),
        };
        self
    }

    pub fn issuer(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    /// 32-byte content hash of the serialized document
    pub fn to_hash(&self) -> AssetResult<[u8; 32]> {
        let json = serde_json::to_string(self)
            .map_err(|e| AssetError::Validation(format!("unserializable metadata: {e}")))?;
        Ok(sha256::Hash::hash(json.as_bytes()).to_byte_array())
    }
}
