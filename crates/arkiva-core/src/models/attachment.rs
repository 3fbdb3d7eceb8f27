//! Attachment record model.
//!
//! The document-metadata layer owns these records; Arkiva only reads the
//! fields it needs for storage decisions and writes back the lost flag and
//! remote URL cache. The record never carries the object bytes, only the
//! stored filename back-reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document-layer attachment record, as exposed through the
/// [`crate::hooks::AttachmentDirectory`] collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: Uuid,
    /// Logical (user-facing) name.
    pub name: String,
    /// Owning record type, e.g. `"res.partner"`.
    pub res_model: Option<String>,
    /// Owning record id.
    pub res_id: Option<i64>,
    pub description: Option<String>,
    /// Sharded stored filename, e.g. `"ab/ab12..."`. Absent for records whose
    /// payload lives inline in the metadata layer.
    pub store_fname: Option<String>,
    /// Content hash of the stored bytes, hex-encoded.
    pub checksum: Option<String>,
    /// Cached remote object URL, if the object was stored remotely.
    pub remote_url: Option<String>,
    /// Set when the stored object could not be found in any store.
    pub lost: bool,
    pub created_at: DateTime<Utc>,
}

impl AttachmentRecord {
    /// Per-object metadata to tag the stored object with.
    pub fn object_metadata(&self) -> ObjectMetadata {
        ObjectMetadata {
            name: Some(self.name.clone()),
            res_model: self.res_model.clone(),
            res_id: self.res_id,
            description: self.description.clone(),
            created_at: Some(self.created_at),
        }
    }
}

/// Metadata mapping carried on a stored object.
#[derive(Debug, Clone, Default)]
pub struct ObjectMetadata {
    pub name: Option<String>,
    pub res_model: Option<String>,
    pub res_id: Option<i64>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ObjectMetadata {
    /// Render as key/value pairs for the object store.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(ref name) = self.name {
            pairs.push(("name".to_string(), name.clone()));
        }
        if let Some(ref res_model) = self.res_model {
            pairs.push(("resmodel".to_string(), res_model.clone()));
        }
        if let Some(res_id) = self.res_id {
            pairs.push(("resid".to_string(), res_id.to_string()));
        }
        if let Some(ref description) = self.description {
            pairs.push(("description".to_string(), description.clone()));
        }
        if let Some(created_at) = self.created_at {
            pairs.push(("createdate".to_string(), created_at.to_rfc3339()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_pairs_skip_absent_fields() {
        let meta = ObjectMetadata {
            name: Some("contract.pdf".to_string()),
            res_id: Some(42),
            ..Default::default()
        };
        let pairs = meta.to_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().any(|(k, v)| k == "name" && v == "contract.pdf"));
        assert!(pairs.iter().any(|(k, v)| k == "resid" && v == "42"));
    }
}
