//! Content-addressed key derivation.
//!
//! A stored filename is `{shard}/{hash}` where the shard is the first two
//! hex characters of the content hash, bounding directory fan-out to 256
//! entries. The same filename layout is used on disk and in the remote
//! store, prefixed there with the namespace. Checklist and trash tiers are
//! explicit key states, not ad-hoc string prefixes.

use std::fmt::{Display, Formatter, Result as FmtResult};

use arkiva_core::constants::{CHECKLIST_PREFIX, HASH_SHARD_LEN, TRASH_PREFIX};

use crate::traits::{StorageError, StorageResult};

/// Lifecycle tier of an object key.
///
/// An object moves `Live -> Checklist -> Trash`: marking for collection
/// writes a checklist entry, the collector moves unreferenced objects to
/// trash, and the read path can move a trashed object back to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Live,
    Checklist,
    Trash,
}

/// A fully-qualified object key: namespace, stored filename and tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    namespace: String,
    fname: String,
    kind: KeyKind,
}

impl ObjectKey {
    pub fn filename(&self) -> &str {
        &self.fname
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn to_live(&self) -> ObjectKey {
        self.with_kind(KeyKind::Live)
    }

    pub fn to_checklist(&self) -> ObjectKey {
        self.with_kind(KeyKind::Checklist)
    }

    pub fn to_trash(&self) -> ObjectKey {
        self.with_kind(KeyKind::Trash)
    }

    fn with_kind(&self, kind: KeyKind) -> ObjectKey {
        ObjectKey {
            namespace: self.namespace.clone(),
            fname: self.fname.clone(),
            kind,
        }
    }

    /// Render the wire key. This is the only place tier prefixes are spelled
    /// out.
    pub fn storage_key(&self) -> String {
        match self.kind {
            KeyKind::Live => format!("{}/{}", self.namespace, self.fname),
            KeyKind::Checklist => {
                format!("{}/{}/{}", self.namespace, CHECKLIST_PREFIX, self.fname)
            }
            KeyKind::Trash => format!("{}/{}/{}", self.namespace, TRASH_PREFIX, self.fname),
        }
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.storage_key())
    }
}

/// Derives deterministic object keys for one namespace.
///
/// Pure; no I/O. Identical content hashes under the same namespace always
/// yield the identical key, which is what makes writes naturally
/// deduplicating.
#[derive(Debug, Clone)]
pub struct ContentAddresser {
    namespace: String,
}

impl ContentAddresser {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Sharded stored filename for a content hash: `ab/ab12...`.
    pub fn filename_for(&self, checksum: &str) -> StorageResult<String> {
        let checksum = checksum.to_ascii_lowercase();
        if checksum.len() <= HASH_SHARD_LEN || !checksum.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidKey(format!(
                "Content hash must be hex, got {checksum:?}"
            )));
        }
        Ok(format!("{}/{}", &checksum[..HASH_SHARD_LEN], checksum))
    }

    /// Live key for a content hash.
    pub fn content_key(&self, checksum: &str) -> StorageResult<ObjectKey> {
        let fname = self.filename_for(checksum)?;
        Ok(ObjectKey {
            namespace: self.namespace.clone(),
            fname,
            kind: KeyKind::Live,
        })
    }

    /// Live key for a stored filename handed back by the metadata layer.
    ///
    /// Leading separators are stripped; traversal segments are rejected.
    pub fn key_for_filename(&self, fname: &str) -> StorageResult<ObjectKey> {
        let fname = fname.trim_start_matches(['/', '\\']);
        if fname.is_empty()
            || fname
                .split('/')
                .any(|segment| segment.is_empty() || segment == "..")
        {
            return Err(StorageError::InvalidKey(format!(
                "Stored filename contains invalid segments: {fname:?}"
            )));
        }
        Ok(ObjectKey {
            namespace: self.namespace.clone(),
            fname: fname.to_string(),
            kind: KeyKind::Live,
        })
    }

    /// Listing prefix for checklist entries, with trailing slash.
    pub fn checklist_prefix(&self) -> String {
        format!("{}/{}/", self.namespace, CHECKLIST_PREFIX)
    }

    /// Recover the stored filename from a listed checklist key.
    pub fn filename_from_checklist_key(&self, raw_key: &str) -> Option<String> {
        raw_key
            .strip_prefix(&self.checklist_prefix())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "3f786850e387550fdab836ed7e6dc881de23001b";

    #[test]
    fn filename_is_sharded_and_stable() {
        let addresser = ContentAddresser::new("maindb");
        let fname = addresser.filename_for(HASH).unwrap();
        assert_eq!(fname, format!("3f/{HASH}"));
        // stable across instances
        assert_eq!(
            ContentAddresser::new("maindb").filename_for(HASH).unwrap(),
            fname
        );
    }

    #[test]
    fn content_key_is_case_insensitive() {
        let addresser = ContentAddresser::new("maindb");
        let lower = addresser.content_key(HASH).unwrap();
        let upper = addresser.content_key(&HASH.to_uppercase()).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn empty_or_non_hex_hash_is_rejected() {
        let addresser = ContentAddresser::new("maindb");
        assert!(addresser.content_key("").is_err());
        assert!(addresser.content_key("zz").is_err());
        assert!(addresser.content_key("nothex!").is_err());
    }

    #[test]
    fn tier_transitions_render_reserved_prefixes() {
        let addresser = ContentAddresser::new("maindb");
        let live = addresser.content_key(HASH).unwrap();
        assert_eq!(live.storage_key(), format!("maindb/3f/{HASH}"));
        assert_eq!(
            live.to_checklist().storage_key(),
            format!("maindb/checklist/3f/{HASH}")
        );
        assert_eq!(
            live.to_trash().storage_key(),
            format!("maindb/trash/3f/{HASH}")
        );
        assert_eq!(live.to_checklist().to_live(), live);
    }

    #[test]
    fn checklist_key_round_trips_through_listing() {
        let addresser = ContentAddresser::new("maindb");
        let key = addresser.key_for_filename("ab/abc123").unwrap();
        let listed = key.to_checklist().storage_key();
        assert_eq!(
            addresser.filename_from_checklist_key(&listed).as_deref(),
            Some("ab/abc123")
        );
        assert_eq!(addresser.filename_from_checklist_key("other/key"), None);
    }

    #[test]
    fn traversal_filenames_are_rejected() {
        let addresser = ContentAddresser::new("maindb");
        assert!(addresser.key_for_filename("../etc/passwd").is_err());
        assert!(addresser.key_for_filename("ab//x").is_err());
        assert!(addresser.key_for_filename("").is_err());
        // leading separators are tolerated, the rest must be clean
        let key = addresser.key_for_filename("/ab/abc").unwrap();
        assert_eq!(key.filename(), "ab/abc");
    }
}
