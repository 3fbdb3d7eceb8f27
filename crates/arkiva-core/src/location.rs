//! Storage location descriptors.
//!
//! A location descriptor is the configuration string handed to us by the
//! document-metadata layer. The format for the remote backend is
//! `s3://auth-method:credential-ref@bucket-name`, where `auth-method` is
//! either the literal `profile` (credential-ref names an AWS profile) or an
//! access key id (credential-ref is the secret key). Any other scheme means
//! local-only storage; a malformed `s3://` descriptor fails closed to local.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::AppError;

/// Scheme prefix identifying the remote backend.
pub const REMOTE_SCHEME: &str = "s3://";

/// Credentials reference carried by a remote location descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAuth {
    /// Use a named AWS credentials profile.
    Profile(String),
    /// Use a static access key pair.
    AccessKey { key_id: String, secret: String },
}

/// A parsed remote (S3) storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    pub auth: RemoteAuth,
    pub bucket: String,
}

/// A parsed storage location descriptor.
///
/// The scheme determines all downstream behavior: `Remote` enables the
/// object-store path, everything else is local-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Local,
    Remote(RemoteLocation),
}

impl StorageLocation {
    /// Parse a location descriptor.
    ///
    /// Descriptors without the `s3://` scheme are local storage. A descriptor
    /// with the scheme but a malformed remainder is an error; callers treat
    /// that as fail-closed to local.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let Some(remain) = raw.strip_prefix(REMOTE_SCHEME) else {
            return Ok(StorageLocation::Local);
        };

        let (credentials, bucket) = remain.split_once('@').ok_or_else(|| {
            AppError::Config(format!("Malformed storage location: missing '@' in {raw:?}"))
        })?;
        let (method, credential_ref) = credentials.split_once(':').ok_or_else(|| {
            AppError::Config(format!("Malformed storage location: missing ':' in {raw:?}"))
        })?;

        if method.is_empty() || credential_ref.is_empty() || bucket.is_empty() {
            return Err(AppError::Config(format!(
                "Malformed storage location: empty component in {raw:?}"
            )));
        }

        let auth = if method == "profile" {
            RemoteAuth::Profile(credential_ref.to_string())
        } else {
            RemoteAuth::AccessKey {
                key_id: method.to_string(),
                secret: credential_ref.to_string(),
            }
        };

        Ok(StorageLocation::Remote(RemoteLocation {
            auth,
            bucket: bucket.to_string(),
        }))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StorageLocation::Remote(_))
    }
}

impl Display for StorageLocation {
    /// Secrets are redacted; safe for logs.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageLocation::Local => write!(f, "local"),
            StorageLocation::Remote(remote) => match &remote.auth {
                RemoteAuth::Profile(name) => {
                    write!(f, "{}profile:{}@{}", REMOTE_SCHEME, name, remote.bucket)
                }
                RemoteAuth::AccessKey { key_id, .. } => {
                    write!(f, "{}{}:***@{}", REMOTE_SCHEME, key_id, remote.bucket)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_profile_location() {
        let location = StorageLocation::parse("s3://profile:default@mybucket").unwrap();
        assert_eq!(
            location,
            StorageLocation::Remote(RemoteLocation {
                auth: RemoteAuth::Profile("default".to_string()),
                bucket: "mybucket".to_string(),
            })
        );
    }

    #[test]
    fn parse_access_key_location() {
        let location = StorageLocation::parse("s3://AKIAEXAMPLE:sekret@mybucket").unwrap();
        match location {
            StorageLocation::Remote(remote) => {
                assert_eq!(remote.bucket, "mybucket");
                assert_eq!(
                    remote.auth,
                    RemoteAuth::AccessKey {
                        key_id: "AKIAEXAMPLE".to_string(),
                        secret: "sekret".to_string(),
                    }
                );
            }
            other => panic!("expected remote location, got {other:?}"),
        }
    }

    #[test]
    fn non_remote_scheme_is_local() {
        assert_eq!(StorageLocation::parse("file").unwrap(), StorageLocation::Local);
        assert_eq!(StorageLocation::parse("db").unwrap(), StorageLocation::Local);
        assert_eq!(StorageLocation::parse("").unwrap(), StorageLocation::Local);
    }

    #[test]
    fn malformed_remote_descriptor_is_an_error() {
        assert!(StorageLocation::parse("s3://nobucket").is_err());
        assert!(StorageLocation::parse("s3://:x@bucket").is_err());
        assert!(StorageLocation::parse("s3://profile:@bucket").is_err());
        assert!(StorageLocation::parse("s3://profile:default@").is_err());
    }

    #[test]
    fn display_redacts_secret() {
        let location = StorageLocation::parse("s3://AKIAEXAMPLE:sekret@mybucket").unwrap();
        let shown = location.to_string();
        assert!(!shown.contains("sekret"));
        assert!(shown.contains("AKIAEXAMPLE"));
    }
}
