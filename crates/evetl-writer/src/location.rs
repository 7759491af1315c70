//! Fully-qualified object-storage locations (`s3://bucket/key`, `file:///path`).

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    S3,
    File,
}

impl Scheme {
    pub fn parse(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "s3" | "s3a" | "s3n" => Some(Scheme::S3),
            "file" => Some(Scheme::File),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::S3 => "s3",
            Scheme::File => "file",
        }
    }
}

/// A parsed location. `path` never starts with `/` and is relative to the
/// bucket (S3) or the filesystem root (file).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLocation {
    scheme: Scheme,
    bucket: String,
    path: String,
}

impl StorageLocation {
    pub fn parse(location: &str) -> Result<Self> {
        let (scheme_str, rest) = location
            .split_once("://")
            .ok_or_else(|| StorageError::invalid_location(location, "missing '<scheme>://'"))?;

        let scheme = Scheme::parse(scheme_str).ok_or_else(|| {
            StorageError::invalid_location(
                location,
                format!("unsupported scheme '{}' (expected s3 or file)", scheme_str),
            )
        })?;

        match scheme {
            Scheme::S3 => {
                let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
                if bucket.is_empty() {
                    return Err(StorageError::invalid_location(location, "empty bucket name"));
                }
                Ok(Self {
                    scheme,
                    bucket: bucket.to_string(),
                    path: key.trim_start_matches('/').to_string(),
                })
            }
            Scheme::File => {
                if !rest.starts_with('/') {
                    return Err(StorageError::invalid_location(
                        location,
                        "file locations must be absolute (file:///path)",
                    ));
                }
                Ok(Self {
                    scheme,
                    bucket: String::new(),
                    path: rest.trim_start_matches('/').to_string(),
                })
            }
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key / relative path, without a leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the location can only name a directory (empty or trailing `/`).
    pub fn is_dir_like(&self) -> bool {
        self.path.is_empty() || self.path.ends_with('/')
    }

    /// Path usable as a directory prefix: empty, or ending in `/`.
    pub fn dir_path(&self) -> String {
        if self.is_dir_like() {
            self.path.clone()
        } else {
            format!("{}/", self.path)
        }
    }

    /// Same location, forced to directory form.
    pub fn as_dir(&self) -> Self {
        Self {
            scheme: self.scheme,
            bucket: self.bucket.clone(),
            path: self.dir_path(),
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::S3 => write!(f, "s3://{}/{}", self.bucket, self.path),
            Scheme::File => write!(f, "file:///{}", self.path),
        }
    }
}

impl FromStr for StorageLocation {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
