//! # Application and Version Names
//!
//! Newtype wrappers for the two user-chosen namespaces. You cannot pass
//! a `VersionName` where an `AppName` is expected.
//!
//! Both names end up as file names inside the server's data directory,
//! so the rules reject anything that could escape a directory: path
//! separators, `.`/`..`, NUL and other control characters. Names are
//! case-sensitive and otherwise free-form.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum name length in bytes of UTF-8.
pub const MAX_NAME_BYTES: usize = 200;

/// The pseudo-version that always resolves to the current registry state.
pub const LATEST: &str = "latest";

/// File extension every pushed artifact must carry.
pub const APK_EXTENSION: &str = "apk";

fn check_name(raw: &str) -> Result<(), String> {
    if raw.is_empty() {
        return Err("must not be empty".into());
    }
    if raw.len() > MAX_NAME_BYTES {
        return Err(format!("must not exceed {MAX_NAME_BYTES} bytes"));
    }
    if raw == "." || raw == ".." {
        return Err("must not be a relative path component".into());
    }
    if let Some(c) = raw
        .chars()
        .find(|c| *c == '/' || *c == '\\' || c.is_control())
    {
        return Err(format!("contains forbidden character {c:?}"));
    }
    Ok(())
}

/// Name of an application, unique and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppName(String);

impl AppName {
    /// Validate and wrap an application name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        check_name(&name).map_err(|reason| ValidationError::InvalidAppName {
            name: name.clone(),
            reason,
        })?;
        Ok(Self(name))
    }

    /// Derive the application name from an uploaded filename.
    ///
    /// Any leading directories are dropped, the extension must be `.apk`
    /// (any case), and the stem is kept exactly as written.
    pub fn from_filename(filename: &str) -> Result<Self, ValidationError> {
        let base = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename);
        let (stem, ext) = base
            .rsplit_once('.')
            .ok_or_else(|| ValidationError::NotAnApk(filename.to_string()))?;
        if !ext.eq_ignore_ascii_case(APK_EXTENSION) {
            return Err(ValidationError::NotAnApk(filename.to_string()));
        }
        Self::new(stem)
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The filename this application's artifact is served and bundled as.
    pub fn artifact_filename(&self) -> String {
        format!("{}.{APK_EXTENSION}", self.0)
    }
}

/// Name of a frozen version.
///
/// `latest` is reserved: it always means "current registry state" and
/// can never name a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionName(String);

impl VersionName {
    /// Validate and wrap a version name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let invalid = |reason: String| ValidationError::InvalidVersionName {
            name: name.clone(),
            reason,
        };
        check_name(&name).map_err(invalid)?;
        if name == LATEST {
            return Err(invalid(format!("{LATEST:?} is reserved")));
        }
        Ok(Self(name))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A version selector as it appears in pull requests: either the moving
/// `latest` pointer or a frozen version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Frozen(VersionName),
}

impl VersionSelector {
    /// Parse a selector; `latest` maps to [`VersionSelector::Latest`].
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw == LATEST {
            Ok(Self::Latest)
        } else {
            VersionName::new(raw).map(Self::Frozen)
        }
    }

    /// Render the selector as it appears in URLs and messages.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => LATEST,
            Self::Frozen(v) => v.as_str(),
        }
    }
}

macro_rules! string_newtype_impls {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype_impls!(AppName);
string_newtype_impls!(VersionName);

impl std::fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
