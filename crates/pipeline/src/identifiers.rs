//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`BranchName`] with a [`CommitHash`] even though both are strings under the
//! hood.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or only whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// A Git branch name (e.g. `"main"`, `"release/1.x"`).
    BranchName
}

string_id! {
    /// Name of the relational table the mirror writes into (e.g. `"raw_commits"`).
    ///
    /// Only non-emptiness is checked here; the relational adapter enforces
    /// identifier syntax before interpolating it into SQL.
    TableName
}

// ---------------------------------------------------------------------------
// Commit hash
// ---------------------------------------------------------------------------

/// A Git commit SHA-1: exactly 40 hexadecimal characters, stored lower-case.
///
/// Unique within one repository; used as the relational mirror's unique key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    /// Length of a full SHA-1 hex digest.
    pub const LEN: usize = 40;

    /// Parses a hash, returning `None` unless `value` is 40 hex characters.
    ///
    /// Upper-case digits are accepted and folded to lower-case.
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        if v.len() == Self::LEN && v.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(v.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Returns the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| format!("'{value}' is not a 40-character hex commit hash"))
    }
}

impl From<CommitHash> for String {
    fn from(hash: CommitHash) -> Self {
        hash.0
    }
}

impl std::fmt::Display for CommitHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Repository slug
// ---------------------------------------------------------------------------

/// Identifies a hosted repository by its `owner/name` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositorySlug {
    owner: String,
    name: String,
}

impl RepositorySlug {
    /// Creates a slug, returning `None` if either part is empty or contains `/`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Option<Self> {
        let owner = owner.into();
        let name = name.into();
        let valid = |s: &str| !s.trim().is_empty() && !s.contains('/');
        if valid(&owner) && valid(&name) {
            Some(Self {
                owner: owner.trim().to_string(),
                name: name.trim().to_string(),
            })
        } else {
            None
        }
    }

    /// The user or organisation owning the repository.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepositorySlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .split_once('/')
            .ok_or_else(|| format!("'{s}' is not in owner/name form"))?;
        Self::new(owner, name).ok_or_else(|| format!("'{s}' is not in owner/name form"))
    }
}

impl std::fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single ingestion run (one invocation of [`crate::Ingestion::run`]).
///
/// Generated fresh for every CLI invocation; recorded on the `ingestion` span
/// so all activity from a single run can be correlated in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
