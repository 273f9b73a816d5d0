//! Identifier and validated scalar types for pipeline entities.

use super::LifecycleDomainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

macro_rules! positive_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(try_from = "u64", into = "u64")]
        pub struct $name(u64);

        impl $name {
            /// Creates a validated identifier.
            ///
            /// # Errors
            ///
            /// Returns [`LifecycleDomainError::InvalidIdentifier`] when the
            /// value is zero.
            pub const fn new(value: u64) -> Result<Self, LifecycleDomainError> {
                if value == 0 {
                    return Err(LifecycleDomainError::InvalidIdentifier {
                        kind: $kind,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Returns the underlying numeric value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl TryFrom<u64> for $name {
            type Error = LifecycleDomainError;

            fn try_from(value: u64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_identifier!(
    /// Identity of a unit of requested work.
    WorkItemId,
    "work item"
);

positive_identifier!(
    /// Identity of one execution attempt of a work item.
    ExecutionId,
    "task execution"
);

positive_identifier!(
    /// Identity of a tracked issue.
    IssueId,
    "issue"
);

positive_identifier!(
    /// Pull request number assigned by the source-control provider.
    PullRequestNumber,
    "pull request number"
);

/// Repository coordinates as `owner` and `name`, written `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName {
    owner: String,
    name: String,
}

impl RepositoryName {
    /// Creates validated repository coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidRepository`] when either part
    /// is empty or contains whitespace or a slash.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, LifecycleDomainError> {
        let raw_owner = owner.into();
        let raw_name = name.into();
        let owner_trimmed = raw_owner.trim();
        let name_trimmed = raw_name.trim();
        if !is_repository_segment(owner_trimmed) || !is_repository_segment(name_trimmed) {
            return Err(LifecycleDomainError::InvalidRepository(format!(
                "{raw_owner}/{raw_name}"
            )));
        }
        Ok(Self {
            owner: owner_trimmed.to_owned(),
            name: name_trimmed.to_owned(),
        })
    }

    /// Returns the repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl TryFrom<&str> for RepositoryName {
    type Error = LifecycleDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (owner, name) = value
            .split_once('/')
            .ok_or_else(|| LifecycleDomainError::InvalidRepository(value.to_owned()))?;
        Self::new(owner, name)
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = LifecycleDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<RepositoryName> for String {
    fn from(value: RepositoryName) -> Self {
        value.to_string()
    }
}

fn is_repository_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.chars().any(|ch| ch.is_whitespace() || ch == '/')
}

/// Externally assigned pull request identity.
///
/// Rendered as `owner/repo#42`, which is both the wire form and the
/// partition key used for pull request and code review traffic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PullRequestKey {
    repository: RepositoryName,
    number: PullRequestNumber,
}

impl PullRequestKey {
    /// Creates a key from validated parts.
    #[must_use]
    pub const fn new(repository: RepositoryName, number: PullRequestNumber) -> Self {
        Self { repository, number }
    }

    /// Creates a key from raw external values.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleDomainError`] when any component is invalid.
    pub fn from_parts(owner: &str, repo: &str, number: u64) -> Result<Self, LifecycleDomainError> {
        Ok(Self::new(
            RepositoryName::new(owner, repo)?,
            PullRequestNumber::new(number)?,
        ))
    }

    /// Returns the repository coordinates.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }
}

impl fmt::Display for PullRequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

impl TryFrom<&str> for PullRequestKey {
    type Error = LifecycleDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || LifecycleDomainError::InvalidRepository(value.to_owned());
        let (repository, number) = value.rsplit_once('#').ok_or_else(invalid)?;
        let parsed = number.trim().parse::<u64>().map_err(|_| invalid())?;
        Ok(Self::new(
            RepositoryName::try_from(repository)?,
            PullRequestNumber::new(parsed)?,
        ))
    }
}

impl TryFrom<String> for PullRequestKey {
    type Error = LifecycleDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<PullRequestKey> for String {
    fn from(value: PullRequestKey) -> Self {
        value.to_string()
    }
}

/// One-based review attempt counter for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ReviewAttempt(u32);

impl ReviewAttempt {
    /// The first review attempt.
    pub const FIRST: Self = Self(1);

    /// Creates a validated attempt counter.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidIdentifier`] when the value is
    /// zero.
    pub const fn new(value: u32) -> Result<Self, LifecycleDomainError> {
        if value == 0 {
            return Err(LifecycleDomainError::InvalidIdentifier {
                kind: "review attempt",
                value: 0,
            });
        }
        Ok(Self(value))
    }

    /// Returns the following attempt.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the numeric attempt.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ReviewAttempt {
    type Error = LifecycleDomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReviewAttempt> for u32 {
    fn from(value: ReviewAttempt) -> Self {
        value.0
    }
}

impl fmt::Display for ReviewAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplication key shared by recurring detections of the same finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Maximum stored length of a correlation key.
    const MAX_LENGTH: usize = 255;

    /// Creates a validated correlation key.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidCorrelationKey`] when the
    /// trimmed value is empty or longer than 255 characters.
    pub fn new(value: impl Into<String>) -> Result<Self, LifecycleDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() || normalized.chars().count() > Self::MAX_LENGTH {
            return Err(LifecycleDomainError::InvalidCorrelationKey(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Derives a key from the stable coordinates of a finding.
    ///
    /// Line numbers are deliberately absent: a finding that moves within a
    /// file keeps its key.
    #[must_use]
    pub fn derive(
        repository: &RepositoryName,
        category: &str,
        rule_id: Option<&str>,
        file_path: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        for part in [
            repository.to_string().as_str(),
            category,
            rule_id.unwrap_or_default(),
            file_path.trim(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Returns the key as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CorrelationKey {
    type Error = LifecycleDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CorrelationKey> for String {
    fn from(value: CorrelationKey) -> Self {
        value.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review quality score between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QualityScore(u8);

impl QualityScore {
    /// Creates a validated quality score.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleDomainError::InvalidQualityScore`] above 100.
    pub const fn new(value: u8) -> Result<Self, LifecycleDomainError> {
        if value > 100 {
            return Err(LifecycleDomainError::InvalidQualityScore(value));
        }
        Ok(Self(value))
    }

    /// Returns the numeric score.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for QualityScore {
    type Error = LifecycleDomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QualityScore> for u8 {
    fn from(value: QualityScore) -> Self {
        value.0
    }
}
