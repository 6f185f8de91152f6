//! Checksum trust policies.
//!
//! A policy inspects the declared ("original") and server-computed
//! ("actual") checksums of one artifact and answers two questions: does the
//! set verify, and which value is authoritative for a given algorithm.
//! Policies only ever borrow the checksum set; inspection is read-only.

pub mod local;
pub mod remote;

use depot_types::{ChecksumInfo, ChecksumType, ChecksumsInfo, RepoPath};

/// Verdict of a policy on incoming content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChecksumDecision {
    /// The content may be stored and served.
    Accept,
    /// The content must be refused.
    Reject { reason: String },
}

impl ChecksumDecision {
    /// Returns `true` if the decision is `Accept`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Checksum policy of one repository kind.
pub trait ChecksumPolicy: Send + Sync {
    /// Human-readable name of this policy (e.g. "client-trust").
    fn name(&self) -> &str;

    /// Any-match verification: the set verifies if at least one algorithm's
    /// original agrees with its actual value (or is the trusted sentinel).
    fn verify(&self, checksums: &ChecksumsInfo) -> bool {
        any_match(checksums)
    }

    /// The authoritative value for `checksum_type`, or `None` when the set
    /// holds no usable value for that algorithm.
    fn checksum(
        &self,
        checksum_type: ChecksumType,
        checksums: &ChecksumsInfo,
        path: Option<&RepoPath>,
    ) -> Option<String>;

    /// Decide whether incoming content with these checksums is accepted.
    fn decide(&self, checksums: &ChecksumsInfo) -> ChecksumDecision;
}

/// Returns `true` if any entry's original matches its actual value.
///
/// An empty set, or a set where no entry carries an original, fails.
pub fn any_match(checksums: &ChecksumsInfo) -> bool {
    checksums.iter().any(ChecksumInfo::checksums_match)
}

/// Returns `true` for Maven metadata files (`maven-metadata.xml` and friends),
/// whose checksums are always server-authoritative.
pub fn is_metadata(path: &RepoPath) -> bool {
    path.name().ends_with("metadata.xml")
}

/// Describe every mismatching entry, for rejection reasons and logs.
pub(crate) fn describe_mismatches(checksums: &ChecksumsInfo) -> String {
    let parts: Vec<String> = checksums
        .iter()
        .filter(|info| info.is_mismatch())
        .map(|info| {
            format!(
                "{} declared {} but computed {}",
                info.checksum_type,
                info.original.as_deref().unwrap_or_default(),
                info.actual.as_deref().unwrap_or_default(),
            )
        })
        .collect();
    if parts.is_empty() {
        "no declared checksum to verify against".to_string()
    } else {
        parts.join("; ")
    }
}
