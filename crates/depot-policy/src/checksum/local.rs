use depot_types::{ChecksumType, ChecksumsInfo, LocalChecksumPolicyType, RepoPath};

use super::{any_match, describe_mismatches, is_metadata, ChecksumDecision, ChecksumPolicy};

/// Checksum policy of a local repository.
///
/// In client mode the checksum declared at deploy time is authoritative; in
/// server mode the computed one is. Metadata files are always served with
/// the computed value, since the server regenerates them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocalChecksumPolicy {
    policy_type: LocalChecksumPolicyType,
}

impl LocalChecksumPolicy {
    pub fn new(policy_type: LocalChecksumPolicyType) -> Self {
        Self { policy_type }
    }

    pub fn policy_type(&self) -> LocalChecksumPolicyType {
        self.policy_type
    }
}

impl ChecksumPolicy for LocalChecksumPolicy {
    fn name(&self) -> &str {
        match self.policy_type {
            LocalChecksumPolicyType::Client => "client-trust",
            LocalChecksumPolicyType::Server => "server-trust",
        }
    }

    fn checksum(
        &self,
        checksum_type: ChecksumType,
        checksums: &ChecksumsInfo,
        path: Option<&RepoPath>,
    ) -> Option<String> {
        let info = checksums.get(checksum_type)?;
        if path.is_some_and(is_metadata) {
            return info.actual.clone();
        }
        match self.policy_type {
            LocalChecksumPolicyType::Server => info.actual.clone(),
            LocalChecksumPolicyType::Client if info.is_marked_as_trusted() => info.actual.clone(),
            LocalChecksumPolicyType::Client => info.original.clone(),
        }
    }

    /// Client mode refuses a deploy whose declared checksums all disagree
    /// with the received bytes. Trusted-marker entries are not declarations;
    /// deploys without any declaration pass.
    fn decide(&self, checksums: &ChecksumsInfo) -> ChecksumDecision {
        if self.policy_type == LocalChecksumPolicyType::Server {
            return ChecksumDecision::Accept;
        }
        let declared: ChecksumsInfo = checksums
            .iter()
            .filter(|info| info.original.is_some() && !info.is_marked_as_trusted())
            .cloned()
            .collect();
        if declared.is_empty() || any_match(&declared) {
            ChecksumDecision::Accept
        } else {
            ChecksumDecision::Reject {
                reason: describe_mismatches(checksums),
            }
        }
    }
}
