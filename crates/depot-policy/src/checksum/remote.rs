use depot_types::{ChecksumType, ChecksumsInfo, RemoteChecksumPolicyType, RepoPath};
use tracing::debug;

use super::{any_match, describe_mismatches, ChecksumDecision, ChecksumPolicy};

/// Checksum policy of a remote repository, applied to content fetched from
/// its origin before the content is cached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemoteChecksumPolicy {
    policy_type: RemoteChecksumPolicyType,
}

impl RemoteChecksumPolicy {
    pub fn new(policy_type: RemoteChecksumPolicyType) -> Self {
        Self { policy_type }
    }

    pub fn policy_type(&self) -> RemoteChecksumPolicyType {
        self.policy_type
    }
}

impl ChecksumPolicy for RemoteChecksumPolicy {
    fn name(&self) -> &str {
        match self.policy_type {
            RemoteChecksumPolicyType::Verify => "verify",
            RemoteChecksumPolicyType::GenerateIfAbsent => "generate-if-absent",
            RemoteChecksumPolicyType::Fail => "fail",
        }
    }

    fn checksum(
        &self,
        checksum_type: ChecksumType,
        checksums: &ChecksumsInfo,
        _path: Option<&RepoPath>,
    ) -> Option<String> {
        let info = checksums.get(checksum_type)?;
        if info.checksums_match() {
            return info.actual.clone();
        }
        match (&info.original, self.policy_type) {
            (None, RemoteChecksumPolicyType::GenerateIfAbsent) => info.actual.clone(),
            _ => None,
        }
    }

    fn decide(&self, checksums: &ChecksumsInfo) -> ChecksumDecision {
        let accepted = match self.policy_type {
            RemoteChecksumPolicyType::Verify => any_match(checksums),
            RemoteChecksumPolicyType::GenerateIfAbsent => {
                any_match(checksums) || checksums.iter().all(|info| info.original.is_none())
            }
            RemoteChecksumPolicyType::Fail => !checksums.iter().any(|info| info.is_mismatch()),
        };
        if accepted {
            ChecksumDecision::Accept
        } else {
            let reason = describe_mismatches(checksums);
            debug!(policy = self.name(), reason = %reason, "remote checksum rejected");
            ChecksumDecision::Reject { reason }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_types::ChecksumInfo;

    fn set(entries: &[(ChecksumType, Option<&str>, &str)]) -> ChecksumsInfo {
        entries
            .iter()
            .map(|(ty, original, actual)| {
                ChecksumInfo::new(*ty, original.map(String::from), Some(actual.to_string()))
            })
            .collect()
    }

    fn policy(ty: RemoteChecksumPolicyType) -> RemoteChecksumPolicy {
        RemoteChecksumPolicy::new(ty)
    }

    #[test]
    fn verify_requires_a_match() {
        let p = policy(RemoteChecksumPolicyType::Verify);
        assert!(!p.decide(&set(&[(ChecksumType::Sha1, None, "aa")])).is_accepted());
        assert!(!p.decide(&set(&[(ChecksumType::Sha1, Some("bb"), "aa")])).is_accepted());
        assert!(p
            .decide(&set(&[
                (ChecksumType::Sha1, Some("bb"), "aa"),
                (ChecksumType::Md5, Some("cc"), "cc"),
            ]))
            .is_accepted());
    }

    #[test]
    fn generate_if_absent_accepts_undeclared() {
        let p = policy(RemoteChecksumPolicyType::GenerateIfAbsent);
        assert!(p.decide(&set(&[(ChecksumType::Sha1, None, "aa")])).is_accepted());
        assert!(p.decide(&ChecksumsInfo::new()).is_accepted());
        assert!(!p.decide(&set(&[(ChecksumType::Sha1, Some("bb"), "aa")])).is_accepted());
    }

    #[test]
    fn fail_rejects_any_mismatch() {
        let p = policy(RemoteChecksumPolicyType::Fail);
        let decision = p.decide(&set(&[
            (ChecksumType::Sha1, Some("bb"), "aa"),
            (ChecksumType::Md5, Some("cc"), "cc"),
        ]));
        match decision {
            ChecksumDecision::Reject { reason } => {
                assert!(reason.contains("SHA-1"));
                assert!(reason.contains("bb"));
            }
            ChecksumDecision::Accept => panic!("mismatch must reject"),
        }
        assert!(p.decide(&set(&[(ChecksumType::Sha1, None, "aa")])).is_accepted());
    }

    #[test]
    fn checksum_value_selection() {
        let generate = policy(RemoteChecksumPolicyType::GenerateIfAbsent);
        let verify = policy(RemoteChecksumPolicyType::Verify);
        let undeclared = set(&[(ChecksumType::Sha1, None, "aa")]);
        let matching = set(&[(ChecksumType::Sha1, Some("aa"), "aa")]);
        let mismatching = set(&[(ChecksumType::Sha1, Some("bb"), "aa")]);

        assert_eq!(generate.checksum(ChecksumType::Sha1, &undeclared, None).as_deref(), Some("aa"));
        assert_eq!(verify.checksum(ChecksumType::Sha1, &undeclared, None), None);
        assert_eq!(verify.checksum(ChecksumType::Sha1, &matching, None).as_deref(), Some("aa"));
        assert_eq!(generate.checksum(ChecksumType::Sha1, &mismatching, None), None);
        assert_eq!(generate.checksum(ChecksumType::Md5, &matching, None), None);
    }

    #[test]
    fn names() {
        assert_eq!(policy(RemoteChecksumPolicyType::Fail).name(), "fail");
        assert_eq!(policy(RemoteChecksumPolicyType::default()).name(), "generate-if-absent");
    }
}
