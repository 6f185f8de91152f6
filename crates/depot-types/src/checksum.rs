use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Sentinel stored as the original checksum of a file deployed without a
/// declared checksum. The actual value is accepted unconditionally.
pub const TRUSTED_FILE_MARKER: &str = "NO_ORIG";

/// Supported digest algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    Md5,
    Sha1,
    Sha256,
}

impl ChecksumType {
    /// Every supported algorithm, weakest first.
    pub const ALL: [ChecksumType; 3] = [Self::Md5, Self::Sha1, Self::Sha256];

    /// Canonical algorithm name.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
        }
    }

    /// File extension of the checksum sidecar (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the lower-case hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }

    /// Returns `true` if `value` is a well-formed hex digest for this algorithm.
    pub fn is_valid(&self, value: &str) -> bool {
        value.len() == self.hex_len() && hex::decode(value).is_ok()
    }

    /// Recognise a checksum sidecar path (`lib.jar.sha1`), returning the
    /// algorithm and the path of the file it describes.
    pub fn from_path(path: &str) -> Option<(Self, &str)> {
        Self::ALL.iter().find_map(|ty| {
            let target = path.strip_suffix(ty.extension())?.strip_suffix('.')?;
            (!target.is_empty() && !target.ends_with('/')).then_some((*ty, target))
        })
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm())
    }
}

impl FromStr for ChecksumType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(TypeError::UnknownChecksumType(s.to_string())),
        }
    }
}

/// Declared (`original`) and server-computed (`actual`) checksum for one
/// algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumInfo {
    pub checksum_type: ChecksumType,
    /// Value declared by the client or the remote origin.
    pub original: Option<String>,
    /// Value computed by the server over the received bytes.
    pub actual: Option<String>,
}

impl ChecksumInfo {
    pub fn new(
        checksum_type: ChecksumType,
        original: Option<String>,
        actual: Option<String>,
    ) -> Self {
        Self {
            checksum_type,
            original,
            actual,
        }
    }

    /// Info for a file deployed without a declared checksum.
    pub fn trusted(checksum_type: ChecksumType, actual: impl Into<String>) -> Self {
        Self::new(
            checksum_type,
            Some(TRUSTED_FILE_MARKER.to_string()),
            Some(actual.into()),
        )
    }

    /// Returns `true` if the original is the trusted-file sentinel.
    pub fn is_marked_as_trusted(&self) -> bool {
        self.original.as_deref() == Some(TRUSTED_FILE_MARKER)
    }

    /// Returns `true` if the original matches the actual value (exact string
    /// equality), or the original carries the trusted sentinel.
    pub fn checksums_match(&self) -> bool {
        if self.is_marked_as_trusted() {
            return true;
        }
        match (&self.original, &self.actual) {
            (Some(original), Some(actual)) => original == actual,
            _ => false,
        }
    }

    /// Returns `true` if an original exists and disagrees with the actual value.
    pub fn is_mismatch(&self) -> bool {
        self.original.is_some() && self.actual.is_some() && !self.checksums_match()
    }

    /// Merge newer information into this entry.
    ///
    /// A field is replaced only when the incoming value is non-blank and
    /// differs from the current one.
    pub fn merge(&mut self, other: &ChecksumInfo) {
        merge_field(&mut self.original, other.original.as_deref());
        merge_field(&mut self.actual, other.actual.as_deref());
    }
}

fn merge_field(current: &mut Option<String>, incoming: Option<&str>) {
    let Some(value) = incoming else {
        return;
    };
    if value.trim().is_empty() || current.as_deref() == Some(value) {
        return;
    }
    *current = Some(value.to_string());
}

/// Set of [`ChecksumInfo`] holding at most one entry per algorithm.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumsInfo {
    entries: BTreeMap<ChecksumType, ChecksumInfo>,
}

impl ChecksumsInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from declared originals and computed actuals.
    ///
    /// Algorithms present in either map get an entry.
    pub fn from_parts(
        originals: &BTreeMap<ChecksumType, String>,
        actuals: &BTreeMap<ChecksumType, String>,
    ) -> Self {
        let mut info = Self::new();
        for ty in ChecksumType::ALL {
            let original = originals.get(&ty).cloned();
            let actual = actuals.get(&ty).cloned();
            if original.is_some() || actual.is_some() {
                info.add(ChecksumInfo::new(ty, original, actual));
            }
        }
        info
    }

    /// Insert an entry, replacing any existing entry for the same algorithm.
    pub fn add(&mut self, info: ChecksumInfo) {
        self.entries.insert(info.checksum_type, info);
    }

    pub fn get(&self, checksum_type: ChecksumType) -> Option<&ChecksumInfo> {
        self.entries.get(&checksum_type)
    }

    pub fn remove(&mut self, checksum_type: ChecksumType) -> Option<ChecksumInfo> {
        self.entries.remove(&checksum_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChecksumInfo> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge incrementally discovered information, entry by entry.
    ///
    /// Existing values are only replaced under the [`ChecksumInfo::merge`]
    /// rule; entries for new algorithms are added.
    pub fn merge(&mut self, other: &ChecksumsInfo) {
        for incoming in other.iter() {
            match self.entries.get_mut(&incoming.checksum_type) {
                Some(existing) => existing.merge(incoming),
                None => self.add(incoming.clone()),
            }
        }
    }

    /// Server-computed value for an algorithm.
    pub fn actual(&self, checksum_type: ChecksumType) -> Option<&str> {
        self.get(checksum_type).and_then(|info| info.actual.as_deref())
    }

    /// Declared value for an algorithm.
    pub fn original(&self, checksum_type: ChecksumType) -> Option<&str> {
        self.get(checksum_type).and_then(|info| info.original.as_deref())
    }
}

impl FromIterator<ChecksumInfo> for ChecksumsInfo {
    fn from_iter<I: IntoIterator<Item = ChecksumInfo>>(iter: I) -> Self {
        let mut info = Self::new();
        for entry in iter {
            info.add(entry);
        }
        info
    }
}
