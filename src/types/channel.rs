use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// release channel of a version
///
/// each channel maps to a dedicated branch inside the entity's repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Listed,
    Unlisted,
}

impl Channel {
    /// branch name is a pure function of the channel
    pub fn branch_name(&self) -> &'static str {
        match self {
            Channel::Listed => "listed",
            Channel::Unlisted => "unlisted",
        }
    }

    /// all channels, for iteration
    pub const ALL: [Channel; 2] = [Channel::Listed, Channel::Unlisted];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.branch_name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listed" => Ok(Channel::Listed),
            "unlisted" => Ok(Channel::Unlisted),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

/// which upload stream a repository stores
///
/// an entity owns at most one repository per kind; the kind is part of the
/// on-disk layout (`<storage-root>/<entity-id>/<kind>/`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    /// the primary uploaded package
    Package,
    /// the optional source archive
    Source,
}

impl PackageKind {
    /// directory name under the entity's storage path
    pub fn dir_name(&self) -> &'static str {
        match self {
            PackageKind::Package => "package",
            PackageKind::Source => "source",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(PackageKind::Package),
            "source" => Ok(PackageKind::Source),
            other => Err(format!("unknown package kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_names() {
        assert_eq!(Channel::Listed.branch_name(), "listed");
        assert_eq!(Channel::Unlisted.branch_name(), "unlisted");
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("listed".parse::<Channel>().unwrap(), Channel::Listed);
        assert_eq!("unlisted".parse::<Channel>().unwrap(), Channel::Unlisted);
        assert!("beta".parse::<Channel>().is_err());
    }

    #[test]
    fn test_package_kind_dir_names() {
        assert_eq!(PackageKind::Package.dir_name(), "package");
        assert_eq!(PackageKind::Source.dir_name(), "source");
    }

    #[test]
    fn test_package_kind_parse() {
        assert_eq!("package".parse::<PackageKind>().unwrap(), PackageKind::Package);
        assert_eq!("source".parse::<PackageKind>().unwrap(), PackageKind::Source);
        assert!("binary".parse::<PackageKind>().is_err());
    }

    #[test]
    fn test_channel_serde() {
        let json = serde_json::to_string(&Channel::Unlisted).unwrap();
        assert_eq!(json, "\"unlisted\"");
        let parsed: Channel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Channel::Unlisted);
    }
}
