//! Release versions as they appear in manifests and tags.
//!
//! Manifests are looser than semver: a leading `v` is common, and so are
//! shortened `1` or `1.2` forms. [`ReleaseVersion`] accepts those and keeps
//! the `v` so a bump writes back the same style it read.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver `{text}`: {source}")]
    InvalidSemver {
        /// The rejected text.
        text: String,
        /// Why semver rejected it.
        #[source]
        source: semver::Error,
    },

    /// The bumped component does not fit in a `u64`.
    #[error("cannot bump {version} by {level}: component overflows")]
    Overflow {
        /// The version being bumped.
        version: Version,
        /// The requested level.
        level: BumpLevel,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver bump level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// Compute the next version by applying a bump level.
///
/// Lower components reset to zero, and pre-release and build metadata are
/// dropped: bumping `1.2.3-rc.1` by patch gives `1.2.4`.
///
/// # Errors
///
/// Returns [`VersionError::Overflow`] when the bumped component is already
/// `u64::MAX`.
pub fn next_version(current: &Version, level: BumpLevel) -> VersionResult<Version> {
    let overflow = || VersionError::Overflow {
        version: current.clone(),
        level,
    };
    Ok(match level {
        BumpLevel::Patch => {
            let patch = current.patch.checked_add(1).ok_or_else(overflow)?;
            Version::new(current.major, current.minor, patch)
        }
        BumpLevel::Minor => {
            let minor = current.minor.checked_add(1).ok_or_else(overflow)?;
            Version::new(current.major, minor, 0)
        }
        BumpLevel::Major => {
            let major = current.major.checked_add(1).ok_or_else(overflow)?;
            Version::new(major, 0, 0)
        }
    })
}

/// A semver version plus whether it was written with a `v` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseVersion {
    /// The parsed version, with shortened forms padded out.
    pub version: Version,
    /// Whether the text started with `v`.
    pub v_prefix: bool,
}

impl ReleaseVersion {
    /// Parse `1.2.3`, `v1.2.3`, `1.2` or `1`.
    ///
    /// Missing minor and patch parts default to `0`. Pre-release and build
    /// metadata are only accepted on a full `X.Y.Z`.
    pub fn parse(text: &str) -> VersionResult<Self> {
        let (v_prefix, body) = match text.strip_prefix('v') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let plain = !body.contains(['-', '+']);
        let padded = match body.matches('.').count() {
            0 if plain => format!("{body}.0.0"),
            1 if plain => format!("{body}.0"),
            _ => body.to_string(),
        };

        let version = Version::parse(&padded).map_err(|source| VersionError::InvalidSemver {
            text: text.to_string(),
            source,
        })?;
        Ok(Self { version, v_prefix })
    }

    /// The next release at `level`, written in the same style.
    pub fn bump(&self, level: BumpLevel) -> VersionResult<Self> {
        Ok(Self {
            version: next_version(&self.version, level)?,
            v_prefix: self.v_prefix,
        })
    }
}

impl FromStr for ReleaseVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.v_prefix {
            write!(f, "v")?;
        }
        write!(f, "{}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ReleaseVersion {
        ReleaseVersion::parse(text).unwrap()
    }

    #[test]
    fn bump_patch() {
        let v = Version::new(1, 2, 3);
        assert_eq!(next_version(&v, BumpLevel::Patch).unwrap(), Version::new(1, 2, 4));
    }

    #[test]
    fn bump_minor() {
        let v = Version::new(1, 2, 3);
        assert_eq!(next_version(&v, BumpLevel::Minor).unwrap(), Version::new(1, 3, 0));
    }

    #[test]
    fn bump_major() {
        let v = Version::new(1, 2, 3);
        assert_eq!(next_version(&v, BumpLevel::Major).unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn bump_from_zero() {
        let v = Version::new(0, 1, 0);
        assert_eq!(next_version(&v, BumpLevel::Patch).unwrap(), Version::new(0, 1, 1));
        assert_eq!(next_version(&v, BumpLevel::Minor).unwrap(), Version::new(0, 2, 0));
        assert_eq!(next_version(&v, BumpLevel::Major).unwrap(), Version::new(1, 0, 0));
    }

    #[test]
    fn bump_drops_prerelease_and_build() {
        assert_eq!(
            parse("1.2.3-rc.1+b7").bump(BumpLevel::Patch).unwrap().to_string(),
            "1.2.4"
        );
    }

    #[test]
    fn bump_at_component_limit_overflows() {
        let max = u64::MAX;
        let v = Version::new(1, 2, max);
        assert!(matches!(
            next_version(&v, BumpLevel::Patch),
            Err(VersionError::Overflow {
                level: BumpLevel::Patch,
                ..
            })
        ));
        assert_eq!(next_version(&v, BumpLevel::Minor).unwrap(), Version::new(1, 3, 0));

        let v = Version::new(max, max, 0);
        assert!(next_version(&v, BumpLevel::Minor).is_err());
        assert!(next_version(&v, BumpLevel::Major).is_err());

        let text = format!("{max}.0.0");
        assert!(parse(&text).bump(BumpLevel::Major).is_err());
    }

    #[test]
    fn parses_full_versions() {
        assert_eq!(parse("1.0.0").version, Version::new(1, 0, 0));
        assert_eq!(parse("0.1.1").version, Version::new(0, 1, 1));

        let pre = parse("1.0.0-aw2Q22ad");
        assert_eq!(pre.version.pre.as_str(), "aw2Q22ad");

        let build = parse("1.1.1+2211sda21");
        assert_eq!(build.version.build.as_str(), "2211sda21");

        let both = parse("1.1.1-aw2Q22ad+2211sda21");
        assert_eq!(both.to_string(), "1.1.1-aw2Q22ad+2211sda21");
    }

    #[test]
    fn keeps_v_prefix() {
        let v = parse("v1.1.1");
        assert!(v.v_prefix);
        assert_eq!(v.version, Version::new(1, 1, 1));
        assert_eq!(v.to_string(), "v1.1.1");
        assert_eq!(v.bump(BumpLevel::Minor).unwrap().to_string(), "v1.2.0");
    }

    #[test]
    fn pads_short_forms() {
        assert_eq!(parse("1").to_string(), "1.0.0");
        assert_eq!(parse("1.2").to_string(), "1.2.0");
        assert_eq!(parse("v2").to_string(), "v2.0.0");
    }

    #[test]
    fn rejects_invalid_text() {
        for bad in [".0.0", "a.b.x", "1.0.0+sad+sad", "asdas", "", "01.0.0", "1-rc.1"] {
            assert!(ReleaseVersion::parse(bad).is_err(), "{bad} should be rejected");
        }
    }
}
