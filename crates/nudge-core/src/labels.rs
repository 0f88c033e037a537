//! Choosing a bump level from pull request labels.

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::version::BumpLevel;

/// Errors from label decisions.
///
/// Both variants are addressed to whoever opened the pull request, so their
/// messages are suitable for posting as a comment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// None of the version labels is present.
    #[error(
        "There is no version label on the pull request.\nPlease use one of the following: {}",
        expected.join(", ")
    )]
    Missing {
        /// The configured label names.
        expected: Vec<String>,
    },

    /// More than one version label is present.
    #[error("There are multiple version labels on the pull request. Please use only one.")]
    Multiple {
        /// The version labels that were found.
        found: Vec<String>,
    },
}

/// Result alias for label decisions.
pub type LabelResult<T> = Result<T, LabelError>;

/// The label names that map to each bump level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    /// Label selecting a patch bump.
    pub patch: String,
    /// Label selecting a minor bump.
    pub minor: String,
    /// Label selecting a major bump.
    pub major: String,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            patch: "patch".into(),
            minor: "minor".into(),
            major: "major".into(),
        }
    }
}

impl LabelSet {
    /// Labels from the `[labels]` section, with defaults for unset entries.
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        let Some(labels) = config.labels.as_ref() else {
            return defaults;
        };
        Self {
            patch: labels.patch.clone().unwrap_or(defaults.patch),
            minor: labels.minor.clone().unwrap_or(defaults.minor),
            major: labels.major.clone().unwrap_or(defaults.major),
        }
    }

    fn level_of(&self, label: &str) -> Option<BumpLevel> {
        if label == self.patch {
            Some(BumpLevel::Patch)
        } else if label == self.minor {
            Some(BumpLevel::Minor)
        } else if label == self.major {
            Some(BumpLevel::Major)
        } else {
            None
        }
    }

    /// Pick the bump level. Exactly one version label must be present;
    /// other labels are ignored.
    pub fn decide<S: AsRef<str>>(&self, labels: &[S]) -> LabelResult<BumpLevel> {
        let matched: Vec<(&str, BumpLevel)> = labels
            .iter()
            .map(|label| label.as_ref())
            .filter_map(|name| self.level_of(name).map(|level| (name, level)))
            .collect();

        match matched.as_slice() {
            [] => Err(LabelError::Missing {
                expected: vec![self.patch.clone(), self.minor.clone(), self.major.clone()],
            }),
            [(name, level)] => {
                debug!(label = *name, %level, "version label found");
                Ok(*level)
            }
            _ => Err(LabelError::Multiple {
                found: matched.iter().map(|(name, _)| (*name).to_string()).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelsConfig;

    #[test]
    fn picks_the_single_version_label() {
        let labels = LabelSet::default();
        assert_eq!(labels.decide(&["bug", "minor"]).unwrap(), BumpLevel::Minor);
        assert_eq!(labels.decide(&["patch"]).unwrap(), BumpLevel::Patch);
        assert_eq!(labels.decide(&["major", "docs"]).unwrap(), BumpLevel::Major);
    }

    #[test]
    fn missing_label_lists_the_options() {
        let err = LabelSet::default().decide(&["bug"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "There is no version label on the pull request.\nPlease use one of the following: patch, minor, major"
        );
    }

    #[test]
    fn empty_label_list_is_missing() {
        let none: [&str; 0] = [];
        assert!(matches!(
            LabelSet::default().decide(&none),
            Err(LabelError::Missing { .. })
        ));
    }

    #[test]
    fn multiple_labels_are_rejected() {
        let err = LabelSet::default().decide(&["patch", "major"]).unwrap_err();
        assert_eq!(
            err,
            LabelError::Multiple {
                found: vec!["patch".into(), "major".into()]
            }
        );
    }

    #[test]
    fn same_label_twice_counts_twice() {
        assert!(matches!(
            LabelSet::default().decide(&["minor", "minor"]),
            Err(LabelError::Multiple { .. })
        ));
    }

    #[test]
    fn labels_come_from_config() {
        let config = Config {
            labels: Some(LabelsConfig {
                patch: Some("semver:patch".into()),
                minor: None,
                major: Some("breaking".into()),
            }),
            ..Config::default()
        };
        let labels = LabelSet::from_config(&config);
        assert_eq!(labels.minor, "minor");
        assert_eq!(labels.decide(&["breaking"]).unwrap(), BumpLevel::Major);
        assert!(labels.decide(&["patch"]).is_err());
    }
}
