//! Deployment name resolution.
//!
//! Maps a user-typed, possibly-partial deployment name to a canonical
//! record, given the full list fetched from the platform by the caller.
//! Pure in-memory matching; no I/O and no caching.

use serde::{Deserialize, Serialize};

/// Maximum number of candidates reported for an ambiguous name.
pub const MAX_CANDIDATES: usize = 10;

/// A deployment as reported by the platform. Read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Opaque platform identifier.
    pub id: String,
    /// Display name. May be absent; treated as an empty string for matching.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl DeploymentRecord {
    fn label_lower(&self) -> String {
        self.label.as_deref().unwrap_or("").to_lowercase()
    }
}

/// Tagged outcome of name lookup. Callers branch on every variant
/// explicitly; none of them is an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "match_type", rename_all = "lowercase")]
pub enum ResolutionResult {
    /// Exactly one deployment whose label equals the name.
    Exact { deployment: DeploymentRecord },
    /// Exactly one deployment whose label contains the name.
    Partial { deployment: DeploymentRecord },
    /// Several deployments match; the caller should disambiguate.
    Multiple { candidates: Vec<DeploymentRecord> },
    /// Nothing matched; the caller should suggest listing deployments.
    #[serde(rename = "none")]
    NoMatch,
}

/// Resolve a human-supplied name against the deployment list.
///
/// Case-insensitive. A unique exact label match wins; otherwise substring
/// matching applies, reporting up to [`MAX_CANDIDATES`] candidates in input
/// order. Two or more deployments with the same exact label deliberately
/// fall through to substring matching and therefore come back as
/// `Multiple`: duplicate labels are inherently ambiguous and must be
/// surfaced to the user in candidate form.
pub fn resolve(name: &str, deployments: &[DeploymentRecord]) -> ResolutionResult {
    let name_lower = name.to_lowercase();

    let exact: Vec<&DeploymentRecord> = deployments
        .iter()
        .filter(|d| d.label_lower() == name_lower)
        .collect();
    if exact.len() == 1 {
        return ResolutionResult::Exact {
            deployment: exact[0].clone(),
        };
    }

    let partial: Vec<&DeploymentRecord> = deployments
        .iter()
        .filter(|d| d.label_lower().contains(&name_lower))
        .collect();
    match partial.len() {
        0 => ResolutionResult::NoMatch,
        1 => ResolutionResult::Partial {
            deployment: partial[0].clone(),
        },
        _ => ResolutionResult::Multiple {
            candidates: partial
                .into_iter()
                .take(MAX_CANDIDATES)
                .cloned()
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, label: &str) -> DeploymentRecord {
        DeploymentRecord {
            id: id.to_string(),
            label: Some(label.to_string()),
            status: Some("active".to_string()),
            description: None,
        }
    }

    #[test]
    fn exact_match_wins_over_substring() {
        let deployments = vec![record("d1", "foo"), record("d2", "foobar")];
        let result = resolve("foo", &deployments);
        assert_eq!(
            result,
            ResolutionResult::Exact {
                deployment: deployments[0].clone()
            }
        );
    }

    #[test]
    fn single_substring_match_is_partial() {
        let deployments = vec![record("d1", "foo"), record("d2", "foobar")];
        let result = resolve("bar", &deployments);
        assert_eq!(
            result,
            ResolutionResult::Partial {
                deployment: deployments[1].clone()
            }
        );
    }

    #[test]
    fn several_substring_matches_report_candidates_in_input_order() {
        let deployments = vec![record("d1", "foo"), record("d2", "foobar")];
        let result = resolve("oo", &deployments);
        assert_eq!(
            result,
            ResolutionResult::Multiple {
                candidates: deployments.clone()
            }
        );
    }

    #[test]
    fn no_match() {
        let deployments = vec![record("d1", "foo"), record("d2", "foobar")];
        assert_eq!(resolve("zzz", &deployments), ResolutionResult::NoMatch);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let deployments = vec![record("d1", "Churn-Model-Prod")];
        let result = resolve("churn-model-prod", &deployments);
        assert!(matches!(result, ResolutionResult::Exact { .. }));
        let result = resolve("CHURN", &deployments);
        assert!(matches!(result, ResolutionResult::Partial { .. }));
    }

    #[test]
    fn duplicate_exact_labels_fall_through_to_multiple() {
        // Two deployments with the same label are inherently ambiguous:
        // they skip the exact branch and surface as candidates.
        let deployments = vec![record("d1", "X"), record("d2", "X")];
        let result = resolve("X", &deployments);
        assert_eq!(
            result,
            ResolutionResult::Multiple {
                candidates: deployments.clone()
            }
        );
    }

    #[test]
    fn missing_label_treated_as_empty() {
        let unlabeled = DeploymentRecord {
            id: "d1".to_string(),
            label: None,
            status: None,
            description: None,
        };
        assert_eq!(resolve("anything", &[unlabeled.clone()]), ResolutionResult::NoMatch);
        // The empty string is a substring of every label, including empty.
        let result = resolve("", &[unlabeled.clone()]);
        assert!(matches!(result, ResolutionResult::Exact { .. }));
    }

    #[test]
    fn candidate_list_is_capped() {
        let deployments: Vec<DeploymentRecord> = (0..15)
            .map(|i| record(&format!("d{i}"), &format!("model-{i}")))
            .collect();
        let ResolutionResult::Multiple { candidates } = resolve("model", &deployments) else {
            panic!("expected multiple");
        };
        assert_eq!(candidates.len(), MAX_CANDIDATES);
        assert_eq!(candidates[0].id, "d0");
    }

    #[test]
    fn serializes_with_match_type_tag() {
        let deployments = vec![record("d1", "foo")];
        let json = serde_json::to_value(resolve("foo", &deployments)).unwrap();
        assert_eq!(json["match_type"], "exact");
        assert_eq!(json["deployment"]["id"], "d1");
        let json = serde_json::to_value(resolve("zzz", &deployments)).unwrap();
        assert_eq!(json["match_type"], "none");
    }
}
