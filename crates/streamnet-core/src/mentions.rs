use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;

// A run longer than 25 characters yields its first 25.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_]{4,25})").expect("valid mention regex"));

/// Outcome of resolving candidate logins against known channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionResolution {
    /// Lower-cased login to channel id.
    pub found: BTreeMap<String, String>,
    pub not_found: BTreeSet<String>,
    /// Set when the lookup itself failed; `found` is empty and every
    /// candidate is in `not_found`.
    pub degraded: bool,
}

/// Extract `@login` references from free text.
///
/// Logins are lower-cased and deduplicated. Runs shorter than 4 characters
/// are ignored; longer runs are cut to their first 25.
#[must_use]
pub fn extract_mentions(text: &str) -> BTreeSet<String> {
    MENTION_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Resolve candidate logins to channel ids with a single batch lookup.
///
/// `lookup` receives the lower-cased candidates and returns `(login, id)`
/// pairs for the channels it knows. Logins are compared case-insensitively.
/// Every candidate lands in exactly one of `found` / `not_found`. A failed
/// lookup is logged and reported as all-not-found with `degraded` set.
pub async fn resolve_mentions<F, Fut, E>(
    candidates: &BTreeSet<String>,
    lookup: F,
) -> MentionResolution
where
    F: FnOnce(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<(String, String)>, E>>,
    E: Display,
{
    let wanted: BTreeSet<String> = candidates.iter().map(|c| c.to_ascii_lowercase()).collect();
    if wanted.is_empty() {
        return MentionResolution::default();
    }

    let known = match lookup(wanted.iter().cloned().collect()).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(
                candidates = wanted.len(),
                error = %e,
                "mention lookup failed; treating all candidates as unresolved"
            );
            return MentionResolution {
                found: BTreeMap::new(),
                not_found: wanted,
                degraded: true,
            };
        }
    };

    let mut found = BTreeMap::new();
    for (login, id) in known {
        let login = login.to_ascii_lowercase();
        if wanted.contains(&login) {
            found.entry(login).or_insert(id);
        }
    }
    let not_found = wanted
        .into_iter()
        .filter(|login| !found.contains_key(login))
        .collect();

    MentionResolution {
        found,
        not_found,
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn extract_folds_case_dedups_and_drops_short() {
        assert_eq!(
            extract_mentions("check @Foo_1 and @foo_1!! @ab"),
            set(&["foo_1"])
        );
    }

    #[test]
    fn extract_empty_text() {
        assert!(extract_mentions("").is_empty());
        assert!(extract_mentions("no sigils here").is_empty());
    }

    #[test]
    fn extract_truncates_overlong_login_to_25() {
        let long = format!("@{}", "a".repeat(30));
        assert_eq!(extract_mentions(&long), set(&["a".repeat(25).as_str()]));
        let max = format!("@{}", "b".repeat(25));
        assert_eq!(extract_mentions(&max), set(&["b".repeat(25).as_str()]));
    }

    #[test]
    fn extract_stops_at_punctuation() {
        assert_eq!(
            extract_mentions("thanks @Streamer_One, @other.guy and (@third)"),
            set(&["streamer_one", "other", "third"])
        );
    }

    #[tokio::test]
    async fn resolve_splits_found_and_not_found() {
        let candidates = set(&["foo_1", "ghost"]);
        let result = resolve_mentions(&candidates, |logins| async move {
            assert_eq!(logins, vec!["foo_1".to_string(), "ghost".to_string()]);
            Ok::<_, String>(vec![("Foo_1".to_string(), "1001".to_string())])
        })
        .await;

        assert_eq!(result.found.len(), 1);
        assert_eq!(result.found.get("foo_1").map(String::as_str), Some("1001"));
        assert_eq!(result.not_found, set(&["ghost"]));
        assert!(!result.degraded);
    }

    #[tokio::test]
    async fn resolve_failure_marks_everything_not_found() {
        let candidates = set(&["foo_1", "bar_2"]);
        let result = resolve_mentions(&candidates, |_| async {
            Err::<Vec<(String, String)>, _>("connection refused")
        })
        .await;

        assert!(result.found.is_empty());
        assert_eq!(result.not_found, candidates);
        assert!(result.degraded);
    }

    #[tokio::test]
    async fn resolve_empty_skips_lookup() {
        let result = resolve_mentions(&BTreeSet::new(), |_| async {
            Err::<Vec<(String, String)>, _>("lookup should not run")
        })
        .await;
        assert_eq!(result, MentionResolution::default());
    }

    #[tokio::test]
    async fn resolve_ignores_rows_not_requested() {
        let candidates = set(&["alpha"]);
        let result = resolve_mentions(&candidates, |_| async {
            Ok::<_, String>(vec![
                ("alpha".to_string(), "1".to_string()),
                ("beta".to_string(), "2".to_string()),
            ])
        })
        .await;
        assert_eq!(result.found.len(), 1);
        assert!(result.not_found.is_empty());
    }
}
