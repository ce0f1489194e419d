use crate::{
    backend::{CatalogItem, StatusRequest},
    error::ClientResult,
    game::{Mode, PathConfig},
    log::Log,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How responses that resolve out of issue order are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Whatever resolves last replaces the map, even if it was issued first.
    #[default]
    LastResolvedWins,
    /// Responses older than the newest applied one are discarded.
    DiscardStale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    pub ticket: u64,
    pub request: StatusRequest,
}

/// Install state of the current catalog, derived from backend truth.
#[derive(Debug, Clone)]
pub struct StatusReconciler {
    category: String,
    items: Vec<CatalogItem>,
    statuses: HashMap<String, bool>,
    policy: StatusPolicy,
    next_ticket: u64,
    newest_applied: Option<u64>,
}

impl StatusReconciler {
    pub fn new(category: &str, policy: StatusPolicy) -> Self {
        Self {
            category: category.to_string(),
            items: Vec::new(),
            statuses: HashMap::new(),
            policy,
            next_ticket: 0,
            newest_applied: None,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn item(&self, slug: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.slug == slug)
    }

    #[cfg(test)]
    pub fn statuses(&self) -> &HashMap<String, bool> {
        &self.statuses
    }

    pub fn is_installed(&self, slug: &str) -> bool {
        self.item(slug)
            .and_then(|item| self.statuses.get(&item.target_file).copied())
            .unwrap_or(false)
    }

    /// Swaps in a freshly fetched catalog. Status entries for files the new
    /// catalog does not contain are dropped right away.
    pub fn replace_catalog(&mut self, category: &str, items: Vec<CatalogItem>) {
        self.category = category.to_string();
        self.items = items;
        let targets = target_set(&self.items);
        self.statuses.retain(|file, _| targets.contains(file.as_str()));
    }

    /// Starts a reconciliation pass. Returns `None` when no request is needed,
    /// in which case the map has already been cleared.
    pub fn begin(&mut self, mode: Mode, paths: &PathConfig) -> Option<StatusQuery> {
        if self.items.is_empty() || !paths.has_usable_path() {
            self.statuses.clear();
            return None;
        }

        let mut seen = HashSet::new();
        let files: Vec<String> = self
            .items
            .iter()
            .filter(|item| seen.insert(item.target_file.as_str()))
            .map(|item| item.target_file.clone())
            .collect();

        self.next_ticket += 1;
        Some(StatusQuery {
            ticket: self.next_ticket,
            request: StatusRequest {
                mode,
                files,
                custom_path: paths.custom_path.clone(),
            },
        })
    }

    /// Applies a resolved query. Returns true when the map was replaced.
    pub fn finish(
        &mut self,
        ticket: u64,
        result: ClientResult<HashMap<String, bool>>,
        log: &Log,
    ) -> bool {
        let exists = match result {
            Ok(exists) => exists,
            Err(err) => {
                log.warn(format!("Status refresh failed: {err}"));
                return false;
            }
        };

        if self.policy == StatusPolicy::DiscardStale {
            if let Some(newest) = self.newest_applied {
                if ticket < newest {
                    log.info(format!("Discarded stale status response #{ticket}"));
                    return false;
                }
            }
        }

        let targets = target_set(&self.items);
        self.statuses = exists
            .into_iter()
            .filter(|(file, _)| targets.contains(file.as_str()))
            .collect();
        self.newest_applied = Some(self.newest_applied.map_or(ticket, |newest| newest.max(ticket)));
        true
    }

}

fn target_set(items: &[CatalogItem]) -> HashSet<&str> {
    items.iter().map(|item| item.target_file.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    fn item(slug: &str, target: &str) -> CatalogItem {
        CatalogItem {
            slug: slug.to_string(),
            name: slug.to_string(),
            image_url: String::new(),
            target_file: target.to_string(),
        }
    }

    fn usable() -> PathConfig {
        PathConfig {
            default_path_exists: true,
            ..PathConfig::default()
        }
    }

    fn exists(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries
            .iter()
            .map(|(file, flag)| (file.to_string(), *flag))
            .collect()
    }

    #[test]
    fn query_deduplicates_target_files() {
        let mut reconciler = StatusReconciler::new("room", StatusPolicy::default());
        reconciler.replace_catalog(
            "room",
            vec![item("a", "x.bin"), item("b", "y.bin"), item("c", "x.bin")],
        );
        let query = reconciler.begin(Mode::Plus, &usable()).expect("query");
        assert_eq!(query.request.files, vec!["x.bin".to_string(), "y.bin".to_string()]);
        assert_eq!(query.request.mode, Mode::Plus);
    }

    #[test]
    fn no_usable_path_short_circuits_to_empty_map() {
        let log = Log::default();
        let mut reconciler = StatusReconciler::new("room", StatusPolicy::default());
        reconciler.replace_catalog("room", vec![item("a", "x.bin")]);
        let query = reconciler.begin(Mode::Plus, &usable()).expect("query");
        reconciler.finish(query.ticket, Ok(exists(&[("x.bin", true)])), &log);
        assert!(reconciler.is_installed("a"));

        assert!(reconciler.begin(Mode::Plus, &PathConfig::default()).is_none());
        assert!(reconciler.statuses().is_empty());
    }

    #[test]
    fn failure_keeps_previous_map() {
        let log = Log::default();
        let mut reconciler = StatusReconciler::new("room", StatusPolicy::default());
        reconciler.replace_catalog("room", vec![item("a", "x.bin")]);
        let first = reconciler.begin(Mode::Plus, &usable()).expect("query");
        reconciler.finish(first.ticket, Ok(exists(&[("x.bin", true)])), &log);

        let second = reconciler.begin(Mode::Plus, &usable()).expect("query");
        let applied = reconciler.finish(
            second.ticket,
            Err(ClientError::Transient("timeout".to_string())),
            &log,
        );
        assert!(!applied);
        assert!(reconciler.is_installed("a"));
        assert_eq!(log.tail(1)[0].message, "Status refresh failed: network error: timeout");
    }

    #[test]
    fn last_resolved_response_wins_without_merge() {
        let log = Log::default();
        let mut reconciler = StatusReconciler::new("room", StatusPolicy::LastResolvedWins);
        reconciler.replace_catalog("room", vec![item("a", "x.bin"), item("b", "y.bin")]);
        let r1 = reconciler.begin(Mode::Plus, &usable()).expect("r1");
        let r2 = reconciler.begin(Mode::PlusUp, &usable()).expect("r2");

        reconciler.finish(r2.ticket, Ok(exists(&[("x.bin", false), ("y.bin", true)])), &log);
        reconciler.finish(r1.ticket, Ok(exists(&[("x.bin", true)])), &log);

        assert_eq!(reconciler.statuses(), &exists(&[("x.bin", true)]));
        assert!(!reconciler.is_installed("b"));
    }

    #[test]
    fn discard_stale_policy_keeps_newer_response() {
        let log = Log::default();
        let mut reconciler = StatusReconciler::new("room", StatusPolicy::DiscardStale);
        reconciler.replace_catalog("room", vec![item("a", "x.bin")]);
        let r1 = reconciler.begin(Mode::Plus, &usable()).expect("r1");
        let r2 = reconciler.begin(Mode::Plus, &usable()).expect("r2");

        assert!(reconciler.finish(r2.ticket, Ok(exists(&[("x.bin", false)])), &log));
        assert!(!reconciler.finish(r1.ticket, Ok(exists(&[("x.bin", true)])), &log));
        assert!(!reconciler.is_installed("a"));
    }

    #[test]
    fn keys_stay_within_current_catalog_across_category_switch() {
        let log = Log::default();
        let mut reconciler = StatusReconciler::new("room", StatusPolicy::default());
        reconciler.replace_catalog("room", vec![item("a", "room/x.bin")]);
        let stale = reconciler.begin(Mode::Plus, &usable()).expect("query");

        reconciler.replace_catalog("effect", vec![item("fx", "fx/glow.bin")]);
        let fresh = reconciler.begin(Mode::Plus, &usable()).expect("query");
        reconciler.finish(fresh.ticket, Ok(exists(&[("fx/glow.bin", true)])), &log);
        reconciler.finish(stale.ticket, Ok(exists(&[("room/x.bin", true)])), &log);

        let targets: HashSet<&str> = reconciler
            .items()
            .iter()
            .map(|item| item.target_file.as_str())
            .collect();
        assert!(reconciler
            .statuses()
            .keys()
            .all(|file| targets.contains(file.as_str())));
        assert_eq!(reconciler.category(), "effect");
    }
}
