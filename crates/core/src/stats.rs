//! Dashboard tallies over nodes and job groups.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub error: i64,
}

impl NodeStats {
    /// Tally node statuses. Collectors report `online`/`offline` while the
    /// dashboard speaks `active`/`inactive`; both spellings are folded. A node
    /// without a status counts as inactive, unrecognised values only count
    /// toward `total`.
    pub fn tally<'a>(statuses: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total += 1;
            match status {
                Some("online" | "active") => stats.active += 1,
                Some("offline" | "inactive") | None => stats.inactive += 1,
                Some("error") => stats.error += 1,
                Some(_) => {}
            }
        }
        stats
    }
}

/// Job group counts keyed by the main job's status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
    pub stopped: i64,
    pub lost: i64,
}

impl JobStats {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total += 1;
            match status {
                Some("running") => stats.running += 1,
                Some("completed") => stats.completed += 1,
                Some("failed") => stats.failed += 1,
                Some("stopped") => stats.stopped += 1,
                Some("lost") => stats.lost += 1,
                _ => {}
            }
        }
        stats
    }
}
