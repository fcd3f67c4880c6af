//! Query-string parsing for the job list endpoints.
//!
//! Filters arrive under several spellings (`status`, `statuses`, `statuses[]`)
//! and either repeated or comma-separated, so they are read from the raw
//! pair list instead of a fixed `Deserialize` struct.

use npuwatch_core::filters::{JobFilter, JobSort};
use npuwatch_core::pagination::PageRequest;
use serde::Deserialize;

use crate::error::AppError;

/// Query parameters for `GET /nodes`.
#[derive(Debug, Default, Deserialize)]
pub struct NodeListParams {
    pub status: Option<String>,
}

/// Query parameters for `GET /jobs/{job_id}/detail`.
#[derive(Debug, Default, Deserialize)]
pub struct DetailParams {
    pub aggregate: Option<String>,
}

impl DetailParams {
    /// Whether to fold in the rest of the job's process tree. Only an
    /// explicit `false` turns it off.
    pub fn aggregate(&self) -> bool {
        self.aggregate.as_deref().map(str::trim) != Some("false")
    }
}

/// Parsed query for `GET /jobs` and `GET /jobs/grouped`.
#[derive(Debug, Default)]
pub struct JobListParams {
    pub filter: JobFilter,
    pub sort: JobSort,
    pub page: PageRequest,
    /// Card counts to keep; `0` stands for unknown. Empty keeps everything.
    pub card_counts: Vec<i64>,
}

impl JobListParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut params = JobListParams::default();
        let mut sort_by = None;
        let mut sort_order = None;
        let mut page = None;
        let mut page_size = None;

        for (key, value) in pairs {
            match key.as_str() {
                "nodeId" | "node_id" => {
                    let value = value.trim();
                    if !value.is_empty() {
                        params.filter.node_id = Some(value.to_string());
                    }
                }
                "status" | "statuses" | "statuses[]" => {
                    params.filter.statuses.extend(split_values(value))
                }
                "type" | "jobType" | "jobTypes" | "jobTypes[]" => {
                    params.filter.job_types.extend(split_values(value))
                }
                "framework" | "frameworks" | "frameworks[]" => {
                    params.filter.frameworks.extend(split_values(value))
                }
                "cardCount" | "cardCounts" | "cardCounts[]" => {
                    for raw in split_values(value) {
                        params.card_counts.push(parse_card_count(&raw)?);
                    }
                }
                "sortBy" | "sort_by" => sort_by = Some(value.as_str()),
                "sortOrder" | "sort_order" => sort_order = Some(value.as_str()),
                "page" => page = value.trim().parse().ok(),
                "pageSize" | "page_size" => page_size = value.trim().parse().ok(),
                _ => {}
            }
        }

        params.sort = JobSort::parse(sort_by, sort_order);
        params.page = PageRequest::new(page, page_size);
        Ok(params)
    }
}

fn split_values(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_card_count(raw: &str) -> Result<i64, AppError> {
    if raw.eq_ignore_ascii_case("unknown") {
        return Ok(0);
    }
    raw.parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| AppError::BadRequest(format!("invalid card count: {raw}")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use npuwatch_core::filters::{SortDirection, SortKey};

    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn aliases_and_commas_accumulate() {
        let params = JobListParams::from_pairs(&pairs(&[
            ("status", "running,failed"),
            ("statuses[]", "lost"),
            ("jobTypes", "training"),
            ("type", "inference"),
            ("frameworks[]", "pytorch"),
            ("nodeId", "node-1"),
        ]))
        .unwrap();
        assert_eq!(params.filter.statuses, ["running", "failed", "lost"]);
        assert_eq!(params.filter.job_types, ["training", "inference"]);
        assert_eq!(params.filter.frameworks, ["pytorch"]);
        assert_eq!(params.filter.node_id.as_deref(), Some("node-1"));
    }

    #[test]
    fn card_counts_accept_unknown() {
        let params =
            JobListParams::from_pairs(&pairs(&[("cardCounts[]", "8"), ("cardCount", "unknown,2")]))
                .unwrap();
        assert_eq!(params.card_counts, [8, 0, 2]);
    }

    #[test]
    fn bad_card_count_is_rejected() {
        for raw in ["eight", "-1", "1.5"] {
            let result = JobListParams::from_pairs(&pairs(&[("cardCounts", raw)]));
            assert_matches!(result, Err(AppError::BadRequest(_)), "value {raw}");
        }
    }

    #[test]
    fn paging_is_clamped_and_defaults_survive_garbage() {
        let params =
            JobListParams::from_pairs(&pairs(&[("page", "0"), ("pageSize", "1000")])).unwrap();
        assert_eq!(params.page.page, 1);
        assert_eq!(params.page.page_size, 100);

        let params =
            JobListParams::from_pairs(&pairs(&[("page", "x"), ("pageSize", "")])).unwrap();
        assert_eq!(params.page.page, 1);
        assert_eq!(params.page.page_size, 20);
    }

    #[test]
    fn detail_aggregates_unless_told_not_to() {
        let params = |v: Option<&str>| DetailParams {
            aggregate: v.map(str::to_string),
        };
        assert!(params(None).aggregate());
        assert!(params(Some("true")).aggregate());
        assert!(params(Some("0")).aggregate());
        assert!(!params(Some("false")).aggregate());
    }

    #[test]
    fn sort_is_parsed() {
        let params =
            JobListParams::from_pairs(&pairs(&[("sortBy", "jobName"), ("sortOrder", "asc")]))
                .unwrap();
        assert_eq!(params.sort.key, SortKey::JobName);
        assert_eq!(params.sort.direction, SortDirection::Asc);

        let params = JobListParams::from_pairs(&[]).unwrap();
        assert_eq!(params.sort, JobSort::default());
        assert!(params.filter.is_empty());
        assert!(params.card_counts.is_empty());
    }
}
