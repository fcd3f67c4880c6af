//! Job group pipeline: load matching jobs, fold them into process trees, and
//! annotate each tree with its NPU card count.
//!
//! Gateway failures are tagged with the step that issued them
//! (`find filtered`, `find npu cards`, ...) so operators can tell a broken
//! job query from a broken occupancy lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use npuwatch_core::filters::{JobFilter, JobSort};
use npuwatch_core::grouping::{
    assign_card_counts, build_groups, distinct_card_counts, filter_by_card_counts,
    pids_by_node, CardOccupancy, JobGroup,
};
use npuwatch_core::pagination::PageRequest;
use npuwatch_core::stats::JobStats;
use sqlx::PgPool;

use crate::error::{QueryContext, QueryError};
use crate::models::job::{Job, JobDetail};
use crate::models::npu::{NpuCard, NpuMetric, NpuProcess};
use crate::repositories::{JobRepo, NpuRepo};

pub struct JobGroupRepo;

impl JobGroupRepo {
    /// Every job matching `filter`, grouped and annotated with card counts.
    pub async fn build(
        pool: &PgPool,
        filter: &JobFilter,
        sort: &JobSort,
    ) -> Result<Vec<JobGroup<Job>>, QueryError> {
        let jobs = JobRepo::find_filtered(pool, filter, sort)
            .await
            .context("find filtered")?;
        let job_count = jobs.len();
        let mut groups = build_groups(jobs);
        let occupancy = Self::occupancy(pool, &groups).await?;
        assign_card_counts(&mut groups, &occupancy);
        tracing::debug!(jobs = job_count, groups = groups.len(), "Built job groups");
        Ok(groups)
    }

    /// One page of groups after the card-count filter, plus the filtered
    /// total.
    pub async fn page(
        pool: &PgPool,
        filter: &JobFilter,
        sort: &JobSort,
        card_counts: &[i64],
        page: PageRequest,
    ) -> Result<(Vec<JobGroup<Job>>, i64), QueryError> {
        let groups = Self::build(pool, filter, sort).await?;
        let groups = filter_by_card_counts(groups, card_counts);
        let total = i64::try_from(groups.len()).unwrap_or(i64::MAX);
        Ok((page.slice(groups), total))
    }

    /// Ascending unique card counts across all job groups.
    pub async fn distinct_card_counts(pool: &PgPool) -> Result<Vec<i64>, QueryError> {
        let groups = Self::build(pool, &JobFilter::default(), &JobSort::default()).await?;
        Ok(distinct_card_counts(&groups))
    }

    /// Group counts by main job status. Card counts are not needed here.
    pub async fn stats(pool: &PgPool) -> Result<JobStats, QueryError> {
        let jobs = JobRepo::find_filtered(pool, &JobFilter::default(), &JobSort::default())
            .await
            .context("find filtered")?;
        let groups = build_groups(jobs);
        Ok(JobStats::tally(
            groups.iter().map(|g| g.main_job.status.as_deref()),
        ))
    }

    /// A job together with the cards its tree holds and the other members
    /// of its tree. `None` if the job does not exist.
    ///
    /// Without `aggregate` only the job's own process is looked at and
    /// `related_jobs` stays empty.
    pub async fn detail(
        pool: &PgPool,
        job_id: &str,
        aggregate: bool,
    ) -> Result<Option<JobDetail>, QueryError> {
        let Some(job) = JobRepo::find_by_id(pool, job_id)
            .await
            .context("find job")?
        else {
            return Ok(None);
        };

        let (Some(node_id), Some(pid)) = (job.node_id.clone(), job.pid) else {
            return Ok(Some(JobDetail {
                job,
                npu_cards: Vec::new(),
                related_jobs: Vec::new(),
            }));
        };

        let related_jobs: Vec<Job> = if aggregate {
            let node_jobs = JobRepo::list_by_node(pool, &node_id)
                .await
                .context("find node jobs")?;
            build_groups(node_jobs)
                .into_iter()
                .find(|group| group.contains(job_id))
                .map(|group| {
                    std::iter::once(group.main_job)
                        .chain(group.child_jobs)
                        .filter(|member| member.job_id != job_id)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let pids: Vec<i64> = std::iter::once(pid)
            .chain(related_jobs.iter().filter_map(|j| j.pid))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let processes = NpuRepo::processes_by_pids(pool, &node_id, &pids)
            .await
            .context("find npu processes")?;
        let npu_ids: Vec<i32> = processes
            .iter()
            .filter_map(|p| p.npu_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let metrics = NpuRepo::latest_metrics(pool, &node_id, &npu_ids)
            .await
            .context("find npu metrics")?;

        Ok(Some(JobDetail {
            job,
            npu_cards: collect_cards(processes, metrics),
            related_jobs,
        }))
    }

    /// One batched occupancy lookup per node.
    async fn occupancy(
        pool: &PgPool,
        groups: &[JobGroup<Job>],
    ) -> Result<CardOccupancy, QueryError> {
        let mut occupancy = CardOccupancy::new();
        for (node_id, pids) in pids_by_node(groups) {
            let cards = NpuRepo::cards_by_pids(pool, &node_id, &pids)
                .await
                .context("find npu cards")?;
            occupancy.extend_node(&node_id, cards);
        }
        Ok(occupancy)
    }
}

/// Fold occupancy rows into one entry per card (keeping the largest
/// per-process memory) and attach each card's chip samples.
fn collect_cards(processes: Vec<NpuProcess>, metrics: Vec<NpuMetric>) -> Vec<NpuCard> {
    let mut memory: BTreeMap<i32, Option<f64>> = BTreeMap::new();
    for process in processes {
        let Some(npu_id) = process.npu_id else {
            continue;
        };
        let slot = memory.entry(npu_id).or_insert(None);
        *slot = match (*slot, process.memory_usage_mb) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    let mut chips: HashMap<i32, Vec<NpuMetric>> = HashMap::new();
    for metric in metrics {
        if let Some(npu_id) = metric.npu_id {
            chips.entry(npu_id).or_default().push(metric);
        }
    }

    memory
        .into_iter()
        .map(|(npu_id, memory_usage_mb)| NpuCard {
            npu_id,
            memory_usage_mb,
            metrics: chips.remove(&npu_id).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn make_process(npu_id: Option<i32>, pid: i64, memory: Option<f64>) -> NpuProcess {
        NpuProcess {
            id: pid,
            node_id: Some("n".into()),
            npu_id,
            pid: Some(pid),
            process_name: None,
            memory_usage_mb: memory,
            status: Some("running".into()),
        }
    }

    fn make_metric(npu_id: i32, bus_id: &str) -> NpuMetric {
        NpuMetric {
            id: 0,
            node_id: Some("n".into()),
            npu_id: Some(npu_id),
            name: None,
            health: None,
            power_w: None,
            temp_c: None,
            aicore_usage_percent: Some(50.0),
            memory_usage_mb: None,
            memory_total_mb: None,
            hbm_usage_mb: None,
            hbm_total_mb: None,
            bus_id: Some(bus_id.into()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn cards_are_deduplicated_and_keep_largest_memory() {
        let cards = collect_cards(
            vec![
                make_process(Some(3), 10, Some(100.0)),
                make_process(Some(1), 11, None),
                make_process(Some(3), 12, Some(900.0)),
                make_process(None, 13, Some(5.0)),
            ],
            vec![make_metric(3, "0000:01"), make_metric(3, "0000:02")],
        );
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].npu_id, 1);
        assert_eq!(cards[0].memory_usage_mb, None);
        assert!(cards[0].metrics.is_empty());
        assert_eq!(cards[1].npu_id, 3);
        assert_eq!(cards[1].memory_usage_mb, Some(900.0));
        assert_eq!(cards[1].metrics.len(), 2);
    }
}
