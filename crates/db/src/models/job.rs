//! Observed process rows and the job detail view built from them.

use npuwatch_core::grouping::ProcessNode;
use npuwatch_core::prompt::{JobFacts, RelatedProcess};
use npuwatch_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

use crate::models::npu::NpuCard;

/// A row from the `jobs` table: one process seen by a collector.
///
/// `ppid` refers to another row's `pid` by value only; there is no foreign
/// key, and the parent may never have been observed.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub node_id: Option<String>,
    pub host_id: Option<String>,
    pub job_name: Option<String>,
    pub job_type: Option<String>,
    pub pid: Option<i64>,
    pub ppid: Option<i64>,
    pub pgid: Option<i64>,
    pub process_name: Option<String>,
    pub command_line: Option<String>,
    pub framework: Option<String>,
    pub model_format: Option<String>,
    pub status: Option<String>,
    /// Epoch seconds.
    pub start_time: Option<i64>,
    /// Epoch seconds.
    pub end_time: Option<i64>,
    pub cwd: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

impl ProcessNode for Job {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    fn pid(&self) -> Option<i64> {
        self.pid
    }

    fn ppid(&self) -> Option<i64> {
        self.ppid
    }

    fn start_time(&self) -> Option<i64> {
        self.start_time
    }
}

impl From<&Job> for JobFacts {
    fn from(job: &Job) -> Self {
        JobFacts {
            job_id: job.job_id.clone(),
            job_name: job.job_name.clone(),
            job_type: job.job_type.clone(),
            framework: job.framework.clone(),
            status: job.status.clone(),
            process_name: job.process_name.clone(),
            command_line: job.command_line.clone(),
            cwd: job.cwd.clone(),
            node_id: job.node_id.clone(),
            pid: job.pid,
            start_time: job.start_time,
            end_time: job.end_time,
        }
    }
}

impl From<&Job> for RelatedProcess {
    fn from(job: &Job) -> Self {
        RelatedProcess {
            pid: job.pid,
            process_name: job.process_name.clone(),
        }
    }
}

/// A job with the cards its process tree occupies and the other members of
/// that tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub job: Job,
    pub npu_cards: Vec<NpuCard>,
    pub related_jobs: Vec<Job>,
}
