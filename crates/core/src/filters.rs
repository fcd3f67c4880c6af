//! Job list filters and sort keys.
//!
//! Sort keys are whitelisted here so the persistence layer can splice the
//! resulting column names into SQL without ever touching user input.

/// Filters recognised by every job query. An empty list means "no
/// restriction" on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub node_id: Option<String>,
    pub statuses: Vec<String>,
    pub job_types: Vec<String>,
    pub frameworks: Vec<String>,
}

impl JobFilter {
    pub fn is_empty(&self) -> bool {
        self.node_id.is_none()
            && self.statuses.is_empty()
            && self.job_types.is_empty()
            && self.frameworks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    StartTime,
    EndTime,
    UpdatedAt,
    JobName,
    JobType,
    Framework,
    NodeId,
    Status,
}

impl SortKey {
    /// Parse a client-supplied key. Both the snake_case column names and the
    /// camelCase field names used by the web client are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = match raw.trim() {
            "start_time" | "startTime" => Self::StartTime,
            "end_time" | "endTime" => Self::EndTime,
            "updated_at" | "updatedAt" => Self::UpdatedAt,
            "job_name" | "jobName" => Self::JobName,
            "job_type" | "jobType" => Self::JobType,
            "framework" => Self::Framework,
            "node_id" | "nodeId" => Self::NodeId,
            "status" => Self::Status,
            _ => return None,
        };
        Some(key)
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::UpdatedAt => "updated_at",
            Self::JobName => "job_name",
            Self::JobType => "job_type",
            Self::Framework => "framework",
            Self::NodeId => "node_id",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Ordering applied to job queries. Defaults to newest-started first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for JobSort {
    fn default() -> Self {
        Self {
            key: SortKey::StartTime,
            direction: SortDirection::Desc,
        }
    }
}

impl JobSort {
    /// Resolve `sortBy` / `sortOrder` query values.
    ///
    /// An unknown or missing key yields the default ordering regardless of
    /// the requested direction. Only `asc` sorts ascending.
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        let Some(key) = sort_by.and_then(SortKey::parse) else {
            return Self::default();
        };
        let direction = match sort_order {
            Some(order) if order.trim().eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        };
        Self { key, direction }
    }

    /// `ORDER BY` body. `job_id` is appended so equal sort values still page
    /// deterministically.
    pub fn order_by(&self) -> String {
        let dir = self.direction.sql();
        format!("{} {dir}, job_id {dir}", self.key.column())
    }
}
