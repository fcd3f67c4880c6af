//! Job group builder.
//!
//! Collectors report every observed process as its own job row. Operators
//! want to see logical jobs, so rows are folded into process trees by
//! following `ppid -> pid` links within a node (union-find with path
//! compression), then annotated with the number of NPU cards the tree
//! occupies.
//!
//! The builder is generic over [`ProcessNode`] so it can be exercised with
//! plain test structs and fed database rows in production.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

/// The fields of an observed process the builder needs.
pub trait ProcessNode {
    fn job_id(&self) -> &str;
    fn node_id(&self) -> Option<&str>;
    fn pid(&self) -> Option<i64>;
    fn ppid(&self) -> Option<i64>;
    /// Epoch seconds.
    fn start_time(&self) -> Option<i64>;
}

/// One process tree: the representative job plus every other member.
///
/// `card_count` is `None` when no running NPU occupancy exists for any
/// member (reported to clients as `null`, filtered as `0`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobGroup<T> {
    pub main_job: T,
    pub child_jobs: Vec<T>,
    pub card_count: Option<i64>,
}

impl<T: ProcessNode> JobGroup<T> {
    pub fn members(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.main_job).chain(self.child_jobs.iter())
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.members().any(|job| job.job_id() == job_id)
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Fold a flat job list into process-tree groups.
///
/// Output order is the discovery order of each tree (the position of its
/// first member in `jobs`). Jobs without a pid cannot take part in a tree and
/// are appended as singleton groups in input order. Card counts are left
/// unset; see [`assign_card_counts`].
pub fn build_groups<T: ProcessNode>(jobs: Vec<T>) -> Vec<JobGroup<T>> {
    let layouts = plan_groups(&jobs);
    let mut slots: Vec<Option<T>> = jobs.into_iter().map(Some).collect();

    layouts
        .into_iter()
        .filter_map(|layout| {
            let main_job = slots[layout.main].take()?;
            let child_jobs = layout
                .children
                .iter()
                .filter_map(|&idx| slots[idx].take())
                .collect();
            Some(JobGroup {
                main_job,
                child_jobs,
                card_count: None,
            })
        })
        .collect()
}

/// Group membership expressed as indexes into the input slice.
struct GroupLayout {
    main: usize,
    children: Vec<usize>,
}

/// Processes are only linked within a node. A missing node id is a value of
/// its own, so two untagged rows can still be linked.
type ProcessKey<'a> = (Option<&'a str>, i64);

fn plan_groups<T: ProcessNode>(jobs: &[T]) -> Vec<GroupLayout> {
    let mut index: HashMap<ProcessKey<'_>, Vec<usize>> = HashMap::new();
    for (idx, job) in jobs.iter().enumerate() {
        if let Some(pid) = job.pid() {
            index.entry((job.node_id(), pid)).or_default().push(idx);
        }
    }

    let mut sets = DisjointSet::new(jobs.len());
    for (idx, job) in jobs.iter().enumerate() {
        let (Some(_), Some(ppid)) = (job.pid(), job.ppid()) else {
            continue;
        };
        let Some(candidates) = index.get(&(job.node_id(), ppid)) else {
            continue;
        };
        if let Some(parent) = choose_parent(jobs, candidates, idx) {
            sets.union(idx, parent);
        }
    }

    let mut roots = Vec::new();
    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut pidless = Vec::new();
    for (idx, job) in jobs.iter().enumerate() {
        if job.pid().is_none() {
            pidless.push(idx);
            continue;
        }
        let root = sets.find(idx);
        members
            .entry(root)
            .or_insert_with(|| {
                roots.push(root);
                Vec::new()
            })
            .push(idx);
    }

    let mut layouts: Vec<GroupLayout> = roots
        .into_iter()
        .filter_map(|root| members.remove(&root))
        .map(|group| {
            let main = select_main(jobs, &group);
            let children = group.into_iter().filter(|&idx| idx != main).collect();
            GroupLayout { main, children }
        })
        .collect();

    layouts.extend(pidless.into_iter().map(|idx| GroupLayout {
        main: idx,
        children: Vec::new(),
    }));
    layouts
}

/// Pick the parent among every job on the node that carries the child's
/// `ppid`. Pids get recycled, so prefer the candidate that started closest
/// before the child, then the closest one after it, then one without a start
/// time. Remaining ties go to the earliest row.
fn choose_parent<T: ProcessNode>(jobs: &[T], candidates: &[usize], child: usize) -> Option<usize> {
    let child_start = jobs[child].start_time();
    candidates
        .iter()
        .copied()
        .filter(|&idx| idx != child)
        .min_by_key(|&idx| {
            let (rank, gap) = match (child_start, jobs[idx].start_time()) {
                (Some(c), Some(p)) if p <= c => (0u8, c.abs_diff(p)),
                (Some(c), Some(p)) => (1, c.abs_diff(p)),
                _ => (2, 0),
            };
            (rank, gap, idx)
        })
}

/// A member is root-like when its parent is not part of the group. The
/// earliest-starting root-like member wins (missing start times last, then
/// `job_id`). A group without any root-like member falls back to its first
/// row.
fn select_main<T: ProcessNode>(jobs: &[T], group: &[usize]) -> usize {
    let pids: HashSet<i64> = group.iter().filter_map(|&idx| jobs[idx].pid()).collect();
    group
        .iter()
        .copied()
        .filter(|&idx| !matches!(jobs[idx].ppid(), Some(ppid) if pids.contains(&ppid)))
        .min_by(|&a, &b| main_order(&jobs[a], &jobs[b]))
        // Groups are never empty: each is created with its first member.
        .unwrap_or(group[0])
}

fn main_order<T: ProcessNode>(a: &T, b: &T) -> Ordering {
    let by_start = match (a.start_time(), b.start_time()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_start.then_with(|| a.job_id().cmp(b.job_id()))
}

/// Union-find over row indexes.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, idx: usize) -> usize {
        let mut root = idx;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = idx;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Attach the child's tree under the parent's tree.
    fn union(&mut self, child: usize, parent: usize) {
        let child_root = self.find(child);
        let parent_root = self.find(parent);
        if child_root != parent_root {
            self.parent[child_root] = parent_root;
        }
    }
}

// ---------------------------------------------------------------------------
// Card counts
// ---------------------------------------------------------------------------

/// Running NPU occupancy, `node_id -> pid -> npu ids`.
#[derive(Debug, Clone, Default)]
pub struct CardOccupancy {
    by_node: HashMap<String, HashMap<i64, BTreeSet<i32>>>,
}

impl CardOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_id: &str, pid: i64, npu_id: i32) {
        self.by_node
            .entry(node_id.to_string())
            .or_default()
            .entry(pid)
            .or_default()
            .insert(npu_id);
    }

    /// Merge a per-node `pid -> npu ids` mapping as returned by the database.
    pub fn extend_node(&mut self, node_id: &str, cards: HashMap<i64, BTreeSet<i32>>) {
        let node = self.by_node.entry(node_id.to_string()).or_default();
        for (pid, npus) in cards {
            node.entry(pid).or_default().extend(npus);
        }
    }

    pub fn cards_for(&self, node_id: Option<&str>, pid: i64) -> Option<&BTreeSet<i32>> {
        self.by_node.get(node_id?)?.get(&pid)
    }
}

/// Deduplicated member pids per node, ready for one batched lookup per node.
/// Members without a node id are skipped since card rows are node-scoped.
pub fn pids_by_node<T: ProcessNode>(groups: &[JobGroup<T>]) -> BTreeMap<String, Vec<i64>> {
    let mut by_node: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
    for job in groups.iter().flat_map(JobGroup::members) {
        if let (Some(node_id), Some(pid)) = (job.node_id(), job.pid()) {
            by_node.entry(node_id.to_string()).or_default().insert(pid);
        }
    }
    by_node
        .into_iter()
        .map(|(node, pids)| (node, pids.into_iter().collect()))
        .collect()
}

/// Cardinality of the union of NPU ids held by any member, `None` if empty.
pub fn card_count<T: ProcessNode>(group: &JobGroup<T>, occupancy: &CardOccupancy) -> Option<i64> {
    let cards: BTreeSet<i32> = group
        .members()
        .filter_map(|job| occupancy.cards_for(job.node_id(), job.pid()?))
        .flatten()
        .copied()
        .collect();
    if cards.is_empty() {
        None
    } else {
        i64::try_from(cards.len()).ok()
    }
}

pub fn assign_card_counts<T: ProcessNode>(groups: &mut [JobGroup<T>], occupancy: &CardOccupancy) {
    for group in groups.iter_mut() {
        group.card_count = card_count(group, occupancy);
    }
}

/// Keep groups whose card count is listed in `targets`; `0` selects groups
/// with an unknown count. An empty target list keeps everything.
pub fn filter_by_card_counts<T>(groups: Vec<JobGroup<T>>, targets: &[i64]) -> Vec<JobGroup<T>> {
    if targets.is_empty() {
        return groups;
    }
    groups
        .into_iter()
        .filter(|group| {
            let count = group.card_count.unwrap_or(0);
            targets.contains(&count)
        })
        .collect()
}

/// Ascending unique known card counts.
pub fn distinct_card_counts<T>(groups: &[JobGroup<T>]) -> Vec<i64> {
    groups
        .iter()
        .filter_map(|group| group.card_count)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
