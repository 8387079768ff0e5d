// ── Partition refresh application ──
//
// A fetch of one partition yields up to three category lists. Categories
// whose read failed are `None` and keep their cached entries.

use tracing::debug;

use super::RouteStore;
use crate::model::{Category, Partition, RouteKey};

/// Result of reading one partition's three categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionSnapshot {
    pub domain: Option<Vec<String>>,
    pub ip: Option<Vec<String>>,
    pub port: Option<Vec<String>>,
}

impl PartitionSnapshot {
    pub fn set(&mut self, category: Category, entries: Option<Vec<String>>) {
        match category {
            Category::Domain => self.domain = entries,
            Category::Ip => self.ip = entries,
            Category::Port => self.port = entries,
        }
    }
}

impl RouteStore {
    /// Apply a partition read. Returns how many lists actually changed.
    pub(crate) fn apply_partition_snapshot(
        &self,
        partition: Partition,
        snapshot: PartitionSnapshot,
    ) -> usize {
        let PartitionSnapshot { domain, ip, port } = snapshot;
        let mut changed = 0;

        for (category, entries) in [
            (Category::Domain, domain),
            (Category::Ip, ip),
            (Category::Port, port),
        ] {
            let Some(entries) = entries else {
                continue;
            };
            if self.list(RouteKey::new(partition, category)).replace(entries) {
                changed += 1;
            }
        }

        debug!(%partition, changed, "partition refresh applied");
        changed
    }
}
