// ── Route table vocabulary ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

/// One of the two route-rule sets held by the tunneling engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Partition {
    Blacklist,
    Whitelist,
}

/// The kind of value a route rule matches.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Domain,
    Ip,
    Port,
}

/// Route mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RouteAction {
    Add,
    Delete,
}

/// A (partition, category) cell of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub partition: Partition,
    pub category: Category,
}

impl RouteKey {
    pub const fn new(partition: Partition, category: Category) -> Self {
        Self {
            partition,
            category,
        }
    }

    /// Every cell, blacklist first, in category order.
    pub fn all() -> impl Iterator<Item = Self> {
        Partition::iter().flat_map(|partition| {
            Category::iter().map(move |category| Self::new(partition, category))
        })
    }

    /// Dense index into a six-slot table.
    pub(crate) const fn slot(self) -> usize {
        let row = match self.partition {
            Partition::Blacklist => 0,
            Partition::Whitelist => 3,
        };
        let col = match self.category {
            Category::Domain => 0,
            Category::Ip => 1,
            Category::Port => 2,
        };
        row + col
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.partition, self.category)
    }
}
