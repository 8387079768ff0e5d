// ── Reactive route store ──
//
// In-memory mirror of the backend route rule set, published through
// `watch` channels. Only the route manager writes to it.

mod refresh;
mod route_list;
mod route_store;

pub use refresh::PartitionSnapshot;
pub use route_store::RouteStore;
