mod explorer;
mod loader;
mod refresh;

pub use explorer::ExplorerTree;
pub use loader::TreeLoader;
pub use refresh::{RefreshBus, RefreshReason, RefreshTarget};
