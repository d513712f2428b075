mod node;
mod state;

pub use node::{NodeKey, TreeNode};
pub use state::NodeState;
