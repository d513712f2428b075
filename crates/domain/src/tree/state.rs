use serde::{Deserialize, Serialize};

/// Load state of one tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeState {
    /// Never expanded, or invalidated by a refresh
    #[default]
    Collapsed,
    /// A children fetch is in flight
    Loading,
    /// Last fetch succeeded
    Loaded,
    /// Last fetch failed; children are a single error leaf
    LoadFailed,
}

impl NodeState {
    /// Transition to loading state
    pub fn to_loading(&self) -> Result<Self, &'static str> {
        match self {
            Self::Loading => Err("Node is already loading"),
            _ => Ok(Self::Loading),
        }
    }

    /// Transition to loaded state
    pub fn to_loaded(&self) -> Result<Self, &'static str> {
        match self {
            Self::Loading => Ok(Self::Loaded),
            _ => Err("Can only finish loading from Loading state"),
        }
    }

    /// Transition to failed state
    pub fn to_failed(&self) -> Result<Self, &'static str> {
        match self {
            Self::Loading => Ok(Self::LoadFailed),
            _ => Err("Can only fail loading from Loading state"),
        }
    }
}
