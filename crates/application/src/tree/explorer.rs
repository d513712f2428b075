use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, warn};

use domain::diagnostic::decode;
use domain::resource::ResourceItem;
use domain::tree::NodeKey;
use domain::{DomainError, ModuleDetails, NodeState, PipelineState, TreeNode};

use super::loader::TreeLoader;
use super::refresh::{RefreshReason, RefreshTarget};

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Vec<TreeNode>>, DomainError>>>;

#[derive(Default)]
struct NodeSlot {
    state: NodeState,
    load_id: u64,
    in_flight: Option<SharedLoad>,
}

struct ListMemo {
    cycle: u64,
    children: Arc<Vec<TreeNode>>,
}

/// Lazily expanded hub hierarchy.
///
/// Concurrent expansions of one node await the same fetch. Resource lists
/// keep their last successful result; it is reused within one refresh cycle
/// and kept across cycles as the last-known view. A refresh drops every load
/// state and optimistic pipeline state.
pub struct ExplorerTree {
    loader: Arc<TreeLoader>,
    slots: DashMap<NodeKey, NodeSlot>,
    memos: DashMap<NodeKey, ListMemo>,
    optimistic: DashMap<String, PipelineState>,
    cycle: AtomicU64,
    next_load_id: AtomicU64,
}

impl ExplorerTree {
    pub fn new(loader: Arc<TreeLoader>) -> Self {
        Self {
            loader,
            slots: DashMap::new(),
            memos: DashMap::new(),
            optimistic: DashMap::new(),
            cycle: AtomicU64::new(0),
            next_load_id: AtomicU64::new(1),
        }
    }

    /// Children of `node`. Never fails: a failed fetch yields one error leaf.
    pub async fn children(&self, node: &TreeNode) -> Vec<TreeNode> {
        if !node.is_expandable() {
            return Vec::new();
        }

        let key = node.key();
        let cycle = self.cycle();

        if node.memoizes_children() {
            if let Some(children) = self.memo_for_cycle(&key, cycle) {
                debug!(node = %key, "Reusing memoized children");
                return self.overlay(&children);
            }
        }

        let (load_id, load) = self.join_or_start(&key, node);
        let result = load.await;
        self.finish(&key, load_id, cycle, node.memoizes_children(), &result);

        match result {
            Ok(children) => self.overlay(&children),
            Err(e) => {
                warn!(node = %key, error = %e, "Failed to load children");
                vec![TreeNode::error_leaf(describe(&e))]
            }
        }
    }

    pub fn state(&self, node: &TreeNode) -> NodeState {
        self.slots
            .get(&node.key())
            .map(|slot| slot.state)
            .unwrap_or_default()
    }

    /// Last successful list for a resource-list node, from any cycle
    pub fn last_known(&self, node: &TreeNode) -> Option<Vec<TreeNode>> {
        self.memos
            .get(&node.key())
            .map(|memo| self.overlay(&memo.children))
    }

    /// Show `state` for one pipeline until the next refresh
    pub fn set_pipeline_state(&self, module: &ModuleDetails, name: &str, state: PipelineState) {
        self.optimistic.insert(pipeline_key(module, name), state);
    }

    pub fn clear_pipeline_state(&self, module: &ModuleDetails, name: &str) {
        self.optimistic.remove(&pipeline_key(module, name));
    }

    pub fn cycle(&self) -> u64 {
        self.cycle.load(Ordering::Acquire)
    }

    fn memo_for_cycle(&self, key: &NodeKey, cycle: u64) -> Option<Arc<Vec<TreeNode>>> {
        self.memos
            .get(key)
            .filter(|memo| memo.cycle == cycle && !memo.children.is_empty())
            .map(|memo| memo.children.clone())
    }

    fn join_or_start(&self, key: &NodeKey, node: &TreeNode) -> (u64, SharedLoad) {
        let mut slot = self.slots.entry(key.clone()).or_default();
        if let Some(in_flight) = &slot.in_flight {
            debug!(node = %key, "Joining in-flight load");
            return (slot.load_id, in_flight.clone());
        }

        if let Ok(loading) = slot.state.to_loading() {
            slot.state = loading;
        }
        slot.load_id = self.next_load_id.fetch_add(1, Ordering::Relaxed);

        let loader = self.loader.clone();
        let node = node.clone();
        let load = async move { loader.load(node).await.map(Arc::new) }
            .boxed()
            .shared();
        slot.in_flight = Some(load.clone());
        (slot.load_id, load)
    }

    /// Settle a load. Every waiter calls this; only the first one for a
    /// given `load_id` has any effect, and a load started before a refresh
    /// never touches the new cycle's state.
    fn finish(
        &self,
        key: &NodeKey,
        load_id: u64,
        cycle: u64,
        memoize: bool,
        result: &Result<Arc<Vec<TreeNode>>, DomainError>,
    ) {
        if let Some(mut slot) = self.slots.get_mut(key) {
            if slot.load_id == load_id && slot.in_flight.is_some() {
                slot.in_flight = None;
                let next = match result {
                    Ok(_) => slot.state.to_loaded(),
                    Err(_) => slot.state.to_failed(),
                };
                if let Ok(next) = next {
                    slot.state = next;
                }
            }
        }

        if let (true, Ok(children)) = (memoize, result) {
            let stale = self
                .memos
                .get(key)
                .is_some_and(|memo| memo.cycle > cycle);
            if !stale {
                self.memos.insert(
                    key.clone(),
                    ListMemo {
                        cycle,
                        children: children.clone(),
                    },
                );
            }
        }
    }

    fn overlay(&self, children: &[TreeNode]) -> Vec<TreeNode> {
        if self.optimistic.is_empty() {
            return children.to_vec();
        }
        children
            .iter()
            .cloned()
            .map(|node| match node {
                TreeNode::ResourceItem {
                    hub,
                    module,
                    item: ResourceItem::LivePipeline(mut pipeline),
                } => {
                    if let Some(state) = self.optimistic.get(&pipeline_key(&module, &pipeline.name)) {
                        pipeline.properties.state = *state;
                    }
                    TreeNode::ResourceItem {
                        hub,
                        module,
                        item: ResourceItem::LivePipeline(pipeline),
                    }
                }
                other => other,
            })
            .collect()
    }
}

impl RefreshTarget for ExplorerTree {
    fn on_refresh(&self, reason: RefreshReason) {
        let cycle = self.cycle.fetch_add(1, Ordering::AcqRel) + 1;
        self.slots.clear();
        self.optimistic.clear();
        debug!(?reason, cycle, "Tree invalidated");
    }
}

fn pipeline_key(module: &ModuleDetails, name: &str) -> String {
    format!("{}/{}", module, name)
}

/// Operator text for a failed load
fn describe(error: &DomainError) -> String {
    match error.remote_error() {
        Some(remote) => decode(remote, None)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
        None => error.to_string(),
    }
}
