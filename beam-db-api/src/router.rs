//! Key-routed read layer
//!
//! Reads and checks go to the view that owns the key's partition. The
//! router is what the coordinator and the HTTP handlers see; with one
//! partition it degenerates to the single local view.

use async_trait::async_trait;
use beam_db_core::TxIndex;
use beam_db_log::partition_for_key;
use beam_db_view::{
    CheckResult, FactView, Result as ViewResult, VersionedValue, View, ViewError,
};
use std::sync::Arc;

/// Routes per-key reads to the owning partition's view.
pub struct PartitionRouter {
    views: Vec<Arc<View>>,
}

impl PartitionRouter {
    /// Router over one view per partition, indexed by partition id.
    pub fn new(views: Vec<Arc<View>>) -> Self {
        Self { views }
    }

    /// The view owning `key`
    pub fn view_for_key(&self, key: &[u8]) -> ViewResult<&Arc<View>> {
        let partition = partition_for_key(key, self.views.len() as u32);
        self.views
            .get(partition as usize)
            .ok_or_else(|| ViewError::unavailable(format!("no view for partition {partition}")))
    }

    /// All partition views, in partition order
    pub fn views(&self) -> &[Arc<View>] {
        &self.views
    }
}

#[async_trait]
impl FactView for PartitionRouter {
    async fn fetch(&self, key: &[u8]) -> ViewResult<Option<VersionedValue>> {
        self.view_for_key(key)?.fetch_local(key)
    }

    async fn fetch_at(&self, key: &[u8], at: TxIndex) -> ViewResult<Option<VersionedValue>> {
        self.view_for_key(key)?.fetch_at_local(key, at)
    }

    async fn check(
        &self,
        key: &[u8],
        ref_index: TxIndex,
        tx_index: TxIndex,
    ) -> ViewResult<CheckResult> {
        self.view_for_key(key)?.check_local(key, ref_index, tx_index)
    }
}
