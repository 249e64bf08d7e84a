//! Missing-key diff between raw readings and computed outputs.

use std::collections::BTreeSet;
use std::sync::Arc;

use hydrosync_core::WorkItem;

use crate::error::StoreError;
use crate::store::Store;

/// Keys present in `raw` and absent from `outputs`, ascending by
/// (machine_id, cycle_id), each key at most once.
pub fn missing_keys<'a>(
    raw: impl IntoIterator<Item = &'a WorkItem>,
    outputs: &BTreeSet<WorkItem>,
) -> Vec<WorkItem> {
    raw.into_iter()
        .filter(|item| !outputs.contains(item))
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Computes the ordered set of work items for one pass.
///
/// Whatever order the store returns, the result is sorted and de-duplicated
/// here: dispatch order and notification order follow this sequence.
#[derive(Clone)]
pub struct DiffEngine {
    store: Arc<dyn Store>,
}

impl DiffEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn missing(&self) -> Result<Vec<WorkItem>, StoreError> {
        let mut items = self.store.find_missing().await?;
        items.sort_unstable();
        items.dedup();
        Ok(items)
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}
