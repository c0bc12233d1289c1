//! # Batch Planning

use shared_types::rpc::MAX_RANGE_BATCH;
use std::ops::Range;

/// Next range to request when the local chain holds `local` blocks and the
/// orderer `remote`. At most `batch_size` blocks, never more than one
/// orderer reply can carry. `None` once caught up.
pub fn next_batch(local: u64, remote: u64, batch_size: u64) -> Option<Range<u64>> {
    if local >= remote {
        return None;
    }
    let batch_size = batch_size.clamp(1, MAX_RANGE_BATCH);
    Some(local..remote.min(local.saturating_add(batch_size)))
}
