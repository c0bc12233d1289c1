//! # Outbound Ports
//!
//! The orderer as seen by a syncing peer.

use crate::domain::SyncError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use shared_types::Block;

/// Blocks of one channel in increasing order. Ends on orderer shutdown;
/// errors end the stream too.
pub type BlockStream = BoxStream<'static, Result<Block, SyncError>>;

/// Orderer connection - outbound port.
#[async_trait]
pub trait OrdererConnection: Send + Sync {
    async fn channel_height(&self, channel_id: &str) -> Result<u64, SyncError>;

    /// Half-open `[start, end)`. The orderer may return fewer blocks than
    /// asked for.
    async fn block_range(
        &self,
        channel_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Block>, SyncError>;

    /// Stream blocks from `start`, following new ones.
    async fn open_deliver(&self, channel_id: &str, start: u64) -> Result<BlockStream, SyncError>;

    /// Address used in logs.
    fn endpoint(&self) -> &str;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockOrderer;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use futures::StreamExt;
    use parking_lot::RwLock;
    use shared_types::StatusCode;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    /// In-memory orderer serving pre-built chains.
    pub struct MockOrderer {
        chains: RwLock<HashMap<String, Vec<Block>>>,
        appended: broadcast::Sender<(String, Block)>,
        /// Remaining range/height calls that fail with `Unavailable`.
        fail_calls: AtomicU32,
        /// Remaining deliver streams that break after their first item.
        break_streams: AtomicU32,
        range_calls: AtomicUsize,
        deliver_opens: AtomicUsize,
        /// Most blocks one range reply carries; 0 means no limit.
        reply_cap: AtomicU64,
    }

    impl Default for MockOrderer {
        fn default() -> Self {
            let (appended, _) = broadcast::channel(256);
            Self {
                chains: RwLock::new(HashMap::new()),
                appended,
                fail_calls: AtomicU32::new(0),
                break_streams: AtomicU32::new(0),
                range_calls: AtomicUsize::new(0),
                deliver_opens: AtomicUsize::new(0),
                reply_cap: AtomicU64::new(0),
            }
        }
    }

    impl MockOrderer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Append a block and wake deliver streams.
        pub fn push_block(&self, channel_id: &str, block: Block) {
            self.chains
                .write()
                .entry(channel_id.to_string())
                .or_default()
                .push(block.clone());
            let _ = self.appended.send((channel_id.to_string(), block));
        }

        pub fn fail_next_calls(&self, n: u32) {
            self.fail_calls.store(n, Ordering::SeqCst);
        }

        pub fn break_next_streams(&self, n: u32) {
            self.break_streams.store(n, Ordering::SeqCst);
        }

        /// Answer range requests with at most `n` blocks.
        pub fn cap_range_replies(&self, n: u64) {
            self.reply_cap.store(n, Ordering::SeqCst);
        }

        pub fn range_calls(&self) -> usize {
            self.range_calls.load(Ordering::SeqCst)
        }

        pub fn deliver_opens(&self) -> usize {
            self.deliver_opens.load(Ordering::SeqCst)
        }

        fn take_failure(counter: &AtomicU32) -> bool {
            counter
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn chain_len(&self, channel_id: &str) -> Result<u64, SyncError> {
            self.chains
                .read()
                .get(channel_id)
                .map(|c| c.len() as u64)
                .ok_or_else(|| SyncError::Remote {
                    status: StatusCode::ChannelNotFound,
                    message: channel_id.to_string(),
                })
        }
    }

    #[async_trait]
    impl OrdererConnection for MockOrderer {
        async fn channel_height(&self, channel_id: &str) -> Result<u64, SyncError> {
            if Self::take_failure(&self.fail_calls) {
                return Err(SyncError::Unavailable("mock failure".into()));
            }
            self.chain_len(channel_id)
        }

        async fn block_range(
            &self,
            channel_id: &str,
            start: u64,
            end: u64,
        ) -> Result<Vec<Block>, SyncError> {
            self.range_calls.fetch_add(1, Ordering::SeqCst);
            if Self::take_failure(&self.fail_calls) {
                return Err(SyncError::Unavailable("mock failure".into()));
            }
            let height = self.chain_len(channel_id)?;
            let chains = self.chains.read();
            let chain = chains.get(channel_id).map(Vec::as_slice).unwrap_or_default();
            let mut end = end.min(height);
            let cap = self.reply_cap.load(Ordering::SeqCst);
            if cap > 0 {
                end = end.min(start.saturating_add(cap));
            }
            if start >= end {
                return Ok(Vec::new());
            }
            Ok(chain[start as usize..end as usize].to_vec())
        }

        async fn open_deliver(
            &self,
            channel_id: &str,
            start: u64,
        ) -> Result<BlockStream, SyncError> {
            self.deliver_opens.fetch_add(1, Ordering::SeqCst);
            self.chain_len(channel_id)?;
            let receiver = self.appended.subscribe();
            let backlog: VecDeque<Block> = self
                .chains
                .read()
                .get(channel_id)
                .map(|c| c.iter().skip(start as usize).cloned().collect())
                .unwrap_or_default();
            let breaks = Self::take_failure(&self.break_streams);

            struct State {
                channel_id: String,
                next: u64,
                backlog: VecDeque<Block>,
                receiver: broadcast::Receiver<(String, Block)>,
                breaks: bool,
                yielded: bool,
            }
            let state = State {
                channel_id: channel_id.to_string(),
                next: start,
                backlog,
                receiver,
                breaks,
                yielded: false,
            };

            let stream = futures::stream::unfold(state, |mut s| async move {
                if s.breaks && s.yielded {
                    s.breaks = false;
                    s.backlog.clear();
                    return Some((Err(SyncError::Unavailable("stream reset".into())), s));
                }
                loop {
                    let block = match s.backlog.pop_front() {
                        Some(block) => block,
                        None => match s.receiver.recv().await {
                            Ok((channel, block)) if channel == s.channel_id => block,
                            Ok(_) => continue,
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => return None,
                        },
                    };
                    if block.number() < s.next {
                        continue;
                    }
                    s.next = block.number() + 1;
                    s.yielded = true;
                    return Some((Ok(block), s));
                }
            });
            // A broken stream ends after its error item.
            Ok(stream
                .scan(false, |failed, item| {
                    let stop = *failed;
                    *failed = item.is_err();
                    futures::future::ready(if stop { None } else { Some(item) })
                })
                .boxed())
        }

        fn endpoint(&self) -> &str {
            "mock-orderer"
        }
    }
}
