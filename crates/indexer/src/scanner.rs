//! Log scanner acting as the indexing host.
//!
//! Fetches the bank's logs in block chunks, orders them by
//! `(blockNumber, logIndex)`, fills missing block timestamps from headers and
//! hands each log to [`project_log`].

use crate::{project_log, EntityKind, Store};
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, Filter, Log};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, info, warn};

/// Default number of blocks per `eth_getLogs` request.
pub const CHUNK_SIZE: u64 = 9_500;

/// Default number of retries of a failed RPC read.
pub const RETRIES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub from: u64,
    pub to: u64,
    /// Logs fetched in the range
    pub logs: usize,
    /// Logs that produced an entity
    pub projected: usize,
    /// Logs with a topic that is not a bank event
    pub skipped: usize,
    /// Logs rejected by a handler
    pub failed: usize,
    /// Projected entities per kind
    pub by_kind: BTreeMap<EntityKind, usize>,
}

impl ScanSummary {
    pub fn merge(&mut self, other: Self) {
        self.logs += other.logs;
        self.projected += other.projected;
        self.skipped += other.skipped;
        self.failed += other.failed;
        for (kind, count) in other.by_kind {
            *self.by_kind.entry(kind).or_default() += count;
        }
    }
}

pub struct EventScanner<P> {
    provider: P,
    bank: Address,
    chunk_size: u64,
    retries: usize,
}

impl<P> EventScanner<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P, bank: Address) -> Self {
        Self {
            provider,
            bank,
            chunk_size: CHUNK_SIZE,
            retries: RETRIES,
        }
    }

    pub const fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = if chunk_size == 0 { 1 } else { chunk_size };
        self
    }

    pub const fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub const fn bank(&self) -> Address {
        self.bank
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100).take(self.retries)
    }

    pub async fn latest_block(&self) -> eyre::Result<u64> {
        Retry::spawn(self.retry_strategy(), || async {
            self.provider.get_block_number().await.map_err(|e| {
                warn!(error = %e, "Block number read failed, will retry");
                eyre::Report::from(e)
            })
        })
        .await
    }

    /// Project every bank log in `[from, to]` into `store`.
    pub async fn scan<S: Store>(
        &self,
        from: u64,
        to: u64,
        store: &mut S,
    ) -> eyre::Result<ScanSummary> {
        let mut summary = ScanSummary {
            from,
            to,
            ..Default::default()
        };
        if from > to {
            return Ok(summary);
        }

        let mut timestamps = HashMap::new();
        let mut current = from;

        while current <= to {
            let chunk_end = current.saturating_add(self.chunk_size - 1).min(to);

            let mut logs = self.fetch_chunk_with_retry(current, chunk_end).await?;
            sort_logs(&mut logs);
            self.fill_timestamps(&mut logs, &mut timestamps).await?;

            let chunk = project_chunk(&logs, store);
            debug!(
                from = current,
                to = chunk_end,
                logs = chunk.logs,
                projected = chunk.projected,
                "Scanned chunk"
            );
            summary.merge(chunk);

            if chunk_end == u64::MAX {
                break;
            }
            current = chunk_end + 1;
        }

        info!(
            from,
            to,
            logs = summary.logs,
            projected = summary.projected,
            skipped = summary.skipped,
            failed = summary.failed,
            "Scan complete"
        );

        Ok(summary)
    }

    async fn fetch_chunk_with_retry(&self, from_block: u64, to_block: u64) -> eyre::Result<Vec<Log>> {
        Retry::spawn(self.retry_strategy(), || async {
            self.fetch_chunk(from_block, to_block).await.map_err(|e| {
                warn!(
                    from = from_block,
                    to = to_block,
                    error = %e,
                    "Log fetch failed, will retry"
                );
                e
            })
        })
        .await
    }

    async fn fetch_chunk(&self, from_block: u64, to_block: u64) -> eyre::Result<Vec<Log>> {
        let filter = Filter::new()
            .address(self.bank)
            .from_block(from_block)
            .to_block(to_block);

        Ok(self.provider.get_logs(&filter).await?)
    }

    /// Fill `block_timestamp` on logs whose node omitted it.
    async fn fill_timestamps(
        &self,
        logs: &mut [Log],
        cache: &mut HashMap<u64, u64>,
    ) -> eyre::Result<()> {
        for log in logs.iter_mut() {
            if log.block_timestamp.is_some() {
                continue;
            }
            let Some(number) = log.block_number else {
                continue;
            };

            let timestamp = match cache.get(&number) {
                Some(timestamp) => *timestamp,
                None => {
                    let timestamp = self.block_timestamp(number).await?;
                    cache.insert(number, timestamp);
                    timestamp
                }
            };
            log.block_timestamp = Some(timestamp);
        }

        Ok(())
    }

    async fn block_timestamp(&self, number: u64) -> eyre::Result<u64> {
        Retry::spawn(self.retry_strategy(), || async {
            let block = self
                .provider
                .get_block_by_number(BlockNumberOrTag::Number(number))
                .await?;
            match block {
                Some(block) => Ok(block.header.timestamp),
                None => Err(eyre::eyre!("Block {} not found", number)),
            }
        })
        .await
    }
}

/// Order logs as they were emitted on chain.
pub fn sort_logs(logs: &mut [Log]) {
    logs.sort_by_key(|log| (log.block_number, log.log_index));
}

/// Project already-ordered logs, counting outcomes. A failing log is logged
/// and does not stop the rest of the chunk.
pub fn project_chunk<S: Store>(logs: &[Log], store: &mut S) -> ScanSummary {
    let mut summary = ScanSummary {
        logs: logs.len(),
        ..Default::default()
    };

    for log in logs {
        match project_log(log, store) {
            Ok(Some(id)) => {
                summary.projected += 1;
                if let Some(entity) = store.get(&id) {
                    *summary.by_kind.entry(entity.kind()).or_default() += 1;
                }
            }
            Ok(None) => summary.skipped += 1,
            Err(e) => {
                warn!(
                    tx_hash = ?log.transaction_hash,
                    log_index = ?log.log_index,
                    error = %e,
                    "Failed to project log"
                );
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::tests::{deposit_event, rpc_log},
        MemoryStore,
    };
    use alloy_primitives::{LogData, B256, U256, U64};
    use alloy_provider::{mock::Asserter, ProviderBuilder};
    use alloy_rpc_types_eth::Block;
    use binding::bank::ITokenBank;

    fn mocked_scanner(asserter: &Asserter) -> EventScanner<impl Provider + Clone> {
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        EventScanner::new(provider, crate::handler::tests::BANK)
    }

    fn block_at(timestamp: u64) -> Block {
        let mut block: Block = Block::default();
        block.header.inner.timestamp = timestamp;
        block
    }

    #[test]
    fn test_sort_by_block_then_index() {
        let mut logs = vec![
            rpc_log(&deposit_event(), 5, 1, 2),
            rpc_log(&deposit_event(), 3, 2, 7),
            rpc_log(&deposit_event(), 5, 3, 0),
        ];

        sort_logs(&mut logs);

        let order: Vec<_> = logs
            .iter()
            .map(|l| (l.block_number.unwrap(), l.log_index.unwrap()))
            .collect();
        assert_eq!(order, vec![(3, 7), (5, 0), (5, 2)]);
    }

    #[test]
    fn test_project_chunk_counts() {
        let mut store = MemoryStore::default();
        let supported = ITokenBank::TokenSupported {
            token: deposit_event().token,
            tokenCount: U256::from(1),
        };
        let mut unknown = rpc_log(&deposit_event(), 4, 4, 0);
        unknown.inner.data =
            LogData::new_unchecked(vec![B256::repeat_byte(0xEE)], Default::default());
        let mut broken = rpc_log(&deposit_event(), 4, 5, 1);
        broken.block_timestamp = None;

        let logs = vec![
            rpc_log(&supported, 1, 1, 0),
            rpc_log(&deposit_event(), 2, 2, 0),
            unknown,
            broken,
            rpc_log(&deposit_event(), 6, 6, 0),
        ];

        let summary = project_chunk(&logs, &mut store);

        assert_eq!(summary.logs, 5);
        assert_eq!(summary.projected, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.by_kind.get(&EntityKind::Deposit), Some(&2));
        assert_eq!(summary.by_kind.get(&EntityKind::TokenSupported), Some(&1));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_merge_accumulates() {
        let mut total = ScanSummary {
            from: 0,
            to: 100,
            ..Default::default()
        };
        let mut chunk = ScanSummary {
            logs: 2,
            projected: 1,
            failed: 1,
            ..Default::default()
        };
        chunk.by_kind.insert(EntityKind::Withdraw, 1);

        total.merge(chunk.clone());
        total.merge(chunk);

        assert_eq!(total.logs, 4);
        assert_eq!(total.projected, 2);
        assert_eq!(total.failed, 2);
        assert_eq!(total.by_kind.get(&EntityKind::Withdraw), Some(&2));
        assert_eq!((total.from, total.to), (0, 100));
    }

    #[tokio::test]
    async fn test_scan_in_chunks_fills_timestamps() {
        let asserter = Asserter::new();
        let scanner = mocked_scanner(&asserter).with_chunk_size(5);

        let mut first = rpc_log(&deposit_event(), 7, 1, 0);
        first.block_timestamp = None;
        let mut second = rpc_log(&deposit_event(), 7, 2, 1);
        second.block_timestamp = None;

        // blocks 0..=4
        asserter.push_success(&Vec::<Log>::new());
        // blocks 5..=9, delivered out of order
        asserter.push_success(&vec![second, first]);
        // one header read serves both logs of block 7
        asserter.push_success(&block_at(0x4d2));
        asserter.push_success(&U64::from(99));

        let mut store = MemoryStore::default();
        let summary = scanner.scan(0, 9, &mut store).await.unwrap();

        assert_eq!((summary.from, summary.to), (0, 9));
        assert_eq!(summary.logs, 2);
        assert_eq!(summary.projected, 2);
        assert_eq!(summary.failed, 0);

        let entities = store.in_chain_order();
        assert_eq!(entities.len(), 2);
        for entity in entities {
            assert_eq!(entity.meta().block_number, 7);
            assert_eq!(entity.meta().block_timestamp, 1234);
        }

        // Exactly two log requests and one header request were made.
        assert_eq!(scanner.latest_block().await.unwrap(), 99);
    }

    #[tokio::test]
    async fn test_scan_retries_failed_fetch() {
        let asserter = Asserter::new();
        let scanner = mocked_scanner(&asserter).with_retries(1);

        asserter.push_failure_msg("transient");
        asserter.push_success(&vec![rpc_log(&deposit_event(), 3, 1, 0)]);

        let mut store = MemoryStore::default();
        let summary = scanner.scan(0, 9, &mut store).await.unwrap();

        assert_eq!(summary.projected, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_gives_up_after_retries() {
        let asserter = Asserter::new();
        let scanner = mocked_scanner(&asserter).with_retries(1);

        asserter.push_failure_msg("down");
        asserter.push_failure_msg("still down");

        let mut store = MemoryStore::default();
        assert!(scanner.scan(0, 9, &mut store).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_latest_block_retried() {
        let asserter = Asserter::new();
        let scanner = mocked_scanner(&asserter).with_retries(1);

        asserter.push_failure_msg("transient");
        asserter.push_success(&U64::from(42));

        assert_eq!(scanner.latest_block().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_empty_range_makes_no_requests() {
        let asserter = Asserter::new();
        let scanner = mocked_scanner(&asserter);
        asserter.push_success(&U64::from(7));

        let mut store = MemoryStore::default();
        let summary = scanner.scan(5, 4, &mut store).await.unwrap();

        assert_eq!(summary.logs, 0);
        assert_eq!(scanner.latest_block().await.unwrap(), 7);
    }
}
