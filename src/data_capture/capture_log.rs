use std::sync::{Mutex, MutexGuard};

use log::trace;

use super::types::CaptureRecord;

/// Append-only log of capture records shared by every listener of a session.
///
/// Appends are serialized by a mutex, so concurrent listeners never lose, duplicate or tear
/// records. Order across listeners follows lock acquisition; order within one listener
/// follows its own arrival order.
#[derive(Debug, Default)]
pub struct CaptureLog {
    records: Mutex<Vec<CaptureRecord>>,
}

impl CaptureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` and returns the log length afterwards.
    pub fn append(&self, record: CaptureRecord) -> usize {
        let mut records = self.lock();
        records.push(record);
        trace!("capture log now holds {} record(s)", records.len());
        records.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn notable_count(&self) -> usize {
        self.lock().iter().filter(|r| r.is_notable).count()
    }

    /// Copy of the records in append order.
    pub fn snapshot(&self) -> Vec<CaptureRecord> {
        self.lock().clone()
    }

    // A panic while holding the lock cannot leave a half-pushed record behind, so the data
    // is still consistent after poisoning.
    fn lock(&self) -> MutexGuard<'_, Vec<CaptureRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_capture::classifier::classify;
    use crate::data_capture::signature_catalog::SignatureCatalog;
    use crate::data_capture::types::Endpoint;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn record_from(port: u16, payload: &[u8]) -> CaptureRecord {
        classify(
            payload,
            Endpoint::new("10.1.1.1", port),
            Endpoint::local(8000),
            &SignatureCatalog::default(),
        )
    }

    #[test]
    fn test_append_preserves_order() {
        let log = CaptureLog::new();
        assert!(log.is_empty());

        assert_eq!(log.append(record_from(1, b"LOGIN")), 1);
        assert_eq!(log.append(record_from(2, b"nothing")), 2);

        let records = log.snapshot();
        assert_eq!(records[0].source.port, 1);
        assert_eq!(records[1].source.port, 2);
        assert_eq!(log.notable_count(), 1);
    }

    #[test]
    fn test_concurrent_threads_append_exactly_once() {
        const WRITERS: u16 = 64;
        let log = Arc::new(CaptureLog::new());

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    log.append(record_from(10_000 + i, b"MATCH data"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = log.snapshot();
        assert_eq!(records.len(), WRITERS as usize);
        let ports: HashSet<u16> = records.iter().map(|r| r.source.port).collect();
        assert_eq!(ports.len(), WRITERS as usize);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_append_exactly_once() {
        let log = Arc::new(CaptureLog::new());
        let mut set = tokio::task::JoinSet::new();

        for listener in 0..8u16 {
            let log = Arc::clone(&log);
            set.spawn(async move {
                for n in 0..25u16 {
                    log.append(record_from(listener * 100 + n, b"P2P"));
                    tokio::task::yield_now().await;
                }
            });
        }
        while let Some(res) = set.join_next().await {
            res.unwrap();
        }

        let records = log.snapshot();
        assert_eq!(records.len(), 200);
        let ports: HashSet<u16> = records.iter().map(|r| r.source.port).collect();
        assert_eq!(ports.len(), 200);

        // per-listener order is kept
        for listener in 0..8u16 {
            let own: Vec<u16> = records
                .iter()
                .map(|r| r.source.port)
                .filter(|p| p / 100 == listener)
                .collect();
            let mut sorted = own.clone();
            sorted.sort_unstable();
            assert_eq!(own, sorted);
        }
    }
}
