//! Range-coalescing block cache.
//!
//! Object stores charge per request, not per byte: the win is turning
//! thousands of small metadata and chunk reads into a handful of large
//! aligned range-GETs. The cache maps `block_index -> bytes` for
//! fixed-size aligned blocks; a logical read spanning several missing
//! blocks fetches each contiguous miss run with a single physical read,
//! while hits flanking the run are served from cache. Eviction is LRU
//! under a byte budget; blocks are handed out as `Arc`s, so a reader
//! that is still decoding keeps its bytes alive across an eviction.
//! Concurrent misses of one block are single-flighted through an
//! in-flight marker and a condvar.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use cloudhdf5_format::error::FormatError;
use cloudhdf5_format::source::ByteSource;

use crate::driver::{Driver, DriverError};

/// Default block size: large enough to amortize object-storage
/// first-byte latency.
pub const DEFAULT_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Default total byte budget for cached blocks.
pub const DEFAULT_CACHE_BUDGET: usize = 1024 * 1024 * 1024;

enum Slot {
    Ready { data: Arc<Vec<u8>>, last_access: u64 },
    /// A fetch for this block is in flight on another caller.
    Pending,
}

struct CacheInner {
    blocks: HashMap<u64, Slot>,
    cached_bytes: usize,
    tick: u64,
}

/// A block cache layered over a [`Driver`].
pub struct BlockCache {
    driver: Box<dyn Driver>,
    block_size: u64,
    budget: usize,
    source_len: u64,
    inner: Mutex<CacheInner>,
    filled: Condvar,
    physical_reads: AtomicU64,
}

impl BlockCache {
    /// Wrap a driver with the default block size and budget.
    pub fn new(driver: Box<dyn Driver>) -> Result<Self, DriverError> {
        Self::with_config(driver, DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_BUDGET)
    }

    /// Wrap a driver with an explicit block size and byte budget.
    pub fn with_config(
        driver: Box<dyn Driver>,
        block_size: u64,
        budget: usize,
    ) -> Result<Self, DriverError> {
        assert!(block_size > 0, "block size must be non-zero");
        let source_len = driver.size()?;
        Ok(Self {
            driver,
            block_size,
            budget,
            source_len,
            inner: Mutex::new(CacheInner {
                blocks: HashMap::new(),
                cached_bytes: 0,
                tick: 0,
            }),
            filled: Condvar::new(),
            physical_reads: AtomicU64::new(0),
        })
    }

    /// Total length of the underlying source.
    pub fn source_len(&self) -> u64 {
        self.source_len
    }

    /// Number of physical driver reads issued so far.
    pub fn physical_reads(&self) -> u64 {
        self.physical_reads.load(Ordering::Relaxed)
    }

    /// Number of blocks currently resident.
    pub fn cached_blocks(&self) -> usize {
        let inner = self.inner.lock().expect("block cache mutex poisoned");
        inner
            .blocks
            .values()
            .filter(|s| matches!(s, Slot::Ready { .. }))
            .count()
    }

    /// Total bytes currently resident.
    pub fn cached_bytes(&self) -> usize {
        self.inner
            .lock()
            .expect("block cache mutex poisoned")
            .cached_bytes
    }

    /// Byte length of block `index`, accounting for the partial tail.
    fn block_len(&self, index: u64) -> usize {
        let start = index * self.block_size;
        (self.source_len - start).min(self.block_size) as usize
    }

    /// Read exactly `length` bytes at `offset` through the cache.
    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, DriverError> {
        if length == 0 {
            return Ok(Vec::new());
        }
        let end = offset + length as u64;
        if end > self.source_len {
            return Err(DriverError::OutOfRange {
                expected: end,
                available: self.source_len,
            });
        }

        let first = offset / self.block_size;
        let last = (end - 1) / self.block_size;
        let mut held: HashMap<u64, Arc<Vec<u8>>> = HashMap::new();

        loop {
            let mut runs: Vec<(u64, u64)> = Vec::new();
            let mut any_pending = false;

            {
                let mut inner = self.inner.lock().expect("block cache mutex poisoned");
                inner.tick += 1;
                let tick = inner.tick;

                for index in first..=last {
                    if held.contains_key(&index) {
                        continue;
                    }
                    match inner.blocks.get_mut(&index) {
                        Some(Slot::Ready { data, last_access }) => {
                            *last_access = tick;
                            held.insert(index, Arc::clone(data));
                        }
                        Some(Slot::Pending) => any_pending = true,
                        None => match runs.last_mut() {
                            Some((_, run_end)) if *run_end + 1 == index => *run_end = index,
                            _ => runs.push((index, index)),
                        },
                    }
                }

                if runs.is_empty() && any_pending {
                    let _guard = self
                        .filled
                        .wait(inner)
                        .expect("block cache condvar poisoned");
                    continue;
                }

                // claim the miss runs before releasing the lock
                for &(run_start, run_end) in &runs {
                    for index in run_start..=run_end {
                        inner.blocks.insert(index, Slot::Pending);
                    }
                }
            }

            if runs.is_empty() {
                break;
            }

            for (pos, &(run_start, run_end)) in runs.iter().enumerate() {
                match self.fetch_run(run_start, run_end) {
                    Ok(fetched) => {
                        let mut inner =
                            self.inner.lock().expect("block cache mutex poisoned");
                        inner.tick += 1;
                        let tick = inner.tick;
                        for (index, data) in fetched {
                            inner.cached_bytes += data.len();
                            held.insert(index, Arc::clone(&data));
                            inner.blocks.insert(
                                index,
                                Slot::Ready {
                                    data,
                                    last_access: tick,
                                },
                            );
                        }
                        Self::evict(&mut inner, self.budget);
                        self.filled.notify_all();
                    }
                    Err(e) => {
                        // release every claim this call still holds, or
                        // other waiters would block on them forever
                        let mut inner =
                            self.inner.lock().expect("block cache mutex poisoned");
                        for &(claimed_start, claimed_end) in &runs[pos..] {
                            for index in claimed_start..=claimed_end {
                                if matches!(inner.blocks.get(&index), Some(Slot::Pending)) {
                                    inner.blocks.remove(&index);
                                }
                            }
                        }
                        self.filled.notify_all();
                        return Err(e);
                    }
                }
            }
        }

        // assemble the logical range from the held blocks
        let mut out = Vec::with_capacity(length);
        for index in first..=last {
            let data = &held[&index];
            let block_start = index * self.block_size;
            let from = offset.max(block_start) - block_start;
            let to = end.min(block_start + data.len() as u64) - block_start;
            out.extend_from_slice(&data[from as usize..to as usize]);
        }
        debug_assert_eq!(out.len(), length);
        Ok(out)
    }

    /// One physical read covering a contiguous run of missing blocks.
    fn fetch_run(
        &self,
        run_start: u64,
        run_end: u64,
    ) -> Result<Vec<(u64, Arc<Vec<u8>>)>, DriverError> {
        let start = run_start * self.block_size;
        let len = (run_end + 1 - run_start) * self.block_size;
        let len = len.min(self.source_len - start) as usize;

        log::debug!(
            "block cache miss: blocks {run_start}..={run_end}, fetching {len} bytes at {start}"
        );
        let bytes = self.driver.read(start, len)?;
        if bytes.len() != len {
            return Err(DriverError::ShortRead {
                expected: len,
                actual: bytes.len(),
            });
        }
        self.physical_reads.fetch_add(1, Ordering::Relaxed);

        let mut out = Vec::with_capacity((run_end + 1 - run_start) as usize);
        for index in run_start..=run_end {
            let from = ((index - run_start) * self.block_size) as usize;
            let to = (from + self.block_len(index)).min(bytes.len());
            out.push((index, Arc::new(bytes[from..to].to_vec())));
        }
        Ok(out)
    }

    /// Evict least-recently-used ready blocks until within budget.
    fn evict(inner: &mut CacheInner, budget: usize) {
        while inner.cached_bytes > budget {
            let lru = inner
                .blocks
                .iter()
                .filter_map(|(&index, slot)| match slot {
                    Slot::Ready { last_access, .. } => Some((index, *last_access)),
                    Slot::Pending => None,
                })
                .min_by_key(|&(_, access)| access)
                .map(|(index, _)| index);
            match lru {
                Some(index) => {
                    if let Some(Slot::Ready { data, .. }) = inner.blocks.remove(&index) {
                        inner.cached_bytes -= data.len();
                    }
                }
                None => break,
            }
        }
    }
}

impl ByteSource for BlockCache {
    fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, FormatError> {
        BlockCache::read(self, offset, length).map_err(|e| match e {
            DriverError::OutOfRange {
                expected,
                available,
            } => FormatError::UnexpectedEof {
                expected,
                available,
            },
            other => FormatError::Io {
                detail: other.to_string(),
            },
        })
    }

    fn len(&self) -> u64 {
        self.source_len
    }
}
