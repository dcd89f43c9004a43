//! Reuse pools for codec streams.
//!
//! Pools are keyed by `(encoding, level)` and provisioned once, for the levels returned by
//! [`Encoding::pooled_levels`]. The table itself is never mutated afterwards; each pool guards
//! its idle streams with its own mutex, so concurrent requests only contend on the pool they
//! actually use.

use crate::codec::{CodecStream, new_stream};
use crate::encoding::Encoding;
use crate::error::CodecError;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

/// Identifies one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub encoding: Encoding,
    pub level: i32,
}

impl PoolKey {
    pub fn new(encoding: Encoding, level: i32) -> Self {
        Self { encoding, level }
    }
}

#[derive(Debug, Default)]
struct Pool {
    idle: Mutex<Vec<Box<dyn CodecStream>>>,
}

impl Pool {
    fn idle(&self) -> MutexGuard<'_, Vec<Box<dyn CodecStream>>> {
        // a panic while holding the lock cannot leave the vec half-updated
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Hands out codec streams, reusing idle ones where a pool exists.
///
/// The acquirer owns a stream exclusively until it gives it back through
/// [`release`](CodecPools::release); pools only ever hold streams nobody else references.
#[derive(Debug)]
pub struct CodecPools {
    pools: HashMap<PoolKey, Pool>,
}

static GLOBAL_POOLS: Lazy<Arc<CodecPools>> = Lazy::new(|| Arc::new(CodecPools::new()));

impl CodecPools {
    /// Creates empty pools for every encoding's common levels.
    pub fn new() -> Self {
        let pools = Encoding::ALL
            .into_iter()
            .flat_map(|encoding| encoding.pooled_levels().iter().map(move |level| PoolKey::new(encoding, *level)))
            .map(|key| (key, Pool::default()))
            .collect();
        Self { pools }
    }

    /// Returns the process wide pools.
    pub fn global() -> Arc<CodecPools> {
        Arc::clone(&GLOBAL_POOLS)
    }

    /// Whether streams of this encoding and level are ever pooled.
    pub fn is_pooled(&self, encoding: Encoding, level: i32) -> bool {
        self.pools.contains_key(&PoolKey::new(encoding, level))
    }

    /// Number of idle streams waiting in the pool of `(encoding, level)`.
    pub fn idle_count(&self, encoding: Encoding, level: i32) -> usize {
        self.pools.get(&PoolKey::new(encoding, level)).map_or(0, |pool| pool.idle().len())
    }

    /// Acquires a stream ready to compress a new response.
    ///
    /// With `pool_enabled` and a provisioned pool an idle stream is reset and reused, otherwise
    /// a new stream is built. Streams for unpooled levels are always built fresh.
    pub fn acquire(&self, encoding: Encoding, level: i32, pool_enabled: bool) -> Result<Box<dyn CodecStream>, CodecError> {
        let pool = if pool_enabled { self.pools.get(&PoolKey::new(encoding, level)) } else { None };

        if let Some(pool) = pool {
            // bind the popped stream first so the lock is released before the reset
            let idle = pool.idle().pop();
            if let Some(mut stream) = idle {
                match stream.reset() {
                    Ok(()) => {
                        trace!(%encoding, level, "reuse pooled codec stream");
                        return Ok(stream);
                    }
                    Err(e) => {
                        warn!(%encoding, level, cause = %e, "failed to reset pooled codec stream, creating a new one");
                    }
                }
            }
        }

        trace!(%encoding, level, pooled = pool.is_some(), "create codec stream");
        new_stream(encoding, level)
    }

    /// Gives a stream back once its response is done.
    ///
    /// The stream is kept only when `pool_enabled` and its `(encoding, level)` has a pool;
    /// everything else is dropped here.
    pub fn release(&self, stream: Box<dyn CodecStream>, pool_enabled: bool) {
        if !pool_enabled {
            return;
        }
        let key = PoolKey::new(stream.encoding(), stream.level());
        if let Some(pool) = self.pools.get(&key) {
            pool.idle().push(stream);
        }
    }
}

impl Default for CodecPools {
    fn default() -> Self {
        Self::new()
    }
}
