//! Parallel step scheduling
//!
//! A fixed rayon pool of `worker_count` threads is built once and reused
//! for every step. `next` is cut into chunks of [`CLAIM_CHUNK`] bodies.
//! Within a step each worker repeatedly claims the next unclaimed chunk
//! from a shared [`IndexSupply`] and writes the kernel result for every body
//! of that chunk straight into its slot of `next`, until the supply is
//! exhausted. [`StepScheduler::run_step`] returns only after every worker
//! has finished its last claim.

use crate::engine::{Body, BodyStore};
use crate::error::{Result, SimError};
use crate::integrator::{advance_body, Physics};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Bodies handed to a worker per claim
pub const CLAIM_CHUNK: usize = 64;

/// Exhaustible supply of the indices `0..len`
///
/// Concurrent claims never observe the same index twice, and every index is
/// handed out exactly once before `claim` starts returning `None`.
#[derive(Debug)]
pub struct IndexSupply {
    next: AtomicUsize,
    len: usize,
}

impl IndexSupply {
    pub fn new(len: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            len,
        }
    }

    pub fn claim(&self) -> Option<usize> {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        (i < self.len).then_some(i)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Drives one synchronized kernel pass over all bodies
pub struct StepScheduler {
    pool: ThreadPool,
    physics: Physics,
    worker_count: usize,
}

impl StepScheduler {
    pub fn new(worker_count: usize, physics: Physics) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .thread_name(|i| format!("gravsim-worker-{i}"))
            .build()?;

        Ok(Self {
            pool,
            physics,
            worker_count,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Advance every body of `current` by one step into `next`
    ///
    /// Workers only read `current`. Each chunk of `next` is owned by the one
    /// worker that claimed it, so every `next[i]` is written exactly once
    /// and by a worker. A panicking worker unwinds through this call and
    /// takes the run down with it. A step that did not produce exactly one
    /// result per body is reported as [`SimError::IncompleteStep`] and
    /// `next` must not be promoted.
    pub fn run_step(&mut self, step: u64, current: &[Body], next: &mut [Body]) -> Result<()> {
        let n = current.len();
        if next.len() != n {
            return Err(SimError::IncompleteStep {
                step,
                expected: n,
                computed: next.len(),
            });
        }

        let slots: Vec<Mutex<Option<&mut [Body]>>> = next
            .chunks_mut(CLAIM_CHUNK)
            .map(|chunk| Mutex::new(Some(chunk)))
            .collect();
        let supply = IndexSupply::new(slots.len());
        let computed = AtomicUsize::new(0);
        let physics = self.physics;

        self.pool.scope(|s| {
            for _ in 0..self.worker_count {
                s.spawn(|_| {
                    while let Some(c) = supply.claim() {
                        let Some(chunk) = slots[c].lock().ok().and_then(|mut slot| slot.take())
                        else {
                            continue;
                        };
                        let base = c * CLAIM_CHUNK;
                        for (k, body) in chunk.iter_mut().enumerate() {
                            *body = advance_body(current, base + k, &physics);
                        }
                        computed.fetch_add(chunk.len(), Ordering::Relaxed);
                    }
                });
            }
        });

        let computed = computed.into_inner();
        if computed != n {
            return Err(SimError::IncompleteStep {
                step,
                expected: n,
                computed,
            });
        }
        Ok(())
    }

    /// Run one step on `store` and swap its buffers
    pub fn advance(&mut self, store: &mut BodyStore) -> Result<()> {
        let step = store.step();
        let (current, next) = store.buffers();
        self.run_step(step, current, next)?;
        store.swap();
        Ok(())
    }
}
