//! Asynchronous Pipeline Build Cache
//!
//! Parallelizes pipeline compilation over a fixed set of compiler instances
//! that are individually not thread-safe.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PipelineBuildCache<C>                    │
//! │                                                              │
//! │  slots: [BuildSlot<C>; N]   each = Mutex<C>                  │
//! │  next_slot: AtomicU64       slot = fetch_add(1) % N          │
//! │  work_queue: WorkQueue      FIFO of build jobs               │
//! │  log: Arc<dyn LogSink>      one call per failed build        │
//! │                                                              │
//! │  request_pipeline()  → queued, returns AsyncPipelineHandle   │
//! │  add_virtual_file()  → synchronous broadcast, every slot     │
//! │  reload_all()        → synchronous broadcast, fail-fast      │
//! │  remove_pipeline()   → synchronous, owning slot only         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Slot selection finishes before the slot lock is taken, so a burst of
//! requests queues on slot locks rather than on the counter. Builds on the
//! same slot are strictly serialized; builds on different slots overlap
//! freely and may finish in any order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::errors::{Result, RuntimeError};
use crate::renderer::pipeline::async_handle::{AsyncPipelineHandle, PendingBuild};
use crate::renderer::pipeline::compiler::{PipelineCompiler, ReloadStatus, VirtualFile};
use crate::renderer::settings::BuildCacheSettings;
use crate::utils::console::LogSink;
use crate::utils::work_queue::{WorkQueue, panic_message};

/// One compiler instance and the lock that serializes access to it.
pub struct BuildSlot<C> {
    compiler: Mutex<C>,
}

impl<C> BuildSlot<C> {
    fn new(compiler: C) -> Self {
        Self {
            compiler: Mutex::new(compiler),
        }
    }

    fn lock(&self) -> MutexGuard<'_, C> {
        self.compiler.lock()
    }
}

struct Shared<C> {
    slots: Box<[BuildSlot<C>]>,
    next_slot: AtomicU64,
    log: Arc<dyn LogSink>,
}

impl<C: PipelineCompiler> Shared<C> {
    /// Round-robin pick. No load awareness, only uniform rotation.
    fn next_slot_index(&self) -> usize {
        let ticket = self.next_slot.fetch_add(1, Ordering::Relaxed);
        (ticket % self.slots.len() as u64) as usize
    }

    fn build(&self, description: &C::Description) -> std::result::Result<(usize, C::Pipeline), String> {
        let index = self.next_slot_index();
        let mut compiler = self.slots[index].lock();

        let outcome = catch_unwind(AssertUnwindSafe(|| -> std::result::Result<(usize, C::Pipeline), String> {
            let pipeline = compiler.compile(description)?;
            if compiler.validate(&pipeline) {
                Ok((index, pipeline))
            } else {
                Err("pipeline compiled but is not valid".to_string())
            }
        }))
        .unwrap_or_else(|payload| Err(format!("pipeline build panicked: {}", panic_message(payload.as_ref()))));
        drop(compiler);

        match &outcome {
            Ok(_) => log::debug!("Pipeline built on slot {index}"),
            Err(message) => {
                log::warn!("Pipeline build failed on slot {index}: {message}");
                self.log.add_log(message);
            }
        }
        outcome
    }
}

/// Asynchronous, slot-parallel pipeline builder.
pub struct PipelineBuildCache<C: PipelineCompiler> {
    shared: Arc<Shared<C>>,
    work_queue: WorkQueue,
}

impl<C: PipelineCompiler> PipelineBuildCache<C> {
    /// Creates `settings.slot_count` compilers with `make_compiler(slot_index)`
    /// and starts the worker pool.
    pub fn new(
        settings: &BuildCacheSettings,
        mut make_compiler: impl FnMut(usize) -> C,
        log: Arc<dyn LogSink>,
    ) -> Result<Self> {
        if settings.slot_count == 0 {
            return Err(RuntimeError::InvalidSettings(
                "a pipeline build cache needs at least one slot".to_string(),
            ));
        }

        let slots = (0..settings.slot_count)
            .map(|index| BuildSlot::new(make_compiler(index)))
            .collect();

        let work_queue = WorkQueue::start(settings.resolved_worker_count(), &settings.thread_name)?;

        log::info!(
            "PipelineBuildCache: {} slot(s), {} worker(s)",
            settings.slot_count,
            work_queue.worker_count()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                slots,
                next_slot: AtomicU64::new(0),
                log,
            }),
            work_queue,
        })
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.shared.slots.len()
    }

    /// Queues a build and returns its handle without waiting.
    ///
    /// Failures are reported once through the log sink; the handle then
    /// resolves to an invalid state.
    pub fn request_pipeline(&self, description: C::Description) -> AsyncPipelineHandle<C::Pipeline> {
        let (pending, handle) = PendingBuild::channel();
        let shared = Arc::clone(&self.shared);

        self.work_queue.enqueue(move || {
            let outcome = shared.build(&description);
            pending.resolve(outcome);
        });

        handle
    }

    /// Registers the same virtual file with every slot, synchronously.
    pub fn add_virtual_file(&self, file: &VirtualFile) {
        for slot in self.shared.slots.iter() {
            slot.lock().add_virtual_file(file);
        }
    }

    /// Reloads every slot, then reports the first failure in slot order.
    ///
    /// All slots are reloaded even after one fails. With no failure the last
    /// slot's status is returned.
    pub fn reload_all(&self) -> Result<ReloadStatus> {
        let results: Vec<_> = self
            .shared
            .slots
            .iter()
            .map(|slot| slot.lock().reload_all())
            .collect();

        let mut status = ReloadStatus::NoChange;
        for (slot, result) in results.into_iter().enumerate() {
            match result {
                Ok(s) => status = s,
                Err(message) => {
                    log::warn!("Pipeline reload failed on slot {slot}: {message}");
                    return Err(RuntimeError::ReloadFailure { slot, message });
                }
            }
        }
        Ok(status)
    }

    /// Removes a built pipeline from the slot that built it.
    ///
    /// A pending handle is resolved first. Failed handles are ignored. Objects
    /// wrapped with [`AsyncPipelineHandle::ready`] carry no slot and are
    /// removed from every slot instead.
    pub fn remove_pipeline(&self, handle: AsyncPipelineHandle<C::Pipeline>) {
        let Some((slot, pipeline)) = handle.into_resolved() else {
            return;
        };

        match slot.and_then(|index| self.shared.slots.get(index)) {
            Some(owner) => owner.lock().remove_pipeline(&pipeline),
            None => {
                for owner in self.shared.slots.iter() {
                    owner.lock().remove_pipeline(&pipeline);
                }
            }
        }
    }

    /// Whether build jobs are still waiting for a worker.
    #[must_use]
    pub fn busy(&self) -> bool {
        self.work_queue.busy()
    }
}
