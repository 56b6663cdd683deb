//! Ping-Pong Resources
//!
//! Temporal passes (reprojection, accumulation, exposure history) need a pair
//! of identically shaped resources: one written this frame, one holding last
//! frame's data. [`PingPongResource`] allocates that pair exactly once and
//! destroys both halves together.
//!
//! # Lifecycle
//!
//! ```text
//!   Unallocated ──get(device, desc)──▶ Allocated { a, b, views }
//!        ▲                                   │
//!        └──────── release() / drop ─────────┘   (destroys a and b)
//! ```
//!
//! The pair is exposed as two named [`ResourceView`]s: `<name>` in the
//! [`Output`](ResourceRole::Output) role and `<name>_hist` in the
//! [`History`](ResourceRole::History) role. The frame graph decides when the
//! roles swap; this type never swaps them itself.

use crate::errors::{Result, RuntimeError};

/// Creation/destruction capability for one kind of GPU resource.
pub trait ResourceKind {
    /// Shared device handle used for both creation and destruction.
    type Device: Clone;
    /// Creation description. Compared across calls to catch shape changes.
    type Desc: Clone + PartialEq + std::fmt::Debug;
    type Resource;

    fn create(device: &Self::Device, desc: &Self::Desc) -> Self::Resource;
    fn destroy(device: &Self::Device, resource: Self::Resource);

    fn name(desc: &Self::Desc) -> &str;
    /// Copy of `desc` with a different debug name.
    fn renamed(desc: &Self::Desc, name: String) -> Self::Desc;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRole {
    /// Written this frame.
    Output,
    /// Holds the previous frame.
    History,
}

/// A named, role-tagged reference to one half of a ping-pong pair.
#[derive(Debug)]
pub struct ResourceView<R> {
    name: String,
    role: ResourceRole,
    resource: R,
}

impl<R> ResourceView<R> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> ResourceRole {
        self.role
    }

    #[must_use]
    pub fn resource(&self) -> &R {
        &self.resource
    }
}

struct Allocation<K: ResourceKind> {
    device: K::Device,
    desc: K::Desc,
    output: ResourceView<K::Resource>,
    history: ResourceView<K::Resource>,
}

impl<K: ResourceKind> Allocation<K> {
    fn new(device: &K::Device, desc: &K::Desc) -> Self {
        let name = K::name(desc).to_string();
        let resource_a = K::create(device, &K::renamed(desc, format!("{name}_a")));
        let resource_b = K::create(device, &K::renamed(desc, format!("{name}_b")));
        log::debug!("Allocated ping-pong pair '{name}'");

        Self {
            device: device.clone(),
            desc: desc.clone(),
            output: ResourceView {
                name: name.clone(),
                role: ResourceRole::Output,
                resource: resource_a,
            },
            history: ResourceView {
                name: format!("{name}_hist"),
                role: ResourceRole::History,
                resource: resource_b,
            },
        }
    }

    fn destroy(self) {
        log::debug!("Destroying ping-pong pair '{}'", self.output.name);
        K::destroy(&self.device, self.output.resource);
        K::destroy(&self.device, self.history.resource);
    }
}

/// Exactly-once allocation and paired teardown of a current/previous pair.
///
/// Owned by a long-lived render pass. Not `Clone`: both resources have a
/// single owner. Use [`take`](Self::take) (or `std::mem::take`) to move the
/// pair out and leave an unallocated instance behind.
pub struct PingPongResource<K: ResourceKind> {
    allocation: Option<Allocation<K>>,
}

impl<K: ResourceKind> PingPongResource<K> {
    #[must_use]
    pub fn new() -> Self {
        Self { allocation: None }
    }

    /// Returns the `(output, history)` views, allocating both resources on
    /// the first call.
    ///
    /// `desc` is only used for allocation. Later calls must pass an equal
    /// description or get [`RuntimeError::ConfigurationMismatch`].
    pub fn get(
        &mut self,
        device: &K::Device,
        desc: &K::Desc,
    ) -> Result<(&ResourceView<K::Resource>, &ResourceView<K::Resource>)> {
        if let Some(existing) = &self.allocation
            && existing.desc != *desc
        {
            log::error!(
                "Ping-pong resource '{}' re-requested as {:?} (allocated as {:?})",
                K::name(&existing.desc),
                desc,
                existing.desc
            );
            return Err(RuntimeError::ConfigurationMismatch {
                name: K::name(&existing.desc).to_string(),
            });
        }

        let allocation = self
            .allocation
            .get_or_insert_with(|| Allocation::new(device, desc));
        Ok((&allocation.output, &allocation.history))
    }

    /// The views, if the pair has been allocated.
    #[must_use]
    pub fn views(&self) -> Option<(&ResourceView<K::Resource>, &ResourceView<K::Resource>)> {
        self.allocation.as_ref().map(|a| (&a.output, &a.history))
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    /// Destroys both resources now. The next `get` allocates a fresh pair.
    pub fn release(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            allocation.destroy();
        }
    }

    /// Moves the pair out, leaving `self` unallocated.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl<K: ResourceKind> Default for PingPongResource<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ResourceKind> Drop for PingPongResource<K> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K: ResourceKind> std::fmt::Debug for PingPongResource<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingPongResource")
            .field("desc", &self.allocation.as_ref().map(|a| &a.desc))
            .finish()
    }
}
