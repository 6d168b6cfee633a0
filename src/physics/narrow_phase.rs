use thiserror::Error;

use crate::physics::handles::{ShapeCoreId, VolumeHandle};
use crate::physics::pose::RigidPose;
use crate::physics::shape_core::{GeometryError, ShapeCore};
use crate::utilities::id_pool::IdPool;

/// Describes why a narrow phase primitive could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VolumeError {
    /// The shape core describes geometry the narrow phase cannot build from.
    #[error("cannot build a collision volume from degenerate geometry: {0}")]
    Degenerate(#[from] GeometryError),
    /// The volume pool has no free slots left.
    #[error("narrow phase volume pool is exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },
    /// A creation request arrived for a shape that already owns a live volume.
    #[error("shape already owns a live collision volume")]
    VolumeAlreadyLive,
}

/// Pool of narrow phase collision primitives.
///
/// The simulation layer only creates and destroys volumes and never inspects
/// their internals; each slot records the core snapshot it was built from so
/// the layer above can verify that a volume and its shape core stayed in sync.
///
/// The pool is bounded. Creation fails with `PoolExhausted` once every slot is
/// claimed, and the failure leaves the pool unchanged.
#[derive(Debug)]
pub struct LowLevelVolumes {
    source_cores: Vec<ShapeCoreId>,
    generations: Vec<u32>,
    live: Vec<bool>,
    ids: IdPool,
    count: usize,
    capacity: usize,
}

impl LowLevelVolumes {
    /// Creates an empty pool holding at most `capacity` live volumes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            source_cores: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            ids: IdPool::new(capacity),
            count: 0,
            capacity,
        }
    }

    /// Number of live volumes.
    #[inline(always)]
    pub fn live_count(&self) -> usize {
        self.count
    }

    /// Maximum number of volumes the pool can hold.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Checks whether a handle refers to a live volume.
    #[inline(always)]
    pub fn is_live(&self, handle: VolumeHandle) -> bool {
        let index = handle.index as usize;
        index < self.live.len()
            && self.generations[index] == handle.generation
            && self.live[index]
    }

    /// Gets the core snapshot a live volume was built from.
    #[inline(always)]
    pub fn source_core(&self, handle: VolumeHandle) -> Option<ShapeCoreId> {
        if !self.is_live(handle) {
            return None;
        }
        Some(self.source_cores[handle.index as usize])
    }

    /// Builds a collision primitive from a core snapshot and pose.
    /// Validation failures and pool exhaustion leave the pool unchanged.
    pub fn create(
        &mut self,
        core_id: ShapeCoreId,
        core: &ShapeCore,
        pose: &RigidPose,
    ) -> Result<VolumeHandle, VolumeError> {
        core.geometry.validate()?;
        debug_assert!(
            pose.position.is_finite(),
            "Volume creation requires a finite pose snapshot."
        );
        if self.count == self.capacity {
            return Err(VolumeError::PoolExhausted {
                capacity: self.capacity,
            });
        }
        let index = self.ids.take() as usize;
        if index == self.live.len() {
            self.source_cores.push(core_id);
            self.generations.push(0);
            self.live.push(true);
        } else {
            debug_assert!(
                !self.live[index],
                "The id pool handed out a slot that is still live."
            );
            self.source_cores[index] = core_id;
            self.live[index] = true;
        }
        self.count += 1;
        Ok(VolumeHandle {
            index: index as u32,
            generation: self.generations[index],
        })
    }

    /// Releases a volume. Idempotent: a stale or never live handle is a safe no-op.
    pub fn destroy(&mut self, handle: VolumeHandle) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        let index = handle.index as usize;
        self.live[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.ids.return_id(index as i32);
        self.count -= 1;
        true
    }
}
