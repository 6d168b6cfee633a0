use glam::Vec3;

use crate::physics::handles::{BroadPhaseHandle, ElementId};
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::id_pool::IdPool;

/// Spatial index the shape simulations register their bounds against.
///
/// Storage is organized as structure of arrays keyed by slot index so that
/// per handle bound writes touch independent lanes. Slot allocation and
/// release are structural operations and must not interleave with the
/// per step bound updates; the stepping driver serializes them.
///
/// Handles are generation checked: releasing a slot bumps its generation,
/// so a handle that outlived its registration can never alias whatever
/// resident claims the slot next.
#[derive(Debug, Default)]
pub struct BroadPhase {
    bounds_min: Vec<Vec3>,
    bounds_max: Vec<Vec3>,
    elements: Vec<ElementId>,
    generations: Vec<u32>,
    live: Vec<bool>,
    ids: IdPool,
    count: usize,
}

impl BroadPhase {
    /// Creates an empty index with the given slot capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bounds_min: Vec::with_capacity(capacity),
            bounds_max: Vec::with_capacity(capacity),
            elements: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            ids: IdPool::new(capacity),
            count: 0,
        }
    }

    /// Number of live residents.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the index has no residents.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Checks whether a handle refers to a live slot.
    #[inline(always)]
    pub fn is_live(&self, handle: BroadPhaseHandle) -> bool {
        let index = handle.index as usize;
        index < self.live.len()
            && self.generations[index] == handle.generation
            && self.live[index]
    }

    /// Registers an element with an initial bound and returns its handle.
    /// Structural operation; must not run concurrently with bound updates.
    pub fn add(&mut self, element: ElementId, bounds: BoundingBox) -> BroadPhaseHandle {
        let index = self.ids.take() as usize;
        if index == self.live.len() {
            self.bounds_min.push(bounds.min);
            self.bounds_max.push(bounds.max);
            self.elements.push(element);
            self.generations.push(0);
            self.live.push(true);
        } else {
            debug_assert!(
                !self.live[index],
                "The id pool handed out a slot that is still live."
            );
            self.bounds_min[index] = bounds.min;
            self.bounds_max[index] = bounds.max;
            self.elements[index] = element;
            self.live[index] = true;
        }
        self.count += 1;
        BroadPhaseHandle {
            index: index as u32,
            generation: self.generations[index],
        }
    }

    /// Overwrites the stored bound for a live handle.
    /// A stale or foreign handle is a contract violation by the caller;
    /// release builds ignore the write.
    pub fn update_bounds(&mut self, handle: BroadPhaseHandle, bounds: BoundingBox) {
        debug_assert!(
            self.is_live(handle),
            "Bound updates require a live broad phase handle."
        );
        if !self.is_live(handle) {
            return;
        }
        let index = handle.index as usize;
        self.bounds_min[index] = bounds.min;
        self.bounds_max[index] = bounds.max;
    }

    /// Releases a slot and bumps its generation. Safe no-op on a stale handle.
    /// Structural operation; must not run concurrently with bound updates.
    pub fn remove(&mut self, handle: BroadPhaseHandle) -> bool {
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

    /// Reads back the bound stored for a handle, if it is live.
    #[inline(always)]
    pub fn stored_bounds(&self, handle: BroadPhaseHandle) -> Option<BoundingBox> {
        if !self.is_live(handle) {
            return None;
        }
        let index = handle.index as usize;
        Some(BoundingBox::new(
            self.bounds_min[index],
            self.bounds_max[index],
        ))
    }

    /// Gets the element resident in a slot, if the handle is live.
    #[inline(always)]
    pub fn element(&self, handle: BroadPhaseHandle) -> Option<ElementId> {
        if !self.is_live(handle) {
            return None;
        }
        Some(self.elements[handle.index as usize])
    }

    /// Enumerates every pair of live residents whose stored bounds intersect.
    /// Purely geometric; collision filtering layers on top of this.
    pub fn collect_overlaps(&self) -> Vec<(BroadPhaseHandle, BroadPhaseHandle)> {
        let mut pairs = Vec::new();
        for a in 0..self.live.len() {
            if !self.live[a] {
                continue;
            }
            for b in (a + 1)..self.live.len() {
                if !self.live[b] {
                    continue;
                }
                if BoundingBox::intersects_bounds(
                    self.bounds_min[a],
                    self.bounds_max[a],
                    self.bounds_min[b],
                    self.bounds_max[b],
                ) {
                    pairs.push((
                        BroadPhaseHandle {
                            index: a as u32,
                            generation: self.generations[a],
                        },
                        BroadPhaseHandle {
                            index: b as u32,
                            generation: self.generations[b],
                        },
                    ));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box_at(center: Vec3) -> BoundingBox {
        BoundingBox::new(center - Vec3::splat(0.5), center + Vec3::splat(0.5))
    }

    #[test]
    fn test_add_update_remove() {
        let mut broad_phase = BroadPhase::with_capacity(8);
        let handle = broad_phase.add(ElementId(1), unit_box_at(Vec3::ZERO));
        assert!(broad_phase.is_live(handle));
        assert_eq!(broad_phase.len(), 1);
        assert_eq!(broad_phase.element(handle), Some(ElementId(1)));

        let moved = unit_box_at(Vec3::new(10.0, 0.0, 0.0));
        broad_phase.update_bounds(handle, moved);
        assert_eq!(broad_phase.stored_bounds(handle), Some(moved));

        assert!(broad_phase.remove(handle));
        assert!(!broad_phase.is_live(handle));
        assert_eq!(broad_phase.len(), 0);
    }

    #[test]
    fn test_stale_handle_cannot_alias_reused_slot() {
        let mut broad_phase = BroadPhase::with_capacity(8);
        let first = broad_phase.add(ElementId(1), unit_box_at(Vec3::ZERO));
        broad_phase.remove(first);
        let second = broad_phase.add(ElementId(2), unit_box_at(Vec3::ONE));
        assert_eq!(first.index, second.index);
        assert!(!broad_phase.is_live(first));
        assert_eq!(broad_phase.stored_bounds(first), None);
        assert_eq!(broad_phase.element(first), None);
        // Removing through the stale handle must not evict the new resident.
        assert!(!broad_phase.remove(first));
        assert!(broad_phase.is_live(second));
    }

    #[test]
    fn test_collect_overlaps() {
        let mut broad_phase = BroadPhase::with_capacity(8);
        let a = broad_phase.add(ElementId(1), unit_box_at(Vec3::ZERO));
        let b = broad_phase.add(ElementId(2), unit_box_at(Vec3::new(0.6, 0.0, 0.0)));
        let _far = broad_phase.add(ElementId(3), unit_box_at(Vec3::new(100.0, 0.0, 0.0)));
        let pairs = broad_phase.collect_overlaps();
        assert_eq!(pairs, vec![(a, b)]);
    }
}
