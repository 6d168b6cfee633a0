use std::hash::Hash;

// Newtype Pattern for enhanced type safety
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BodyHandle(pub i32);

/// Identity token for a collision element, used by the broad phase and
/// the filtering system. Unique among live elements.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub i32);

/// Generation checked index into the shape core registry.
/// Slot reuse bumps the generation, so a stale id can never silently alias
/// a core registered later in the same slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ShapeCoreId {
    pub index: u32,
    pub generation: u32,
}

/// Generation checked index into the broad phase manager's slot storage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BroadPhaseHandle {
    pub index: u32,
    pub generation: u32,
}

/// Generation checked index into the narrow phase volume pool.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VolumeHandle {
    pub index: u32,
    pub generation: u32,
}

// Simple implementations for Display for user-friendliness
impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "BodyHandle<{}>", self.0)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ElementId<{}>", self.0)
    }
}

impl std::fmt::Display for ShapeCoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ShapeCoreId<{}:{}>", self.index, self.generation)
    }
}

impl std::fmt::Display for BroadPhaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "BroadPhaseHandle<{}:{}>", self.index, self.generation)
    }
}

impl std::fmt::Display for VolumeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "VolumeHandle<{}:{}>", self.index, self.generation)
    }
}
