/// Collision group and mask metadata used by the broad phase and the pair
/// logic to exclude element pairs from collision consideration before any
/// geometric test runs.
///
/// Two elements are candidate colliders iff each one's group intersects the
/// other's mask:
///   `(a.group & b.mask) != 0 && (b.group & a.mask) != 0`
/// Elements sharing the same non-zero exclusion group never collide,
/// regardless of their group/mask pairing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FilterAttributes {
    /// Which collision group(s) this element belongs to (bitmask).
    pub group: u32,
    /// Which collision groups this element can collide with (bitmask).
    pub mask: u32,
    /// Exclusion group id. Elements in the same non-zero exclusion group never collide.
    pub exclusion_group: u32,
}

impl FilterAttributes {
    /// Default attributes: first group, collides with everything.
    pub const DEFAULT: Self = Self {
        group: 1,
        mask: u32::MAX,
        exclusion_group: 0,
    };

    /// Attributes that collide with nothing.
    pub const NONE: Self = Self {
        group: 0,
        mask: 0,
        exclusion_group: 0,
    };

    /// Creates attributes with the given group and mask.
    #[inline]
    pub const fn new(group: u32, mask: u32) -> Self {
        Self {
            group,
            mask,
            exclusion_group: 0,
        }
    }

    /// Returns the attributes with the given exclusion group.
    #[inline]
    pub const fn with_exclusion_group(mut self, exclusion_group: u32) -> Self {
        self.exclusion_group = exclusion_group;
        self
    }

    /// Checks whether two attribute sets allow the pair to be considered for collision.
    #[inline]
    pub fn can_collide(a: &Self, b: &Self) -> bool {
        if a.exclusion_group != 0 && a.exclusion_group == b.exclusion_group {
            return false;
        }
        (a.group & b.mask) != 0 && (b.group & a.mask) != 0
    }
}

impl Default for FilterAttributes {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Application defined filter payload carried alongside the attributes.
/// The simulation layer never interprets the words; consumers query it on
/// demand and must not cache it across steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FilterData(pub [u32; 4]);

impl FilterData {
    /// Creates a filter payload from four application defined words.
    #[inline]
    pub const fn new(word0: u32, word1: u32, word2: u32, word3: u32) -> Self {
        Self([word0, word1, word2, word3])
    }
}
