//! Slot Generations
//!
//! Each arena slot carries a generation counter that is bumped whenever the
//! node living in it is destroyed. Ids pair a slot with the generation they
//! were issued under, which turns use-after-free into a cheap lookup miss.

/// Generation counter for an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Generation(u32);

impl Generation {
    /// Generation of a freshly allocated slot
    pub const INITIAL: Self = Generation(0);

    /// Get the raw value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Get the next generation
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}
