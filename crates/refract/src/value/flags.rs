//! Value handle flags

/// Addressability and visibility flags of a value handle (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct Flags(u8);

impl Flags {
    /// No flags
    pub const NONE: Self = Self(0);
    /// The handle aliases stable storage
    pub const ADDR: Self = Self(1 << 0);
    /// Reached through a non-embedded unexported field
    pub const STICKY_RO: Self = Self(1 << 1);
    /// Reached through an unexported embedded field
    pub const EMBED_RO: Self = Self(1 << 2);
    /// Either read-only flag
    pub const RO: Self = Self(Self::STICKY_RO.0 | Self::EMBED_RO.0);

    /// Check if all bits of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any bit of `other` is set
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Union of two flag sets
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Intersection of two flag sets
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits of `self` not in `other`
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Read-only state carried into values derived from this one.
    ///
    /// Any read-only origin becomes sticky once propagated.
    pub const fn ro(self) -> Self {
        if self.intersects(Self::RO) {
            Self::STICKY_RO
        } else {
            Self::NONE
        }
    }
}

impl std::ops::BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_algebra() {
        let f = Flags::ADDR | Flags::EMBED_RO;
        assert!(f.contains(Flags::ADDR));
        assert!(f.intersects(Flags::RO));
        assert!(!f.contains(Flags::RO));
        assert_eq!(f.difference(Flags::ADDR), Flags::EMBED_RO);
        assert_eq!(f.intersection(Flags::RO), Flags::EMBED_RO);
    }

    #[test]
    fn test_ro_becomes_sticky() {
        assert_eq!(Flags::EMBED_RO.ro(), Flags::STICKY_RO);
        assert_eq!(Flags::ADDR.ro(), Flags::NONE);
    }
}
