use core::fmt;
use core::num::NonZeroU32;

/// Handle to an interned name in a plan catalog.
///
/// The 0-based catalog index is stored shifted by one, leaving the zero
/// niche free so `Option<Id>` costs the same four bytes as `Id`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Handle for a 0-based catalog index.
    pub fn from_index(index: u32) -> Self {
        // No manifest comes close to u32::MAX interned names.
        Self(NonZeroU32::new(index + 1).expect("catalog index overflow"))
    }

    /// The 0-based catalog index this handle points at.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

/// Environment name handle.
pub type EnvId = Id;
/// Variable name handle.
pub type VarId = Id;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn index_survives_the_shift() {
        for i in [0_u32, 1, 2, 42, 10_000] {
            assert_eq!(Id::from_index(i).index(), i);
        }
    }

    #[test]
    fn option_id_uses_the_niche() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn debug_prints_the_index() {
        assert_eq!(format!("{:?}", Id::from_index(3)), "#3");
    }

    proptest! {
        #[test]
        fn id_round_trip_any_index(i in 0u32..u32::MAX) {
            prop_assert_eq!(Id::from_index(i).index(), i);
        }
    }
}
