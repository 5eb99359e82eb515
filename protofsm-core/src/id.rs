use std::fmt::{Debug, Display};

macro_rules! impl_id_type {
    ($name:ident, $prefix:literal) => {
        impl $name {
            /// Creates an id from its raw index in the owning arena.
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).expect("arena exceeds u32 id range"))
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                Display::fmt(self, f)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

/// Identifies a state of an [`crate::Fsm`]. Ids are handed out in increasing order and are
/// never reused, even after the state they refer to has been merged away.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);
impl_id_type!(StateId, "s");

/// Identifies a transition, ids are assigned monotonically on creation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(u32);
impl_id_type!(TransitionId, "t");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(StateId::new(3).to_string(), "s3");
        assert_eq!(format!("{:?}", TransitionId::from_index(7)), "t7");
        assert_eq!(StateId::from(4).index(), 4);
    }
}
