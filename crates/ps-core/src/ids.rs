use core::fmt;
use core::num::NonZeroU32;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Declares a compact entity id backed by `NonZeroU32`.
///
/// Zero is never a valid id, so an unbound reference is spelled `Option<Id>`
/// and stays the same size as the id itself.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Smallest id handed out by an empty store.
            pub const FIRST: Self = Self(NonZeroU32::MIN);

            /// Wrap a raw id; `0` is the "no entity" sentinel and yields `None`.
            pub fn new(raw: u32) -> Option<Self> {
                NonZeroU32::new(raw).map(Self)
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }

            /// The id minted after this one.
            pub fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }

            /// "max existing + 1" over an iterator of ids, `FIRST` when empty.
            pub fn after_max(ids: impl IntoIterator<Item = Self>) -> Self {
                ids.into_iter().max().map_or(Self::FIRST, Self::next)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $tag, self.get())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.get())
            }
        }
    };
}

entity_id!(
    /// Id of an invariant point.
    InvId,
    "Inv"
);
entity_id!(
    /// Id of a univariant line.
    UniId,
    "Uni"
);
entity_id!(
    /// Id of a stored dogmin run.
    DogminId,
    "Dogmin"
);

/// Raw integer form of an optional point reference (`0` when unbound).
pub fn raw_inv(id: Option<InvId>) -> u32 {
    id.map_or(0, InvId::get)
}
