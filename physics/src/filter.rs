//! Collision filtering: group index plus category/mask bits.
//!
//! Two shapes may collide only if their filters allow it, independent of geometric overlap:
//! - Same non-zero group: a positive group always collides, a negative group never does.
//! - Otherwise: each side's mask must contain the other side's category.

use num_traits::{One, PrimInt};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CATEGORY_BITS, DEFAULT_GROUP_INDEX, DEFAULT_MASK_BITS};

/// Implemented by enums naming collision layers (one bit each).
///
/// The enum's discriminant (via `#[repr(u8)]`) is the bit index; it must be smaller than the
/// number of bits in `Storage`.
pub trait CollisionLayer {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn bit(&self) -> Self::Storage {
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// A set of layer bits.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> LayerMask<T> {
    pub fn new(bits: T) -> Self {
        Self { bits }
    }

    pub fn empty() -> Self {
        Self { bits: T::zero() }
    }

    pub fn all() -> Self {
        Self { bits: !T::zero() }
    }

    pub fn with<U: CollisionLayer<Storage = T>>(mut self, layer: U) -> Self {
        self.insert(layer);
        self
    }

    pub fn insert<U: CollisionLayer<Storage = T>>(&mut self, layer: U) {
        self.bits = self.bits | layer.bit();
    }

    pub fn remove<U: CollisionLayer<Storage = T>>(&mut self, layer: U) {
        self.bits = self.bits & !layer.bit();
    }

    pub fn contains<U: CollisionLayer<Storage = T>>(&self, layer: U) -> bool {
        (self.bits & layer.bit()) != T::zero()
    }

    pub fn from_layers<U: CollisionLayer<Storage = T> + Copy>(layers: &[U]) -> Self {
        let bits = layers.iter().fold(T::zero(), |acc, l| acc | l.bit());
        Self { bits }
    }

    /// True if any bit is set in both masks.
    #[inline]
    pub fn intersects(&self, other: Self) -> bool {
        (self.bits & other.bits) != T::zero()
    }
}

/// Declare a layer enum and implement [`CollisionLayer`] for it.
///
/// ```
/// use physics::{define_collision_layers, filter::LayerMask};
///
/// define_collision_layers!(Layer, u16, {
///     Ground,
///     Player,
///     Debris,
/// });
///
/// let mask = LayerMask::from_layers(&[Layer::Ground, Layer::Player]);
/// assert_eq!(mask.bits, 0b011);
/// assert!(mask.contains(Layer::Player));
/// assert!(!mask.contains(Layer::Debris));
/// ```
#[macro_export]
macro_rules! define_collision_layers {
    ($name:ident, $storage:ty, { $($variant:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::filter::CollisionLayer for $name {
            type Storage = $storage;

            fn bit_index(&self) -> u8 {
                *self as u8
            }
        }
    };
}

/// Collision filter attached to every shape of a collider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub group_index: i16,
    pub category: LayerMask<u16>,
    pub mask: LayerMask<u16>,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group_index: DEFAULT_GROUP_INDEX,
            category: LayerMask::new(DEFAULT_CATEGORY_BITS),
            mask: LayerMask::new(DEFAULT_MASK_BITS),
        }
    }
}

impl CollisionFilter {
    pub fn should_collide(&self, other: &CollisionFilter) -> bool {
        if self.group_index != 0 && self.group_index == other.group_index {
            return self.group_index > 0;
        }
        self.mask.intersects(other.category) && other.mask.intersects(self.category)
    }

    /// Pack into an engine user-data word.
    ///
    /// Bit layout (least-significant bit = bit 0):
    /// - bits 0..=15  : group index (i16, two's complement)
    /// - bits 16..=31 : category bits
    /// - bits 32..=47 : mask bits
    /// - bits 48..=127: reserved, zero
    pub fn pack(&self) -> u128 {
        (self.group_index as u16 as u128)
            | ((self.category.bits as u128) << 16)
            | ((self.mask.bits as u128) << 32)
    }

    /// Inverse of [`CollisionFilter::pack`]. Reserved bits are ignored.
    pub fn unpack(word: u128) -> Self {
        const FIELD: u128 = u16::MAX as u128;
        Self {
            group_index: (word & FIELD) as u16 as i16,
            category: LayerMask::new(((word >> 16) & FIELD) as u16),
            mask: LayerMask::new(((word >> 32) & FIELD) as u16),
        }
    }
}
