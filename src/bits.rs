//! Typed views over bit ranges of an integer.
//!
//! The PPU's internal registers pack several sub-fields into one word (see
//! [PPU scrolling](https://www.nesdev.org/wiki/PPU_scrolling)). A `BitView` names one of those
//! sub-fields at the type level so callers read and write it without hand-written shifts.

use std::marker::PhantomData;

/// Integer types a [`BitView`] can be laid over.
pub trait BitStorage: Copy {
    const BITS: u32;

    fn to_bits(self) -> u32;
    fn from_bits(bits: u32) -> Self;
}

macro_rules! impl_bit_storage {
    ($($t:ty),*) => {
        $(
            impl BitStorage for $t {
                const BITS: u32 = <$t>::BITS;

                #[inline]
                fn to_bits(self) -> u32 {
                    self as u32
                }

                #[inline]
                fn from_bits(bits: u32) -> Self {
                    bits as $t
                }
            }
        )*
    };
}

impl_bit_storage!(u8, u16);

/// Bits `FIRST..FIRST + LEN` of a `T`.
///
/// ```
/// use emund::bits::BitView;
///
/// type FineY = BitView<u16, 12, 3>;
/// let mut v = 0u16;
/// FineY::set(&mut v, 5);
/// assert_eq!(v, 0x5000);
/// assert_eq!(FineY::get(v), 5);
/// ```
pub struct BitView<T, const FIRST: u32, const LEN: u32>(PhantomData<T>);

impl<T: BitStorage, const FIRST: u32, const LEN: u32> BitView<T, FIRST, LEN> {
    const IN_RANGE: () = assert!(LEN > 0 && FIRST + LEN <= T::BITS);

    /// Mask of the field in place.
    pub const MASK: u32 = ((1u32 << LEN) - 1) << FIRST;

    /// Largest value the field holds.
    pub const MAX: u32 = (1u32 << LEN) - 1;

    /// Field value, shifted down to bit 0.
    #[inline]
    pub fn get(word: T) -> T {
        let () = Self::IN_RANGE;
        T::from_bits((word.to_bits() & Self::MASK) >> FIRST)
    }

    /// Replace the field with `field`; bits of `field` above `LEN` are dropped.
    #[inline]
    pub fn set(word: &mut T, field: T) {
        let () = Self::IN_RANGE;
        let bits = (word.to_bits() & !Self::MASK) | ((field.to_bits() << FIRST) & Self::MASK);
        *word = T::from_bits(bits);
    }

    /// Copy the field from `src` into `dst`, leaving the rest of `dst` untouched.
    #[inline]
    pub fn copy(dst: &mut T, src: T) {
        Self::set(dst, Self::get(src));
    }

    /// Increment the field in place. Returns true when it wrapped back to zero.
    #[inline]
    pub fn increment(word: &mut T) -> bool {
        let next = (Self::get(*word).to_bits() + 1) & Self::MAX;
        Self::set(word, T::from_bits(next));
        next == 0
    }

    /// Toggle every bit of the field.
    #[inline]
    pub fn flip(word: &mut T) {
        *word = T::from_bits(word.to_bits() ^ Self::MASK);
    }
}
