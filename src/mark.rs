use std::{
    fmt::{Debug, Display},
    ops::{
        BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, ShlAssign, Shr,
        ShrAssign, Sub, SubAssign,
    },
};

use itertools::Itertools;
use tracing::error;

use crate::{error::AcceptanceError, Show};

/// The type backing a [`MarkSet`].
pub type MarkBits = u32;

/// A set of acceptance marks, where bit `i` being set means that mark `i` belongs to the set.
/// The set is a plain value, it can be copied around freely and all operations return new sets.
///
/// Indices must stay below [`MarkSet::CAPACITY`]. Setting a bit beyond that is a contract
/// violation which panics in every build, the checked entry point is
/// [`MarkSet::try_from_indices`].
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct MarkSet(MarkBits);

impl MarkSet {
    /// The number of distinct marks that fit into a [`MarkSet`].
    pub const CAPACITY: usize = MarkBits::BITS as usize;

    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wraps raw bits.
    pub const fn from_bits(bits: MarkBits) -> Self {
        Self(bits)
    }

    /// The set `{0, .., n-1}`.
    ///
    /// # Panics
    /// If `n` exceeds [`MarkSet::CAPACITY`].
    pub fn all(n: usize) -> Self {
        match n {
            0 => Self(0),
            n if n <= Self::CAPACITY => Self(MarkBits::MAX >> (Self::CAPACITY - n)),
            n => {
                error!("requested the first {n} marks, but at most {} exist", Self::CAPACITY);
                panic!("mark index out of range");
            }
        }
    }

    /// Collects the given indices into a set.
    ///
    /// # Panics
    /// If any index is at least [`MarkSet::CAPACITY`].
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut out = Self::empty();
        for i in indices {
            out.set(i);
        }
        out
    }

    /// Like [`MarkSet::from_indices`] but reports out-of-range indices instead of panicking.
    pub fn try_from_indices<I: IntoIterator<Item = usize>>(
        indices: I,
    ) -> Result<Self, AcceptanceError> {
        let mut out = Self::empty();
        for i in indices {
            if i >= Self::CAPACITY {
                return Err(AcceptanceError::CapacityExceeded {
                    requested: i,
                    capacity: Self::CAPACITY,
                });
            }
            out.0 |= 1 << i;
        }
        Ok(out)
    }

    /// The raw bits.
    pub fn id(&self) -> MarkBits {
        self.0
    }

    /// Inserts mark `i`.
    ///
    /// # Panics
    /// If `i` is at least [`MarkSet::CAPACITY`].
    pub fn set(&mut self, i: usize) {
        if i >= Self::CAPACITY {
            error!("mark {i} does not fit, only {} marks are supported", Self::CAPACITY);
            panic!("mark index out of range");
        }
        self.0 |= 1 << i;
    }

    /// Removes mark `i`, does nothing if `i` is out of range.
    pub fn clear(&mut self, i: usize) {
        if i < Self::CAPACITY {
            self.0 &= !(1 << i);
        }
    }

    /// Returns true if mark `i` is contained.
    pub fn has(&self, i: usize) -> bool {
        i < Self::CAPACITY && self.0 & (1 << i) != 0
    }

    /// Number of marks in the set.
    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns true if no mark is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The singleton set containing the smallest mark, or the empty set.
    pub fn lowest(&self) -> Self {
        Self(self.0 & self.0.wrapping_neg())
    }

    /// One more than the largest mark, `0` for the empty set.
    pub fn max_set(&self) -> usize {
        Self::CAPACITY - self.0.leading_zeros() as usize
    }

    /// Drops the `n` smallest marks.
    pub fn remove_some(&self, n: usize) -> Self {
        let mut bits = self.0;
        for _ in 0..n {
            if bits == 0 {
                break;
            }
            bits &= bits - 1;
        }
        Self(bits)
    }

    /// Returns true if every mark of `self` is also in `other`.
    pub fn subset(&self, other: &Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Iterates over the contained marks in ascending order.
    pub fn sets(&self) -> Marks {
        Marks(self.0)
    }

    /// Removes the marks in `remove` and renumbers the remaining marks so that they
    /// stay dense: every mark moves down by the number of removed positions below it.
    ///
    /// ```
    /// use automata_acceptance::MarkSet;
    /// let x = MarkSet::from_indices([0, 2, 5]);
    /// assert_eq!(x.strip(MarkSet::from_indices([1, 3])), MarkSet::from_indices([0, 1, 3]));
    /// ```
    pub fn strip(&self, remove: MarkSet) -> Self {
        let mut xv = self.0;
        let mut yv = remove.0;
        while yv != 0 && xv != 0 {
            // the zeros of `yv` below its lowest bit, and everything above it
            let below = !yv & (yv - 1);
            let above = !(yv ^ (yv - 1));
            xv = ((xv & above) >> 1) | (xv & below);
            yv = (yv & above) >> 1;
        }
        Self(xv)
    }
}

/// Ascending iterator over the marks of a [`MarkSet`].
#[derive(Clone, Debug)]
pub struct Marks(MarkBits);

impl Iterator for Marks {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let i = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(i)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Marks {
    fn next_back(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let i = (MarkBits::BITS - 1 - self.0.leading_zeros()) as usize;
        self.0 &= !(1 << i);
        Some(i)
    }
}

impl ExactSizeIterator for Marks {}

impl IntoIterator for MarkSet {
    type Item = usize;
    type IntoIter = Marks;

    fn into_iter(self) -> Self::IntoIter {
        self.sets()
    }
}

impl<const N: usize> From<[usize; N]> for MarkSet {
    fn from(value: [usize; N]) -> Self {
        Self::from_indices(value)
    }
}

impl FromIterator<usize> for MarkSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self::from_indices(iter)
    }
}

macro_rules! mark_set_binop {
    ($($trait:ident::$method:ident, $assign:ident::$assign_method:ident => $op:tt;)*) => {
        $(
            impl $trait for MarkSet {
                type Output = MarkSet;
                fn $method(self, rhs: MarkSet) -> MarkSet {
                    MarkSet(self.0 $op rhs.0)
                }
            }

            impl $assign for MarkSet {
                fn $assign_method(&mut self, rhs: MarkSet) {
                    *self = *self $op rhs;
                }
            }
        )*
    };
}

mark_set_binop! {
    BitOr::bitor, BitOrAssign::bitor_assign => |;
    BitAnd::bitand, BitAndAssign::bitand_assign => &;
    BitXor::bitxor, BitXorAssign::bitxor_assign => ^;
}

impl Sub for MarkSet {
    type Output = MarkSet;
    fn sub(self, rhs: MarkSet) -> MarkSet {
        MarkSet(self.0 & !rhs.0)
    }
}

impl SubAssign for MarkSet {
    fn sub_assign(&mut self, rhs: MarkSet) {
        self.0 &= !rhs.0;
    }
}

impl Not for MarkSet {
    type Output = MarkSet;
    fn not(self) -> MarkSet {
        MarkSet(!self.0)
    }
}

impl Shl<usize> for MarkSet {
    type Output = MarkSet;
    fn shl(self, rhs: usize) -> MarkSet {
        MarkSet(self.0.checked_shl(rhs as u32).unwrap_or(0))
    }
}

impl ShlAssign<usize> for MarkSet {
    fn shl_assign(&mut self, rhs: usize) {
        *self = *self << rhs;
    }
}

impl Shr<usize> for MarkSet {
    type Output = MarkSet;
    fn shr(self, rhs: usize) -> MarkSet {
        MarkSet(self.0.checked_shr(rhs as u32).unwrap_or(0))
    }
}

impl ShrAssign<usize> for MarkSet {
    fn shr_assign(&mut self, rhs: usize) {
        *self = *self >> rhs;
    }
}

impl Display for MarkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.sets().join(","))
    }
}

impl Debug for MarkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Show for MarkSet {
    fn show(&self) -> String {
        self.to_string()
    }

    fn show_collection<'a, I>(iter: I) -> String
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
        I::IntoIter: DoubleEndedIterator,
    {
        format!("[{}]", iter.into_iter().map(|m| m.show()).join(", "))
    }
}
