use super::AcceptanceFormula;
use crate::mark::MarkSet;

impl AcceptanceFormula {
    /// `Inf(0)`.
    pub fn buchi() -> Self {
        Self::inf([0])
    }

    /// `Fin(0)`.
    pub fn cobuchi() -> Self {
        Self::fin([0])
    }

    /// `Inf(0)&Inf(1)&...&Inf(n-1)`, which is [`AcceptanceFormula::t`] for `n = 0`.
    pub fn generalized_buchi(n: usize) -> Self {
        Self::inf(MarkSet::all(n))
    }

    /// `Fin(0)|Fin(1)|...|Fin(n-1)`, which is [`AcceptanceFormula::f`] for `n = 0`.
    pub fn generalized_co_buchi(n: usize) -> Self {
        Self::fin(MarkSet::all(n))
    }

    /// Rabin condition with `n` pairs, pair `i` is `Fin(2i) & Inf(2i+1)`.
    pub fn rabin(n: usize) -> Self {
        (1..=n).rev().fold(Self::f(), |res, i| {
            res | (Self::inf([2 * i - 1]) & Self::fin([2 * i - 2]))
        })
    }

    /// Streett condition with `n` pairs, pair `i` is `Fin(2i) | Inf(2i+1)`.
    pub fn streett(n: usize) -> Self {
        (1..=n).rev().fold(Self::t(), |res, i| {
            res & (Self::inf([2 * i - 1]) | Self::fin([2 * i - 2]))
        })
    }

    /// Generalized Rabin condition where the `i`-th pair has `counts[i]` Inf marks. Marks are
    /// assigned consecutively, every pair uses one Fin mark followed by its Inf marks.
    ///
    /// ```
    /// use automata_acceptance::AcceptanceFormula;
    /// let gr = AcceptanceFormula::generalized_rabin(&[1, 2]);
    /// assert_eq!(gr.to_text(), "(Fin(0) & Inf(1)) | (Fin(2) & (Inf(3)&Inf(4)))");
    /// ```
    pub fn generalized_rabin(counts: &[usize]) -> Self {
        let mut next = 0;
        let mut res = Self::f();
        for &count in counts {
            let fin = Self::fin([next]);
            let inf = Self::inf(MarkSet::from_indices(next + 1..next + 1 + count));
            next += count + 1;
            res = (fin & inf) | res;
        }
        res
    }

    /// Parity condition over `n` priorities. With `max` the largest priority seen infinitely
    /// often decides, otherwise the smallest one does. With `odd` odd priorities are accepting.
    pub fn parity(max: bool, odd: bool, n: usize) -> Self {
        let accepting = |i: usize| (i & 1 == 1) == odd;
        let mut res = if max {
            if odd {
                Self::t()
            } else {
                Self::f()
            }
        } else if accepting(n) {
            Self::t()
        } else {
            Self::f()
        };

        let priorities: Box<dyn Iterator<Item = usize>> = if max {
            Box::new(0..n)
        } else {
            Box::new((0..n).rev())
        };
        for i in priorities {
            if accepting(i) {
                res |= Self::inf([i]);
            } else {
                res &= Self::fin([i]);
            }
        }
        res
    }
}
