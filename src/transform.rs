use tracing::trace;

use crate::{
    error::AcceptanceError,
    formula::{AcceptanceFormula, OpKind},
    mark::MarkSet,
};

impl AcceptanceFormula {
    /// The negation of the formula, obtained by exchanging `And` with `Or` and `Inf` with
    /// `Fin`. This is exact and does not need the oracle.
    pub fn complement(&self) -> Self {
        match self.top() {
            Some(top) if !self.is_t() => self.complement_at(top),
            _ => Self::f(),
        }
    }

    fn complement_at(&self, pos: usize) -> Self {
        let mark = self.mark(pos);
        match self.op(pos) {
            Some(OpKind::And) => self
                .children(pos)
                .fold(Self::f(), |res, c| self.complement_at(c) | res),
            Some(OpKind::Or) => self
                .children(pos)
                .fold(Self::t(), |res, c| self.complement_at(c) & res),
            Some(OpKind::Inf) => Self::fin(mark),
            Some(OpKind::Fin) => Self::inf(mark),
            Some(OpKind::InfNeg) => Self::fin_neg(mark),
            Some(OpKind::FinNeg) => Self::inf_neg(mark),
            None => Self::t(),
        }
    }

    /// Removes the marks in `rem` and renumbers the remaining ones densely, see
    /// [`MarkSet::strip`].
    ///
    /// If `missing` is false, the removed marks simply disappear from their terms, so
    /// `Inf(rem)` becomes true and `Fin(rem)` false. If `missing` is true, the removed marks
    /// are known to never occur: every `Inf` term mentioning one of them becomes false and
    /// every such `Fin` term becomes true. Negated leaves are only renumbered.
    pub fn strip(&self, rem: MarkSet, missing: bool) -> Self {
        if self.is_t() || self.is_f() {
            return self.clone();
        }
        match self.top() {
            Some(top) => {
                trace!("stripping {rem} from formula with {} nodes", self.len());
                self.strip_at(top, rem, missing)
            }
            None => self.clone(),
        }
    }

    fn strip_at(&self, pos: usize, rem: MarkSet, missing: bool) -> Self {
        let mark = self.mark(pos);
        let hit = missing && !(mark & rem).is_empty();
        match self.op(pos) {
            Some(OpKind::And) => self
                .children(pos)
                .fold(Self::t(), |res, c| self.strip_at(c, rem, missing) & res),
            Some(OpKind::Or) => self
                .children(pos)
                .fold(Self::f(), |res, c| self.strip_at(c, rem, missing) | res),
            Some(OpKind::Fin) if hit => Self::t(),
            Some(OpKind::Inf) if hit => Self::f(),
            Some(OpKind::Fin) => Self::fin(mark.strip(rem)),
            Some(OpKind::Inf) => Self::inf(mark.strip(rem)),
            Some(OpKind::FinNeg) => Self::fin_neg(mark.strip(rem)),
            Some(OpKind::InfNeg) => Self::inf_neg(mark.strip(rem)),
            None => Self::t(),
        }
    }

    /// Adds `n` to every mark, which moves the formula into a fresh range of marks so that
    /// it can be combined with a formula over the marks below `n`.
    pub fn shift_left(&self, n: usize) -> Result<Self, AcceptanceError> {
        let top = self.used_sets().max_set();
        if top > 0 && top + n > MarkSet::CAPACITY {
            return Err(AcceptanceError::CapacityExceeded {
                requested: top + n - 1,
                capacity: MarkSet::CAPACITY,
            });
        }
        let mut out = self.clone();
        out.map_marks(|m| m << n);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::{AcceptanceError, AcceptanceFormula as F, MarkSet};

    fn ms<const N: usize>(marks: [usize; N]) -> MarkSet {
        MarkSet::from_indices(marks)
    }

    fn samples() -> Vec<F> {
        vec![
            F::rabin(2),
            F::streett(3),
            F::parity(true, false, 3),
            F::parity(false, true, 4),
            F::inf([0]) | F::fin([1]),
            F::inf([0]) | (F::fin([1]) & F::inf([2])),
            F::generalized_rabin(&[1, 2]),
        ]
    }

    #[test_log::test]
    fn complement_negates() {
        for x in samples() {
            let c = x.complement();
            for bits in 0..64u32 {
                let inf = MarkSet::from_bits(bits);
                assert_eq!(c.accepting(inf), !x.accepting(inf), "{x} on {inf}");
            }
        }
    }

    #[test]
    fn complement_is_an_involution() {
        for x in samples() {
            assert_eq!(x.complement().complement(), x);
        }
        assert!(F::t().complement().is_f());
        assert!(F::f().complement().is_t());
        assert_eq!(F::f().complement(), F::t());
        assert_eq!(F::t().complement().complement(), F::t());
        assert_eq!(F::inf_neg([1]).complement(), F::fin_neg([1]));
    }

    #[test]
    fn complement_swaps_rabin_and_streett_shapes() {
        let c = F::rabin(2).complement();
        assert!(c.is_cnf());
        assert_eq!(c.used_inf_fin_sets(), (ms([0, 2]), ms([1, 3])));
    }

    #[test]
    fn strip_renumbers() {
        assert_eq!(F::inf([0, 1, 2]).strip(ms([1]), false), F::inf([0, 1]));
        let x = F::inf([0]) | (F::fin([2]) & F::inf([3]));
        assert_eq!(
            x.strip(ms([1]), false),
            F::inf([0]) | (F::fin([1]) & F::inf([2]))
        );
        assert!(F::t().strip(ms([0]), true).is_t());
        assert!(F::f().strip(ms([0]), false).is_f());
    }

    #[test]
    fn strip_without_missing_drops_marks() {
        let x = (F::inf([1]) & F::inf([2])) | F::fin([3]);
        assert_eq!(x.strip(ms([2]), false), F::inf([1]) | F::fin([2]));
        assert!(F::fin([2]).strip(ms([2]), false).is_f());
        assert!(F::inf([2]).strip(ms([2]), false).is_t());
        assert_eq!(F::inf([2]).strip(ms([2]), false), F::t());
        assert_eq!(
            (F::fin([0]) & F::inf([2])).strip(ms([2]), false),
            F::fin([0])
        );
    }

    #[test]
    fn strip_with_missing_marks() {
        let x = (F::inf([1]) & F::inf([2])) | F::fin([3]);
        assert_eq!(x.strip(ms([2]), true), F::fin([2]));
        let y = F::fin([0]) & F::inf([1]);
        assert!(y.strip(ms([0]), true).accepting(ms([0])));
        assert_eq!(y.strip(ms([0]), true), F::inf([0]));
    }

    #[test]
    fn stripped_marks_disappear() {
        let x = F::generalized_buchi(6);
        let stripped = x.strip(ms([1, 4]), false);
        assert_eq!(stripped, F::generalized_buchi(4));
        assert!(x.strip(ms([1, 4]), true).is_f());
    }

    #[test]
    fn shifting() {
        let x = F::inf([0]) | F::fin([1]);
        assert_eq!(x.shift_left(3).unwrap(), F::inf([3]) | F::fin([4]));
        assert_eq!(F::t().shift_left(40), Ok(F::t()));
        assert!(matches!(
            F::inf([30]).shift_left(2),
            Err(AcceptanceError::CapacityExceeded { .. })
        ));
    }
}
