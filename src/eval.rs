use tracing::error;

use crate::{
    error::AcceptanceError,
    formula::{AcceptanceFormula, OpKind},
    mark::MarkSet,
};

impl AcceptanceFormula {
    /// Decides whether a run that sees exactly the marks in `inf` infinitely often satisfies
    /// the formula. `Inf(m)` holds if `m ⊆ inf` and `Fin(m)` holds if some mark of `m` is
    /// missing from `inf`. The empty formula is always satisfied.
    ///
    /// # Panics
    /// If the formula contains a negated leaf, those have no meaning on a set of marks.
    pub fn accepting(&self, inf: MarkSet) -> bool {
        match self.top() {
            None => true,
            Some(top) => self.eval(top, inf, false),
        }
    }

    /// Like [`AcceptanceFormula::accepting`], but every `Fin` term counts as satisfied.
    pub fn inf_satisfiable(&self, inf: MarkSet) -> bool {
        match self.top() {
            None => true,
            Some(top) => self.eval(top, inf, true),
        }
    }

    fn eval(&self, pos: usize, inf: MarkSet, ignore_fin: bool) -> bool {
        match self.op(pos) {
            Some(OpKind::And) => self.children(pos).all(|c| self.eval(c, inf, ignore_fin)),
            Some(OpKind::Or) => self.children(pos).any(|c| self.eval(c, inf, ignore_fin)),
            Some(OpKind::Inf) => self.mark(pos).subset(&inf),
            Some(OpKind::Fin) => ignore_fin || !self.mark(pos).subset(&inf),
            Some(kind @ (OpKind::InfNeg | OpKind::FinNeg)) => {
                error!("cannot evaluate {kind:?} leaf at position {pos}");
                panic!("negated leaves cannot be evaluated");
            }
            None => {
                error!("expected an operator at position {pos}");
                panic!("malformed acceptance formula");
            }
        }
    }

    /// Computes a subset of `inf` whose marks, when seen infinitely often, suffice to
    /// satisfy the formula. For a disjunction the first satisfiable operand in storage
    /// order, i.e. starting from the one stored last, provides the witness. Returns the
    /// empty set if `inf` does not satisfy the formula.
    ///
    /// This is only defined for formulas that do not use `Fin`, otherwise
    /// [`AcceptanceError::UnsupportedFin`] is returned.
    pub fn accepting_sets(&self, inf: MarkSet) -> Result<MarkSet, AcceptanceError> {
        if self.uses_fin() {
            return Err(AcceptanceError::UnsupportedFin);
        }
        Ok(match self.top() {
            None => MarkSet::empty(),
            Some(top) => self.witness(top, inf)?.unwrap_or_default(),
        })
    }

    fn witness(&self, pos: usize, inf: MarkSet) -> Result<Option<MarkSet>, AcceptanceError> {
        match self.op(pos) {
            Some(OpKind::And) => {
                let mut res = MarkSet::empty();
                for c in self.children(pos) {
                    match self.witness(c, inf)? {
                        Some(m) => res |= m,
                        None => return Ok(None),
                    }
                }
                Ok(Some(res))
            }
            Some(OpKind::Or) => {
                for c in self.children(pos) {
                    if let Some(m) = self.witness(c, inf)? {
                        return Ok(Some(m));
                    }
                }
                Ok(None)
            }
            Some(OpKind::Inf) => {
                let m = self.mark(pos);
                Ok(m.subset(&inf).then_some(m))
            }
            // a Fin(∅) is the constant false
            Some(OpKind::Fin) => Ok(None),
            _ => Err(AcceptanceError::UnsupportedFin),
        }
    }

    /// Returns true if some `Fin` term with a non-empty operand, or any `FinNeg` term,
    /// occurs in the formula. Formulas without such terms can be checked with
    /// [`AcceptanceFormula::accepting_sets`].
    pub fn uses_fin(&self) -> bool {
        (0..self.len()).any(|pos| match self.op(pos) {
            Some(OpKind::Fin) => !self.mark(pos).is_empty(),
            Some(OpKind::FinNeg) => true,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{AcceptanceError, AcceptanceFormula as F, MarkSet};

    fn ms<const N: usize>(marks: [usize; N]) -> MarkSet {
        MarkSet::from_indices(marks)
    }

    #[test_log::test]
    fn inf_or_fin_inf_pair() {
        let x = F::inf([0]) | (F::fin([1]) & F::inf([2]));
        assert!(x.accepting(ms([0])));
        // Inf(0) alone satisfies the disjunction even though Fin(1) fails
        assert!(x.accepting(ms([0, 1, 2])));
        assert!(!x.accepting(ms([1, 2])));
        assert!(x.accepting(ms([2])));
        assert!(!x.accepting(MarkSet::empty()));
    }

    #[test]
    fn fin_fails_when_all_marks_recur() {
        let x = F::fin([1]) & F::inf([2]);
        assert!(!x.accepting(ms([0, 1, 2])));
        assert!(x.accepting(ms([0, 2])));
        assert!(x.inf_satisfiable(ms([0, 1, 2])));
        assert!(!x.inf_satisfiable(ms([0, 1])));
    }

    #[test]
    fn constants() {
        assert!(F::t().accepting(MarkSet::empty()));
        assert!(!F::f().accepting(MarkSet::all(5)));
        assert!(F::fin([0, 1]).accepting(ms([0])));
        assert!(!F::fin([0, 1]).accepting(ms([0, 1])));
    }

    #[test]
    fn parity_acceptance() {
        let p = F::parity(true, false, 4);
        assert!(p.accepting(ms([0])));
        assert!(!p.accepting(ms([0, 1])));
        assert!(p.accepting(ms([1, 2])));
        assert!(!p.accepting(ms([0, 3])));
        let p = F::parity(false, true, 4);
        assert!(p.accepting(ms([1, 2])));
        assert!(!p.accepting(ms([0, 1])));
        assert!(!p.accepting(MarkSet::empty()));
    }

    #[test]
    fn witnesses() {
        let x = F::inf([0, 1]) | F::inf([2]);
        // the disjunct stored last is tried first
        assert_eq!(x.accepting_sets(ms([0, 1, 2])), Ok(ms([2])));
        assert_eq!(x.accepting_sets(ms([0, 1])), Ok(ms([0, 1])));
        assert_eq!(x.accepting_sets(ms([1])), Ok(MarkSet::empty()));
        let y = (F::inf([0]) | F::inf([1])) & (F::inf([2]) | F::inf([3]));
        assert_eq!(y.accepting_sets(ms([0, 1, 2, 3])), Ok(ms([1, 3])));
        assert_eq!(y.accepting_sets(ms([0, 3])), Ok(ms([0, 3])));
        assert_eq!(F::t().accepting_sets(ms([4])), Ok(MarkSet::empty()));
    }

    #[test]
    fn witnesses_reject_fin() {
        let x = F::inf([0]) | F::fin([1]);
        assert!(x.uses_fin());
        assert_eq!(x.accepting_sets(ms([0])), Err(AcceptanceError::UnsupportedFin));
        assert!(!F::f().uses_fin());
        assert!(F::fin_neg([0]).uses_fin());
        assert!(!F::generalized_buchi(3).uses_fin());
    }

    #[test]
    #[should_panic]
    fn negated_leaves_cannot_be_evaluated() {
        F::inf_neg([0]).accepting(MarkSet::empty());
    }
}
