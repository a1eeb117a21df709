use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::{
    condition::AcceptanceCondition,
    formula::{AcceptanceFormula, OpKind},
    mark::MarkSet,
};

#[cfg(feature = "oracle")]
use crate::{error::AcceptanceError, oracle::BddOracle};

impl AcceptanceCondition {
    /// Returns true for the condition over no marks with a trivially true formula.
    pub fn is_all(&self) -> bool {
        self.num_sets() == 0 && self.is_t()
    }

    /// Returns true for the condition over no marks with a trivially false formula.
    pub fn is_none(&self) -> bool {
        self.num_sets() == 0 && self.is_f()
    }

    /// Büchi acceptance, i.e. `Inf(0)` over a single mark.
    pub fn is_buchi(&self) -> bool {
        self.num_sets() == 1 && self.is_generalized_buchi()
    }

    /// co-Büchi acceptance, i.e. `Fin(0)` over a single mark.
    pub fn is_co_buchi(&self) -> bool {
        self.num_sets() == 1 && self.is_generalized_co_buchi()
    }

    /// Returns true if the formula is `Inf` of all marks, or if it is empty and there are
    /// no marks at all.
    pub fn is_generalized_buchi(&self) -> bool {
        let formula = self.formula();
        (formula.is_empty() && self.num_sets() == 0) || self.is_single_leaf(OpKind::Inf)
    }

    /// Returns true if the formula is `Fin` of all marks.
    pub fn is_generalized_co_buchi(&self) -> bool {
        self.is_single_leaf(OpKind::Fin)
    }

    fn is_single_leaf(&self, kind: OpKind) -> bool {
        let formula = self.formula();
        formula.len() == 2 && formula.op(1) == Some(kind) && formula.mark(1) == self.all_sets()
    }

    /// Recognizes Rabin acceptance and returns the number of pairs. Pair `i` has to be
    /// `Fin(2i) & Inf(2i+1)`, other numberings are only recognized semantically by
    /// `is_rabin_equiv`.
    ///
    /// ```
    /// use automata_acceptance::AcceptanceCondition;
    /// assert_eq!(AcceptanceCondition::rabin(2).is_rabin(), Some(2));
    /// assert_eq!(AcceptanceCondition::streett(2).is_rabin(), None);
    /// ```
    pub fn is_rabin(&self) -> Option<usize> {
        if self.is_f() {
            return (self.num_sets() == 0).then_some(0);
        }
        if self.num_sets() % 2 == 1 || self.is_t() {
            return None;
        }
        self.has_pairs(OpKind::Or, OpKind::And)
            .then_some(self.num_sets() / 2)
    }

    /// Recognizes Streett acceptance and returns the number of pairs. Pair `i` has to be
    /// `Fin(2i) | Inf(2i+1)`.
    pub fn is_streett(&self) -> Option<usize> {
        if self.is_t() {
            return (self.num_sets() == 0).then_some(0);
        }
        if self.num_sets() % 2 == 1 || self.is_f() {
            return None;
        }
        self.has_pairs(OpKind::And, OpKind::Or)
            .then_some(self.num_sets() / 2)
    }

    /// Checks that the formula is an `outer` of `inner` pairs (or a single such pair), that
    /// each pair combines `Fin({m})` with `Inf({m+1})` and that the pairs partition the marks.
    fn has_pairs(&self, outer: OpKind, inner: OpKind) -> bool {
        let formula = self.formula();
        let Some(top) = formula.top() else {
            return false;
        };
        let pairs: Vec<usize> = if formula.op(top) == Some(outer) {
            formula.children(top).collect()
        } else {
            vec![top]
        };

        let mut seen_fin = MarkSet::empty();
        let mut seen_inf = MarkSet::empty();
        for pair in pairs {
            if formula.op(pair) != Some(inner) || formula.size(pair) != 4 {
                return false;
            }
            let Some(((o1, m1), (o2, m2))) = leaf_pair(formula, pair, OpKind::Fin) else {
                return false;
            };
            if o1 != OpKind::Fin || o2 != OpKind::Inf || m1.count() != 1 || m2 != m1 << 1 {
                return false;
            }
            seen_fin |= m1;
            seen_inf |= m2;
        }
        trace!("pairs use Fin marks {seen_fin} and Inf marks {seen_inf}");
        (seen_fin & seen_inf).is_empty() && (seen_fin | seen_inf) == self.all_sets()
    }

    /// Recognizes generalized Rabin acceptance, i.e. a disjunction of pairs
    /// `Fin(m) & Inf(m+1)&...&Inf(m+k)` and lone `Fin(m)` terms, where the marks of every pair
    /// follow each other and all pairs together partition the marks. Returns the number of
    /// `Inf` marks of each pair, ordered by their `Fin` mark. Generalized co-Büchi acceptance
    /// yields a pair without `Inf` marks for every mark.
    ///
    /// ```
    /// use automata_acceptance::AcceptanceCondition;
    /// let cond = AcceptanceCondition::generalized_rabin(&[2, 1]);
    /// assert_eq!(cond.is_generalized_rabin(), Some(vec![2, 1]));
    /// ```
    pub fn is_generalized_rabin(&self) -> Option<Vec<usize>> {
        if self.is_generalized_co_buchi() {
            return Some(vec![0; self.num_sets()]);
        }
        self.generalized_pairs(OpKind::Or, OpKind::And, OpKind::Fin, OpKind::Inf)
    }

    /// The dual of [`AcceptanceCondition::is_generalized_rabin`]: a conjunction of clauses
    /// `Inf(m) | Fin(m+1)|...|Fin(m+k)` and lone `Inf(m)` terms. Generalized Büchi acceptance
    /// yields a clause without `Fin` marks for every mark.
    pub fn is_generalized_streett(&self) -> Option<Vec<usize>> {
        if self.num_sets() > 0 && self.is_generalized_buchi() {
            return Some(vec![0; self.num_sets()]);
        }
        self.generalized_pairs(OpKind::And, OpKind::Or, OpKind::Inf, OpKind::Fin)
    }

    fn generalized_pairs(
        &self,
        outer: OpKind,
        inner: OpKind,
        single: OpKind,
        run: OpKind,
    ) -> Option<Vec<usize>> {
        let formula = self.formula();
        let top = formula.top()?;
        let clauses: Vec<usize> = if formula.op(top) == Some(outer) {
            formula.children(top).collect()
        } else {
            vec![top]
        };

        let mut seen_single = MarkSet::empty();
        let mut seen_run = MarkSet::empty();
        let mut pairs = BTreeMap::new();
        for clause in clauses {
            let (m1, m2) = match formula.op(clause) {
                Some(k) if k == inner && formula.size(clause) == 4 => {
                    let ((o1, m1), (o2, m2)) = leaf_pair(formula, clause, single)?;
                    if o1 != single || o2 != run || m2.is_empty() {
                        return None;
                    }
                    (m1, m2)
                }
                Some(k) if k == single => (formula.mark(clause), MarkSet::empty()),
                _ => return None,
            };
            if m1.count() != 1 {
                return None;
            }
            let anchor = m1.max_set();
            let len = m2.count();
            if *pairs.entry(anchor).or_insert(len) != len {
                return None;
            }
            if !(anchor..anchor + len).all(|j| m2.has(j)) {
                return None;
            }
            seen_single |= m1;
            seen_run |= m2;
        }
        ((seen_single & seen_run).is_empty() && (seen_single | seen_run) == self.all_sets())
            .then(|| pairs.into_values().collect())
    }

    /// Recognizes parity acceptance and returns `(max, odd)`. The formula has to coincide with
    /// the one built by [`AcceptanceFormula::parity`], equivalent formulas of a different
    /// shape are only recognized by `is_parity_equiv`. A condition
    /// without marks is max parity, odd if its formula is true.
    ///
    /// ```
    /// use automata_acceptance::AcceptanceCondition;
    /// let cond: AcceptanceCondition = "parity max odd 5".parse().unwrap();
    /// assert_eq!(cond.is_parity(), Some((true, true)));
    /// ```
    pub fn is_parity(&self) -> Option<(bool, bool)> {
        if self.num_sets() == 0 {
            return Some((true, self.is_t()));
        }
        let odd = self.parity_candidate()?;
        let n = self.num_sets();
        let found = if self.formula() == &AcceptanceFormula::parity(true, odd, n) {
            Some((true, odd))
        } else if self.formula() == &AcceptanceFormula::parity(false, odd, n) {
            Some((false, odd))
        } else {
            None
        };
        debug!("parity shape over {n} marks: {found:?}");
        found
    }

    /// Determines which priorities would have to be accepting: every mark used in an `Inf`
    /// term must have the same parity as mark 0 would have if it were used.
    fn parity_candidate(&self) -> Option<bool> {
        let (inf, _) = self.formula().used_inf_fin_sets();
        let odd = !inf.has(0);
        inf.sets().all(|s| (s & 1 == 1) == odd).then_some(odd)
    }
}

#[cfg(feature = "oracle")]
impl AcceptanceCondition {
    /// Like [`AcceptanceCondition::is_parity`], but if the formula does not have the
    /// canonical shape, it is compared semantically against the max and min parity formulas.
    pub fn is_parity_equiv(
        &self,
        oracle: &mut BddOracle,
    ) -> Result<Option<(bool, bool)>, AcceptanceError> {
        if let Some(found) = self.is_parity() {
            return Ok(Some(found));
        }
        let Some(odd) = self.parity_candidate() else {
            return Ok(None);
        };
        let n = self.num_sets();
        for max in [true, false] {
            if self
                .formula()
                .equiv(&AcceptanceFormula::parity(max, odd, n), oracle)?
            {
                return Ok(Some((max, odd)));
            }
        }
        Ok(None)
    }

    /// Like [`AcceptanceCondition::is_rabin`], but falls back to a semantic comparison with
    /// [`AcceptanceFormula::rabin`].
    pub fn is_rabin_equiv(&self, oracle: &mut BddOracle) -> Result<Option<usize>, AcceptanceError> {
        if let Some(pairs) = self.is_rabin() {
            return Ok(Some(pairs));
        }
        let pairs = self.num_sets() / 2;
        if self.num_sets() % 2 == 1 {
            return Ok(None);
        }
        let same = self.formula().equiv(&AcceptanceFormula::rabin(pairs), oracle)?;
        Ok(same.then_some(pairs))
    }

    /// Like [`AcceptanceCondition::is_streett`], but falls back to a semantic comparison with
    /// [`AcceptanceFormula::streett`].
    pub fn is_streett_equiv(
        &self,
        oracle: &mut BddOracle,
    ) -> Result<Option<usize>, AcceptanceError> {
        if let Some(pairs) = self.is_streett() {
            return Ok(Some(pairs));
        }
        let pairs = self.num_sets() / 2;
        if self.num_sets() % 2 == 1 {
            return Ok(None);
        }
        let same = self
            .formula()
            .equiv(&AcceptanceFormula::streett(pairs), oracle)?;
        Ok(same.then_some(pairs))
    }
}

/// The two leaves below the binary operator at `pos`, the one of kind `first` comes first.
fn leaf_pair(
    formula: &AcceptanceFormula,
    pos: usize,
    first: OpKind,
) -> Option<((OpKind, MarkSet), (OpKind, MarkSet))> {
    let upper = (formula.op(pos - 1)?, formula.mark(pos - 1));
    let lower = (formula.op(pos - 3)?, formula.mark(pos - 3));
    if lower.0 == first {
        Some((lower, upper))
    } else {
        Some((upper, lower))
    }
}

#[cfg(test)]
mod tests {
    use crate::{AcceptanceCondition as C, AcceptanceFormula as F};

    #[test]
    fn simple_shapes() {
        assert!(C::all().is_all());
        assert!(C::none().is_none());
        assert!(!C::new(1).is_all());
        assert!(C::buchi().is_buchi());
        assert!(C::cobuchi().is_co_buchi());
        assert!(!C::cobuchi().is_buchi());
        assert!(C::generalized_buchi(3).is_generalized_buchi());
        assert!(C::all().is_generalized_buchi());
        assert!(!C::with_formula(4, F::generalized_buchi(3)).is_generalized_buchi());
        assert!(C::generalized_co_buchi(2).is_generalized_co_buchi());
        assert!(C::none().is_generalized_co_buchi());
    }

    #[test_log::test]
    fn rabin_and_streett() {
        for n in 1..5 {
            assert_eq!(C::rabin(n).is_rabin(), Some(n));
            assert_eq!(C::streett(n).is_streett(), Some(n));
            assert_eq!(C::rabin(n).is_streett(), None);
            assert_eq!(C::streett(n).is_rabin(), None);
        }
        assert_eq!(C::none().is_rabin(), Some(0));
        assert_eq!(C::all().is_streett(), Some(0));
        assert_eq!(C::with_formula(2, F::f()).is_rabin(), None);
        // one mark too many
        assert_eq!(C::with_formula(5, F::rabin(2)).is_rabin(), None);
        // pairs numbered the other way around
        let swapped = C::with_formula(2, F::inf([0]) & F::fin([1]));
        assert_eq!(swapped.is_rabin(), None);
    }

    #[test]
    fn complemented_rabin_is_streett() {
        let cond = C::rabin(3).complement();
        assert_eq!(cond.is_streett(), None);
        let relabeled = C::with_formula(
            4,
            (F::fin([0]) | F::inf([1])) & (F::inf([3]) | F::fin([2])),
        );
        assert_eq!(relabeled.is_streett(), Some(2));
    }

    #[test]
    fn generalized_rabin() {
        assert_eq!(
            C::generalized_rabin(&[1, 2]).is_generalized_rabin(),
            Some(vec![1, 2])
        );
        assert_eq!(
            C::generalized_rabin(&[3, 0, 1]).is_generalized_rabin(),
            Some(vec![3, 0, 1])
        );
        assert_eq!(C::rabin(2).is_generalized_rabin(), Some(vec![1, 1]));
        assert_eq!(C::generalized_co_buchi(3).is_generalized_rabin(), Some(vec![0, 0, 0]));
        assert_eq!(C::generalized_buchi(2).is_generalized_rabin(), None);
        // Inf marks that do not follow their Fin mark
        let gapped = C::with_formula(4, (F::fin([0]) & F::inf([2, 3])) | F::fin([1]));
        assert_eq!(gapped.is_generalized_rabin(), None);
        // a mark that is not used
        assert_eq!(C::with_formula(6, F::rabin(2)).is_generalized_rabin(), None);
    }

    #[test]
    fn generalized_streett() {
        let gs = C::generalized_rabin(&[1, 2]).complement();
        assert_eq!(gs.is_generalized_streett(), Some(vec![1, 2]));
        assert_eq!(
            C::rabin(2).complement().is_generalized_streett(),
            Some(vec![1, 1])
        );
        // Streett pairs number the Fin mark first
        assert_eq!(C::streett(2).is_generalized_streett(), None);
        assert_eq!(C::generalized_buchi(2).is_generalized_streett(), Some(vec![0, 0]));
        assert_eq!(C::rabin(1).is_generalized_streett(), None);
    }

    #[test]
    fn parity() {
        for n in 1..7 {
            for max in [true, false] {
                for odd in [true, false] {
                    let found = C::parity(max, odd, n).is_parity();
                    let (m, o) = found.unwrap();
                    assert_eq!(o, odd);
                    // with a single priority min and max coincide
                    assert!(m == max || n == 1);
                }
            }
        }
        assert_eq!(C::all().is_parity(), Some((true, true)));
        assert_eq!(C::none().is_parity(), Some((true, false)));
        assert_eq!(C::generalized_buchi(5).is_parity(), None);
        assert_eq!(C::rabin(2).is_parity(), None);
    }

    #[cfg(feature = "oracle")]
    #[test_log::test]
    fn parity_up_to_equivalence() {
        use crate::BddOracle;
        let mut oracle = BddOracle::new();
        let cond: C = "Inf(4) | (Fin(3)&Inf(2)) | (Fin(3)&Fin(1)&Inf(0))"
            .parse()
            .unwrap();
        assert_eq!(cond.num_sets(), 5);
        assert_eq!(cond.is_parity(), None);
        assert_eq!(cond.is_parity_equiv(&mut oracle), Ok(Some((true, false))));
        assert_eq!(oracle.allocated(), 0);
        assert_eq!(
            C::generalized_buchi(5).is_parity_equiv(&mut oracle),
            Ok(None)
        );
    }

    #[cfg(feature = "oracle")]
    #[test]
    fn rabin_up_to_equivalence() {
        use crate::BddOracle;
        let mut oracle = BddOracle::new();
        let cond = C::with_formula(4, F::rabin(2).to_cnf(&mut oracle).unwrap());
        assert_eq!(cond.is_rabin(), None);
        assert_eq!(cond.is_rabin_equiv(&mut oracle), Ok(Some(2)));
        let cond = C::with_formula(4, F::streett(2).to_dnf(&mut oracle).unwrap());
        assert_eq!(cond.is_streett_equiv(&mut oracle), Ok(Some(2)));
        assert_eq!(C::buchi().is_rabin_equiv(&mut oracle), Ok(None));
    }
}
