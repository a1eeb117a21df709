use std::fmt::{Debug, Display};

use tracing::{debug, error};

use crate::{error::AcceptanceError, formula::AcceptanceFormula, mark::MarkSet, Show};

/// An acceptance formula together with the number of marks it ranges over. This is what an
/// automaton carries around: the marks `0..num_sets` may occur on its transitions and the
/// formula decides which sets of infinitely often seen marks are accepting.
///
/// Every fallible operation computes its result before touching `self`, so a failed call
/// leaves the condition unchanged.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct AcceptanceCondition {
    num_sets: usize,
    formula: AcceptanceFormula,
    uses_fin: bool,
}

impl AcceptanceCondition {
    /// Creates a condition over `num_sets` marks that accepts everything.
    ///
    /// # Panics
    /// If `num_sets` exceeds [`MarkSet::CAPACITY`].
    pub fn new(num_sets: usize) -> Self {
        Self::with_formula(num_sets, AcceptanceFormula::t())
    }

    /// Creates a condition over `num_sets` marks with the given formula.
    ///
    /// # Panics
    /// If `num_sets` exceeds [`MarkSet::CAPACITY`] or the formula uses a mark outside of
    /// `0..num_sets`, see [`AcceptanceCondition::try_with_formula`] for the checked variant.
    pub fn with_formula(num_sets: usize, formula: AcceptanceFormula) -> Self {
        match Self::try_with_formula(num_sets, formula) {
            Ok(cond) => cond,
            Err(err) => {
                error!("cannot create condition over {num_sets} marks: {err}");
                panic!("invalid acceptance condition: {err}");
            }
        }
    }

    /// Creates a condition over `num_sets` marks with the given formula, failing with
    /// [`AcceptanceError::CapacityExceeded`] if `num_sets` exceeds [`MarkSet::CAPACITY`] or
    /// if the formula uses a mark that is not below `num_sets`.
    pub fn try_with_formula(
        num_sets: usize,
        formula: AcceptanceFormula,
    ) -> Result<Self, AcceptanceError> {
        if num_sets > MarkSet::CAPACITY {
            return Err(AcceptanceError::CapacityExceeded {
                requested: num_sets,
                capacity: MarkSet::CAPACITY,
            });
        }
        check_marks(num_sets, &formula)?;
        let uses_fin = formula.uses_fin();
        Ok(Self {
            num_sets,
            formula,
            uses_fin,
        })
    }

    /// Creates a condition that ranges over precisely the marks up to the largest one used
    /// in `formula`.
    pub fn from_formula(formula: AcceptanceFormula) -> Self {
        Self::with_formula(formula.used_sets().max_set(), formula)
    }

    /// The condition over no marks that accepts everything.
    pub fn all() -> Self {
        Self::new(0)
    }

    /// The condition over no marks that accepts nothing.
    pub fn none() -> Self {
        Self::with_formula(0, AcceptanceFormula::f())
    }

    /// Büchi acceptance over a single mark.
    pub fn buchi() -> Self {
        Self::with_formula(1, AcceptanceFormula::buchi())
    }

    /// co-Büchi acceptance over a single mark.
    pub fn cobuchi() -> Self {
        Self::with_formula(1, AcceptanceFormula::cobuchi())
    }

    /// Generalized Büchi acceptance over `n` marks.
    pub fn generalized_buchi(n: usize) -> Self {
        Self::with_formula(n, AcceptanceFormula::generalized_buchi(n))
    }

    /// Generalized co-Büchi acceptance over `n` marks.
    pub fn generalized_co_buchi(n: usize) -> Self {
        Self::with_formula(n, AcceptanceFormula::generalized_co_buchi(n))
    }

    /// Rabin acceptance with `n` pairs, using `2n` marks.
    pub fn rabin(n: usize) -> Self {
        Self::with_formula(2 * n, AcceptanceFormula::rabin(n))
    }

    /// Streett acceptance with `n` pairs, using `2n` marks.
    pub fn streett(n: usize) -> Self {
        Self::with_formula(2 * n, AcceptanceFormula::streett(n))
    }

    /// Generalized Rabin acceptance, see [`AcceptanceFormula::generalized_rabin`].
    pub fn generalized_rabin(counts: &[usize]) -> Self {
        let num_sets = counts.iter().map(|c| c + 1).sum();
        Self::with_formula(num_sets, AcceptanceFormula::generalized_rabin(counts))
    }

    /// Parity acceptance over `n` priorities, see [`AcceptanceFormula::parity`].
    pub fn parity(max: bool, odd: bool, n: usize) -> Self {
        Self::with_formula(n, AcceptanceFormula::parity(max, odd, n))
    }

    /// Number of marks the condition ranges over.
    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    /// The acceptance formula.
    pub fn formula(&self) -> &AcceptanceFormula {
        &self.formula
    }

    /// Returns true if the formula has a `Fin` term with non-empty operand.
    pub fn uses_fin(&self) -> bool {
        self.uses_fin
    }

    /// The set of all marks `0..num_sets`.
    pub fn all_sets(&self) -> MarkSet {
        MarkSet::all(self.num_sets)
    }

    /// Returns true if the formula is trivially true.
    pub fn is_t(&self) -> bool {
        self.formula.is_t()
    }

    /// Returns true if the formula is trivially false.
    pub fn is_f(&self) -> bool {
        self.formula.is_f()
    }

    /// Adds `n` fresh marks and returns the index of the first one. With `n = 0` this is
    /// just the current number of marks.
    pub fn add_sets(&mut self, n: usize) -> Result<usize, AcceptanceError> {
        let first = self.num_sets;
        if first + n > MarkSet::CAPACITY {
            return Err(AcceptanceError::CapacityExceeded {
                requested: first + n,
                capacity: MarkSet::CAPACITY,
            });
        }
        self.num_sets += n;
        debug!("condition now ranges over {} marks", self.num_sets);
        Ok(first)
    }

    /// Adds a single fresh mark and returns its index.
    pub fn add_set(&mut self) -> Result<usize, AcceptanceError> {
        self.add_sets(1)
    }

    /// The singleton set containing mark `u`, which must be one of the marks of the condition.
    pub fn mark(&self, u: usize) -> Result<MarkSet, AcceptanceError> {
        if u >= self.num_sets {
            return Err(AcceptanceError::CapacityExceeded {
                requested: u,
                capacity: self.num_sets,
            });
        }
        Ok(MarkSet::from_indices([u]))
    }

    /// The marks of the condition that are not in `m`.
    pub fn comp(&self, m: MarkSet) -> MarkSet {
        self.all_sets() - m
    }

    /// Replaces the formula, keeping the number of marks. Fails without changing anything if
    /// the new formula uses a mark that is not below [`AcceptanceCondition::num_sets`].
    pub fn set_acceptance(&mut self, formula: AcceptanceFormula) -> Result<(), AcceptanceError> {
        check_marks(self.num_sets, &formula)?;
        self.uses_fin = formula.uses_fin();
        self.formula = formula;
        Ok(())
    }

    /// See [`AcceptanceFormula::accepting`].
    pub fn accepting(&self, inf: MarkSet) -> bool {
        self.formula.accepting(inf)
    }

    /// See [`AcceptanceFormula::inf_satisfiable`].
    pub fn inf_satisfiable(&self, inf: MarkSet) -> bool {
        self.formula.inf_satisfiable(inf)
    }

    /// See [`AcceptanceFormula::accepting_sets`].
    pub fn accepting_sets(&self, inf: MarkSet) -> Result<MarkSet, AcceptanceError> {
        self.formula.accepting_sets(inf)
    }

    /// Given the mark sets occurring on the transitions of some cycle, computes the marks
    /// that can be dropped because they always occur together with another mark. Marks are
    /// considered in ascending order and a mark that has been found useless is never used
    /// to make others useless.
    ///
    /// ```
    /// use automata_acceptance::{AcceptanceCondition, MarkSet};
    /// let cond = AcceptanceCondition::generalized_buchi(3);
    /// let seen = [MarkSet::from_indices([0, 1]), MarkSet::from_indices([2])];
    /// assert_eq!(cond.useless(seen), MarkSet::from_indices([1]));
    /// ```
    pub fn useless<I: IntoIterator<Item = MarkSet>>(&self, sets: I) -> MarkSet {
        let sets: Vec<MarkSet> = sets.into_iter().collect();
        let all = self.all_sets();
        let mut useless = MarkSet::empty();
        for x in 0..self.num_sets {
            if useless.has(x) {
                continue;
            }
            let mut candidates = all - (useless | MarkSet::from_indices([x]));
            for v in sets.iter().filter(|v| v.has(x)) {
                candidates &= *v;
                if candidates.is_empty() {
                    break;
                }
            }
            useless |= candidates;
        }
        useless
    }

    /// Renders a set of marks as `{0,3}`, the empty set is rendered as the empty string.
    pub fn format(&self, m: MarkSet) -> String {
        if m.is_empty() {
            String::new()
        } else {
            m.to_string()
        }
    }

    /// Removes the marks in `rem` from the condition, see [`AcceptanceFormula::strip`].
    pub fn strip(&self, rem: MarkSet, missing: bool) -> Self {
        let removed = (self.all_sets() & rem).count();
        Self::with_formula(self.num_sets - removed, self.formula.strip(rem, missing))
    }

    /// The condition over the same marks that accepts precisely what `self` rejects.
    pub fn complement(&self) -> Self {
        Self::with_formula(self.num_sets, self.formula.complement())
    }

    /// The conjunction of `self` and `other`, where the marks of `other` are moved behind
    /// the ones of `self`.
    pub fn join(&self, other: &Self) -> Result<Self, AcceptanceError> {
        let num_sets = self.num_sets + other.num_sets;
        if num_sets > MarkSet::CAPACITY {
            return Err(AcceptanceError::CapacityExceeded {
                requested: num_sets,
                capacity: MarkSet::CAPACITY,
            });
        }
        let shifted = other.formula.shift_left(self.num_sets)?;
        Ok(Self::with_formula(
            num_sets,
            self.formula.clone() & shifted,
        ))
    }
}

/// Every mark of `formula` has to be below `num_sets`.
fn check_marks(num_sets: usize, formula: &AcceptanceFormula) -> Result<(), AcceptanceError> {
    let used = formula.used_sets().max_set();
    if used > num_sets {
        return Err(AcceptanceError::CapacityExceeded {
            requested: used - 1,
            capacity: num_sets,
        });
    }
    Ok(())
}

impl Display for AcceptanceCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.num_sets, self.formula)
    }
}

impl Debug for AcceptanceCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Show for AcceptanceCondition {
    fn show(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::AcceptanceCondition as C;
    use crate::{AcceptanceError, AcceptanceFormula as F, MarkSet};

    fn ms<const N: usize>(marks: [usize; N]) -> MarkSet {
        MarkSet::from_indices(marks)
    }

    #[test]
    fn construction() {
        let c = C::from_formula(F::inf([0]) | F::fin([3]));
        assert_eq!(c.num_sets(), 4);
        assert!(c.uses_fin());
        assert_eq!(c.all_sets(), MarkSet::all(4));
        assert!(!C::generalized_buchi(3).uses_fin());
        assert_eq!(C::generalized_rabin(&[1, 2]).num_sets(), 5);
        assert_eq!(C::rabin(3).num_sets(), 6);
        assert_eq!(C::from_formula(F::t()).num_sets(), 0);
    }

    #[test]
    #[should_panic]
    fn too_many_sets() {
        C::new(33);
    }

    #[test_log::test]
    fn adding_sets() {
        let mut c = C::new(2);
        assert_eq!(c.add_sets(0), Ok(2));
        assert_eq!(c.add_sets(3), Ok(2));
        assert_eq!(c.add_set(), Ok(5));
        assert_eq!(c.num_sets(), 6);
        assert!(matches!(
            c.add_sets(30),
            Err(AcceptanceError::CapacityExceeded { .. })
        ));
        assert_eq!(c.num_sets(), 6);
        assert_eq!(c.mark(4), Ok(ms([4])));
        assert!(c.mark(6).is_err());
    }

    #[test]
    fn formulas_stay_within_the_marks() {
        assert_eq!(
            C::try_with_formula(1, F::inf([1])),
            Err(AcceptanceError::CapacityExceeded {
                requested: 1,
                capacity: 1
            })
        );
        assert!(C::try_with_formula(33, F::t()).is_err());
        assert_eq!(C::try_with_formula(2, F::inf([1])), Ok(C::from_formula(F::inf([1]))));

        let mut c = C::buchi();
        assert!(c.set_acceptance(F::fin([0]) | F::inf([3])).is_err());
        assert_eq!(c, C::buchi());
    }

    #[test]
    #[should_panic]
    fn formula_beyond_the_marks_panics() {
        C::with_formula(1, F::inf([1]));
    }

    #[test]
    fn joined_marks_stay_distinct() {
        let a = C::with_formula(2, F::inf([1]));
        let joined = a.join(&C::buchi()).unwrap();
        assert_eq!(joined.num_sets(), 3);
        assert_eq!(joined.formula(), &F::inf([1, 2]));
        assert!(!joined.accepting(MarkSet::from_indices([1])));
    }

    #[test]
    fn complements_and_formatting() {
        let c = C::new(4);
        assert_eq!(c.comp(ms([1, 2])), ms([0, 3]));
        assert_eq!(c.format(ms([0, 3])), "{0,3}");
        assert_eq!(c.format(MarkSet::empty()), "");
    }

    #[test]
    fn replacing_the_formula() {
        let mut c = C::generalized_buchi(2);
        c.set_acceptance(F::fin([0]) & F::inf([1])).unwrap();
        assert!(c.uses_fin());
        assert_eq!(c.num_sets(), 2);
        assert!(c.accepting(ms([1])));
        assert!(!c.accepting(ms([0, 1])));
        assert!(c.inf_satisfiable(ms([0, 1])));
        assert_eq!(c.accepting_sets(ms([1])), Err(AcceptanceError::UnsupportedFin));
    }

    #[test]
    fn useless_marks() {
        let c = C::generalized_buchi(4);
        // 0 and 1 always occur together, as do 2 and 3
        let seen = [ms([0, 1]), ms([0, 1, 2, 3]), ms([2, 3])];
        assert_eq!(c.useless(seen), ms([1, 3]));
        // mark 1 never occurs, so nothing restricts the marks considered together with it
        assert_eq!(c.useless([ms([0])]), ms([0, 2, 3]));
        assert_eq!(c.useless([ms([0]), ms([1]), ms([2]), ms([3])]), MarkSet::empty());
    }

    #[test]
    fn joining() {
        let a = C::buchi();
        let b = C::from_formula(F::inf([0]) | F::fin([1]));
        let joined = a.join(&b).unwrap();
        assert_eq!(joined.num_sets(), 3);
        assert_eq!(
            joined.formula(),
            &(F::inf([0]) & (F::inf([1]) | F::fin([2])))
        );
        assert!(joined.uses_fin());
        assert!(C::new(20).join(&C::new(20)).is_err());
    }

    #[test]
    fn stripping_and_complementing() {
        let c = C::generalized_buchi(4).strip(ms([1, 7]), false);
        assert_eq!(c.num_sets(), 3);
        assert_eq!(c.formula(), &F::generalized_buchi(3));
        let r = C::rabin(1).complement();
        assert_eq!(r.num_sets(), 2);
        assert!(r.accepting(ms([0, 1])));
        assert!(!r.accepting(ms([1])));
    }

    #[test]
    fn display() {
        assert_eq!(C::buchi().to_string(), "(1, Inf(0))");
        assert_eq!(C::all().to_string(), "(0, t)");
        assert_eq!(C::none().to_string(), "(0, f)");
    }
}
