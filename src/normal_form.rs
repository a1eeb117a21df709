use crate::formula::{AcceptanceFormula, OpKind};

#[cfg(feature = "oracle")]
use crate::{
    error::AcceptanceError,
    mark::MarkSet,
    math::{dense_numbering, Bijection},
    oracle::BddOracle,
};
#[cfg(feature = "oracle")]
use biodivine_lib_bdd::Bdd;
#[cfg(feature = "oracle")]
use std::ops::Range;
#[cfg(feature = "oracle")]
use tracing::{debug, trace};

impl AcceptanceFormula {
    /// Checks whether the formula is a disjunction of conjunctions, where every `Fin` term
    /// inside a conjunction has a single mark. Does not consult the oracle.
    pub fn is_dnf(&self) -> bool {
        self.has_normal_shape(OpKind::Or, OpKind::And, [OpKind::Fin, OpKind::FinNeg])
    }

    /// Checks whether the formula is a conjunction of disjunctions, where every `Inf` term
    /// inside a disjunction has a single mark. Does not consult the oracle.
    pub fn is_cnf(&self) -> bool {
        self.has_normal_shape(OpKind::And, OpKind::Or, [OpKind::Inf, OpKind::InfNeg])
    }

    fn has_normal_shape(&self, outer: OpKind, inner: OpKind, single: [OpKind; 2]) -> bool {
        if self.is_empty() || self.len() == 2 {
            return true;
        }
        let mut pos = self.len() - 1;
        // lowest position that belongs to an inner clause seen so far
        let mut scope = pos + 1;
        if self.op(pos) == Some(outer) {
            pos -= 1;
        }
        while pos > 0 {
            match self.op(pos) {
                Some(k) if k == outer => return false,
                Some(k) if k == inner => {
                    scope = scope.min(pos - self.size(pos));
                    pos -= 1;
                }
                Some(k) => {
                    if single.contains(&k) && self.mark(pos).count() > 1 && pos > scope {
                        return false;
                    }
                    pos = pos.saturating_sub(2);
                }
                None => return false,
            }
        }
        true
    }
}

#[cfg(feature = "oracle")]
impl AcceptanceFormula {
    /// Translates the subformula at `pos` into a decision diagram, mark `m` is represented
    /// by the variable `vars[m]`.
    pub(crate) fn to_bdd(
        &self,
        pos: usize,
        oracle: &BddOracle,
        vars: &Bijection<usize, usize>,
    ) -> Result<Bdd, AcceptanceError> {
        let var = |m: usize, positive: bool| match vars.get_by_left(&m) {
            Some(&v) if positive => oracle.var(v),
            Some(&v) => oracle.not_var(v),
            None => oracle.mk_false(),
        };
        match self.op(pos) {
            Some(OpKind::And) => {
                let mut res = oracle.mk_true();
                for c in self.children(pos) {
                    res = res.and(&self.to_bdd(c, oracle, vars)?);
                }
                Ok(res)
            }
            Some(OpKind::Or) => {
                let mut res = oracle.mk_false();
                for c in self.children(pos) {
                    res = res.or(&self.to_bdd(c, oracle, vars)?);
                }
                Ok(res)
            }
            Some(OpKind::Inf) => Ok(self
                .mark(pos)
                .sets()
                .fold(oracle.mk_true(), |acc, m| acc.and(&var(m, true)))),
            Some(OpKind::Fin) => Ok(self
                .mark(pos)
                .sets()
                .fold(oracle.mk_false(), |acc, m| acc.or(&var(m, false)))),
            _ => Err(AcceptanceError::NegatedLeaf),
        }
    }

    /// Runs `f` on the decision diagram of the formula, with one freshly allocated variable
    /// per mark of `used`. The variables are released afterwards.
    fn with_bdd<T, F>(
        &self,
        used: MarkSet,
        oracle: &mut BddOracle,
        f: F,
    ) -> Result<T, AcceptanceError>
    where
        F: FnOnce(
            &BddOracle,
            Bdd,
            &Bijection<usize, usize>,
            Range<usize>,
        ) -> Result<T, AcceptanceError>,
    {
        let n = used.count();
        oracle.scoped(n, |oracle, base| {
            let vars = dense_numbering(used, base);
            let bdd = match self.top() {
                Some(top) => self.to_bdd(top, oracle, &vars)?,
                None => oracle.mk_true(),
            };
            f(oracle, bdd, &vars, base..base + n)
        })
    }

    /// Computes an equivalent formula in disjunctive normal form. Every disjunct is a
    /// conjunction of single-mark `Fin` terms and at most one `Inf` term. Formulas with at
    /// most one leaf are returned unchanged.
    pub fn to_dnf(&self, oracle: &mut BddOracle) -> Result<Self, AcceptanceError> {
        if self.is_empty() || self.len() == 2 {
            return Ok(self.clone());
        }
        let used = self.used_sets();
        let dnf = self.with_bdd(used, oracle, |oracle, bdd, vars, range| {
            if bdd.is_true() {
                return Ok(Self::t());
            }
            if bdd.is_false() {
                return Ok(Self::f());
            }
            let mut res = Self::f();
            for cube in oracle.isop(&bdd, range) {
                let mut term = Self::t();
                let mut inf = MarkSet::empty();
                for (var, positive) in cube.literals() {
                    let Some(&mark) = vars.get_by_right(&var) else {
                        continue;
                    };
                    if positive {
                        inf.set(mark);
                    } else {
                        term = Self::fin([mark]) & term;
                    }
                }
                term &= Self::inf(inf);
                res = term | res;
            }
            Ok(res)
        })?;
        debug!("dnf of {} nodes has {} nodes", self.len(), dnf.len());
        Ok(dnf)
    }

    /// Computes an equivalent formula in conjunctive normal form, the dual of
    /// [`AcceptanceFormula::to_dnf`].
    pub fn to_cnf(&self, oracle: &mut BddOracle) -> Result<Self, AcceptanceError> {
        if self.is_empty() || self.len() == 2 {
            return Ok(self.clone());
        }
        let used = self.used_sets();
        let cnf = self.with_bdd(used, oracle, |oracle, bdd, vars, range| {
            if bdd.is_true() {
                return Ok(Self::t());
            }
            if bdd.is_false() {
                return Ok(Self::f());
            }
            let mut res = Self::t();
            for cube in oracle.isop(&bdd.not(), range) {
                let mut clause = Self::f();
                let mut fin = MarkSet::empty();
                for (var, positive) in cube.literals() {
                    let Some(&mark) = vars.get_by_right(&var) else {
                        continue;
                    };
                    if positive {
                        fin.set(mark);
                    } else {
                        clause = Self::inf([mark]) | clause;
                    }
                }
                clause |= Self::fin(fin);
                res = clause & res;
            }
            Ok(res)
        })?;
        debug!("cnf of {} nodes has {} nodes", self.len(), cnf.len());
        Ok(cnf)
    }

    /// Looks for a set of marks that, seen infinitely often, makes the formula fail. The
    /// first component tells whether such a set exists, the second is one such set.
    pub fn unsat_mark(&self, oracle: &mut BddOracle) -> Result<(bool, MarkSet), AcceptanceError> {
        if self.is_t() {
            return Ok((false, MarkSet::empty()));
        }
        if !self.uses_fin() {
            // without Fin terms, seeing nothing at all is rejecting
            return Ok((true, MarkSet::empty()));
        }
        let used = self.used_sets();
        self.with_bdd(used, oracle, |oracle, bdd, vars, range| {
            if bdd.is_true() {
                return Ok((false, MarkSet::empty()));
            }
            if bdd.is_false() {
                return Ok((true, MarkSet::empty()));
            }
            let witness: MarkSet = oracle
                .sat_one(&bdd.not(), range)
                .map(|cube| {
                    cube.literals()
                        .filter(|(_, positive)| *positive)
                        .filter_map(|(var, _)| vars.get_by_right(&var).copied())
                        .collect()
                })
                .unwrap_or_default();
            trace!("found rejecting set {witness}");
            Ok((true, witness))
        })
    }

    /// For a cycle that already sees the marks of `inf`, lists what is still needed to make
    /// it accepting (if `accepting` is true) or rejecting. Every inner list is one option,
    /// an entry `s ≥ 0` asks for set `s` to be present and an entry `-s-1` asks for set `s`
    /// to be absent.
    pub fn missing(
        &self,
        inf: MarkSet,
        accepting: bool,
        oracle: &mut BddOracle,
    ) -> Result<Vec<Vec<isize>>, AcceptanceError> {
        if self.is_empty() {
            return Ok(if accepting { vec![] } else { vec![vec![]] });
        }
        let used = self.used_sets();
        self.with_bdd(used, oracle, |oracle, bdd, vars, range| {
            let mut res = (inf & used).sets().fold(bdd, |f, m| match vars.get_by_left(&m) {
                Some(&v) => oracle.restrict(&f, v, true),
                None => f,
            });
            if accepting {
                res = res.not();
            }
            if res.is_false() {
                return Ok(vec![]);
            }
            Ok(oracle
                .isop(&res, range)
                .into_iter()
                .map(|cube| {
                    cube.literals()
                        .filter_map(|(var, positive)| {
                            let s = *vars.get_by_right(&var)? as isize;
                            Some(if positive { -s - 1 } else { s })
                        })
                        .collect()
                })
                .collect())
        })
    }

    /// Decides whether `self` and `other` accept the same sets of marks.
    pub fn equiv(&self, other: &Self, oracle: &mut BddOracle) -> Result<bool, AcceptanceError> {
        let used = self.used_sets() | other.used_sets();
        self.with_bdd(used, oracle, |oracle, bdd, vars, _| {
            let rhs = match other.top() {
                Some(top) => other.to_bdd(top, oracle, vars)?,
                None => oracle.mk_true(),
            };
            Ok(oracle.equal(&bdd, &rhs))
        })
    }
}
