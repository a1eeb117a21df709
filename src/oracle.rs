use std::ops::Range;

use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet};
use itertools::Itertools;
use tracing::{trace, warn};

use crate::error::OracleError;

/// A conjunction of literals, each given as a variable index and its polarity. Variables that
/// do not appear are unconstrained. Literals are sorted by variable index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Cube(Vec<(usize, bool)>);

impl Cube {
    /// The literals of the cube.
    pub fn literals(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.0.iter().copied()
    }

    /// The value the cube forces on variable `var`, if any.
    pub fn value(&self, var: usize) -> Option<bool> {
        self.0.iter().find(|(v, _)| *v == var).map(|(_, b)| *b)
    }

    /// Number of literals.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the cube has no literals, i.e. it is the constant true.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn with(mut self, var: usize, value: bool) -> Self {
        self.0.push((var, value));
        self
    }
}

/// Decision diagram backend used for semantic questions about acceptance formulas, like
/// equivalence or the computation of normal forms.
///
/// The oracle owns a fixed universe of boolean variables. Callers reserve contiguous blocks
/// of them with [`BddOracle::alloc_vars`] and give them back with
/// [`BddOracle::release_vars`], in stack order. One oracle must not be shared between
/// threads without external locking, every call takes it by reference instead of relying
/// on global state.
pub struct BddOracle {
    vars: BddVariableSet,
    capacity: usize,
    next: usize,
}

impl std::fmt::Debug for BddOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BddOracle")
            .field("capacity", &self.capacity)
            .field("allocated", &self.next)
            .finish()
    }
}

impl Default for BddOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl BddOracle {
    /// Number of variables an oracle created with [`BddOracle::new`] provides.
    pub const DEFAULT_VARIABLES: u16 = 64;

    /// Creates an oracle with [`BddOracle::DEFAULT_VARIABLES`] variables.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_VARIABLES)
    }

    /// Creates an oracle that can hand out up to `capacity` variables at once.
    pub fn with_capacity(capacity: u16) -> Self {
        Self {
            vars: BddVariableSet::new_anonymous(capacity),
            capacity: capacity as usize,
            next: 0,
        }
    }

    /// Number of variables that are currently allocated.
    pub fn allocated(&self) -> usize {
        self.next
    }

    /// Reserves `n` fresh variables and returns the index of the first one.
    pub fn alloc_vars(&mut self, n: usize) -> Result<usize, OracleError> {
        let available = self.capacity - self.next;
        if n > available {
            return Err(OracleError::VariablesExhausted {
                requested: n,
                available,
            });
        }
        let base = self.next;
        self.next += n;
        trace!("allocated variables {base}..{}", self.next);
        Ok(base)
    }

    /// Releases every variable from `base` onwards. Blocks have to be released in the
    /// reverse order of their allocation.
    pub fn release_vars(&mut self, base: usize) {
        if base > self.next {
            warn!("releasing variables from {base}, but only {} are allocated", self.next);
            return;
        }
        trace!("released variables {base}..{}", self.next);
        self.next = base;
    }

    /// Allocates `n` variables, runs `f` with the index of the first one and releases them
    /// again, no matter whether `f` succeeds.
    pub fn scoped<T, E, F>(&mut self, n: usize, f: F) -> Result<T, E>
    where
        E: From<OracleError>,
        F: FnOnce(&mut Self, usize) -> Result<T, E>,
    {
        let base = self.alloc_vars(n)?;
        let out = f(self, base);
        self.release_vars(base);
        out
    }

    fn variable(&self, i: usize) -> BddVariable {
        debug_assert!(i < self.capacity, "variable {i} is out of range");
        BddVariable::from_index(i)
    }

    /// The function that is true iff variable `i` is.
    pub fn var(&self, i: usize) -> Bdd {
        self.vars.mk_var(self.variable(i))
    }

    /// The function that is true iff variable `i` is false.
    pub fn not_var(&self, i: usize) -> Bdd {
        self.vars.mk_not_var(self.variable(i))
    }

    /// Constant true.
    pub fn mk_true(&self) -> Bdd {
        self.vars.mk_true()
    }

    /// Constant false.
    pub fn mk_false(&self) -> Bdd {
        self.vars.mk_false()
    }

    /// Decides whether `f` and `g` denote the same function.
    pub fn equal(&self, f: &Bdd, g: &Bdd) -> bool {
        f.xor(g).is_false()
    }

    /// Restricts `f` by fixing variable `i` to `value`.
    pub fn restrict(&self, f: &Bdd, i: usize, value: bool) -> Bdd {
        f.var_restrict(self.variable(i), value)
    }

    /// A satisfying assignment of `f` over the variables in `vars`, or `None` if `f` is
    /// unsatisfiable.
    pub fn sat_one(&self, f: &Bdd, vars: Range<usize>) -> Option<Cube> {
        let valuation = f.sat_witness()?;
        Some(Cube(
            vars.map(|i| (i, valuation.value(self.variable(i))))
                .collect(),
        ))
    }

    fn depends_on(&self, f: &Bdd, i: usize) -> bool {
        !self.equal(&self.restrict(f, i, true), &self.restrict(f, i, false))
    }

    /// Computes an irredundant sum of products of `f`, where only the variables in `vars`
    /// may occur in `f`. The returned cubes are pairwise distinct, their disjunction is `f`
    /// and no literal or cube can be dropped without changing that.
    pub fn isop(&self, f: &Bdd, vars: Range<usize>) -> Vec<Cube> {
        let order = vars.collect_vec();
        let (_, cubes) = self.isop_between(f, f, &order);
        trace!("isop produced {} cubes", cubes.len());
        cubes
            .into_iter()
            .map(|mut c| {
                c.0.sort_unstable();
                c
            })
            .collect()
    }

    /// Minato-Morreale recursion computing a cover `c` with `lower ≤ c ≤ upper`.
    fn isop_between(&self, lower: &Bdd, upper: &Bdd, vars: &[usize]) -> (Bdd, Vec<Cube>) {
        if lower.is_false() {
            return (self.mk_false(), vec![]);
        }
        if upper.is_true() {
            return (self.mk_true(), vec![Cube::default()]);
        }
        let Some(idx) = vars
            .iter()
            .position(|&v| self.depends_on(lower, v) || self.depends_on(upper, v))
        else {
            // both are constants and lower is not false, so the interval is [true, true]
            return (self.mk_true(), vec![Cube::default()]);
        };
        let x = vars[idx];
        let rest = &vars[idx + 1..];

        let (l0, l1) = (self.restrict(lower, x, false), self.restrict(lower, x, true));
        let (u0, u1) = (self.restrict(upper, x, false), self.restrict(upper, x, true));

        let (c0, cubes0) = self.isop_between(&l0.and_not(&u1), &u0, rest);
        let (c1, cubes1) = self.isop_between(&l1.and_not(&u0), &u1, rest);
        let rest_lower = l0.and_not(&c0).or(&l1.and_not(&c1));
        let (cd, cubesd) = self.isop_between(&rest_lower, &u0.and(&u1), rest);

        let cover = self
            .not_var(x)
            .and(&c0)
            .or(&self.var(x).and(&c1))
            .or(&cd);
        let cubes = cubes0
            .into_iter()
            .map(|c| c.with(x, false))
            .chain(cubes1.into_iter().map(|c| c.with(x, true)))
            .chain(cubesd)
            .collect();
        (cover, cubes)
    }

    /// Rebuilds the function described by a list of cubes.
    pub fn from_cubes(&self, cubes: &[Cube]) -> Bdd {
        cubes.iter().fold(self.mk_false(), |acc, cube| {
            let term = cube.literals().fold(self.mk_true(), |t, (v, b)| {
                t.and(&if b { self.var(v) } else { self.not_var(v) })
            });
            acc.or(&term)
        })
    }
}
