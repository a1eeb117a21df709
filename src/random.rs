use tracing::trace;

use crate::formula::AcceptanceFormula;

impl AcceptanceFormula {
    /// Generates a random formula over the marks `0..n`. Every mark appears in an `Inf` or a
    /// `Fin` term with equal probability, after each term the same mark is used again with
    /// probability `reuse`. The terms are then combined pairwise in random order, each time
    /// with `&` or `|` at random, until a single formula is left. For `n = 0` this is
    /// [`AcceptanceFormula::t`].
    ///
    /// This is meant for testing, the result is in general neither minimal nor free of
    /// redundant terms.
    ///
    /// # Panics
    /// If `n` exceeds [`crate::MarkSet::CAPACITY`] or if `reuse` is not below 1, which
    /// would never terminate.
    pub fn random(n: usize, reuse: f64, rng: &mut fastrand::Rng) -> Self {
        assert!(reuse < 1.0, "reuse probability has to be below 1");
        let mut terms = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            terms.push(if rng.bool() {
                Self::inf([i])
            } else {
                Self::fin([i])
            });
            if reuse <= 0.0 || rng.f64() >= reuse {
                i += 1;
            }
        }
        trace!("combining {} random terms over {n} marks", terms.len());

        while terms.len() > 1 {
            let last = terms.swap_remove(rng.usize(..terms.len()));
            let other = rng.usize(..terms.len());
            if rng.bool() {
                terms[other] |= last;
            } else {
                terms[other] &= last;
            }
        }
        terms.pop().unwrap_or_default()
    }
}
