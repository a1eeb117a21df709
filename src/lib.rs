//! Library for working with the acceptance conditions of ω-automata in Rust.
//!
//! An ω-automaton marks some of its transitions with acceptance marks, which are small
//! integers. A run is accepting if the set of marks it sees infinitely often satisfies the
//! acceptance formula of the automaton. Such a formula is a positive boolean combination of
//! terms `Inf(m)`, which demands that every mark in `m` is seen infinitely often, and `Fin(m)`,
//! which demands that some mark in `m` is seen only finitely often.
//!
//! The most important types are
//! - [`MarkSet`], a set of marks stored as a bitset.
//! - [`AcceptanceFormula`], a formula stored as a flat postfix sequence of nodes. All
//!   combinators (see [`AcceptanceFormula::and`] and [`AcceptanceFormula::or`]) simplify
//!   constants, merge `Inf` terms in conjunctions and `Fin` terms in disjunctions and flatten
//!   nested operators, so that formulas are kept in a small canonical shape.
//! - [`AcceptanceCondition`], a formula together with the number of marks it ranges over. It
//!   can be classified into the well-known shapes (Büchi, Rabin, Streett, parity, ...) and
//!   parsed from text such as `Rabin 2` or `Inf(0) | (Fin(1) & Inf(2))`.
//!
//! Questions that need reasoning about the boolean function a formula denotes, like
//! equivalence or the computation of normal forms, are answered through a `BddOracle`. It is
//! feature gated behind the `oracle` feature, just like the random generation of formulas is
//! gated behind the `random` feature. Both are enabled by default.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use automata_acceptance::prelude::*;` should be enough to use the package.
pub mod prelude {
    #[cfg(feature = "oracle")]
    pub use super::oracle::{BddOracle, Cube};
    pub use super::{
        error::{AcceptanceError, OracleError, SyntaxError},
        formula::{AcceptanceFormula, Node, OpKind},
        math,
        AcceptanceCondition, MarkSet, Show,
    };
}

/// Errors that can occur when building, evaluating or parsing acceptance conditions.
pub mod error;
pub use error::{AcceptanceError, OracleError, SyntaxError};

/// Sets of acceptance marks.
pub mod mark;
pub use mark::MarkSet;

/// Defines the postfix encoding of acceptance formulas and the combinators that keep it in
/// canonical shape.
pub mod formula;
pub use formula::{AcceptanceFormula, Node, OpKind};

/// Evaluation of formulas on the set of marks a run sees infinitely often.
mod eval;

/// Complementation and renumbering of formulas.
mod transform;

/// Normal forms and semantic questions, answered through the decision diagram oracle.
mod normal_form;

/// Recognition of the named acceptance shapes.
mod classify;

/// The acceptance condition, a formula together with the number of marks it ranges over.
pub mod condition;
pub use condition::AcceptanceCondition;

/// This module contains some definitions of mathematical objects which are used throughout the
/// crate and do not really fit to the top level.
pub mod math;

pub mod text;

/// Decision diagram backend for semantic questions about formulas. This is feature gated
/// behind the `oracle` feature.
#[cfg(feature = "oracle")]
pub mod oracle;
#[cfg(feature = "oracle")]
pub use oracle::{BddOracle, Cube};

/// Implements the generation of random acceptance formulas.
#[cfg(feature = "random")]
mod random;

/// Helper trait which can be used to display marks, formulas and such.
pub trait Show {
    /// Returns a human readable representation of `self`. This is mainly used for debugging
    /// purposes and in log messages.
    fn show(&self) -> String;
    /// Show a collection of the thing, for a collection of mark sets this should be
    /// `[{0,1}, {2}]`. By default this is unimplemented.
    fn show_collection<'a, I>(_iter: I) -> String
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
        I::IntoIter: DoubleEndedIterator,
    {
        unimplemented!("This operation makes no sense.")
    }
}

impl Show for usize {
    fn show(&self) -> String {
        self.to_string()
    }
    fn show_collection<'a, I: IntoIterator<Item = &'a Self>>(iter: I) -> String
    where
        Self: 'a,
        I::IntoIter: DoubleEndedIterator,
    {
        format!(
            "[{}]",
            itertools::Itertools::join(&mut iter.into_iter().map(|x| x.show()), ", ")
        )
    }
}

impl<S: Show> Show for Vec<S> {
    fn show(&self) -> String {
        S::show_collection(self.iter())
    }
}

impl<S: Show> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}
