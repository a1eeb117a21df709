use std::{
    cmp::Ordering,
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign},
};

use tracing::trace;

use crate::mark::MarkSet;

/// Named shapes such as Rabin, Streett or parity formulas.
mod shapes;

/// The kind of an operator node in an [`AcceptanceFormula`]. The order of the variants
/// matters, it is used for ordering formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpKind {
    /// Every mark of the operand is seen infinitely often.
    Inf,
    /// Some mark of the operand is seen only finitely often.
    Fin,
    /// Negated dual of [`OpKind::Inf`], only used as an intermediate representation.
    InfNeg,
    /// Negated dual of [`OpKind::Fin`], only used as an intermediate representation.
    FinNeg,
    /// Conjunction of the operand subtrees.
    And,
    /// Disjunction of the operand subtrees.
    Or,
}

impl OpKind {
    /// Returns true for the leaf operators, i.e. those whose single operand is a mark node.
    pub fn is_leaf(&self) -> bool {
        !matches!(self, OpKind::And | OpKind::Or)
    }
}

/// A single node of the postfix encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    /// Operand of a leaf operator.
    Mark(MarkSet),
    /// An operator together with the number of nodes in its operand subtrees.
    Op {
        /// What the operator does.
        kind: OpKind,
        /// Number of nodes below this operator, the operator itself is not counted.
        size: usize,
    },
}

/// A boolean combination of `Inf` and `Fin` terms, stored as a postfix sequence of [`Node`]s.
///
/// The operator at position `p` with `size` s owns the nodes `p - s .. p`, and its last operand
/// ends right at `p - 1`. This makes it possible to walk from any operator to its operands
/// without parent pointers, see [`AcceptanceFormula::children`]. The empty sequence is the
/// constant true and `Fin(∅)` is the constant false.
///
/// All combinators keep the formula in a canonical shape: at most one `Inf` term per
/// conjunction, placed first, and at most one `Fin` term per disjunction, placed first.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct AcceptanceFormula(Vec<Node>);

impl AcceptanceFormula {
    /// The formula that is always satisfied.
    pub fn t() -> Self {
        Self(Vec::new())
    }

    /// The formula that is never satisfied.
    pub fn f() -> Self {
        Self::leaf(OpKind::Fin, MarkSet::empty())
    }

    fn leaf(kind: OpKind, marks: MarkSet) -> Self {
        Self(vec![Node::Mark(marks), Node::Op { kind, size: 1 }])
    }

    /// `Inf(marks)`, which holds if every mark in `marks` is seen infinitely often. With no
    /// marks this is [`AcceptanceFormula::t`].
    pub fn inf<M: Into<MarkSet>>(marks: M) -> Self {
        let marks = marks.into();
        if marks.is_empty() {
            return Self::t();
        }
        Self::leaf(OpKind::Inf, marks)
    }

    /// `Fin(marks)`, which holds if some mark in `marks` is seen only finitely often.
    pub fn fin<M: Into<MarkSet>>(marks: M) -> Self {
        Self::leaf(OpKind::Fin, marks.into())
    }

    /// The negated dual of [`AcceptanceFormula::inf`].
    pub fn inf_neg<M: Into<MarkSet>>(marks: M) -> Self {
        Self::leaf(OpKind::InfNeg, marks.into())
    }

    /// The negated dual of [`AcceptanceFormula::fin`].
    pub fn fin_neg<M: Into<MarkSet>>(marks: M) -> Self {
        Self::leaf(OpKind::FinNeg, marks.into())
    }

    /// Gives access to the underlying nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.0
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty sequence, which is the constant true.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the formula is trivially true, i.e. empty or `Inf(∅)`.
    pub fn is_t(&self) -> bool {
        match self.top() {
            None => true,
            Some(p) => self.op(p) == Some(OpKind::Inf) && self.mark(p).is_empty(),
        }
    }

    /// Returns true if the formula is `Fin(∅)`.
    pub fn is_f(&self) -> bool {
        match self.top() {
            None => false,
            Some(p) => self.op(p) == Some(OpKind::Fin) && self.mark(p).is_empty(),
        }
    }

    /// Position of the outermost operator, `None` for the empty formula.
    pub fn top(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }

    /// Kind of the outermost operator.
    pub fn top_op(&self) -> Option<OpKind> {
        self.top().and_then(|p| self.op(p))
    }

    /// The operator at `pos`, if `pos` holds an operator.
    pub fn op(&self, pos: usize) -> Option<OpKind> {
        match self.0.get(pos) {
            Some(Node::Op { kind, .. }) => Some(*kind),
            _ => None,
        }
    }

    /// Number of nodes owned by the node at `pos`, zero for marks.
    pub fn size(&self, pos: usize) -> usize {
        match self.0.get(pos) {
            Some(Node::Op { size, .. }) => *size,
            _ => 0,
        }
    }

    /// The operand of the leaf operator at `pos`. Returns the empty set if `pos` is not a
    /// leaf operator.
    pub fn mark(&self, pos: usize) -> MarkSet {
        match pos.checked_sub(1).and_then(|p| self.0.get(p)) {
            Some(Node::Mark(m)) if self.op(pos).is_some_and(|k| k.is_leaf()) => *m,
            _ => MarkSet::empty(),
        }
    }

    /// Mutable access to the operand of the leaf operator at `pos`.
    pub(crate) fn mark_mut(&mut self, pos: usize) -> Option<&mut MarkSet> {
        if !self.op(pos).is_some_and(|k| k.is_leaf()) {
            return None;
        }
        match self.0.get_mut(pos.checked_sub(1)?) {
            Some(Node::Mark(m)) => Some(m),
            _ => None,
        }
    }

    /// Iterates over the positions of the operands of the operator at `pos`, starting with
    /// the last one, i.e. the one stored right below `pos`. Leaf operators have no children.
    pub fn children(&self, pos: usize) -> Children<'_> {
        let (end, low) = match self.0.get(pos) {
            Some(Node::Op { kind, size }) if !kind.is_leaf() => (pos, pos - size),
            _ => (pos, pos),
        };
        Children {
            formula: self,
            end,
            low,
        }
    }

    /// Copies the subtree whose outermost operator is at `pos`.
    pub fn subformula(&self, pos: usize) -> Self {
        let low = pos - self.size(pos);
        Self(self.0[low..=pos].to_vec())
    }

    fn push_op(&mut self, kind: OpKind) {
        let size = self.0.len();
        self.0.push(Node::Op { kind, size });
    }

    /// Finds an operand of the operator at `pos` that is a leaf of the given kind.
    fn find_child(&self, pos: usize, kind: OpKind) -> Option<usize> {
        self.children(pos).find(|&c| self.op(c) == Some(kind))
    }

    /// Merges two operands `self` and `rhs` under `op`. A leaf of kind `merge` that occurs
    /// at the top level of both sides is merged into a single leaf, a leaf that only the
    /// right side has is moved to the very front. Operands which are themselves `op` are
    /// flattened.
    fn combine(mut self, rhs: Self, op: OpKind, merge: OpKind) -> Self {
        let mut left = None;
        match self.top_op() {
            Some(k) if k == op => {
                let top = self.0.len() - 1;
                left = self.find_child(top, merge);
                self.0.pop();
            }
            Some(k) if k == merge => left = self.top(),
            _ => {}
        }

        let (rhs_top, rhs_end) = match rhs.top() {
            Some(p) if rhs.op(p) == Some(op) => (p, p),
            Some(p) => (p, p + 1),
            None => return self,
        };
        let right = if rhs.op(rhs_top) == Some(op) {
            rhs.find_child(rhs_top, merge)
        } else if rhs.op(rhs_top) == Some(merge) {
            Some(rhs_top)
        } else {
            None
        };

        match (left, right) {
            (Some(l), Some(r)) => {
                let extra = rhs.mark(r);
                if let Some(m) = self.mark_mut(l) {
                    *m |= extra;
                }
                self.0.extend_from_slice(&rhs.0[..r - 1]);
                self.0.extend_from_slice(&rhs.0[r + 1..rhs_end]);
            }
            (None, Some(r)) => {
                self.0.splice(0..0, rhs.0[r - 1..=r].iter().copied());
                self.0.extend_from_slice(&rhs.0[..r - 1]);
                self.0.extend_from_slice(&rhs.0[r + 1..rhs_end]);
            }
            _ => self.0.extend_from_slice(&rhs.0[..rhs_end]),
        }
        self.push_op(op);
        self
    }

    /// Conjunction of `self` and `rhs`. Constants are absorbed, `Inf(a) & Inf(b)` becomes
    /// `Inf(a ∪ b)` and nested conjunctions are flattened.
    pub fn and(self, rhs: Self) -> Self {
        if self.is_t() || rhs.is_f() {
            return rhs;
        }
        if rhs.is_t() || self.is_f() {
            return self;
        }
        match (self.top_op(), rhs.top_op()) {
            (Some(OpKind::Inf), Some(OpKind::Inf)) | (Some(OpKind::InfNeg), Some(OpKind::InfNeg)) => {
                self.union_tops(&rhs)
            }
            _ => {
                trace!("conjunction of {} and {} nodes", self.len(), rhs.len());
                self.combine(rhs, OpKind::And, OpKind::Inf)
            }
        }
    }

    /// Disjunction of `self` and `rhs`, the dual of [`AcceptanceFormula::and`] that merges
    /// `Fin` terms.
    pub fn or(self, rhs: Self) -> Self {
        if self.is_t() || rhs.is_f() {
            return self;
        }
        if rhs.is_t() || self.is_f() {
            return rhs;
        }
        match (self.top_op(), rhs.top_op()) {
            (Some(OpKind::Fin), Some(OpKind::Fin)) | (Some(OpKind::FinNeg), Some(OpKind::FinNeg)) => {
                self.union_tops(&rhs)
            }
            _ => {
                trace!("disjunction of {} and {} nodes", self.len(), rhs.len());
                self.combine(rhs, OpKind::Or, OpKind::Fin)
            }
        }
    }

    fn union_tops(mut self, rhs: &Self) -> Self {
        let extra = rhs.top().map(|p| rhs.mark(p)).unwrap_or_default();
        if let Some(m) = self.top().and_then(|p| self.mark_mut(p)) {
            *m |= extra;
        }
        self
    }

    /// All marks that occur in some leaf.
    pub fn used_sets(&self) -> MarkSet {
        self.0.iter().fold(MarkSet::empty(), |acc, node| match node {
            Node::Mark(m) => acc | *m,
            Node::Op { .. } => acc,
        })
    }

    /// The marks used in `Inf`/`InfNeg` leaves and those used in `Fin`/`FinNeg` leaves.
    pub fn used_inf_fin_sets(&self) -> (MarkSet, MarkSet) {
        let mut inf = MarkSet::empty();
        let mut fin = MarkSet::empty();
        for pos in 1..self.0.len() {
            match self.op(pos) {
                Some(OpKind::Inf | OpKind::InfNeg) => inf |= self.mark(pos),
                Some(OpKind::Fin | OpKind::FinNeg) => fin |= self.mark(pos),
                _ => {}
            }
        }
        (inf, fin)
    }

    /// Applies `f` to every mark node.
    pub(crate) fn map_marks<F: FnMut(MarkSet) -> MarkSet>(&mut self, mut f: F) {
        for node in self.0.iter_mut() {
            if let Node::Mark(m) = node {
                *m = f(*m);
            }
        }
    }
}

/// Iterator over the operand positions of an operator, see [`AcceptanceFormula::children`].
#[derive(Clone, Debug)]
pub struct Children<'a> {
    formula: &'a AcceptanceFormula,
    end: usize,
    low: usize,
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.end <= self.low {
            return None;
        }
        let top = self.end - 1;
        self.end = top.saturating_sub(self.formula.size(top)).max(self.low);
        Some(top)
    }
}

impl PartialOrd for AcceptanceFormula {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AcceptanceFormula {
    /// Shorter formulas come first, formulas of equal length are compared from the
    /// outermost operator downwards.
    fn cmp(&self, other: &Self) -> Ordering {
        self.len().cmp(&other.len()).then_with(|| {
            self.0
                .iter()
                .rev()
                .zip(other.0.iter().rev())
                .map(|(l, r)| l.cmp(r))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }
}

impl BitAnd for AcceptanceFormula {
    type Output = AcceptanceFormula;
    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for AcceptanceFormula {
    type Output = AcceptanceFormula;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl BitAndAssign for AcceptanceFormula {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = std::mem::take(self).and(rhs);
    }
}

impl BitOrAssign for AcceptanceFormula {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = std::mem::take(self).or(rhs);
    }
}
