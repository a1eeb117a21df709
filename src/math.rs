use crate::mark::MarkSet;

/// Represents a bijective mapping between `L` and `R`, that is a mapping which associates
/// each `L` with precisely one `R` and vice versa. Used to relate acceptance marks to the
/// decision diagram variables that stand for them.
pub type Bijection<L, R> = bimap::BiBTreeMap<L, R>;

/// Assigns consecutive indices starting at `base` to the marks of `used`, in ascending order.
pub fn dense_numbering(used: MarkSet, base: usize) -> Bijection<usize, usize> {
    used.sets()
        .enumerate()
        .map(|(rank, mark)| (mark, base + rank))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::dense_numbering;
    use crate::MarkSet;

    #[test]
    fn numbering_is_dense() {
        let map = dense_numbering(MarkSet::from_indices([1, 4, 7]), 10);
        assert_eq!(map.get_by_left(&4), Some(&11));
        assert_eq!(map.get_by_right(&12), Some(&7));
        assert_eq!(map.len(), 3);
    }
}
