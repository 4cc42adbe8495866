use rand::Rng;

use crate::Permutation;

/// Operators producing new permutations from existing ones. Parents are never modified.
pub trait Breeder: Send {
    fn crossover(&self, p1: &[usize], p2: &[usize], rng: &mut impl Rng) -> Permutation;

    fn mutate(&self, parent: &[usize], rng: &mut impl Rng) -> Permutation;
}

/// Order crossover (OX) combined with swap mutation
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderCrossoverSwap;

impl Breeder for OrderCrossoverSwap {
    /// The slice `p2[c1..=c2]` is kept in place. The remaining positions, starting right after `c2`
    /// and wrapping around, are filled with the genes of `p1` not yet present, in the order
    /// in which they are encountered walking `p1` from right after `c2` (wrapping as well).
    fn crossover(&self, p1: &[usize], p2: &[usize], rng: &mut impl Rng) -> Permutation {
        debug_assert!(p1.len() == p2.len());
        let n = p1.len();
        if n == 0 {
            return vec![];
        }
        let (mut c1, mut c2) = (rng.random_range(0..n), rng.random_range(0..n));
        if c1 > c2 {
            std::mem::swap(&mut c1, &mut c2);
        }
        order_crossover(p1, p2, c1, c2)
    }

    /// Swaps two distinct positions. Permutations shorter than two are copied as is.
    fn mutate(&self, parent: &[usize], rng: &mut impl Rng) -> Permutation {
        let mut child = parent.to_vec();
        let n = child.len();
        if n < 2 {
            return child;
        }
        let i = rng.random_range(0..n);
        // uniform over the other n - 1 positions
        let j = (i + rng.random_range(1..n)) % n;
        child.swap(i, j);
        child
    }
}

/// [`OrderCrossoverSwap::crossover`] with fixed cut points, `c1 <= c2 < p1.len()`
pub fn order_crossover(p1: &[usize], p2: &[usize], c1: usize, c2: usize) -> Permutation {
    let n = p1.len();
    debug_assert!(c1 <= c2 && c2 < n);

    let mut child = vec![usize::MAX; n];
    let mut present = vec![false; n];
    for i in c1..=c2 {
        child[i] = p2[i];
        present[p2[i]] = true;
    }

    let mut fill = (c2 + 1) % n;
    for k in 0..n {
        let gene = p1[(c2 + 1 + k) % n];
        if !present[gene] {
            child[fill] = gene;
            present[gene] = true;
            fill = (fill + 1) % n;
        }
    }
    debug_assert!(child.iter().all(|g| *g < n));
    child
}
