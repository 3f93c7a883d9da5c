//! Applicability queries, answered by the compiler
//!
//! There is no runtime type inspection anywhere in the crate. Whether a node
//! accepts an input, and what it produces, is decided by `Node<I>` impls, so
//! these queries only compile for applicable pairs.
//!
//! ```
//! use daggr::{is_applicable, produces_value, Absence, Leaf, Node, Noop, ResultOf};
//!
//! type Double = Leaf<fn(i32) -> i32>;
//!
//! fn double(x: i32) -> i32 {
//!     x * 2
//! }
//!
//! assert!(is_applicable::<Double, i32>());
//! assert!(produces_value::<Double, i32>());
//! assert!(!produces_value::<Noop, Absence>());
//!
//! let node: Double = Leaf::new(double as fn(i32) -> i32);
//! let out: ResultOf<Double, i32> = node.call(4).unwrap();
//! assert_eq!(out, 8);
//! ```
//!
//! The bootstrap node takes nothing but `Absence`:
//!
//! ```compile_fail
//! use daggr::{is_applicable, Noop};
//!
//! assert!(is_applicable::<Noop, i32>());
//! ```
//!
//! Chaining a consumer that cannot take the producer's output is rejected
//! when the graph is built:
//!
//! ```compile_fail
//! use daggr::{leaf, Node};
//!
//! let chain = leaf(|x: i32| x + 1).then(|s: String| s.len());
//! ```
//!
//! Siblings of a group must share one input type:
//!
//! ```compile_fail
//! use daggr::{all, Node};
//!
//! let group = all((|x: i32| x, |s: String| s));
//! let _ = group.call(1);
//! ```

use super::absence::Datum;
use super::node::Node;

/// What `N` produces when given an `I`
pub type ResultOf<N, I> = <N as Node<I>>::Output;

/// Compiles, and returns true, only when `N` accepts `I`
pub const fn is_applicable<N: Node<I>, I>() -> bool {
    true
}

/// Whether `N` produces a value (as opposed to `Absence`) when given an `I`
pub const fn produces_value<N, I>() -> bool
where
    N: Node<I>,
    N::Output: Datum,
{
    <N::Output as Datum>::PRESENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{All, Leaf, Noop, Sequence};
    use crate::Absence;

    type Inc = Leaf<fn(i64) -> i64>;
    type Show = Leaf<fn(i64) -> String>;
    type Forget = Leaf<fn(i64)>;

    #[test]
    fn test_sequence_result_type() {
        assert!(is_applicable::<Sequence<Inc, Show>, i64>());
        let _: ResultOf<Sequence<Inc, Show>, i64> = String::new();
    }

    #[test]
    fn test_group_result_type() {
        type Group = All<(Inc, Forget, Show)>;
        assert!(is_applicable::<Group, i64>());
        let _: ResultOf<Group, i64> = (1_i64, String::new());
    }

    #[test]
    fn test_absence_results() {
        assert!(!produces_value::<Forget, i64>());
        assert!(!produces_value::<Noop, Absence>());
        assert!(produces_value::<Sequence<Noop, Leaf<fn(Absence) -> u8>>, Absence>());
    }
}
