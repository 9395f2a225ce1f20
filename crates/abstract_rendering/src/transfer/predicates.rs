//! Whole-grid predicates.

use crate::aggregates::{cells, Aggregates};

/// True when every cell of the grid's region satisfies `predicate`, defaults included.
/// An empty region passes vacuously.
pub fn all<A>(aggregates: &dyn Aggregates<A>, predicate: &dyn Fn(&A) -> bool) -> bool {
    cells::<A, _>(aggregates).all(|(x, y)| predicate(&aggregates.get(x, y)))
}
