//! Transfers built out of other transfers.

use tracing::trace;

use crate::aggregates::{Aggregates, FlatAggregates};
use crate::error::Result;
use crate::renderer::Renderer;
use crate::transfer::general::Const;
use crate::transfer::predicates;
use crate::transfer::{ItemWise, SetWise, Specialized, Transfer};

type Predicate<In> = dyn Fn(&In) -> bool + Send + Sync;

/// If/then/else over cell values.
///
/// When both branches specialize item-wise the predicate is tested per cell. Otherwise
/// the predicate is tested against every cell of the grid first and the whole grid goes
/// to `pass` only if all cells satisfy it.
pub struct If<In, Out> {
    predicate: Box<Predicate<In>>,
    pass: Box<dyn Transfer<In, Out>>,
    fail: Box<dyn Transfer<In, Out>>,
    empty: Out,
}

impl<In, Out> If<In, Out> {
    /// The empty value is taken from `fail`.
    pub fn new<P, T, F>(predicate: P, pass: T, fail: F) -> Self
    where
        P: Fn(&In) -> bool + Send + Sync + 'static,
        T: Transfer<In, Out> + 'static,
        F: Transfer<In, Out> + 'static,
    {
        let empty = fail.empty_value();
        Self::with_empty(predicate, pass, fail, empty)
    }

    pub fn with_empty<P, T, F>(predicate: P, pass: T, fail: F, empty: Out) -> Self
    where
        P: Fn(&In) -> bool + Send + Sync + 'static,
        T: Transfer<In, Out> + 'static,
        F: Transfer<In, Out> + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            pass: Box::new(pass),
            fail: Box::new(fail),
            empty,
        }
    }
}

impl<In, Out> If<In, Out>
where
    Out: Clone + Send + Sync + 'static,
{
    /// Constant branches; the empty value is `fail`.
    pub fn values<P>(predicate: P, pass: Out, fail: Out) -> Self
    where
        P: Fn(&In) -> bool + Send + Sync + 'static,
    {
        Self::new(predicate, Const::new(pass), Const::new(fail))
    }
}

impl<In, Out> Transfer<In, Out> for If<In, Out>
where
    Out: Clone + Send + Sync,
{
    fn empty_value(&self) -> Out {
        self.empty.clone()
    }

    fn specialize(&self, aggregates: &dyn Aggregates<In>) -> Result<Specialized<'_, In, Out>> {
        let pass = self.pass.specialize(aggregates)?;
        let fail = self.fail.specialize(aggregates)?;
        let predicate = self.predicate.as_ref();
        Ok(match (pass, fail) {
            (Specialized::ItemWise(pass), Specialized::ItemWise(fail)) => {
                Specialized::item_wise(IfItemWise {
                    predicate,
                    pass,
                    fail,
                    empty: self.empty.clone(),
                })
            }
            (pass, fail) => Specialized::set_wise(IfSetWise {
                predicate,
                pass,
                fail,
            }),
        })
    }
}

struct IfItemWise<'a, In, Out> {
    predicate: &'a Predicate<In>,
    pass: Box<dyn ItemWise<In, Out> + 'a>,
    fail: Box<dyn ItemWise<In, Out> + 'a>,
    empty: Out,
}

impl<In, Out: Clone + Send + Sync> ItemWise<In, Out> for IfItemWise<'_, In, Out> {
    fn empty_value(&self) -> Out {
        self.empty.clone()
    }

    fn at(&self, x: i32, y: i32, aggregates: &dyn Aggregates<In>) -> Out {
        if (self.predicate)(&aggregates.get(x, y)) {
            self.pass.at(x, y, aggregates)
        } else {
            self.fail.at(x, y, aggregates)
        }
    }
}

struct IfSetWise<'a, In, Out> {
    predicate: &'a Predicate<In>,
    pass: Specialized<'a, In, Out>,
    fail: Specialized<'a, In, Out>,
}

impl<In, Out: Clone + Send + Sync> SetWise<In, Out> for IfSetWise<'_, In, Out> {
    fn process(
        &self,
        aggregates: &dyn Aggregates<In>,
        renderer: &Renderer,
    ) -> Result<FlatAggregates<Out>> {
        // Read-only pass over the whole grid before any branch writes.
        let passed = predicates::all(aggregates, self.predicate);
        trace!(passed, "Set-wise predicate evaluated");
        if passed {
            renderer.apply(aggregates, &self.pass)
        } else {
            renderer.apply(aggregates, &self.fail)
        }
    }
}

/// Runs `first`, then `second` over the grid `first` produced.
///
/// `second` can only be specialized once the intermediate grid exists, so the sequence
/// is always set-wise.
pub struct Seq<In, Mid, Out> {
    first: Box<dyn Transfer<In, Mid>>,
    second: Box<dyn Transfer<Mid, Out>>,
}

impl<In, Mid, Out> Seq<In, Mid, Out> {
    pub fn new<F, S>(first: F, second: S) -> Self
    where
        F: Transfer<In, Mid> + 'static,
        S: Transfer<Mid, Out> + 'static,
    {
        Self {
            first: Box::new(first),
            second: Box::new(second),
        }
    }
}

impl<In, Mid, Out> Transfer<In, Out> for Seq<In, Mid, Out>
where
    Mid: Clone + Send + Sync,
    Out: Clone + Send + Sync,
{
    fn empty_value(&self) -> Out {
        self.second.empty_value()
    }

    fn specialize(&self, aggregates: &dyn Aggregates<In>) -> Result<Specialized<'_, In, Out>> {
        let first = self.first.specialize(aggregates)?;
        Ok(Specialized::set_wise(SeqSetWise {
            first,
            second: self.second.as_ref(),
        }))
    }
}

struct SeqSetWise<'a, In, Mid, Out> {
    first: Specialized<'a, In, Mid>,
    second: &'a dyn Transfer<Mid, Out>,
}

impl<In, Mid, Out> SetWise<In, Out> for SeqSetWise<'_, In, Mid, Out>
where
    Mid: Clone + Send + Sync,
    Out: Clone + Send + Sync,
{
    fn process(
        &self,
        aggregates: &dyn Aggregates<In>,
        renderer: &Renderer,
    ) -> Result<FlatAggregates<Out>> {
        let intermediate = renderer.apply(aggregates, &self.first)?;
        renderer.transfer(&intermediate, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::FlatAggregates;
    use crate::color::Color;
    use crate::renderer::{RenderConfig, RenderMode};
    use crate::transfer::general::{Echo, Present};

    /// Doubles every cell, but only as a whole-grid operation.
    struct Doubler;

    impl SetWise<i64, i64> for Doubler {
        fn process(
            &self,
            aggregates: &dyn Aggregates<i64>,
            _renderer: &Renderer,
        ) -> Result<FlatAggregates<i64>> {
            Ok(FlatAggregates::copy_of(aggregates).map(|v| v * 2))
        }
    }

    impl Transfer<i64, i64> for Doubler {
        fn empty_value(&self) -> i64 {
            0
        }

        fn specialize(&self, _aggregates: &dyn Aggregates<i64>) -> Result<Specialized<'_, i64, i64>> {
            Ok(Specialized::set_wise(Doubler))
        }
    }

    fn grid() -> FlatAggregates<i64> {
        FlatAggregates::from_rows(vec![vec![10, 0], vec![3, 6]], 0)
    }

    #[test]
    fn test_item_wise_if_dispatches_per_cell() {
        let transfer = If::values(|v: &i64| *v > 5, 1i64, 0);
        let grid = grid();
        assert!(transfer.specialize(&grid).unwrap().is_item_wise());

        let parallel = Renderer::new(RenderConfig {
            mode: RenderMode::Parallel,
            threads: 2,
            rows_per_task: 1,
        })
        .unwrap();
        for renderer in [Renderer::serial(), parallel] {
            let out = renderer.transfer(&grid, &transfer).unwrap();
            assert_eq!(out.to_rows(), vec![vec![1, 0], vec![0, 1]]);
        }
        assert_eq!(transfer.empty_value(), 0);
    }

    #[test]
    fn test_set_wise_if_dispatches_whole_grid() {
        let renderer = Renderer::serial();
        let transfer = If::new(|v: &i64| *v >= 0, Doubler, Const::new(-1i64));
        assert!(!transfer.specialize(&grid()).unwrap().is_item_wise());
        let out = renderer.transfer(&grid(), &transfer).unwrap();
        assert_eq!(out.to_rows(), vec![vec![20, 0], vec![6, 12]]);

        let transfer = If::new(|v: &i64| *v > 0, Doubler, Const::new(-1i64));
        let out = renderer.transfer(&grid(), &transfer).unwrap();
        assert_eq!(out.to_rows(), vec![vec![-1, -1], vec![-1, -1]]);
    }

    #[test]
    fn test_seq_is_set_wise_and_chains() {
        let seq = Seq::new(Echo::new(0i64), Present::new(Color::RED, Color::WHITE));
        let grid = grid();
        assert!(!seq.specialize(&grid).unwrap().is_item_wise());
        assert_eq!(Transfer::<i64, Color>::empty_value(&seq), Color::WHITE);

        let out = Renderer::serial().transfer(&grid, &seq).unwrap();
        assert_eq!(
            out.to_rows(),
            vec![vec![Color::RED, Color::WHITE], vec![Color::RED, Color::RED]]
        );
    }

    #[test]
    fn test_seq_specializes_second_against_intermediate_grid() {
        // The threshold is applied to doubled values, so 3 becomes 6 and passes.
        let seq = Seq::new(Doubler, If::values(|v: &i64| *v > 5, 1i64, 0));
        let out = Renderer::serial().transfer(&grid(), &seq).unwrap();
        assert_eq!(out.to_rows(), vec![vec![1, 0], vec![1, 1]]);
    }
}
