//! The operation interpreter.
//!
//! A pipeline is an ordered list of [`Operation`]s applied to a sequence of
//! [`Value`]s. Each operation consumes the previous one's output. Terminal
//! style operations (`reduce`, `every`, `some`, `find`) do not end the chain:
//! they collapse the sequence to at most one item and later operations run on
//! that.

use crate::Value;
use anyhow::Error;
use core::cmp::Ordering;
use core::fmt;
use dom::Document;
use std::rc::Rc;

pub type Visitor = Rc<dyn Fn(&Document, &Value) -> Result<(), Error>>;
pub type Mapper = Rc<dyn Fn(&Document, &Value) -> Result<Value, Error>>;
pub type Predicate = Rc<dyn Fn(&Document, &Value) -> Result<bool, Error>>;
pub type Comparator = Rc<dyn Fn(&Document, &Value, &Value) -> Result<Ordering, Error>>;
pub type Reducer = Rc<dyn Fn(&Document, Value, &Value) -> Result<Value, Error>>;

#[derive(Clone)]
pub enum Operation {
    /// Call the visitor per item; the sequence passes through unchanged.
    ForEach(Visitor),
    Map(Mapper),
    Filter(Predicate),
    /// Stable sort.
    Sort(Comparator),
    /// Left fold from `initial`; continues as `[accumulator]`.
    Reduce { reducer: Reducer, initial: Value },
    /// Continues as `[Bool]`. Stops at the first failing item.
    Every(Predicate),
    /// Continues as `[Bool]`. Stops at the first passing item.
    Some(Predicate),
    /// Continues as `[item]`, or nothing when no item passes.
    Find(Predicate),
}

impl fmt::Debug for Operation {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

impl Operation {
    pub fn for_each<F>(visitor: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<(), Error> + 'static,
    {
        Self::ForEach(Rc::new(visitor))
    }

    pub fn map<F>(mapper: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<Value, Error> + 'static,
    {
        Self::Map(Rc::new(mapper))
    }

    pub fn filter<F>(predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        Self::Filter(Rc::new(predicate))
    }

    pub fn sort<F>(comparator: F) -> Self
    where
        F: Fn(&Document, &Value, &Value) -> Result<Ordering, Error> + 'static,
    {
        Self::Sort(Rc::new(comparator))
    }

    pub fn reduce<F>(reducer: F, initial: Value) -> Self
    where
        F: Fn(&Document, Value, &Value) -> Result<Value, Error> + 'static,
    {
        Self::Reduce {
            reducer: Rc::new(reducer),
            initial,
        }
    }

    pub fn every<F>(predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        Self::Every(Rc::new(predicate))
    }

    pub fn some<F>(predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        Self::Some(Rc::new(predicate))
    }

    pub fn find<F>(predicate: F) -> Self
    where
        F: Fn(&Document, &Value) -> Result<bool, Error> + 'static,
    {
        Self::Find(Rc::new(predicate))
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::ForEach(_) => "forEach",
            Self::Map(_) => "map",
            Self::Filter(_) => "filter",
            Self::Sort(_) => "sort",
            Self::Reduce { .. } => "reduce",
            Self::Every(_) => "every",
            Self::Some(_) => "some",
            Self::Find(_) => "find",
        }
    }

    /// The comparator of a `sort`.
    pub fn comparator(&self) -> Option<&Comparator> {
        match self {
            Self::Sort(comparator) => Some(comparator),
            _ => None,
        }
    }

    /// Apply this operation to `items`.
    ///
    /// # Errors
    /// Returns the first error raised by the user function.
    pub fn apply(&self, document: &Document, items: Vec<Value>) -> Result<Vec<Value>, Error> {
        match self {
            Self::ForEach(visitor) => {
                for item in &items {
                    visitor(document, item)?;
                }
                Ok(items)
            }
            Self::Map(mapper) => items.iter().map(|item| mapper(document, item)).collect(),
            Self::Filter(predicate) => {
                let mut kept = Vec::with_capacity(items.len());
                for item in items {
                    if predicate(document, &item)? {
                        kept.push(item);
                    }
                }
                Ok(kept)
            }
            Self::Sort(comparator) => sort_items(document, comparator, items),
            Self::Reduce { reducer, initial } => {
                let accumulator = items
                    .iter()
                    .try_fold(initial.clone(), |acc, item| reducer(document, acc, item))?;
                Ok(vec![accumulator])
            }
            Self::Every(predicate) => {
                for item in &items {
                    if !predicate(document, item)? {
                        return Ok(vec![Value::Bool(false)]);
                    }
                }
                Ok(vec![Value::Bool(true)])
            }
            Self::Some(predicate) => {
                for item in &items {
                    if predicate(document, item)? {
                        return Ok(vec![Value::Bool(true)]);
                    }
                }
                Ok(vec![Value::Bool(false)])
            }
            Self::Find(predicate) => {
                for item in items {
                    if predicate(document, &item)? {
                        return Ok(vec![item]);
                    }
                }
                Ok(Vec::new())
            }
        }
    }
}

/// `sort_by` cannot fail, so the first comparator error is held and the
/// remaining comparisons are treated as equal.
pub(crate) fn sort_items(
    document: &Document,
    comparator: &Comparator,
    mut items: Vec<Value>,
) -> Result<Vec<Value>, Error> {
    let mut failure = None;
    items.sort_by(|left, right| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        comparator(document, left, right).unwrap_or_else(|err| {
            failure = Some(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(items),
    }
}

/// Thread `input` through `operations` in order.
///
/// # Errors
/// The first failing operation aborts the rest of the pipeline.
pub fn run(
    document: &Document,
    operations: &[Operation],
    input: Vec<Value>,
) -> Result<Vec<Value>, Error> {
    operations
        .iter()
        .try_fold(input, |items, operation| operation.apply(document, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use core::cell::Cell;
    use dom::DocumentConfig;

    fn numbers(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::Number).collect()
    }

    fn number(item: &Value) -> Result<f64, Error> {
        match item.as_number() {
            Some(number) => Ok(number),
            None => bail!("not a number: {item:?}"),
        }
    }

    fn positive(_: &Document, item: &Value) -> Result<bool, Error> {
        Ok(number(item)? > 0.0)
    }

    fn document() -> Document {
        Document::with_config(&DocumentConfig::default())
    }

    #[test]
    fn operations_thread_left_to_right() {
        let doc = document();
        let pipeline = vec![
            Operation::map(|_, item| Ok(Value::Number(number(item)? * 10.0))),
            Operation::filter(|_, item| Ok(number(item)? > 15.0)),
            Operation::sort(|_, left, right| Ok(number(right)?.total_cmp(&number(left)?))),
        ];
        let out = run(&doc, &pipeline, numbers(&[1.0, 3.0, 2.0])).unwrap();
        assert_eq!(out, numbers(&[30.0, 20.0]));
    }

    #[test]
    fn for_each_passes_items_through() {
        let doc = document();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let pipeline = vec![Operation::for_each(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        })];
        let out = run(&doc, &pipeline, numbers(&[1.0, 2.0])).unwrap();
        assert_eq!(out, numbers(&[1.0, 2.0]));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn terminal_operations_collapse_the_sequence() {
        let doc = document();
        let reduce = Operation::reduce(
            |_, acc, item| Ok(Value::Number(number(&acc)? + number(item)?)),
            Value::Number(0.5),
        );
        assert_eq!(reduce.apply(&doc, numbers(&[1.0, 2.0])).unwrap(), numbers(&[3.5]));
        assert_eq!(
            Operation::every(positive).apply(&doc, numbers(&[1.0, -1.0])).unwrap(),
            vec![Value::Bool(false)]
        );
        assert_eq!(
            Operation::every(positive).apply(&doc, Vec::new()).unwrap(),
            vec![Value::Bool(true)]
        );
        assert_eq!(
            Operation::some(positive).apply(&doc, numbers(&[-1.0, 2.0])).unwrap(),
            vec![Value::Bool(true)]
        );
        assert_eq!(
            Operation::find(positive).apply(&doc, numbers(&[-1.0, 4.0, 5.0])).unwrap(),
            numbers(&[4.0])
        );
        assert!(Operation::find(positive).apply(&doc, numbers(&[-1.0])).unwrap().is_empty());
    }

    #[test]
    fn later_operations_see_the_collapsed_sequence() {
        let doc = document();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let pipeline = vec![
            Operation::find(|_, item| Ok(number(item)? > 100.0)),
            Operation::for_each(move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        ];
        assert!(run(&doc, &pipeline, numbers(&[1.0, 2.0])).unwrap().is_empty());
        assert_eq!(seen.get(), 0, "find with no match leaves nothing to visit");
    }

    #[test]
    fn every_short_circuits() {
        let doc = document();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let every = Operation::every(move |_, item| {
            counter.set(counter.get() + 1);
            Ok(number(item)? > 0.0)
        });
        every.apply(&doc, numbers(&[-1.0, 2.0, 3.0])).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn sort_is_stable() {
        let doc = document();
        let items = vec![
            Value::List(vec![Value::Number(1.0), Value::from("a")]),
            Value::List(vec![Value::Number(0.0), Value::from("b")]),
            Value::List(vec![Value::Number(1.0), Value::from("c")]),
        ];
        let by_first = Operation::sort(|_, left, right| {
            let key = |item: &Value| item.as_list().and_then(|list| list[0].as_number());
            Ok(key(left).partial_cmp(&key(right)).unwrap_or(Ordering::Equal))
        });
        let out = by_first.apply(&doc, items).unwrap();
        let labels: Vec<&str> = out
            .iter()
            .filter_map(|item| item.as_list().and_then(|list| list[1].as_str()))
            .collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
    }

    #[test]
    fn errors_abort_the_rest_of_the_pipeline() {
        let doc = document();
        let reached = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reached);
        let pipeline = vec![
            Operation::map(|_, _| bail!("boom")),
            Operation::for_each(move |_, _| {
                flag.set(true);
                Ok(())
            }),
        ];
        let err = run(&doc, &pipeline, numbers(&[1.0])).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!reached.get());

        let failing_sort = Operation::sort(|_, _, _| bail!("cannot compare"));
        assert!(failing_sort.apply(&doc, numbers(&[2.0, 1.0])).is_err());
    }
}
