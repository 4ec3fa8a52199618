//! # Cardinality Container
//!
//! `Data<T>` holds zero, one or many values together with a flag saying
//! whether the values are conceptually singular. The flag is metadata, not
//! derived from the number of values:
//!
//! - a singular container holds 0 items (absent) or 1 item (present) and
//!   renders as `null` or an object;
//! - a plural container always renders as an array, even when empty or
//!   holding a single item.
//!
//! `flat_map` ANDs the singular flags of the receiver and every result.
//! It is the only operation that can turn a singular container plural.

use std::future::Future;

use futures_util::future::try_join_all;
use serde_json::Value;

/// Zero/one/many values with a singular/plural tag
#[derive(Debug, Clone, PartialEq)]
pub struct Data<T> {
    values: Vec<T>,
    is_singular: bool,
}

/// The value of a `Data<T>` once its cardinality is resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped<T> {
    /// `None` when absent, `Some` when present
    Singular(Option<T>),
    /// Always a list, even with zero or one item
    Plural(Vec<T>),
}

impl<T> Data<T> {
    /// A singular container holding one value
    pub fn pure(value: T) -> Self {
        Self {
            values: vec![value],
            is_singular: true,
        }
    }

    /// A plural container
    pub fn of(values: Vec<T>) -> Self {
        Self {
            values,
            is_singular: false,
        }
    }

    /// A singular container holding nothing
    pub fn empty() -> Self {
        Self {
            values: Vec::new(),
            is_singular: true,
        }
    }

    /// Build from a singular option
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::pure(v),
            None => Self::empty(),
        }
    }

    /// Parse `null`, a single value, or an array of values
    pub fn from_json<E, F>(value: Value, mut parse: F) -> Result<Self, E>
    where
        F: FnMut(Value) -> Result<T, E>,
    {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::Array(items) => items
                .into_iter()
                .map(&mut parse)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::of),
            other => parse(other).map(Self::pure),
        }
    }

    pub fn is_singular(&self) -> bool {
        self.is_singular
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.values.iter_mut()
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Data<U> {
        Data {
            values: self.values.into_iter().map(f).collect(),
            is_singular: self.is_singular,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Data<U>, E> {
        let values = self.values.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Data {
            values,
            is_singular: self.is_singular,
        })
    }

    pub fn flat_map<U>(self, mut f: impl FnMut(T) -> Data<U>) -> Data<U> {
        let is_singular = self.is_singular;
        let results: Vec<Data<U>> = self.values.into_iter().map(&mut f).collect();
        Data::concat(is_singular, results)
    }

    pub fn try_flat_map<U, E>(
        self,
        f: impl FnMut(T) -> Result<Data<U>, E>,
    ) -> Result<Data<U>, E> {
        let is_singular = self.is_singular;
        let results = self.values.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Data::concat(is_singular, results))
    }

    /// Map every value concurrently; results keep input order
    pub async fn map_async<U, E, F, Fut>(self, f: F) -> Result<Data<U>, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<U, E>>,
    {
        let is_singular = self.is_singular;
        let values = try_join_all(self.values.into_iter().map(f)).await?;
        Ok(Data {
            values,
            is_singular,
        })
    }

    /// `flat_map` with async item functions, bulk-awaited in input order
    pub async fn flat_map_async<U, E, F, Fut>(self, f: F) -> Result<Data<U>, E>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<Data<U>, E>>,
    {
        let is_singular = self.is_singular;
        let results = try_join_all(self.values.into_iter().map(f)).await?;
        Ok(Data::concat(is_singular, results))
    }

    /// Keep matching values; cardinality is unchanged
    pub fn filter(self, mut predicate: impl FnMut(&T) -> bool) -> Self {
        Self {
            values: self.values.into_iter().filter(|v| predicate(v)).collect(),
            is_singular: self.is_singular,
        }
    }

    pub fn every(&self, predicate: impl FnMut(&T) -> bool) -> bool {
        self.values.iter().all(predicate)
    }

    pub fn some(&self, predicate: impl FnMut(&T) -> bool) -> bool {
        self.values.iter().any(predicate)
    }

    pub fn reduce<A>(&self, init: A, f: impl FnMut(A, &T) -> A) -> A {
        self.values.iter().fold(init, f)
    }

    /// Resolve to `None`/`Some` for singular data, a list otherwise
    pub fn into_unwrapped(self) -> Unwrapped<T> {
        if self.is_singular {
            Unwrapped::Singular(self.values.into_iter().next())
        } else {
            Unwrapped::Plural(self.values)
        }
    }

    /// Render as `null`, a single JSON value, or an array
    pub fn to_json(&self, mut render: impl FnMut(&T) -> Value) -> Value {
        if self.is_singular {
            self.values.first().map(&mut render).unwrap_or(Value::Null)
        } else {
            Value::Array(self.values.iter().map(render).collect())
        }
    }

    fn concat(receiver_singular: bool, results: Vec<Data<T>>) -> Self {
        let is_singular = results
            .iter()
            .fold(receiver_singular, |acc, d| acc && d.is_singular);
        Self {
            values: results.into_iter().flat_map(|d| d.values).collect(),
            is_singular,
        }
    }
}

impl<T> IntoIterator for Data<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Data<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_singular_and_plural_never_conflate() {
        assert_eq!(Data::pure(7).into_unwrapped(), Unwrapped::Singular(Some(7)));
        assert_eq!(Data::of(vec![7]).into_unwrapped(), Unwrapped::Plural(vec![7]));
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(Data::<i32>::empty().into_unwrapped(), Unwrapped::Singular(None));
        assert_eq!(Data::<i32>::of(vec![]).into_unwrapped(), Unwrapped::Plural(vec![]));
    }

    #[test]
    fn test_from_json_shapes() {
        let parse = |v: Value| v.as_i64().ok_or("not a number");

        let null = Data::from_json(Value::Null, parse).unwrap();
        assert!(null.is_singular());
        assert!(null.is_empty());

        let one = Data::from_json(json!(3), parse).unwrap();
        assert_eq!(one.into_unwrapped(), Unwrapped::Singular(Some(3)));

        let many = Data::from_json(json!([1, 2]), parse).unwrap();
        assert_eq!(many.into_unwrapped(), Unwrapped::Plural(vec![1, 2]));

        assert!(Data::from_json(json!(["x"]), parse).is_err());
    }

    #[test]
    fn test_flat_map_matches_map() {
        let data = Data::of(vec![1, 2, 3]);
        let via_flat_map = data.clone().flat_map(|x| Data::pure(x * 10));
        let via_map = data.map(|x| x * 10);
        assert_eq!(via_flat_map, via_map);
    }

    #[test]
    fn test_flat_map_preserves_order() {
        let data = Data::of(vec![1, 2, 3]);
        let expanded = data.flat_map(|x| Data::of(vec![x, x]));
        assert_eq!(expanded.into_values(), vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_flat_map_ands_singular_flags() {
        // Removing the only item of a singular container keeps it singular.
        let removed = Data::pure(1).flat_map(|_| Data::<i32>::empty());
        assert_eq!(removed.into_unwrapped(), Unwrapped::Singular(None));

        // A plural result makes the whole container plural.
        let widened = Data::pure(1).flat_map(|x| Data::of(vec![x]));
        assert!(!widened.is_singular());

        // A plural receiver never becomes singular.
        let plural = Data::of(vec![1]).flat_map(Data::pure);
        assert!(!plural.is_singular());
    }

    #[test]
    fn test_filter_every_some_reduce() {
        let data = Data::of(vec![1, 2, 3, 4]);
        assert!(data.every(|x| *x > 0));
        assert!(data.some(|x| *x == 3));
        assert_eq!(data.reduce(0, |acc, x| acc + x), 10);

        let evens = data.filter(|x| x % 2 == 0);
        assert_eq!(evens.values(), &[2, 4]);

        let absent = Data::pure(1).filter(|x| *x > 1);
        assert_eq!(absent.into_unwrapped(), Unwrapped::Singular(None));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Data::<i32>::empty().to_json(|x| json!(x)), Value::Null);
        assert_eq!(Data::pure(1).to_json(|x| json!(x)), json!(1));
        assert_eq!(Data::of(vec![1]).to_json(|x| json!(x)), json!([1]));
    }

    #[tokio::test]
    async fn test_async_variants_keep_order() {
        use std::time::Duration;

        let data = Data::of(vec![30u64, 10, 20]);
        let mapped = data
            .clone()
            .map_async(|ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, ()>(ms)
            })
            .await
            .unwrap();
        assert_eq!(mapped.values(), &[30, 10, 20]);

        let dropped = data
            .flat_map_async(|ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                if ms == 10 {
                    Ok::<_, ()>(Data::empty())
                } else {
                    Ok(Data::pure(ms))
                }
            })
            .await
            .unwrap();
        assert_eq!(dropped.values(), &[30, 20]);
        assert!(!dropped.is_singular());
    }
}
