//! Time-indexed sequences of states.
//!
//! A [`Trace`] maps sample times to values. The monitor uses it both for the state of a vehicle
//! (one map of signal values per timestamp) and for the robustness produced by a formula.
//!
//! Times are stored as [`NotNan`] so the underlying map can be ordered. Methods that accept a raw
//! `f64` time panic on NaN; use [`Trace::try_insert`] when the time comes from untrusted input.
//!
//! ```rust
//! use vigil_core::Trace;
//!
//! let mut speed: Trace<f64> = Trace::new();
//! speed.insert(0.0, 88.0);
//! speed.insert(1.0, 91.5);
//!
//! let doubled: Trace<f64> = speed.iter().map_states(|v| v * 2.0).collect();
//!
//! assert_eq!(doubled.at_time(1.0), Some(&183.0));
//! assert_eq!(speed.range(0.5..).times().collect::<Vec<_>>(), vec![1.0]);
//! ```
use std::collections::BTreeMap;
use std::ops::{Bound, RangeBounds};

use ordered_float::NotNan;
use thiserror::Error;

/// A set of values where each value is associated with a time.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Trace<T>(BTreeMap<NotNan<f64>, T>);

/// Error returned by [`Trace::try_insert`] for a NaN time.
#[derive(Debug, Clone, Copy, Error)]
#[error("trace times must not be NaN")]
pub struct NanTimeError;

fn key(time: f64) -> NotNan<f64> {
    NotNan::new(time).expect("trace times must not be NaN")
}

impl<T> Default for Trace<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// # Panics
///
/// Panics if any time is NaN.
impl<A, T> FromIterator<(A, T)> for Trace<T>
where
    A: Into<f64>,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (A, T)>,
    {
        Self(iter.into_iter().map(|(time, state)| (key(time.into()), state)).collect())
    }
}

impl<A, T, const N: usize> From<[(A, T); N]> for Trace<T>
where
    A: Into<f64>,
{
    fn from(values: [(A, T); N]) -> Self {
        Self::from_iter(values)
    }
}

impl<A, T> From<Vec<(A, T)>> for Trace<T>
where
    A: Into<f64>,
{
    fn from(values: Vec<(A, T)>) -> Self {
        Self::from_iter(values)
    }
}

impl<T> Trace<T> {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// State recorded at exactly `time`, if any.
    pub fn at_time(&self, time: f64) -> Option<&T> {
        self.0.get(&key(time))
    }

    /// Insert a state, returning the state previously stored at the same time.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN.
    pub fn insert(&mut self, time: f64, state: T) -> Option<T> {
        self.0.insert(key(time), state)
    }

    /// Checked variant of [`Trace::insert`].
    pub fn try_insert(&mut self, time: f64, state: T) -> Result<Option<T>, NanTimeError> {
        let time = NotNan::new(time).map_err(|_| NanTimeError)?;
        Ok(self.0.insert(time, state))
    }

    /// Earliest `(time, state)` pair.
    pub fn first(&self) -> Option<(f64, &T)> {
        self.0.first_key_value().map(|(t, s)| (t.into_inner(), s))
    }

    /// Latest `(time, state)` pair.
    pub fn last(&self) -> Option<(f64, &T)> {
        self.0.last_key_value().map(|(t, s)| (t.into_inner(), s))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.into_iter()
    }

    pub fn times(&self) -> Times<Iter<'_, T>> {
        Times(self.iter())
    }

    pub fn states(&self) -> States<Iter<'_, T>> {
        States(self.iter())
    }

    /// Iterate over the elements whose times fall inside `bounds`.
    pub fn range<R>(&self, bounds: R) -> Range<'_, T>
    where
        R: RangeBounds<f64>,
    {
        let start = convert_bound(bounds.start_bound());
        let end = convert_bound(bounds.end_bound());

        Range(self.0.range((start, end)))
    }
}

fn convert_bound(bound: Bound<&f64>) -> Bound<NotNan<f64>> {
    match bound {
        Bound::Unbounded => Bound::Unbounded,
        Bound::Included(&val) => Bound::Included(key(val)),
        Bound::Excluded(&val) => Bound::Excluded(key(val)),
    }
}

/// How a sampled signal is read between two sample times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Straight line between the neighbouring samples.
    Linear,
    /// Value of the most recent sample at or before the query time.
    Hold,
}

impl Trace<f64> {
    /// Value of the signal at `time`, reconstructed from the neighbouring samples.
    ///
    /// Returns `None` when `time` lies outside `[first, last]`.
    ///
    /// ```rust
    /// use vigil_core::trace::{Interpolation, Trace};
    ///
    /// let x = Trace::from([(0.0, 0.0), (2.0, 10.0)]);
    ///
    /// assert_eq!(x.sample(1.0, Interpolation::Linear), Some(5.0));
    /// assert_eq!(x.sample(1.0, Interpolation::Hold), Some(0.0));
    /// assert_eq!(x.sample(3.0, Interpolation::Linear), None);
    /// ```
    pub fn sample(&self, time: f64, interpolation: Interpolation) -> Option<f64> {
        let (t0, &v0) = self.range(..=time).next_back()?;

        if t0 == time {
            return Some(v0);
        }

        let (t1, &v1) = self.range(time..).next()?;

        match interpolation {
            Interpolation::Hold => Some(v0),
            Interpolation::Linear => Some(v0 + (v1 - v0) * (time - t0) / (t1 - t0)),
        }
    }
}

/// Iterator over the times of a trace in chronological order.
pub struct Times<I>(I);

impl<I, T> Iterator for Times<I>
where
    I: Iterator<Item = (f64, T)>,
{
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|p| p.0)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<I, T> DoubleEndedIterator for Times<I>
where
    I: DoubleEndedIterator<Item = (f64, T)>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|p| p.0)
    }
}

impl<I, T> ExactSizeIterator for Times<I>
where
    I: ExactSizeIterator<Item = (f64, T)>,
{
    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Iterator over the states of a trace in chronological order.
pub struct States<I>(I);

impl<I, T> Iterator for States<I>
where
    I: Iterator<Item = (f64, T)>,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|p| p.1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<I, T> DoubleEndedIterator for States<I>
where
    I: DoubleEndedIterator<Item = (f64, T)>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|p| p.1)
    }
}

impl<I, T> ExactSizeIterator for States<I>
where
    I: ExactSizeIterator<Item = (f64, T)>,
{
    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Applies a function to every state while keeping the times.
pub struct MapStates<I, F> {
    iter: I,
    f: F,
}

impl<I, F, T, U> Iterator for MapStates<I, F>
where
    I: Iterator<Item = (f64, T)>,
    F: FnMut(T) -> U,
{
    type Item = (f64, U);

    fn next(&mut self) -> Option<Self::Item> {
        let (time, state) = self.iter.next()?;
        Some((time, (self.f)(state)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<I, F, T, U> DoubleEndedIterator for MapStates<I, F>
where
    I: DoubleEndedIterator<Item = (f64, T)>,
    F: FnMut(T) -> U,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let (time, state) = self.iter.next_back()?;
        Some((time, (self.f)(state)))
    }
}

impl<I, F, T, U> ExactSizeIterator for MapStates<I, F>
where
    I: ExactSizeIterator<Item = (f64, T)>,
    F: FnMut(T) -> U,
{
    fn len(&self) -> usize {
        self.iter.len()
    }
}

/// Borrowing iterator over the `(time, state)` pairs of a trace.
pub struct Iter<'a, T>(std::collections::btree_map::Iter<'a, NotNan<f64>, T>);

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (f64, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(t, s)| (t.into_inner(), s))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(t, s)| (t.into_inner(), s))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'a, T> Iter<'a, T> {
    pub fn states(self) -> States<Self> {
        States(self)
    }

    pub fn map_states<F, U>(self, f: F) -> MapStates<Self, F>
    where
        F: FnMut(&'a T) -> U,
    {
        MapStates { f, iter: self }
    }
}

/// Owning iterator over the `(time, state)` pairs of a trace.
pub struct IntoIter<T>(std::collections::btree_map::IntoIter<NotNan<f64>, T>);

impl<T> Iterator for IntoIter<T> {
    type Item = (f64, T);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(t, s)| (t.into_inner(), s))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(t, s)| (t.into_inner(), s))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> IntoIter<T> {
    pub fn states(self) -> States<Self> {
        States(self)
    }

    pub fn map_states<F, U>(self, f: F) -> MapStates<Self, F>
    where
        F: FnMut(T) -> U,
    {
        MapStates { f, iter: self }
    }
}

/// Iterator over a time window of a trace, see [`Trace::range`].
pub struct Range<'a, T>(std::collections::btree_map::Range<'a, NotNan<f64>, T>);

impl<'a, T> Iterator for Range<'a, T> {
    type Item = (f64, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(t, s)| (t.into_inner(), s))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Range<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(t, s)| (t.into_inner(), s))
    }
}

impl<'a, T> Range<'a, T> {
    pub fn times(self) -> Times<Self> {
        Times(self)
    }

    pub fn states(self) -> States<Self> {
        States(self)
    }
}

impl<T> IntoIterator for Trace<T> {
    type Item = (f64, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self.0.into_iter())
    }
}

impl<'a, T> IntoIterator for &'a Trace<T> {
    type Item = (f64, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        Iter(self.0.iter())
    }
}
