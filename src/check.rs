//! Precondition checks for numeric inputs to log-density code.
//!
//! Every check is one scalar predicate lifted over two axes:
//!
//! * shape: a single value, an ordered sequence, or a matrix, via the
//!   [`Elements`] adapter. A collection is valid iff every element is, and
//!   the first offending element (left to right, row-major) is the one
//!   reported.
//! * failure policy: [`ErrorPolicy::Raise`] returns a [`DomainError`]
//!   carrying the offending value, while [`ErrorPolicy::Sentinel`] writes
//!   NaN through the caller's output reference and returns `Ok(false)`.
//!
//! On success every check returns `Ok(true)` and leaves the output reference
//! untouched. Callers must treat the boolean, not the output value, as the
//! success signal.
//!
//! The checks hold no state and are safe to call concurrently from any
//! number of chains.

use std::fmt::Display;

use ndarray::{Array1, Array2};
use num_traits::Float;

use crate::error::DomainError;

/// What a check does with an invalid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Fail the computation with a [`DomainError`].
    #[default]
    Raise,
    /// Write NaN through the output reference and report `false`.
    Sentinel,
}

impl ErrorPolicy {
    fn report<T: Float + Display>(
        self,
        function: &str,
        label: &str,
        value: T,
        expected: &str,
        result: &mut T,
    ) -> Result<bool, DomainError> {
        match self {
            ErrorPolicy::Raise => Err(DomainError::new(function, label, value, expected)),
            ErrorPolicy::Sentinel => {
                *result = T::nan();
                Ok(false)
            }
        }
    }
}

/// Lifts a scalar predicate over scalar, sequence and matrix inputs.
///
/// `first_offending` walks the elements in a deterministic order (sequences
/// left to right, matrices row-major) and returns the first one the
/// predicate rejects. Scalars are their own single element.
///
/// Custom scalar types implementing [`Float`] get the collection impls for
/// free; the scalar impl is a one-liner in the defining crate.
pub trait Elements<T: Float> {
    fn first_offending<P: Fn(T) -> bool>(&self, ok: P) -> Option<T>;
}

impl Elements<f64> for f64 {
    fn first_offending<P: Fn(f64) -> bool>(&self, ok: P) -> Option<f64> {
        if ok(*self) {
            None
        } else {
            Some(*self)
        }
    }
}

impl Elements<f32> for f32 {
    fn first_offending<P: Fn(f32) -> bool>(&self, ok: P) -> Option<f32> {
        if ok(*self) {
            None
        } else {
            Some(*self)
        }
    }
}

impl<T: Float> Elements<T> for [T] {
    fn first_offending<P: Fn(T) -> bool>(&self, ok: P) -> Option<T> {
        self.iter().copied().find(|&v| !ok(v))
    }
}

impl<T: Float> Elements<T> for Vec<T> {
    fn first_offending<P: Fn(T) -> bool>(&self, ok: P) -> Option<T> {
        self.as_slice().first_offending(ok)
    }
}

impl<T: Float> Elements<T> for Array1<T> {
    fn first_offending<P: Fn(T) -> bool>(&self, ok: P) -> Option<T> {
        self.iter().copied().find(|&v| !ok(v))
    }
}

impl<T: Float> Elements<T> for Array2<T> {
    fn first_offending<P: Fn(T) -> bool>(&self, ok: P) -> Option<T> {
        // ndarray iterates in logical order, rightmost axis fastest.
        self.iter().copied().find(|&v| !ok(v))
    }
}

fn check_all<T, V, P>(
    function: &str,
    value: &V,
    ok: P,
    expected: &str,
    result: &mut T,
    policy: ErrorPolicy,
) -> Result<bool, DomainError>
where
    T: Float + Display,
    V: Elements<T> + ?Sized,
    P: Fn(T) -> bool,
{
    match value.first_offending(ok) {
        None => Ok(true),
        Some(bad) => policy.report(function, "value", bad, expected, result),
    }
}

/// Checks that every element of `value` is finite (not NaN, not infinite).
pub fn check_finite<T, V>(
    function: &str,
    value: &V,
    result: &mut T,
    policy: ErrorPolicy,
) -> Result<bool, DomainError>
where
    T: Float + Display,
    V: Elements<T> + ?Sized,
{
    check_all(function, value, |v: T| v.is_finite(), "finite", result, policy)
}

/// Checks that every element of `value` lies in the inclusive `[low, high]`.
///
/// An infinite bound leaves that side unconstrained, but a NaN bound makes
/// the whole call invalid regardless of `value`, and a NaN or infinite
/// element is never in bounds even against an infinite bound.
pub fn check_bounded<T, V>(
    function: &str,
    value: &V,
    low: T,
    high: T,
    result: &mut T,
    policy: ErrorPolicy,
) -> Result<bool, DomainError>
where
    T: Float + Display,
    V: Elements<T> + ?Sized,
{
    if low.is_nan() {
        return policy.report(function, "lower bound", low, "a number", result);
    }
    if high.is_nan() {
        return policy.report(function, "upper bound", high, "a number", result);
    }
    let expected = format!("between {low} and {high}");
    check_all(
        function,
        value,
        |v: T| v.is_finite() && low <= v && v <= high,
        &expected,
        result,
        policy,
    )
}

/// Checks that every element of `value` is strictly positive.
pub fn check_positive<T, V>(
    function: &str,
    value: &V,
    result: &mut T,
    policy: ErrorPolicy,
) -> Result<bool, DomainError>
where
    T: Float + Display,
    V: Elements<T> + ?Sized,
{
    check_all(
        function,
        value,
        |v: T| v > T::zero(),
        "positive",
        result,
        policy,
    )
}

/// Checks that every element of `value` is zero or greater.
pub fn check_nonnegative<T, V>(
    function: &str,
    value: &V,
    result: &mut T,
    policy: ErrorPolicy,
) -> Result<bool, DomainError>
where
    T: Float + Display,
    V: Elements<T> + ?Sized,
{
    check_all(
        function,
        value,
        |v: T| v >= T::zero(),
        "nonnegative",
        result,
        policy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    const FUNCTION: &str = "check_test";
    const INF: f64 = f64::INFINITY;

    #[test]
    fn finite_scalar_raise() {
        let mut result = 1.25;
        assert!(check_finite(FUNCTION, &0.0, &mut result, ErrorPolicy::Raise).unwrap());
        assert_eq!(result, 1.25);

        for x in [INF, -INF, f64::NAN] {
            let err = check_finite(FUNCTION, &x, &mut result, ErrorPolicy::Raise).unwrap_err();
            assert_eq!(err.function, FUNCTION);
            assert_eq!(err.value, x.to_string());
            assert_eq!(err.expected, "finite");
            assert_eq!(result, 1.25);
        }
    }

    #[test]
    fn finite_scalar_sentinel() {
        let mut result = 0.0;
        assert!(check_finite(FUNCTION, &0.5, &mut result, ErrorPolicy::Sentinel).unwrap());
        assert_eq!(result, 0.0);

        for x in [INF, -INF, f64::NAN] {
            result = 0.0;
            assert!(!check_finite(FUNCTION, &x, &mut result, ErrorPolicy::Sentinel).unwrap());
            assert!(result.is_nan());
        }
    }

    #[test]
    fn finite_vector() {
        let mut result = 0.0;
        let ok = vec![-1.0, 0.0, 1.0];
        assert!(check_finite(FUNCTION, &ok, &mut result, ErrorPolicy::Raise).unwrap());

        for bad in [INF, -INF, f64::NAN] {
            let x = vec![-1.0, 0.0, bad];
            let err = check_finite(FUNCTION, &x, &mut result, ErrorPolicy::Raise).unwrap_err();
            assert_eq!(err.value, bad.to_string());

            result = 0.0;
            assert!(!check_finite(FUNCTION, &x, &mut result, ErrorPolicy::Sentinel).unwrap());
            assert!(result.is_nan());
        }
    }

    #[test]
    fn finite_slice() {
        let mut result = 0.0;
        let x: &[f64] = &[-1.0, 0.0, INF];
        assert!(check_finite(FUNCTION, x, &mut result, ErrorPolicy::Raise).is_err());
    }

    #[test]
    fn finite_matrix() {
        let mut result = 0.0;
        let ok = arr2(&[[-1.0, 0.0], [1.0, 2.0]]);
        assert!(check_finite(FUNCTION, &ok, &mut result, ErrorPolicy::Raise).unwrap());

        let bad = arr2(&[[-1.0, 0.0], [f64::NAN, 2.0]]);
        assert!(check_finite(FUNCTION, &bad, &mut result, ErrorPolicy::Raise).is_err());

        assert!(!check_finite(FUNCTION, &bad, &mut result, ErrorPolicy::Sentinel).unwrap());
        assert!(result.is_nan());
    }

    #[test]
    fn first_offending_element_is_reported() {
        let mut result = 0.0;
        let x = vec![1.0, INF, f64::NAN];
        let err = check_finite(FUNCTION, &x, &mut result, ErrorPolicy::Raise).unwrap_err();
        assert_eq!(err.value, INF.to_string());

        // Matrices walk row-major, so the row-0 entry wins over the row-1 one.
        let m = arr2(&[[1.0, -INF], [f64::NAN, 2.0]]);
        let err = check_finite(FUNCTION, &m, &mut result, ErrorPolicy::Raise).unwrap_err();
        assert_eq!(err.value, (-INF).to_string());
    }

    #[test]
    fn bounded_inclusive_range() {
        let mut result = 0.0;
        for x in [0.0, -1.0, 1.0] {
            assert!(check_bounded(FUNCTION, &x, -1.0, 1.0, &mut result, ErrorPolicy::Raise).unwrap());
            assert!(
                check_bounded(FUNCTION, &x, -1.0, 1.0, &mut result, ErrorPolicy::Sentinel).unwrap()
            );
        }
        assert_eq!(result, 0.0);
    }

    #[test]
    fn bounded_rejects_out_of_range() {
        let mut result = 0.0;
        for x in [-2.0, 2.0, f64::NAN, -INF, INF] {
            assert!(check_bounded(FUNCTION, &x, -1.0, 1.0, &mut result, ErrorPolicy::Raise).is_err());

            result = 0.0;
            assert!(
                !check_bounded(FUNCTION, &x, -1.0, 1.0, &mut result, ErrorPolicy::Sentinel).unwrap()
            );
            assert!(result.is_nan());
        }
    }

    #[test]
    fn bounded_infinite_bounds_are_unconstrained() {
        let mut result = 0.0;
        assert!(check_bounded(FUNCTION, &0.0, -INF, 1.0, &mut result, ErrorPolicy::Raise).unwrap());
        assert!(check_bounded(FUNCTION, &0.0, -1.0, INF, &mut result, ErrorPolicy::Raise).unwrap());
        assert!(check_bounded(FUNCTION, &0.0, -INF, INF, &mut result, ErrorPolicy::Raise).unwrap());
    }

    #[test]
    fn bounded_infinite_value_is_never_in_bounds() {
        // Even against an infinite bound on the same side.
        let mut result = 0.0;
        assert!(check_bounded(FUNCTION, &INF, -INF, INF, &mut result, ErrorPolicy::Raise).is_err());
        assert!(check_bounded(FUNCTION, &-INF, -INF, INF, &mut result, ErrorPolicy::Raise).is_err());
    }

    #[test]
    fn bounded_wrong_side_infinite_bound_rejects() {
        let mut result = 0.0;
        assert!(check_bounded(FUNCTION, &0.0, INF, 1.0, &mut result, ErrorPolicy::Raise).is_err());
        assert!(check_bounded(FUNCTION, &0.0, -1.0, -INF, &mut result, ErrorPolicy::Raise).is_err());
    }

    #[test]
    fn bounded_nan_bound_invalidates_whole_check() {
        let mut result = 0.0;
        let err = check_bounded(FUNCTION, &0.0, f64::NAN, 1.0, &mut result, ErrorPolicy::Raise)
            .unwrap_err();
        assert_eq!(err.label, "lower bound");

        let err = check_bounded(FUNCTION, &0.0, -1.0, f64::NAN, &mut result, ErrorPolicy::Raise)
            .unwrap_err();
        assert_eq!(err.label, "upper bound");

        result = 0.0;
        assert!(
            !check_bounded(FUNCTION, &0.0, f64::NAN, 1.0, &mut result, ErrorPolicy::Sentinel)
                .unwrap()
        );
        assert!(result.is_nan());

        result = 0.0;
        assert!(
            !check_bounded(FUNCTION, &0.0, -1.0, f64::NAN, &mut result, ErrorPolicy::Sentinel)
                .unwrap()
        );
        assert!(result.is_nan());
    }

    #[test]
    fn bounded_vector_and_matrix() {
        let mut result = 0.0;
        let x = vec![-1.0, 0.0, 1.0];
        assert!(check_bounded(FUNCTION, &x, -1.0, 1.0, &mut result, ErrorPolicy::Raise).unwrap());

        let x = vec![-1.0, 0.0, 1.5];
        let err =
            check_bounded(FUNCTION, &x, -1.0, 1.0, &mut result, ErrorPolicy::Raise).unwrap_err();
        assert_eq!(err.value, "1.5");

        let m = arr2(&[[0.0, 0.5], [-0.5, -3.0]]);
        assert!(!check_bounded(FUNCTION, &m, -1.0, 1.0, &mut result, ErrorPolicy::Sentinel).unwrap());
        assert!(result.is_nan());
    }

    #[test]
    fn positive_and_nonnegative() {
        let mut result = 0.0;
        assert!(check_positive(FUNCTION, &1.0, &mut result, ErrorPolicy::Raise).unwrap());
        assert!(check_positive(FUNCTION, &0.0, &mut result, ErrorPolicy::Raise).is_err());
        assert!(check_positive(FUNCTION, &-1.0, &mut result, ErrorPolicy::Raise).is_err());
        assert!(check_positive(FUNCTION, &f64::NAN, &mut result, ErrorPolicy::Raise).is_err());

        assert!(check_nonnegative(FUNCTION, &0.0, &mut result, ErrorPolicy::Raise).unwrap());
        assert!(check_nonnegative(FUNCTION, &-0.1, &mut result, ErrorPolicy::Raise).is_err());

        let x = vec![1.0, 2.0, 0.0];
        assert!(!check_positive(FUNCTION, &x, &mut result, ErrorPolicy::Sentinel).unwrap());
        assert!(result.is_nan());
    }

    #[test]
    fn works_for_f32() {
        let mut result = 0.0f32;
        assert!(check_finite(FUNCTION, &1.0f32, &mut result, ErrorPolicy::Raise).unwrap());
        assert!(!check_finite(FUNCTION, &f32::NAN, &mut result, ErrorPolicy::Sentinel).unwrap());
        assert!(result.is_nan());
    }

    #[test]
    fn error_message_names_the_caller() {
        let mut result = 0.0;
        let err = check_finite("normal_lpdf", &INF, &mut result, ErrorPolicy::Raise).unwrap_err();
        assert_eq!(err.to_string(), "normal_lpdf: value is inf, but must be finite");
    }
}
