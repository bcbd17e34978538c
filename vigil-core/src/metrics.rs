/// Types with a greatest element.
///
/// `top` is the identity of [`Meet::min`], which is why `always` starts its fold from it: an
/// empty window is vacuously satisfied.
pub trait Top {
    fn top() -> Self;
}

/// Types with a least element.
///
/// `bottom` is the identity of [`Join::max`]. `eventually` folds from it, so a window with no
/// samples is never satisfied.
pub trait Bottom {
    fn bottom() -> Self;
}

/// Greatest lower bound of two values (conjunction, `always`).
///
/// ```rust
/// use vigil_core::Meet;
/// assert_eq!(Meet::min(&1.0, &2.0), 1.0);
/// ```
pub trait Meet: PartialOrd {
    fn min(&self, other: &Self) -> Self;
}

/// Least upper bound of two values (disjunction, `eventually`).
///
/// ```rust
/// use vigil_core::Join;
/// assert_eq!(Join::max(&1.0, &2.0), 2.0);
/// ```
pub trait Join: PartialOrd {
    fn max(&self, other: &Self) -> Self;
}

impl Top for f64 {
    fn top() -> Self {
        f64::INFINITY
    }
}

impl Bottom for f64 {
    fn bottom() -> Self {
        f64::NEG_INFINITY
    }
}

impl Meet for f64 {
    fn min(&self, other: &Self) -> Self {
        f64::min(*self, *other)
    }
}

impl Join for f64 {
    fn max(&self, other: &Self) -> Self {
        f64::max(*self, *other)
    }
}

#[cfg(test)]
mod tests {
    use super::{Bottom, Join, Meet, Top};

    #[test]
    fn identities() {
        assert_eq!(Meet::min(&f64::top(), &-3.5), -3.5);
        assert_eq!(Join::max(&f64::bottom(), &-3.5), -3.5);
    }
}
