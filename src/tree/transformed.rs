//! Change-tracking carrier for tree rewrites.
//!
//! Every transform returns its result wrapped in [`Transformed`] so callers
//! can tell whether anything changed without comparing trees. `No` always
//! carries the original value, which for `Arc`-backed nodes preserves pointer
//! identity; this is what lets the fixed-point executor detect convergence
//! cheaply.

#[derive(Debug, Clone)]
pub enum Transformed<T> {
    Yes(T),
    No(T),
}

impl<T> Transformed<T> {
    pub fn is_yes(&self) -> bool {
        matches!(self, Transformed::Yes(_))
    }

    pub fn inner(&self) -> &T {
        match self {
            Transformed::Yes(v) | Transformed::No(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Transformed::Yes(v) | Transformed::No(v) => v,
        }
    }

    /// Map the carried value, preserving the change flag.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Transformed<U> {
        match self {
            Transformed::Yes(v) => Transformed::Yes(f(v)),
            Transformed::No(v) => Transformed::No(f(v)),
        }
    }

    /// Rebuild a parent from a child result: construct a fresh node only when
    /// the child actually changed, otherwise hand back the original parent.
    pub fn rebuild_or_clone<F: FnOnce(T) -> T>(self, old: T, builder: F) -> Transformed<T> {
        match self {
            Transformed::Yes(v) => Transformed::Yes(builder(v)),
            Transformed::No(_) => Transformed::No(old),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_flag() {
        let yes = Transformed::Yes(1).map(|n| n + 1);
        assert!(yes.is_yes());
        assert_eq!(*yes.inner(), 2);

        let no = Transformed::No(1).map(|n| n + 1);
        assert!(!no.is_yes());
        assert_eq!(no.into_inner(), 2);
    }

    #[test]
    fn test_rebuild_or_clone_keeps_original_on_no() {
        let tf: Transformed<i32> = Transformed::No(5);
        let rebuilt = tf.rebuild_or_clone(7, |v| v * 10);
        assert!(!rebuilt.is_yes());
        assert_eq!(rebuilt.into_inner(), 7);

        let tf: Transformed<i32> = Transformed::Yes(5);
        let rebuilt = tf.rebuild_or_clone(7, |v| v * 10);
        assert!(rebuilt.is_yes());
        assert_eq!(rebuilt.into_inner(), 50);
    }
}
