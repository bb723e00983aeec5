use std::collections::VecDeque;

/// Simple double ended queue that ensures that all elements are unique. Used
/// as a worklist: pushing an element that is already queued is a no-op.
#[derive(Debug)]
pub struct DequeSet<T: Eq> {
    inner: VecDeque<T>,
}

impl<T: Eq> DequeSet<T> {
    pub fn new() -> Self {
        Self{ inner: VecDeque::new() }
    }

    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    #[inline]
    pub fn push_back(&mut self, to_push: T) {
        if self.any(|v| *v == to_push) {
            return;
        }

        self.inner.push_back(to_push);
    }

    /// Returns true if any queued element satisfies the predicate.
    #[inline]
    pub fn any<F: Fn(&T) -> bool>(&self, f: F) -> bool {
        self.inner.iter().any(f)
    }
}

/// Simple vector set that ensures that all elements are unique. Elements keep
/// their insertion order (we expect the vector to be small).
#[derive(Debug, Clone)]
pub struct VecSet<T: Eq> {
    inner: Vec<T>,
}

impl<T: Eq> VecSet<T> {
    pub fn new() -> Self {
        Self{ inner: Vec::new() }
    }

    /// Pushes the element, returns false if it was already present.
    #[inline]
    pub fn push(&mut self, to_push: T) -> bool {
        if self.contains(&to_push) {
            return false;
        }

        self.inner.push(to_push);
        true
    }

    #[inline]
    pub fn contains(&self, element: &T) -> bool {
        self.inner.iter().any(|v| v == element)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<T> {
        self.inner.iter()
    }
}

impl<T: Eq> Default for VecSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
