use std::collections::VecDeque;

/// Fixed-capacity FIFO buffer. Pushing into a full window evicts the oldest
/// element first, so `len() <= capacity()` always holds.
#[derive(Debug, Clone)]
pub struct FifoWindow<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> FifoWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, returning the evicted element if the window was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.buf.iter()
    }

    /// The `n` most recent elements, oldest first. Returns fewer when the
    /// window holds fewer than `n`.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> {
        self.buf.iter().skip(self.buf.len().saturating_sub(n))
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl<T: Copy + Into<f64>> FifoWindow<T> {
    /// Arithmetic mean over the current contents; 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.buf.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.buf.iter().map(|&v| v.into()).sum();
        sum / self.buf.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut w = FifoWindow::new(3);
        assert_eq!(w.push(1.0), None);
        assert_eq!(w.push(2.0), None);
        assert_eq!(w.push(3.0), None);
        assert!(w.is_full());
        assert_eq!(w.push(4.0), Some(1.0));
        assert_eq!(w.len(), 3);
        assert_eq!(w.iter().copied().collect::<Vec<f64>>(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_mean_over_partial_window() {
        let mut w: FifoWindow<f64> = FifoWindow::new(20);
        assert_eq!(w.mean(), 0.0);
        w.push(10.0);
        w.push(20.0);
        assert!((w.mean() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_of_flags() {
        let mut w: FifoWindow<u8> = FifoWindow::new(4);
        for bit in [0u8, 1, 1, 0, 1] {
            w.push(bit);
        }
        // [1, 1, 0, 1]
        assert!((w.mean() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_latest() {
        let mut w = FifoWindow::new(5);
        for v in 0..5u8 {
            w.push(v);
        }
        assert_eq!(w.latest(2).copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(w.latest(10).count(), 5);
    }
}
