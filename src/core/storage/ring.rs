use std::collections::VecDeque;

use {
    Error,
    Result,
};

/// Ring/bounded buffer of T's.
#[derive(Clone, Debug)]
pub struct Ring<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    /// Creates a ring holding at most capacity items.
    pub fn with_capacity(capacity: usize) -> Ring<T> {
        Ring {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an item or returns an error if the buffer is full.
    pub fn enqueue(&mut self, item: T) -> Result<()> {
        if self.buffer.len() >= self.capacity {
            return Err(Error::Exhausted);
        }

        self.buffer.push_back(item);
        Ok(())
    }

    /// Removes the head of the buffer or returns an error if the buffer is
    /// empty.
    pub fn dequeue(&mut self) -> Result<T> {
        self.buffer.pop_front().ok_or(Error::Exhausted)
    }

    /// Applies f on the head of the buffer and dequeues it unless f returns
    /// an error.
    ///
    /// # Returns
    ///
    /// An error or the result of f.
    pub fn dequeue_maybe<F, R>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&T) -> Result<R>,
    {
        let res = match self.buffer.front() {
            Some(item) => f(item)?,
            None => return Err(Error::Exhausted),
        };

        self.buffer.pop_front();
        Ok(res)
    }

    /// Returns the current number of items in the ring.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }
}
