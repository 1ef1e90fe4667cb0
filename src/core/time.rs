//! Abstractions for providing the current time.

use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{
    Duration,
    Instant,
};

/// An environment that provides the current time.
pub trait Env: Debug {
    /// Returns an instance corresponding to "now".
    fn now_instant(&self) -> Instant;
}

/// An environment that provides system based time.
#[derive(Clone, Debug)]
pub struct SystemEnv;

impl SystemEnv {
    pub fn new() -> SystemEnv {
        SystemEnv {}
    }
}

impl Env for SystemEnv {
    fn now_instant(&self) -> Instant {
        Instant::now()
    }
}

/// An environment that provides a configurable time.
///
/// Clones share the same clock so a test can keep a handle and advance the
/// time observed by a stack.
#[derive(Clone, Debug)]
pub struct MockEnv {
    now: Rc<Cell<Instant>>,
}

impl MockEnv {
    pub fn new() -> MockEnv {
        MockEnv {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Env for MockEnv {
    fn now_instant(&self) -> Instant {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_env_shared_clock() {
        let env = MockEnv::new();
        let clone = env.clone();
        let start = env.now_instant();

        clone.advance(Duration::from_secs(5));
        assert_eq!(env.now_instant(), start + Duration::from_secs(5));
    }
}
