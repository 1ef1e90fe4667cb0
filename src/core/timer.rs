//! The timer facility the stack arms and cancels.
//!
//! Expiry is reported back to the stack by whoever drives the timer, by
//! calling `Stack::on_timer` with the armed event.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{
    Duration,
    Instant,
};

use core::interface::InterfaceId;
use core::repr::Ipv4Address;
use core::time::Env;

/// Opaque handle of an armed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhcpTimeout {
    /// Start discovery.
    Init,
    /// No OFFER or ACK arrived in time.
    Retransmit,
    /// T1, unicast a REQUEST to the leasing server.
    Renew,
    /// T2, broadcast a REQUEST to any server.
    Rebind,
    /// The lease ran out.
    Expire,
}

/// What happens when a timer fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    ArpRetry {
        interface: InterfaceId,
        addr: Ipv4Address,
    },
    Dhcp {
        interface: InterfaceId,
        timeout: DhcpTimeout,
    },
}

impl TimerEvent {
    pub fn interface(&self) -> InterfaceId {
        match *self {
            TimerEvent::ArpRetry { interface, .. } => interface,
            TimerEvent::Dhcp { interface, .. } => interface,
        }
    }
}

pub trait Timer: Debug {
    /// Arms a one shot timer that delivers event after delay.
    fn arm(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle;

    /// Cancels an armed timer. Cancelling a fired or cancelled timer is a
    /// no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug)]
struct Inner {
    env: Box<dyn Env>,
    next_handle: u64,
    armed: BTreeMap<(Instant, TimerHandle), TimerEvent>,
}

/// A deadline ordered timer queue.
///
/// Clones share the same queue, so one clone can be handed to a stack while
/// the event loop keeps another to poll for expired timers.
#[derive(Clone, Debug)]
pub struct TimerQueue {
    inner: Rc<RefCell<Inner>>,
}

impl TimerQueue {
    pub fn new<E: Env + 'static>(env: E) -> TimerQueue {
        TimerQueue {
            inner: Rc::new(RefCell::new(Inner {
                env: Box::new(env),
                next_handle: 0,
                armed: BTreeMap::new(),
            })),
        }
    }

    /// Removes and returns every event whose deadline is at or before now,
    /// earliest first.
    pub fn expired(&self, now: Instant) -> Vec<TimerEvent> {
        let mut inner = self.inner.borrow_mut();

        let due: Vec<(Instant, TimerHandle)> = inner
            .armed
            .keys()
            .take_while(|&&(deadline, _)| deadline <= now)
            .cloned()
            .collect();

        due.iter()
            .filter_map(|key| inner.armed.remove(key))
            .collect()
    }

    /// Returns the earliest deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.inner
            .borrow()
            .armed
            .keys()
            .next()
            .map(|&(deadline, _)| deadline)
    }

    /// Returns the armed events in deadline order.
    pub fn armed(&self) -> Vec<(Instant, TimerEvent)> {
        self.inner
            .borrow()
            .armed
            .iter()
            .map(|(&(deadline, _), event)| (deadline, *event))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().armed.len()
    }
}

impl Timer for TimerQueue {
    fn arm(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = TimerHandle(inner.next_handle);
        inner.next_handle += 1;

        let deadline = inner.env.now_instant() + delay;
        inner.armed.insert((deadline, handle), event);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut inner = self.inner.borrow_mut();
        let key = inner.armed.keys().find(|&&(_, h)| h == handle).cloned();
        if let Some(key) = key {
            inner.armed.remove(&key);
        }
    }
}
