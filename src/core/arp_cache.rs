//! IPv4 to Ethernet address cache with per entry pending queues.

use std::collections::{
    HashMap,
    VecDeque,
};
use std::time::{
    Duration,
    Instant,
};

use core::buffer::PacketBuffer;
use core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use core::timer::TimerHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    /// A request is outstanding.
    Pending {
        retries: usize,
        last_request: Instant,
        timer: Option<TimerHandle>,
    },
    Resolved {
        eth_addr: EthernetAddress,
        since: Instant,
    },
    /// Retries were exhausted or the mapping went stale.
    Expired,
}

#[derive(Debug)]
struct Entry {
    state: EntryState,
    pending: VecDeque<PacketBuffer>,
    last_used: Instant,
}

/// Result of looking up an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Resolved(EthernetAddress),
    Pending,
    /// Unknown or expired, a request needs to be sent.
    Miss,
}

/// Result of an entry's retry timer firing.
#[derive(Debug)]
pub enum Retry {
    /// Send another request.
    Again,
    /// Retries are exhausted, the entry expired and its queue was discarded.
    Exhausted(VecDeque<PacketBuffer>),
    /// The entry is gone or no longer pending.
    Stale,
}

/// An entry removed from the cache along with its outstanding work.
#[derive(Debug)]
pub struct Removed {
    pub addr: Ipv4Address,
    pub timer: Option<TimerHandle>,
    pub pending: VecDeque<PacketBuffer>,
}

/// Maintains a bounded set of IPv4 -> ethernet address mappings. Entries are
/// evicted least recently used first.
#[derive(Debug)]
pub struct ArpCache {
    entries: HashMap<Ipv4Address, Entry>,
    capacity: usize,
    pending_capacity: usize,
    ttl: Duration,
}

impl ArpCache {
    /// Creates an ARP cache holding up to capacity entries, each queueing up
    /// to pending_capacity packets. Resolved mappings expire after ttl.
    pub fn new(capacity: usize, pending_capacity: usize, ttl: Duration) -> ArpCache {
        ArpCache {
            entries: HashMap::new(),
            capacity,
            pending_capacity,
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn state(&self, ipv4_addr: Ipv4Address) -> Option<EntryState> {
        self.entries.get(&ipv4_addr).map(|entry| entry.state)
    }

    pub fn pending_len(&self, ipv4_addr: Ipv4Address) -> usize {
        self.entries
            .get(&ipv4_addr)
            .map(|entry| entry.pending.len())
            .unwrap_or(0)
    }

    /// Looks up an address, expiring a stale mapping.
    pub fn lookup(&mut self, ipv4_addr: Ipv4Address, now: Instant) -> Lookup {
        let ttl = self.ttl;

        match self.entries.get_mut(&ipv4_addr) {
            Some(entry) => {
                entry.last_used = now;
                match entry.state {
                    EntryState::Resolved { eth_addr, since } => {
                        if now.duration_since(since) > ttl {
                            entry.state = EntryState::Expired;
                            Lookup::Miss
                        } else {
                            Lookup::Resolved(eth_addr)
                        }
                    }
                    EntryState::Pending { .. } => Lookup::Pending,
                    EntryState::Expired => Lookup::Miss,
                }
            }
            None => Lookup::Miss,
        }
    }

    /// Lookup the ethernet address for an IPv4 address.
    pub fn eth_addr_for_ip(&mut self, ipv4_addr: Ipv4Address, now: Instant) -> Option<EthernetAddress> {
        match self.lookup(ipv4_addr, now) {
            Lookup::Resolved(eth_addr) => Some(eth_addr),
            _ => None,
        }
    }

    /// Marks an address as Pending with a fresh retry budget, creating the
    /// entry if needed. Returns the least recently used entry if one was
    /// evicted to make room.
    pub fn begin_resolution(&mut self, ipv4_addr: Ipv4Address, now: Instant) -> Option<Removed> {
        let state = EntryState::Pending {
            retries: 0,
            last_request: now,
            timer: None,
        };

        if let Some(entry) = self.entries.get_mut(&ipv4_addr) {
            entry.state = state;
            entry.last_used = now;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        self.entries.insert(
            ipv4_addr,
            Entry {
                state,
                pending: VecDeque::new(),
                last_used: now,
            },
        );

        evicted
    }

    fn evict(&mut self) -> Option<Removed> {
        let lru = self.entries
            .iter()
            .min_by_key(|&(_, entry)| entry.last_used)
            .map(|(addr, _)| *addr)?;

        debug!("Evicting ARP entry for {}.", lru);
        self.remove(lru)
    }

    fn remove(&mut self, ipv4_addr: Ipv4Address) -> Option<Removed> {
        self.entries.remove(&ipv4_addr).map(|entry| Removed {
            addr: ipv4_addr,
            timer: timer_of(&entry.state),
            pending: entry.pending,
        })
    }

    /// Records the retry timer of a pending entry.
    pub fn set_timer(&mut self, ipv4_addr: Ipv4Address, handle: TimerHandle) {
        if let Some(entry) = self.entries.get_mut(&ipv4_addr) {
            if let EntryState::Pending { ref mut timer, .. } = entry.state {
                *timer = Some(handle);
            }
        }
    }

    /// Queues a packet on an entry awaiting resolution. Returns the packet that
    /// was dropped, either the oldest one on overflow or the packet itself if
    /// the address has no entry.
    pub fn enqueue(&mut self, ipv4_addr: Ipv4Address, buffer: PacketBuffer) -> Option<PacketBuffer> {
        let pending_capacity = self.pending_capacity;

        match self.entries.get_mut(&ipv4_addr) {
            Some(entry) => {
                let dropped = if entry.pending.len() >= pending_capacity {
                    entry.pending.pop_front()
                } else {
                    None
                };
                if pending_capacity > 0 {
                    entry.pending.push_back(buffer);
                    dropped
                } else {
                    Some(buffer)
                }
            }
            None => Some(buffer),
        }
    }

    /// Records a mapping learned from the network for an address that already
    /// has an entry. Returns the packets queued on the entry in FIFO order and
    /// the retry timer to cancel, or None if the address is not cached.
    pub fn resolve(
        &mut self,
        ipv4_addr: Ipv4Address,
        eth_addr: EthernetAddress,
        now: Instant,
    ) -> Option<(VecDeque<PacketBuffer>, Option<TimerHandle>)> {
        let entry = self.entries.get_mut(&ipv4_addr)?;
        let timer = timer_of(&entry.state);

        entry.state = EntryState::Resolved {
            eth_addr,
            since: now,
        };

        Some((entry.pending.drain(..).collect(), timer))
    }

    /// Advances the retry state of an entry after its timer fired.
    pub fn retry(&mut self, ipv4_addr: Ipv4Address, now: Instant, max_retries: usize) -> Retry {
        let entry = match self.entries.get_mut(&ipv4_addr) {
            Some(entry) => entry,
            None => return Retry::Stale,
        };

        match entry.state {
            EntryState::Pending { retries, .. } if retries < max_retries => {
                entry.state = EntryState::Pending {
                    retries: retries + 1,
                    last_request: now,
                    timer: None,
                };
                Retry::Again
            }
            EntryState::Pending { .. } => {
                entry.state = EntryState::Expired;
                Retry::Exhausted(entry.pending.drain(..).collect())
            }
            _ => Retry::Stale,
        }
    }

    /// Removes every entry.
    pub fn drain(&mut self) -> Vec<Removed> {
        let addrs: Vec<Ipv4Address> = self.entries.keys().cloned().collect();
        addrs
            .into_iter()
            .filter_map(|addr| self.remove(addr))
            .collect()
    }
}

fn timer_of(state: &EntryState) -> Option<TimerHandle> {
    match *state {
        EntryState::Pending { timer, .. } => timer,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arp_cache() -> ArpCache {
        ArpCache::new(2, 2, Duration::from_secs(60))
    }

    fn ipv4(i: u8) -> Ipv4Address {
        Ipv4Address::new([0, 0, 0, i])
    }

    fn eth(i: u8) -> EthernetAddress {
        EthernetAddress::new([0, 0, 0, 0, 0, i])
    }

    fn packet(tag: u8) -> PacketBuffer {
        PacketBuffer::from_frame(vec![tag])
    }

    #[test]
    fn test_lookup_ip_with_no_mapping() {
        let mut arp_cache = arp_cache();
        assert_eq!(arp_cache.lookup(ipv4(0), Instant::now()), Lookup::Miss);
        assert_eq!(arp_cache.len(), 0);
    }

    #[test]
    fn test_resolve_flushes_in_order() {
        let mut arp_cache = arp_cache();
        let now = Instant::now();

        assert!(arp_cache.begin_resolution(ipv4(0), now).is_none());
        assert!(arp_cache.enqueue(ipv4(0), packet(1)).is_none());
        assert!(arp_cache.enqueue(ipv4(0), packet(2)).is_none());
        assert_eq!(arp_cache.lookup(ipv4(0), now), Lookup::Pending);

        let (pending, _) = arp_cache.resolve(ipv4(0), eth(0), now).unwrap();
        let tags: Vec<u8> = pending.iter().map(|p| p.as_bytes()[0]).collect();
        assert_eq!(tags, vec![1, 2]);
        assert_eq!(arp_cache.lookup(ipv4(0), now), Lookup::Resolved(eth(0)));
    }

    #[test]
    fn test_enqueue_drops_oldest() {
        let mut arp_cache = arp_cache();
        let now = Instant::now();

        arp_cache.begin_resolution(ipv4(0), now);
        arp_cache.enqueue(ipv4(0), packet(1));
        arp_cache.enqueue(ipv4(0), packet(2));
        let dropped = arp_cache.enqueue(ipv4(0), packet(3)).unwrap();
        assert_eq!(dropped.as_bytes(), &[1]);
        assert_eq!(arp_cache.pending_len(ipv4(0)), 2);
    }

    #[test]
    fn test_resolve_unknown_not_cached() {
        let mut arp_cache = arp_cache();
        assert!(arp_cache.resolve(ipv4(0), eth(0), Instant::now()).is_none());
        assert_eq!(arp_cache.len(), 0);
    }

    #[test]
    fn test_lookup_ip_after_expiring() {
        let mut arp_cache = arp_cache();
        let now = Instant::now();

        arp_cache.begin_resolution(ipv4(0), now);
        arp_cache.resolve(ipv4(0), eth(0), now);

        let later = now + Duration::from_secs(60);
        assert_eq!(arp_cache.eth_addr_for_ip(ipv4(0), later), Some(eth(0)));

        let later = now + Duration::from_secs(61);
        assert_eq!(arp_cache.lookup(ipv4(0), later), Lookup::Miss);
        assert_eq!(arp_cache.state(ipv4(0)), Some(EntryState::Expired));

        arp_cache.begin_resolution(ipv4(0), later);
        assert_eq!(arp_cache.lookup(ipv4(0), later), Lookup::Pending);
    }

    #[test]
    fn test_retries_bounded() {
        let mut arp_cache = arp_cache();
        let now = Instant::now();

        arp_cache.begin_resolution(ipv4(0), now);
        arp_cache.enqueue(ipv4(0), packet(1));

        for _ in 0 .. 3 {
            assert_matches!(arp_cache.retry(ipv4(0), now, 3), Retry::Again);
        }
        assert_matches!(
            arp_cache.state(ipv4(0)),
            Some(EntryState::Pending { retries: 3, .. })
        );

        match arp_cache.retry(ipv4(0), now, 3) {
            Retry::Exhausted(pending) => assert_eq!(pending.len(), 1),
            retry => panic!("Unexpected {:?}", retry),
        }
        assert_eq!(arp_cache.state(ipv4(0)), Some(EntryState::Expired));
        assert_matches!(arp_cache.retry(ipv4(0), now, 3), Retry::Stale);
    }

    #[test]
    fn test_evict_least_recently_used() {
        let mut arp_cache = arp_cache();
        let now = Instant::now();

        arp_cache.begin_resolution(ipv4(0), now);
        arp_cache.resolve(ipv4(0), eth(0), now);
        arp_cache.begin_resolution(ipv4(1), now + Duration::from_secs(1));
        arp_cache.resolve(ipv4(1), eth(1), now + Duration::from_secs(1));

        // Touch the older entry so the newer one is least recently used.
        arp_cache.lookup(ipv4(0), now + Duration::from_secs(2));

        let evicted = arp_cache
            .begin_resolution(ipv4(2), now + Duration::from_secs(3))
            .unwrap();
        assert_eq!(evicted.addr, ipv4(1));
        assert_eq!(arp_cache.len(), 2);
        assert!(arp_cache.state(ipv4(1)).is_none());
    }
}
