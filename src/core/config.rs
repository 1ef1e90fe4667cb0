//! Tunable limits and timeouts of a stack instance.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct StackConfig {
    /// Maximum number of ARP entries per interface before least recently used
    /// entries are evicted.
    pub arp_cache_capacity: usize,
    /// Maximum number of packets queued on a pending ARP entry. The oldest
    /// packet is dropped on overflow.
    pub arp_pending_capacity: usize,
    /// Number of request retransmissions before an entry expires.
    pub arp_max_retries: usize,
    pub arp_retry_interval: Duration,
    /// Age after which a resolved entry must be revalidated.
    pub arp_entry_ttl: Duration,
    /// Delay between dhcp_start() and the first DISCOVER.
    pub dhcp_init_delay: Duration,
    /// Time to wait for an OFFER or ACK before restarting discovery.
    pub dhcp_retransmit_timeout: Duration,
    /// TTL in seconds advertised in NBNS query responses.
    pub nbns_ttl: u32,
    pub ip_ttl: u8,
    /// Maximum number of packets buffered in each socket queue.
    pub socket_queue_capacity: usize,
}

impl Default for StackConfig {
    fn default() -> StackConfig {
        StackConfig {
            arp_cache_capacity: 64,
            arp_pending_capacity: 8,
            arp_max_retries: 3,
            arp_retry_interval: Duration::from_secs(1),
            arp_entry_ttl: Duration::from_secs(60),
            dhcp_init_delay: Duration::from_secs(0),
            dhcp_retransmit_timeout: Duration::from_secs(4),
            nbns_ttl: 300000,
            ip_ttl: 64,
            socket_queue_capacity: 64,
        }
    }
}
