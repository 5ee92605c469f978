use iprouter_packets::Ipv4Packet;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Packets waiting for one next hop to answer ARP.
#[derive(Clone, Debug)]
pub struct PendingResolution {
    /// Egress interface the requests go out of and the packets will leave by.
    pub interface: String,
    pub last_sent: Instant,
    pub retries_left: u32,
    pub packets: Vec<Ipv4Packet>,
}

impl PendingResolution {
    pub fn new<S: Into<String>>(interface: S, now: Instant, retries_left: u32) -> Self {
        PendingResolution {
            interface: interface.into(),
            last_sent: now,
            retries_left,
            packets: Vec::new(),
        }
    }
}

///
/// Insertion ordered map from next hop to its `PendingResolution`.
///
/// The order lives in a deque of `(key, generation)` slots and the entries in a hash
/// map that also records each key's current generation. Removing by key only touches the
/// map; the slot left behind in the deque no longer matches and is skipped when it
/// reaches the front. Re-pushing a key gives it a fresh generation at the back, so the
/// entry moves to the end of the order.
///
#[derive(Debug, Default)]
pub struct PendingQueue {
    order: VecDeque<(Ipv4Addr, u64)>,
    entries: HashMap<Ipv4Addr, (u64, PendingResolution)>,
    next_generation: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        PendingQueue::default()
    }

    /// Appends `entry` as the newest. Any existing entry for `key` is replaced.
    pub fn push(&mut self, key: Ipv4Addr, entry: PendingResolution) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.order.push_back((key, generation));
        self.entries.insert(key, (generation, entry));
    }

    pub fn contains(&self, key: Ipv4Addr) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: Ipv4Addr) -> Option<&PendingResolution> {
        self.entries.get(&key).map(|(_, entry)| entry)
    }

    pub fn get_mut(&mut self, key: Ipv4Addr) -> Option<&mut PendingResolution> {
        self.entries.get_mut(&key).map(|(_, entry)| entry)
    }

    pub fn remove(&mut self, key: Ipv4Addr) -> Option<PendingResolution> {
        let (_, entry) = self.entries.remove(&key)?;
        // Stale slots are normally dropped from the front; bound them when removals
        // happen out of order.
        if self.order.len() > 2 * self.entries.len() + 16 {
            self.compact();
        }
        Some(entry)
    }

    pub fn peek_oldest(&mut self) -> Option<(Ipv4Addr, &PendingResolution)> {
        self.discard_stale();
        let &(key, _) = self.order.front()?;
        self.entries.get(&key).map(|(_, entry)| (key, entry))
    }

    pub fn pop_oldest(&mut self) -> Option<(Ipv4Addr, PendingResolution)> {
        self.discard_stale();
        let (key, _) = self.order.pop_front()?;
        self.entries.remove(&key).map(|(_, entry)| (key, entry))
    }

    /// When the oldest entry falls `interval` past its last request. Entries are pushed
    /// in `last_sent` order, so none is due earlier.
    pub fn next_deadline(&mut self, interval: Duration) -> Option<Instant> {
        let (_, oldest) = self.peek_oldest()?;
        oldest.last_sent.checked_add(interval)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn discard_stale(&mut self) {
        while let Some(&(key, generation)) = self.order.front() {
            match self.entries.get(&key) {
                Some((current, _)) if *current == generation => break,
                _ => {
                    self.order.pop_front();
                }
            }
        }
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order.retain(|(key, generation)| match entries.get(key) {
            Some((current, _)) => current == generation,
            None => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn entry(now: Instant) -> PendingResolution {
        PendingResolution::new("eth0", now, 5)
    }

    #[test]
    fn fifo_order() {
        let now = Instant::now();
        let mut queue = PendingQueue::new();
        queue.push(ip(1), entry(now));
        queue.push(ip(2), entry(now));
        queue.push(ip(3), entry(now));

        assert_eq!(queue.peek_oldest().map(|(k, _)| k), Some(ip(1)));
        assert_eq!(queue.pop_oldest().map(|(k, _)| k), Some(ip(1)));
        assert_eq!(queue.pop_oldest().map(|(k, _)| k), Some(ip(2)));
        assert_eq!(queue.pop_oldest().map(|(k, _)| k), Some(ip(3)));
        assert!(queue.pop_oldest().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn removed_keys_are_skipped() {
        let now = Instant::now();
        let mut queue = PendingQueue::new();
        queue.push(ip(1), entry(now));
        queue.push(ip(2), entry(now));
        assert!(queue.remove(ip(1)).is_some());
        assert!(queue.remove(ip(1)).is_none());

        assert_eq!(queue.peek_oldest().map(|(k, _)| k), Some(ip(2)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn repush_moves_to_back() {
        let now = Instant::now();
        let mut queue = PendingQueue::new();
        queue.push(ip(1), entry(now));
        queue.push(ip(2), entry(now));

        let (key, mut popped) = queue.pop_oldest().unwrap();
        popped.retries_left -= 1;
        queue.push(key, popped);

        assert_eq!(queue.pop_oldest().map(|(k, _)| k), Some(ip(2)));
        let (key, last) = queue.pop_oldest().unwrap();
        assert_eq!(key, ip(1));
        assert_eq!(last.retries_left, 4);
    }

    #[test]
    fn remove_then_push_is_not_shadowed_by_old_slot() {
        let now = Instant::now();
        let mut queue = PendingQueue::new();
        queue.push(ip(1), entry(now));
        queue.push(ip(2), entry(now));
        queue.remove(ip(1));
        queue.push(ip(1), entry(now));

        assert_eq!(queue.pop_oldest().map(|(k, _)| k), Some(ip(2)));
        assert_eq!(queue.pop_oldest().map(|(k, _)| k), Some(ip(1)));
        assert!(queue.pop_oldest().is_none());
    }

    #[test]
    fn next_deadline_follows_the_oldest_entry() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let mut queue = PendingQueue::new();
        assert_eq!(queue.next_deadline(interval), None);

        queue.push(ip(1), entry(start));
        queue.push(ip(2), entry(start + Duration::from_millis(30)));
        assert_eq!(queue.next_deadline(interval), Some(start + interval));

        queue.remove(ip(1));
        assert_eq!(
            queue.next_deadline(interval),
            Some(start + Duration::from_millis(130))
        );
    }

    #[test]
    fn packets_append_to_existing_entry() {
        let now = Instant::now();
        let mut queue = PendingQueue::new();
        queue.push(ip(1), entry(now));
        queue.get_mut(ip(1)).unwrap().packets.push(Ipv4Packet::empty());
        queue.get_mut(ip(1)).unwrap().packets.push(Ipv4Packet::empty());
        assert_eq!(queue.get(ip(1)).unwrap().packets.len(), 2);
        assert!(queue.contains(ip(1)));
        assert!(!queue.contains(ip(2)));
    }

    #[test]
    fn many_out_of_order_removals_stay_bounded() {
        let now = Instant::now();
        let mut queue = PendingQueue::new();
        queue.push(ip(0), entry(now));
        for round in 0..1000u32 {
            let key = Ipv4Addr::from(0x0a01_0000 + round);
            queue.push(key, entry(now));
            queue.remove(key);
        }
        assert!(queue.order.len() <= 2 * queue.len() + 17);
        assert_eq!(queue.pop_oldest().map(|(k, _)| k), Some(ip(0)));
    }
}
