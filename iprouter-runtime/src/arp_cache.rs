use iprouter_packets::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// IPv4 to MAC bindings. Entries are learned from ARP traffic, overwritten by newer
/// traffic, and never expire.
#[derive(Clone, Debug, Default)]
pub struct ArpCache {
    entries: HashMap<Ipv4Addr, MacAddr>,
}

impl ArpCache {
    pub fn new() -> Self {
        ArpCache::default()
    }

    /// Records `ip` at `mac`. Returns true if the binding is new or changed.
    pub fn update(&mut self, ip: Ipv4Addr, mac: MacAddr) -> bool {
        self.entries.insert(ip, mac) != Some(mac)
    }

    pub fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.entries.get(&ip).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learn_and_overwrite() {
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        let first = MacAddr::new([2, 0, 0, 0, 0, 2]);
        let second = MacAddr::new([2, 0, 0, 0, 0, 3]);

        let mut cache = ArpCache::new();
        assert!(cache.lookup(ip).is_none());
        assert!(cache.update(ip, first));
        assert!(!cache.update(ip, first));
        assert_eq!(cache.lookup(ip), Some(first));

        assert!(cache.update(ip, second));
        assert_eq!(cache.lookup(ip), Some(second));
        assert_eq!(cache.len(), 1);
    }
}
