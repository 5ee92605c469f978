use iprouter_packets::MacAddr;
use iprouter_runtime::interface::mask_to_prefix;
use iprouter_runtime::Interface;
use libc;
use log::{debug, warn};
use std::{collections::HashMap, ffi::CStr, io, net::Ipv4Addr, ptr};

/// One `getifaddrs(3)` record reduced to what the router needs.
#[derive(Debug, Default)]
struct Record {
    mac: Option<MacAddr>,
    ipv4: Option<(Ipv4Addr, Ipv4Addr)>,
    loopback: bool,
}

/// Lists the host's non-loopback interfaces that have both a hardware address and an
/// IPv4 address, in the order the kernel reports them. Only the first IPv4 address of
/// each interface is used.
pub fn system_interfaces() -> io::Result<Vec<Interface>> {
    let mut order = Vec::new();
    let mut records: HashMap<String, Record> = HashMap::new();

    // getifaddrs allocates the list; every node is read before freeifaddrs releases it and
    // no pointer into it outlives this block.
    // Resources:
    // man 3 getifaddrs
    unsafe {
        let mut head: *mut libc::ifaddrs = ptr::null_mut();
        if libc::getifaddrs(&mut head) < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut cursor = head;
        while !cursor.is_null() {
            let ifa = &*cursor;
            cursor = ifa.ifa_next;
            if ifa.ifa_addr.is_null() || ifa.ifa_name.is_null() {
                continue;
            }

            let name = CStr::from_ptr(ifa.ifa_name).to_string_lossy().into_owned();
            if !records.contains_key(&name) {
                order.push(name.clone());
            }
            let record = records.entry(name).or_default();
            record.loopback = ifa.ifa_flags & libc::IFF_LOOPBACK as libc::c_uint != 0;

            match i32::from((*ifa.ifa_addr).sa_family) {
                libc::AF_PACKET => {
                    let ll = &*(ifa.ifa_addr as *const libc::sockaddr_ll);
                    if ll.sll_halen == 6 {
                        let mut bytes = [0; 6];
                        bytes.copy_from_slice(&ll.sll_addr[..6]);
                        record.mac = Some(MacAddr::new(bytes));
                    }
                }
                libc::AF_INET if record.ipv4.is_none() && !ifa.ifa_netmask.is_null() => {
                    let addr = &*(ifa.ifa_addr as *const libc::sockaddr_in);
                    let mask = &*(ifa.ifa_netmask as *const libc::sockaddr_in);
                    record.ipv4 = Some((
                        Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr)),
                        Ipv4Addr::from(u32::from_be(mask.sin_addr.s_addr)),
                    ));
                }
                _ => {}
            }
        }

        libc::freeifaddrs(head);
    }

    let mut interfaces = Vec::new();
    for name in order {
        let record = match records.remove(&name) {
            Some(record) => record,
            None => continue,
        };
        if record.loopback {
            continue;
        }
        match to_interface(&name, &record) {
            Some(interface) => interfaces.push(interface),
            None => debug!("skipping {}: no hardware or IPv4 address", name),
        }
    }
    Ok(interfaces)
}

fn to_interface(name: &str, record: &Record) -> Option<Interface> {
    let mac = record.mac?;
    let (ip, mask) = record.ipv4?;
    let prefix_len = match mask_to_prefix(mask) {
        Some(len) => len,
        None => {
            warn!("skipping {}: netmask {} is not contiguous", name, mask);
            return None;
        }
    };
    Interface::new(name, mac, ip, prefix_len).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_records_are_skipped() {
        let mut record = Record::default();
        assert!(to_interface("eth0", &record).is_none());

        record.mac = Some(MacAddr::new([2, 0, 0, 0, 0, 1]));
        assert!(to_interface("eth0", &record).is_none());

        record.ipv4 = Some((Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 255, 255, 0)));
        let interface = to_interface("eth0", &record).unwrap();
        assert_eq!(interface.prefix_len(), 24);

        record.ipv4 = Some((Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 0, 255, 0)));
        assert!(to_interface("eth0", &record).is_none());
    }

    #[test]
    fn enumeration_never_reports_loopback() {
        let interfaces = system_interfaces().unwrap();
        assert!(interfaces.iter().all(|i| !i.ip().is_loopback()));
    }
}
