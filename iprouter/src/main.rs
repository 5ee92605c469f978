use clap::{App, Arg, ArgMatches};
use failure::{format_err, Error};
use iprouter_afpacket::AfPacketNet;
use iprouter_runtime::config::load_routes;
use iprouter_runtime::{Router, RouterConfig};
use log::info;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("iprouter")
        .version("0.1")
        .author("iprouter contributors")
        .about("Static IPv4 router over raw Ethernet interfaces")
        .arg(
            Arg::with_name("routes")
                .short("r")
                .long("routes")
                .value_name("FILE")
                .help("Static route file, one `network mask next_hop interface` per line")
                .default_value("forwarding_table.txt")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("interface")
                .short("i")
                .long("interface")
                .value_name("NAME")
                .help("Route between these interfaces only (default: every IPv4 interface)")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("retry_interval")
                .long("retry-interval")
                .value_name("MS")
                .help("Milliseconds between ARP requests for the same next hop")
                .default_value("1000")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("arp_retries")
                .long("arp-retries")
                .value_name("N")
                .help("ARP requests sent before queued packets are bounced as unreachable")
                .default_value("5")
                .takes_value(true),
        )
}

fn router_config(matches: &ArgMatches) -> Result<RouterConfig, Error> {
    let retry_ms: u64 = parse_arg(matches, "retry_interval")?;
    if retry_ms == 0 {
        return Err(format_err!("--retry-interval must be at least 1 ms"));
    }
    let arp_retries: u32 = parse_arg(matches, "arp_retries")?;
    if arp_retries == 0 {
        return Err(format_err!("--arp-retries must be at least 1"));
    }
    Ok(RouterConfig {
        retry_interval: Duration::from_millis(retry_ms),
        arp_retries,
        ..RouterConfig::default()
    })
}

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T, Error> {
    let value = matches.value_of(name).unwrap_or_default();
    value
        .parse()
        .map_err(|_| format_err!("invalid value {:?} for --{}", value, name.replace('_', "-")))
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = app().get_matches();
    let config = router_config(&matches)?;
    let routes_path = matches.value_of("routes").unwrap_or("forwarding_table.txt");
    let routes = load_routes(routes_path)?;
    info!("loaded {} static routes from {}", routes.len(), routes_path);

    let names: Option<Vec<String>> = matches
        .values_of("interface")
        .map(|values| values.map(String::from).collect());

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    let net = AfPacketNet::open(names.as_ref().map(Vec::as_slice), shutdown)?;
    let mut router = Router::new(net, &routes, config)?;
    router.run()?;

    info!("The world has been routed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let matches = app().get_matches_from(vec!["iprouter"]);
        let config = router_config(&matches).unwrap();
        assert_eq!(config.retry_interval, Duration::from_secs(1));
        assert_eq!(config.arp_retries, 5);
        assert_eq!(matches.value_of("routes"), Some("forwarding_table.txt"));
        assert!(matches.values_of("interface").is_none());
    }

    #[test]
    fn overrides() {
        let matches = app().get_matches_from(vec![
            "iprouter",
            "-r",
            "routes.txt",
            "-i",
            "eth0",
            "--interface",
            "eth1",
            "--retry-interval",
            "250",
            "--arp-retries",
            "3",
        ]);
        let config = router_config(&matches).unwrap();
        assert_eq!(config.retry_interval, Duration::from_millis(250));
        assert_eq!(config.arp_retries, 3);
        assert_eq!(matches.value_of("routes"), Some("routes.txt"));
        let names: Vec<&str> = matches.values_of("interface").unwrap().collect();
        assert_eq!(names, vec!["eth0", "eth1"]);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let matches = app().get_matches_from(vec!["iprouter", "--arp-retries", "many"]);
        let err = router_config(&matches).unwrap_err();
        assert_eq!(err.to_string(), "invalid value \"many\" for --arp-retries");

        let matches = app().get_matches_from(vec!["iprouter", "--retry-interval", "0"]);
        assert!(router_config(&matches).is_err());
    }

    #[test]
    fn zero_arp_retries_is_rejected() {
        let matches = app().get_matches_from(vec!["iprouter", "--arp-retries", "0"]);
        let err = router_config(&matches).unwrap_err();
        assert_eq!(err.to_string(), "--arp-retries must be at least 1");
    }
}
