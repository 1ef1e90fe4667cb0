extern crate clap;
extern crate env_logger;
extern crate kernet;
#[macro_use]
extern crate lazy_static;

use std::thread;
use std::time::Duration;

use kernet::core::config::StackConfig;
use kernet::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use kernet::core::service::Stack;
use kernet::core::time::{
    Env,
    SystemEnv,
};
use kernet::core::timer::TimerQueue;
use kernet::linux::Tap;

lazy_static! {
    static ref POLL_INTERVAL: Duration = Duration::from_millis(1);
}

fn app<'a, 'b>() -> clap::App<'a, 'b> {
    clap::App::new("dev_up")
        .about("Brings up a stack on a Linux TAP interface.")
        .arg(
            clap::Arg::with_name("tap")
                .long("tap")
                .value_name("TAP")
                .help("Linux TAP interface")
                .default_value("tap0")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("dev-mac")
                .long("dev-mac")
                .value_name("MAC")
                .help("MAC address of the stack")
                .default_value("06:11:22:33:44:55")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("dev-ipv4")
                .long("dev-ipv4")
                .value_name("IPV4")
                .help("Static IPv4 address, DHCP is used if absent")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("netmask")
                .long("netmask")
                .value_name("IPV4")
                .default_value("255.255.255.0")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("gateway")
                .long("gateway")
                .value_name("IPV4")
                .takes_value(true),
        )
        .arg(
            clap::Arg::with_name("name")
                .long("name")
                .value_name("NAME")
                .help("NetBIOS name to answer to")
                .takes_value(true),
        )
}

/// Opens a Linux TAP interface and runs the stack on it. The stack answers
/// ARP and ping requests, and NetBIOS queries if a name is set.
fn main() {
    env_logger::init();

    let matches = app().get_matches();

    let eth_addr = matches
        .value_of("dev-mac")
        .and_then(|mac| mac.parse::<EthernetAddress>().ok())
        .expect("Bad MAC address.");
    let parse_ipv4 = |arg: &str| {
        matches
            .value_of(arg)
            .map(|addr| addr.parse::<Ipv4Address>().expect("Bad IPv4 address."))
    };

    let tap = Tap::new(matches.value_of("tap").unwrap(), eth_addr).expect("Opening TAP.");

    let env = SystemEnv::new();
    let timers = TimerQueue::new(env.clone());
    let mut stack = Stack::new(StackConfig::default(), env.clone(), timers.clone());
    let id = stack.attach(Box::new(tap));

    match parse_ipv4("dev-ipv4") {
        Some(addr) => {
            let netmask = parse_ipv4("netmask").unwrap();
            stack
                .set_ipv4_addr(id, addr, netmask, parse_ipv4("gateway"))
                .unwrap();
        }
        None => stack.dhcp_start(id).unwrap(),
    }

    if let Some(name) = matches.value_of("name") {
        stack.nbns_register_name(id, name).unwrap();
    }

    loop {
        stack.poll();

        for event in timers.expired(env.now_instant()) {
            if let Err(err) = stack.on_timer(event) {
                eprintln!("Timer {:?} failed with {:?}.", event, err);
            }
        }

        thread::sleep(*POLL_INTERVAL);
    }
}
