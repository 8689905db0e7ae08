use ipnet::Ipv4Net;
use owo_colors::OwoColorize;
use std::net::Ipv4Addr;

pub fn display_some_net(net: &Option<Ipv4Net>) -> String {
    match net {
        Some(net) => net.to_string(),
        None => "".to_owned(),
    }
}
pub fn display_some_addr(addr: &Option<Ipv4Addr>) -> String {
    match addr {
        Some(addr) => addr.to_string(),
        None => "".to_owned(),
    }
}
pub fn display_bool(value: &bool) -> String {
    if *value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}
