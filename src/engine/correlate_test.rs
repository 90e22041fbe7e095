use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::correlate::Correlator;
use super::MessageEnvelope;
use crate::message::name::Name;
use crate::message::resource::a::AResource;
use crate::message::resource::aaaa::AaaaResource;
use crate::message::resource::ptr::PtrResource;
use crate::message::resource::srv::SrvResource;
use crate::message::resource::txt::TxtResource;
use crate::message::resource::{Resource, ResourceBody, ResourceHeader};
use crate::message::Message;
use crate::service::ServiceRecord;

const SRC: &str = "192.168.1.10:5353";

fn resource(name: &str, ttl: u32, body: Box<dyn ResourceBody>) -> Resource {
    Resource {
        header: ResourceHeader {
            name: Name::new(name).unwrap(),
            ttl,
            ..Default::default()
        },
        body: Some(body),
    }
}

fn ptr(name: &str, target: &str, ttl: u32) -> Resource {
    resource(
        name,
        ttl,
        Box::new(PtrResource {
            ptr: Name::new(target).unwrap(),
        }),
    )
}

fn srv(name: &str, target: &str, port: u16, ttl: u32) -> Resource {
    resource(
        name,
        ttl,
        Box::new(SrvResource {
            priority: 0,
            weight: 0,
            port,
            target: Name::new(target).unwrap(),
        }),
    )
}

fn txt(name: &str, strings: &[&str], ttl: u32) -> Resource {
    resource(
        name,
        ttl,
        Box::new(TxtResource {
            txt: strings.iter().map(|s| s.to_string()).collect(),
        }),
    )
}

fn a(name: &str, ip: Ipv4Addr) -> Resource {
    resource(name, 120, Box::new(AResource { a: ip.octets() }))
}

fn aaaa(name: &str, ip: Ipv6Addr) -> Resource {
    resource(name, 120, Box::new(AaaaResource { aaaa: ip.octets() }))
}

fn envelope(answers: Vec<Resource>) -> MessageEnvelope {
    envelope_from(answers, SRC)
}

fn envelope_from(answers: Vec<Resource>, src: &str) -> MessageEnvelope {
    MessageEnvelope {
        msg: Message {
            answers,
            ..Default::default()
        },
        src: src.parse().unwrap(),
    }
}

fn browse_correlator() -> Correlator {
    Correlator::new(ServiceRecord::new("", "_workstation._tcp", "local", &[]))
}

fn full_response(ttl: u32) -> Vec<Resource> {
    vec![
        ptr(
            "_workstation._tcp.local.",
            "Host._workstation._tcp.local.",
            ttl,
        ),
        srv("Host._workstation._tcp.local.", "host.local.", 9, ttl),
        txt("Host._workstation._tcp.local.", &[], ttl),
        a("host.local.", Ipv4Addr::new(192, 168, 1, 10)),
    ]
}

#[test]
fn test_browse_basic() {
    let mut correlator = browse_correlator();

    let out = correlator.handle_message(&envelope(full_response(120)));
    assert_eq!(out.len(), 1);

    let entry = &out[0];
    assert_eq!(entry.instance, "Host");
    assert_eq!(entry.service, "_workstation._tcp");
    assert_eq!(entry.domain, "local");
    assert_eq!(entry.host_name, "host.local.");
    assert_eq!(entry.port, 9);
    assert_eq!(entry.text, Vec::<String>::new());
    assert_eq!(entry.addr_ipv4, vec![Ipv4Addr::new(192, 168, 1, 10)]);
    assert!(entry.addr_ipv6.is_empty());
    assert_eq!(entry.ttl, 120);
}

#[test]
fn test_source_address_fallback() {
    let mut correlator = browse_correlator();

    // No A/AAAA record: the datagram source address stands in.
    let answers = vec![
        ptr(
            "_workstation._tcp.local.",
            "Host._workstation._tcp.local.",
            120,
        ),
        srv("Host._workstation._tcp.local.", "host.local.", 9, 120),
    ];
    let out = correlator.handle_message(&envelope(answers));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].addr_ipv4, vec![Ipv4Addr::new(192, 168, 1, 10)]);
}

#[test]
fn test_source_address_fallback_v6() {
    let mut correlator = browse_correlator();

    let answers = vec![srv("Host._workstation._tcp.local.", "host.local.", 9, 120)];
    let out = correlator.handle_message(&envelope_from(answers, "[fe80::1]:5353"));
    assert_eq!(out.len(), 1);
    assert!(out[0].addr_ipv4.is_empty());
    assert_eq!(out[0].addr_ipv6, vec!["fe80::1".parse::<Ipv6Addr>().unwrap()]);
}

#[test]
fn test_duplicate_response_delivered_once() {
    let mut correlator = browse_correlator();

    assert_eq!(correlator.handle_message(&envelope(full_response(120))).len(), 1);
    assert!(correlator.handle_message(&envelope(full_response(120))).is_empty());
}

#[test]
fn test_goodbye_then_reannounce() {
    let mut correlator = browse_correlator();

    assert_eq!(correlator.handle_message(&envelope(full_response(120))).len(), 1);

    // The goodbye itself is not delivered...
    assert!(correlator.handle_message(&envelope(full_response(0))).is_empty());

    // ...but it clears the way for a fresh announcement.
    let out = correlator.handle_message(&envelope(full_response(120)));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].ttl, 120);
}

#[test]
fn test_mismatched_names_ignored() {
    let mut correlator = browse_correlator();

    let answers = vec![
        // PTR for a different service type.
        ptr("_ipp._tcp.local.", "Printer._ipp._tcp.local.", 120),
        // SRV whose name is not suffixed by the service name.
        srv("Printer._ipp._tcp.local.", "printer.local.", 631, 120),
        a("printer.local.", Ipv4Addr::new(192, 168, 1, 77)),
    ];
    assert!(correlator.handle_message(&envelope(answers)).is_empty());
}

#[test]
fn test_ptr_only_entry_waits_for_more_records() {
    let mut correlator = browse_correlator();

    // A bare PTR has no address and no SRV source address to fall back on.
    let answers = vec![ptr(
        "_workstation._tcp.local.",
        "Host._workstation._tcp.local.",
        120,
    )];
    assert!(correlator.handle_message(&envelope(answers)).is_empty());

    // The full announcement later delivers exactly once.
    assert_eq!(correlator.handle_message(&envelope(full_response(120))).len(), 1);
}

#[test]
fn test_service_type_enumeration_needs_no_address() {
    let mut correlator = Correlator::new(ServiceRecord::new(
        "",
        "_services._dns-sd._udp",
        "local",
        &[],
    ));

    let answers = vec![ptr(
        "_services._dns-sd._udp.local.",
        "_workstation._tcp.local.",
        120,
    )];
    let out = correlator.handle_message(&envelope(answers));
    assert_eq!(out.len(), 1);
    assert!(out[0].addr_ipv4.is_empty());
    assert!(out[0].addr_ipv6.is_empty());
    assert_eq!(out[0].instance, "_workstation._tcp.local");
}

#[test]
fn test_lookup_filters_other_instances() {
    let mut correlator = Correlator::new(ServiceRecord::new(
        "Host",
        "_workstation._tcp",
        "local",
        &[],
    ));

    let answers = vec![
        srv("Other._workstation._tcp.local.", "other.local.", 9, 120),
        a("other.local.", Ipv4Addr::new(192, 168, 1, 20)),
    ];
    assert!(correlator.handle_message(&envelope(answers)).is_empty());

    let answers = vec![
        srv("Host._workstation._tcp.local.", "host.local.", 9, 120),
        a("host.local.", Ipv4Addr::new(192, 168, 1, 10)),
    ];
    let out = correlator.handle_message(&envelope(answers));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].instance, "Host");
}

#[test]
fn test_addresses_attach_by_host_name() {
    let mut correlator = browse_correlator();

    let answers = vec![
        srv("Host._workstation._tcp.local.", "host.local.", 9, 120),
        // Addresses for an unrelated host must not attach.
        a("elsewhere.local.", Ipv4Addr::new(10, 0, 0, 1)),
        a("host.local.", Ipv4Addr::new(192, 168, 1, 10)),
        aaaa("host.local.", "fe80::2".parse().unwrap()),
    ];
    let out = correlator.handle_message(&envelope(answers));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].addr_ipv4, vec![Ipv4Addr::new(192, 168, 1, 10)]);
    assert_eq!(out[0].addr_ipv6, vec!["fe80::2".parse::<Ipv6Addr>().unwrap()]);
}

#[test]
fn test_records_in_additionals_count() {
    let mut correlator = browse_correlator();

    let env = MessageEnvelope {
        msg: Message {
            answers: vec![ptr(
                "_workstation._tcp.local.",
                "Host._workstation._tcp.local.",
                120,
            )],
            additionals: vec![
                srv("Host._workstation._tcp.local.", "host.local.", 9, 120),
                a("host.local.", Ipv4Addr::new(192, 168, 1, 10)),
            ],
            ..Default::default()
        },
        src: SRC.parse().unwrap(),
    };
    let out = correlator.handle_message(&env);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].port, 9);
}

#[test]
fn test_src_addr_recorded_from_srv_datagram() {
    let mut correlator = browse_correlator();

    let answers = vec![
        srv("Host._workstation._tcp.local.", "host.local.", 9, 120),
        a("host.local.", Ipv4Addr::new(192, 168, 1, 10)),
    ];
    let out = correlator.handle_message(&envelope_from(answers, "172.16.0.5:5353"));
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].src_addr,
        Some(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 5)))
    );
    // The real address came from the A record, not the fallback.
    assert_eq!(out[0].addr_ipv4, vec![Ipv4Addr::new(192, 168, 1, 10)]);
}
