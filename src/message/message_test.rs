use super::name::Name;
use super::resource::a::AResource;
use super::resource::aaaa::AaaaResource;
use super::resource::opaque::OpaqueResource;
use super::resource::ptr::PtrResource;
use super::resource::srv::SrvResource;
use super::resource::txt::TxtResource;
use super::resource::{Resource, ResourceBody, ResourceHeader};
use super::*;
use crate::error::Error;

fn resource(name: &str, ttl: u32, body: Box<dyn ResourceBody>) -> Resource {
    Resource {
        header: ResourceHeader {
            name: Name::new(name).unwrap(),
            class: DNSCLASS_INET,
            ttl,
            ..Default::default()
        },
        body: Some(body),
    }
}

#[test]
fn test_query_round_trip() {
    let mut msg = Message {
        header: Header::default(),
        questions: vec![Question {
            name: Name::new("_workstation._tcp.local.").unwrap(),
            typ: DnsType::Ptr,
            class: DNSCLASS_INET,
        }],
        ..Default::default()
    };
    let buf = msg.pack().unwrap();

    let mut parsed = Message::default();
    parsed.unpack(&buf).unwrap();

    assert!(!parsed.header.response);
    assert!(!parsed.header.recursion_desired);
    assert_eq!(parsed.questions.len(), 1);
    assert_eq!(parsed.questions[0].name.data, "_workstation._tcp.local.");
    assert_eq!(parsed.questions[0].typ, DnsType::Ptr);
    assert_eq!(parsed.questions[0].class, DNSCLASS_INET);
    assert!(parsed.answers.is_empty());
}

#[test]
fn test_response_round_trip() {
    let mut msg = Message {
        header: Header {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers: vec![
            resource(
                "_workstation._tcp.local.",
                120,
                Box::new(PtrResource {
                    ptr: Name::new("Host._workstation._tcp.local.").unwrap(),
                }),
            ),
            resource(
                "Host._workstation._tcp.local.",
                120,
                Box::new(SrvResource {
                    priority: 0,
                    weight: 0,
                    port: 9,
                    target: Name::new("host.local.").unwrap(),
                }),
            ),
            resource(
                "Host._workstation._tcp.local.",
                120,
                Box::new(TxtResource {
                    txt: vec!["path=/".to_owned(), "version=1".to_owned()],
                }),
            ),
        ],
        additionals: vec![
            resource("host.local.", 120, Box::new(AResource { a: [192, 168, 1, 10] })),
            resource(
                "host.local.",
                120,
                Box::new(AaaaResource {
                    aaaa: "fe80::1".parse::<std::net::Ipv6Addr>().unwrap().octets(),
                }),
            ),
        ],
        ..Default::default()
    };
    let buf = msg.pack().unwrap();

    let mut parsed = Message::default();
    parsed.unpack(&buf).unwrap();

    assert!(parsed.header.response);
    assert!(parsed.header.authoritative);
    assert_eq!(parsed.answers.len(), 3);
    assert_eq!(parsed.additionals.len(), 2);

    let ptr = parsed.answers[0]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<PtrResource>()
        .unwrap();
    assert_eq!(ptr.ptr.data, "Host._workstation._tcp.local.");

    let srv = parsed.answers[1]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<SrvResource>()
        .unwrap();
    assert_eq!(srv.port, 9);
    assert_eq!(srv.target.data, "host.local.");
    assert_eq!(parsed.answers[1].header.ttl, 120);

    let txt = parsed.answers[2]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<TxtResource>()
        .unwrap();
    assert_eq!(txt.txt, vec!["path=/".to_owned(), "version=1".to_owned()]);

    let a = parsed.additionals[0]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<AResource>()
        .unwrap();
    assert_eq!(a.a, [192, 168, 1, 10]);

    let aaaa = parsed.additionals[1]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<AaaaResource>()
        .unwrap();
    assert_eq!(aaaa.aaaa[0], 0xfe);
    assert_eq!(aaaa.aaaa[15], 0x01);
}

#[test]
fn test_compression_pointer_unpack() {
    // Hand-packed response with two A records; the second name is a
    // pointer back to the first (offset 12, right after the header).
    #[rustfmt::skip]
    let raw: Vec<u8> = vec![
        // header: id=0, bits=response, 0 questions, 2 answers
        0x00, 0x00, 0x84, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
        // answer 1: host.local. A 10.0.0.1
        4, b'h', b'o', b's', b't', 5, b'l', b'o', b'c', b'a', b'l', 0,
        0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x78, 0x00, 0x04, 10, 0, 0, 1,
        // answer 2: pointer to offset 12, A 10.0.0.2
        0xC0, 0x0C,
        0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x78, 0x00, 0x04, 10, 0, 0, 2,
    ];

    let mut parsed = Message::default();
    parsed.unpack(&raw).unwrap();

    assert_eq!(parsed.answers.len(), 2);
    assert_eq!(parsed.answers[0].header.name.data, "host.local.");
    assert_eq!(parsed.answers[1].header.name.data, "host.local.");
    let a = parsed.answers[1]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<AResource>()
        .unwrap();
    assert_eq!(a.a, [10, 0, 0, 2]);
}

#[test]
fn test_packed_names_use_compression() {
    let mut msg = Message {
        header: Header {
            response: true,
            ..Default::default()
        },
        answers: vec![
            resource("host.local.", 120, Box::new(AResource { a: [10, 0, 0, 1] })),
            resource("host.local.", 120, Box::new(AResource { a: [10, 0, 0, 2] })),
        ],
        ..Default::default()
    };
    let buf = msg.pack().unwrap();

    // The second occurrence of the name packs as a 2-byte pointer rather
    // than repeating the 12-byte label sequence.
    let uncompressed_len = 12 + 2 * (12 + 10 + 4);
    assert!(buf.len() < uncompressed_len);

    let mut parsed = Message::default();
    parsed.unpack(&buf).unwrap();
    assert_eq!(parsed.answers[1].header.name.data, "host.local.");
}

#[test]
fn test_unknown_record_type_is_opaque() {
    // NSEC (type 47) shows up in real mDNS responses; the engine must parse
    // around it.
    #[rustfmt::skip]
    let raw: Vec<u8> = vec![
        0x00, 0x00, 0x84, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00,
        // answer 1: host.local. NSEC with 3 bytes of rdata
        4, b'h', b'o', b's', b't', 5, b'l', b'o', b'c', b'a', b'l', 0,
        0x00, 0x2F, 0x00, 0x01, 0x00, 0x00, 0x00, 0x78, 0x00, 0x03, 0xAA, 0xBB, 0xCC,
        // answer 2: same name (pointer), A 10.0.0.1
        0xC0, 0x0C,
        0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x78, 0x00, 0x04, 10, 0, 0, 1,
    ];

    let mut parsed = Message::default();
    parsed.unpack(&raw).unwrap();

    assert_eq!(parsed.answers.len(), 2);
    let opaque = parsed.answers[0]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<OpaqueResource>()
        .unwrap();
    assert_eq!(opaque.data, vec![0xAA, 0xBB, 0xCC]);
    assert_eq!(parsed.answers[0].header.typ, DnsType::Unsupported);
    assert_eq!(parsed.answers[1].header.typ, DnsType::A);
}

#[test]
fn test_junk_input_is_rejected() {
    let mut msg = Message::default();
    assert!(msg.unpack(&[]).is_err());
    assert!(msg.unpack(&[0xFF; 5]).is_err());

    // Claims one answer but carries none.
    let truncated = vec![0x00, 0x00, 0x84, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
    let mut msg = Message::default();
    assert!(msg.unpack(&truncated).is_err());
}

#[test]
fn test_rdata_length_must_match_body() {
    // A record claiming 6 bytes of rdata but encoding an address (4 bytes).
    #[rustfmt::skip]
    let raw: Vec<u8> = vec![
        0x00, 0x00, 0x84, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        4, b'h', b'o', b's', b't', 5, b'l', b'o', b'c', b'a', b'l', 0,
        0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x78, 0x00, 0x06, 10, 0, 0, 1, 0, 0,
    ];
    let mut msg = Message::default();
    assert_eq!(msg.unpack(&raw), Err(Error::ErrResourceLen));
}

#[test]
fn test_name_requires_trailing_dot() {
    let name = Name::new("host.local").unwrap();
    assert_eq!(
        name.pack(vec![], &mut None, 0),
        Err(Error::ErrNonCanonicalName)
    );
}

#[test]
fn test_root_name_round_trip() {
    let name = Name::new(".").unwrap();
    let buf = name.pack(vec![], &mut None, 0).unwrap();
    assert_eq!(buf, vec![0]);

    let mut parsed = Name::default();
    let off = parsed.unpack(&buf, 0).unwrap();
    assert_eq!(off, 1);
    assert_eq!(parsed.data, ".");
}

#[test]
fn test_pointer_loop_is_rejected() {
    // A name that points at itself never terminates; the pointer limit
    // must cut it off.
    #[rustfmt::skip]
    let raw: Vec<u8> = vec![
        0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0xC0, 0x0C, // question name: pointer to itself
        0x00, 0x0C, 0x00, 0x01,
    ];
    let mut msg = Message::default();
    assert_eq!(msg.unpack(&raw), Err(Error::ErrTooManyPtr));
}

#[test]
fn test_txt_empty_rdata() {
    let mut msg = Message {
        header: Header {
            response: true,
            ..Default::default()
        },
        answers: vec![resource(
            "Host._workstation._tcp.local.",
            120,
            Box::new(TxtResource { txt: vec![] }),
        )],
        ..Default::default()
    };
    let buf = msg.pack().unwrap();

    let mut parsed = Message::default();
    parsed.unpack(&buf).unwrap();
    let txt = parsed.answers[0]
        .body
        .as_ref()
        .unwrap()
        .as_any()
        .downcast_ref::<TxtResource>()
        .unwrap();
    assert!(txt.txt.is_empty());
}
