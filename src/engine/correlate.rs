use std::collections::HashMap;
use std::net::IpAddr;

use super::MessageEnvelope;
use crate::message::resource::a::AResource;
use crate::message::resource::aaaa::AaaaResource;
use crate::message::resource::ptr::PtrResource;
use crate::message::resource::srv::SrvResource;
use crate::message::resource::txt::TxtResource;
use crate::message::resource::Resource;
use crate::service::{trim_dot, ServiceEntry, ServiceRecord};

// Correlator merges the records of incoming messages into ServiceEntry
// values and decides which become visible to the consumer.
//
// It is owned by a single scheduler task; `sent_entries` is the only state
// carried across datagrams, so no locking is involved anywhere.
pub(crate) struct Correlator {
    record: ServiceRecord,
    // Instance FQDN -> entry already delivered. A goodbye removes the
    // instance so a later announcement is delivered again.
    sent_entries: HashMap<String, ServiceEntry>,
}

impl Correlator {
    pub(crate) fn new(record: ServiceRecord) -> Self {
        Correlator {
            record,
            sent_entries: HashMap::new(),
        }
    }

    // handle_message correlates one incoming message and returns the entries
    // that are ready for delivery, in arrival order of their defining
    // records.
    //
    // The transient per-message map is keyed by instance FQDN; records from
    // the answer, authority and additional sections are treated uniformly.
    pub(crate) fn handle_message(&mut self, envelope: &MessageEnvelope) -> Vec<ServiceEntry> {
        let mut entries: HashMap<String, ServiceEntry> = HashMap::new();
        let mut order: Vec<String> = vec![];

        let sections = || {
            envelope
                .msg
                .answers
                .iter()
                .chain(envelope.msg.authorities.iter())
                .chain(envelope.msg.additionals.iter())
        };

        // First pass: instance-defining records (PTR, SRV, TXT).
        for resource in sections() {
            self.merge_instance_record(resource, envelope, &mut entries, &mut order);
        }

        // Second pass: associate addresses, now that the host names are
        // known.
        for resource in sections() {
            let Some(body) = &resource.body else { continue };
            let name = &resource.header.name.data;
            if let Some(a) = body.as_any().downcast_ref::<AResource>() {
                for entry in entries.values_mut().filter(|e| &e.host_name == name) {
                    entry.addr_ipv4.push(a.a.into());
                }
            } else if let Some(aaaa) = body.as_any().downcast_ref::<AaaaResource>() {
                for entry in entries.values_mut().filter(|e| &e.host_name == name) {
                    entry.addr_ipv6.push(aaaa.aaaa.into());
                }
            }
        }

        let mut out = vec![];
        for key in order {
            let Some(mut entry) = entries.remove(&key) else {
                continue;
            };

            // TTL zero is a goodbye: never delivered, and the instance may
            // be delivered again on a fresh announcement.
            if entry.ttl == 0 {
                self.sent_entries.remove(&key);
                continue;
            }
            if self.sent_entries.contains_key(&key) {
                continue;
            }

            // A DNS-SD service-type enumeration answers with bare PTRs, so
            // only that case goes out without a resolved address.
            if self.record.service_type_name() != self.record.service_name()
                && entry.addr_ipv4.is_empty()
                && entry.addr_ipv6.is_empty()
            {
                match entry.src_addr {
                    Some(IpAddr::V4(ip)) => entry.addr_ipv4.push(ip),
                    Some(IpAddr::V6(ip)) => entry.addr_ipv6.push(ip),
                    // Not resolvable yet; wait for more records.
                    None => continue,
                }
            }

            self.sent_entries.insert(key, entry.clone());
            out.push(entry);
        }
        out
    }

    fn merge_instance_record(
        &self,
        resource: &Resource,
        envelope: &MessageEnvelope,
        entries: &mut HashMap<String, ServiceEntry>,
        order: &mut Vec<String>,
    ) {
        let Some(body) = &resource.body else { return };
        let header = &resource.header;
        let service_name = self.record.service_name();
        let instance_name = self.record.service_instance_name();

        if let Some(ptr) = body.as_any().downcast_ref::<PtrResource>() {
            // PTR maps the service name to an instance FQDN.
            if service_name != header.name.data {
                return;
            }
            if !instance_name.is_empty() && instance_name != ptr.ptr.data {
                return;
            }
            let entry = Self::entry_for(&self.record, &ptr.ptr.data, entries, order);
            entry.ttl = header.ttl;
        } else if let Some(srv) = body.as_any().downcast_ref::<SrvResource>() {
            if !self.matches_instance(&header.name.data) {
                return;
            }
            let entry = Self::entry_for(&self.record, &header.name.data, entries, order);
            entry.host_name = srv.target.data.clone();
            entry.port = srv.port;
            entry.ttl = header.ttl;
            entry.src_addr = Some(envelope.src.ip());
        } else if let Some(txt) = body.as_any().downcast_ref::<TxtResource>() {
            if !self.matches_instance(&header.name.data) {
                return;
            }
            let entry = Self::entry_for(&self.record, &header.name.data, entries, order);
            entry.text = txt.txt.clone();
            entry.ttl = header.ttl;
        }
    }

    // matches_instance applies the SRV/TXT header rules: an exact match when
    // a specific instance is looked up, a service-name suffix otherwise.
    fn matches_instance(&self, name: &str) -> bool {
        let instance_name = self.record.service_instance_name();
        if !instance_name.is_empty() {
            instance_name == name
        } else {
            name.ends_with(self.record.service_name())
        }
    }

    fn entry_for<'a>(
        record: &ServiceRecord,
        key: &str,
        entries: &'a mut HashMap<String, ServiceEntry>,
        order: &mut Vec<String>,
    ) -> &'a mut ServiceEntry {
        if !entries.contains_key(key) {
            order.push(key.to_owned());
            let instance = trim_dot(key.strip_suffix(record.service_name()).unwrap_or(key));
            entries.insert(
                key.to_owned(),
                ServiceEntry::new(instance, &record.service, &record.domain),
            );
        }
        entries.get_mut(key).unwrap()
    }
}
