//! Programmable storage for the records served by the fixture.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use hickory_proto::rr::rdata::{A, AAAA, CNAME};
use hickory_proto::rr::{LowerName, Name, RData, Record, RecordType};

/// TTL applied to every record served by the fixture.
const DEFAULT_TTL: u32 = 3600;

/// Mutable mapping from canonical domain name to the ordered records
/// stored under it.
///
/// The store is safe to share between concurrent callers: every operation
/// locks the whole map for its duration, so a lookup sees either the full
/// pre-state or the full post-state of any concurrent mutation. Names are
/// canonicalized (lowercase, fully qualified) on every call, so lookups are
/// case-insensitive and a trailing dot is never significant.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Mutex<BTreeMap<LowerName, Vec<Record>>>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an address record (A or AAAA, selected by the IP version)
    /// for `name`, creating the entry if absent.
    pub fn add_address(&self, name: &Name, addr: IpAddr) {
        let rdata = match addr {
            IpAddr::V4(addr) => RData::A(A::from(addr)),
            IpAddr::V6(addr) => RData::AAAA(AAAA::from(addr)),
        };
        self.append(name, rdata);
    }

    /// Append an alias (CNAME) record redirecting `name` to `target`.
    pub fn add_alias(&self, name: &Name, target: &Name) {
        let target = Name::from(canonical(target));
        self.append(name, RData::CNAME(CNAME(target)));
    }

    /// Remove every record stored under `name`. No-op if the name is absent.
    pub fn remove(&self, name: &Name) {
        self.lock().remove(&canonical(name));
    }

    /// Look up the records of type `rtype` stored under `name`.
    ///
    /// Returns `None` when the name has no entry at all, and `Some` with the
    /// (possibly empty) matching records otherwise. The distinction lets the
    /// responder tell "no such name" apart from "name exists, but not with
    /// this record type".
    pub fn lookup(&self, name: &Name, rtype: RecordType) -> Option<Vec<Record>> {
        self.lock().get(&canonical(name)).map(|records| {
            records
                .iter()
                .filter(|record| record.record_type() == rtype)
                .cloned()
                .collect()
        })
    }

    fn append(&self, name: &Name, rdata: RData) {
        let owner = canonical(name);
        let record = Record::from_rdata(Name::from(&owner), DEFAULT_TTL, rdata);
        self.lock().entry(owner).or_default().push(record);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<LowerName, Vec<Record>>> {
        // A poisoning panic cannot leave the map partially mutated, so the
        // guard is still safe to hand out.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for RecordStore {
    /// Deep copy: the clone owns independent record vectors, so mutations
    /// on either side never show up on the other.
    fn clone(&self) -> Self {
        Self {
            records: Mutex::new(self.lock().clone()),
        }
    }
}

/// Canonical form of a name: lowercase and fully qualified.
fn canonical(name: &Name) -> LowerName {
    let mut name = name.to_lowercase();
    name.set_fqdn(true);
    LowerName::new(&name)
}
