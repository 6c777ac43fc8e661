use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Address family of the client that opened a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    Ipv4,
    Ipv6,
}

impl IpFamily {
    /// Classify `addr`. IPv4-mapped IPv6 addresses count as IPv4.
    pub fn of(addr: &IpAddr) -> Self {
        match addr.to_canonical() {
            IpAddr::V4(_) => IpFamily::Ipv4,
            IpAddr::V6(_) => IpFamily::Ipv6,
        }
    }
}

/// Identity attached to an authenticated request.
///
/// Built once at login and stored verbatim as the session record; every
/// later request on that session sees the same values. Handlers receive it
/// as an explicit argument.
///
/// Serialized field names are the session record's wire format. `title` is
/// stored as `jabatan` and `ip_family` as `ipvx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: String,
    pub name: String,
    pub role: String,
    pub nip: String,
    pub department_id: String,
    #[serde(rename = "jabatan")]
    pub title: String,
    /// Client address observed at login.
    pub ip: String,
    #[serde(rename = "ipvx")]
    pub ip_family: IpFamily,
}

/// Canonical textual form of a client address.
pub fn client_ip(addr: &IpAddr) -> String {
    addr.to_canonical().to_string()
}
