//! User domain entity and role set

use chrono::{DateTime, Utc};

/// Email domain accepted for registration (and its subdomains).
pub const INSTITUTIONAL_DOMAIN: &str = "unisabana.edu.co";

/// Capability a user may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Passenger,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passenger => "passenger",
            Self::Driver => "driver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passenger" => Some(Self::Passenger),
            "driver" => Some(Self::Driver),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Small bitfield of held roles. The passenger bit is always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSet(u8);

const PASSENGER_BIT: u8 = 0b01;
const DRIVER_BIT: u8 = 0b10;

impl RoleSet {
    pub fn passenger_only() -> Self {
        Self(PASSENGER_BIT)
    }

    pub fn with_driver() -> Self {
        Self(PASSENGER_BIT | DRIVER_BIT)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & Self::bit(role) != 0
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= Self::bit(role);
    }

    /// Removes a role. The passenger role cannot be removed.
    pub fn remove(&mut self, role: Role) {
        if role != Role::Passenger {
            self.0 &= !Self::bit(role);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        [Role::Passenger, Role::Driver]
            .into_iter()
            .filter(|r| self.contains(*r))
    }

    /// Comma-separated persistence form, e.g. `"passenger,driver"`.
    pub fn encode(&self) -> String {
        self.iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parses the persistence form; the passenger bit is forced on.
    pub fn decode(s: &str) -> Self {
        let mut set = Self::passenger_only();
        for part in s.split(',') {
            if let Some(role) = Role::parse(part.trim()) {
                set.insert(role);
            }
        }
        set
    }

    fn bit(role: Role) -> u8 {
        match role {
            Role::Passenger => PASSENGER_BIT,
            Role::Driver => DRIVER_BIT,
        }
    }
}

impl Default for RoleSet {
    fn default() -> Self {
        Self::passenger_only()
    }
}

/// How a passenger intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Nequi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Nequi => "nequi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "nequi" => Some(Self::Nequi),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registered member of the university community.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    /// Lowercased institutional address, unique.
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Unique university-issued identifier, e.g. `A00012345`.
    pub university_id: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub roles: RoleSet,
    pub active_role: Role,
    /// Default vehicle for new trips. Only set while the user owns vehicles.
    pub active_vehicle_id: Option<String>,
    pub emergency_contact: Option<String>,
    pub preferred_payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_driver(&self) -> bool {
        self.roles.contains(Role::Driver)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Whether `email` belongs to the institutional domain or a subdomain of it.
///
/// The address is expected in lowercased form.
pub fn is_institutional_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain == INSTITUTIONAL_DOMAIN
        || domain.ends_with(&format!(".{}", INSTITUTIONAL_DOMAIN))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_set_always_contains_passenger() {
        let mut set = RoleSet::passenger_only();
        assert!(set.contains(Role::Passenger));
        set.remove(Role::Passenger);
        assert!(set.contains(Role::Passenger));
    }

    #[test]
    fn role_set_insert_and_remove_driver() {
        let mut set = RoleSet::passenger_only();
        assert!(!set.contains(Role::Driver));
        set.insert(Role::Driver);
        assert!(set.contains(Role::Driver));
        set.remove(Role::Driver);
        assert!(!set.contains(Role::Driver));
    }

    #[test]
    fn role_set_encode_decode_roundtrip() {
        let set = RoleSet::with_driver();
        assert_eq!(set.encode(), "passenger,driver");
        assert_eq!(RoleSet::decode("passenger,driver"), set);
        assert_eq!(RoleSet::decode(""), RoleSet::passenger_only());
        assert_eq!(RoleSet::decode("driver"), RoleSet::with_driver());
    }

    #[test]
    fn institutional_email_accepts_domain_and_subdomains() {
        assert!(is_institutional_email("laura@unisabana.edu.co"));
        assert!(is_institutional_email("prof@clinica.unisabana.edu.co"));
    }

    #[test]
    fn institutional_email_rejects_foreign_domains() {
        assert!(!is_institutional_email("laura@gmail.com"));
        assert!(!is_institutional_email("laura@unisabana.edu.co.evil.com"));
        assert!(!is_institutional_email("evil-unisabana.edu.co"));
        assert!(!is_institutional_email("@unisabana.edu.co"));
    }

    #[test]
    fn payment_method_parse() {
        assert_eq!(PaymentMethod::parse("cash"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("nequi"), Some(PaymentMethod::Nequi));
        assert_eq!(PaymentMethod::parse("card"), None);
    }
}
