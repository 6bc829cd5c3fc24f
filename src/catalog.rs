//! Fixed lookup tables: test accounts, carrier prefixes, wallet menus and
//! resolver endpoints.
//!
//! These are data fixtures, not logic. Transactions are simulated, so the
//! electricity flow verifies meters against the known test accounts below.

/// A known electricity account used for simulated verification
#[derive(Debug, Clone, Copy)]
pub struct MeterAccount {
    /// 11-digit meter number
    pub meter: &'static str,
    /// Registered account holder
    pub name: &'static str,
    /// Supply area
    pub area: &'static str,
}

/// Known test accounts keyed by meter number
pub const TEST_ACCOUNTS: &[MeterAccount] = &[
    MeterAccount {
        meter: "37145678901",
        name: "T. Moyo",
        area: "Harare - Avondale",
    },
    MeterAccount {
        meter: "37100023456",
        name: "S. Ncube",
        area: "Bulawayo - Hillside",
    },
    MeterAccount {
        meter: "37155512345",
        name: "R. Chirwa",
        area: "Mutare - Dangamvura",
    },
];

/// Look up a known test meter account.
#[must_use]
pub fn find_meter_account(meter: &str) -> Option<&'static MeterAccount> {
    TEST_ACCOUNTS.iter().find(|a| a.meter == meter)
}

/// Mobile network prefixes for carrier detection
pub const CARRIER_PREFIXES: &[(&str, &str)] = &[
    ("077", "Econet"),
    ("078", "Econet"),
    ("071", "NetOne"),
    ("073", "Telecel"),
];

/// Detect the carrier for a local 10-digit phone number.
#[must_use]
pub fn detect_carrier(phone: &str) -> Option<&'static str> {
    CARRIER_PREFIXES
        .iter()
        .find(|(prefix, _)| phone.starts_with(prefix))
        .map(|(_, carrier)| *carrier)
}

/// Wallet options offered when paying for electricity tokens
pub const ZESA_WALLETS: &[&str] = &["EcoCash", "OneMoney"];

/// Wallet options offered when buying airtime
pub const AIRTIME_WALLETS: &[&str] = &["EcoCash", "OneMoney", "InnBucks"];

/// Fixed airtime tiers in cents, presented as menu options 1..=N
pub const AIRTIME_TIERS_CENTS: &[u64] = &[50, 100, 200, 500];

/// Bill-payment categories and the resolver endpoint path for each.
///
/// The extra `general` entry backs codes submitted outside the bill flow,
/// where no category has been chosen yet; the resolver response carries
/// the authoritative category either way.
pub const BILL_CATEGORIES: &[(&str, &str)] = &[
    ("Municipal rates", "/resolve/municipal"),
    ("School fees", "/resolve/education"),
    ("Insurance", "/resolve/insurance"),
    ("Internet & TV", "/resolve/telco"),
];

/// Resolver endpoint path used when no category context exists
pub const GENERAL_RESOLVE_PATH: &str = "/resolve/general";

/// Endpoint path for a bill category index (1-based menu numbering).
#[must_use]
pub fn category_resolve_path(index: usize) -> &'static str {
    BILL_CATEGORIES
        .get(index)
        .map_or(GENERAL_RESOLVE_PATH, |entry| entry.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_lookup() {
        let account = find_meter_account("37145678901").expect("fixture meter");
        assert_eq!(account.name, "T. Moyo");
        assert!(find_meter_account("99999999999").is_none());
    }

    #[test]
    fn test_carrier_detection() {
        assert_eq!(detect_carrier("0771234567"), Some("Econet"));
        assert_eq!(detect_carrier("0781234567"), Some("Econet"));
        assert_eq!(detect_carrier("0712345678"), Some("NetOne"));
        assert_eq!(detect_carrier("0731234567"), Some("Telecel"));
        assert_eq!(detect_carrier("0751234567"), None);
    }

    #[test]
    fn test_category_paths() {
        assert_eq!(category_resolve_path(0), "/resolve/municipal");
        assert_eq!(category_resolve_path(99), GENERAL_RESOLVE_PATH);
    }
}
