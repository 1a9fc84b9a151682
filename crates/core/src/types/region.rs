//! Region and country code tables for the print provider.
//!
//! The provider wants ISO-style codes ("CA", "US"), buyers type display
//! names ("California", "United States"). These tables translate; inputs
//! already in code form pass through untouched.

/// US state and territory display names with their USPS codes.
static US_STATES: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

/// Country display names with their ISO 3166-1 alpha-2 codes.
///
/// Only the US is a supported ship-to country today; the rest of the table
/// keeps profile forms tolerant of how people spell their country.
static COUNTRIES: &[(&str, &str)] = &[
    ("United States", "US"),
    ("United States of America", "US"),
    ("USA", "US"),
    ("Canada", "CA"),
    ("United Kingdom", "GB"),
    ("Australia", "AU"),
    ("New Zealand", "NZ"),
    ("Germany", "DE"),
    ("France", "FR"),
    ("Italy", "IT"),
    ("Spain", "ES"),
    ("Netherlands", "NL"),
    ("Belgium", "BE"),
    ("Switzerland", "CH"),
    ("Austria", "AT"),
    ("Sweden", "SE"),
    ("Norway", "NO"),
    ("Denmark", "DK"),
    ("Finland", "FI"),
    ("Ireland", "IE"),
    ("Portugal", "PT"),
];

/// True if the input already looks like a two-letter uppercase code.
fn is_code(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// Resolve a US state/province display name to its provider region code.
///
/// Inputs already in two-letter code form are returned as-is. Returns
/// `None` for names the table doesn't know; callers decide whether that's
/// fatal (for checkout it isn't - the raw name passes through with a
/// warning).
#[must_use]
pub fn region_code(name: &str) -> Option<&str> {
    if is_code(name) {
        return Some(name);
    }
    US_STATES
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, code)| *code)
}

/// Resolve a country display name to its ISO 3166-1 alpha-2 code.
///
/// Inputs already in code form are returned as-is.
#[must_use]
pub fn country_code(name: &str) -> Option<&str> {
    if is_code(name) {
        return Some(name);
    }
    COUNTRIES
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, code)| *code)
}
