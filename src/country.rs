use isocountry::CountryCode;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ALPHA2_REGEX: Regex = Regex::new(r"^[A-Za-z]{2}$").unwrap();
}

/// Source of display names for ISO 3166-1 alpha-2 codes
pub trait CountryRegistry: Send + Sync {
    /// Display name for `code`, or `None` when the registry has no entry
    fn lookup(&self, code: &str) -> Option<String>;
}

/// Registry backed by the ISO 3166-1 table shipped with `isocountry`
#[derive(Clone, Copy, Debug, Default)]
pub struct IsoCountryRegistry;

impl CountryRegistry for IsoCountryRegistry {
    fn lookup(&self, code: &str) -> Option<String> {
        CountryCode::for_alpha2(&code.to_uppercase())
            .ok()
            .map(|country| country.name().to_string())
    }
}

/// Display name for a country code, or the code itself
///
/// Unknown codes and codes that are not two ASCII letters come back unchanged;
/// a miss is never reported as an error.
pub fn resolve_country(registry: &dyn CountryRegistry, code: &str) -> String {
    let trimmed = code.trim();
    if !ALPHA2_REGEX.is_match(trimmed) {
        return code.to_string();
    }

    registry
        .lookup(trimmed)
        .unwrap_or_else(|| code.to_string())
}
