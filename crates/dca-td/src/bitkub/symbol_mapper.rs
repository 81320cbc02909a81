//! Symbol mapping between target-map keys and Bitkub symbols.
//!
//! Bitkub trades everything against THB with `BASE_THB` symbols, while target
//! maps written by analysis tooling often use the global `BASE/USDT` form.
//! Both spellings name the same asset here.

/// Quote currency of every Bitkub spot market.
pub const QUOTE: &str = "THB";

/// Alternate quote suffix accepted in target-map keys.
pub const ALT_QUOTE: &str = "USDT";

/// Quote suffixes stripped when normalizing a key.
const KNOWN_SUFFIXES: &[&str] = &["/USDT", "_USDT", "/BUSD", "_BUSD", "/THB", "_THB", "/USD"];

/// Base asset of a key or symbol (`"BTC"` for `"BTC_THB"` or `"btc/usdt"`).
pub fn base_asset(key: &str) -> String {
    let upper = key.trim().to_uppercase();
    for suffix in KNOWN_SUFFIXES {
        if let Some(base) = upper.strip_suffix(suffix) {
            return base.to_string();
        }
    }
    upper
        .split(['_', '/'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Bitkub symbol for a target-map key (`"BTC/USDT"` → `"BTC_THB"`).
pub fn to_exchange_symbol(key: &str) -> String {
    format!("{}_{QUOTE}", base_asset(key))
}

/// The alternate key spelling checked after the key itself
/// (`"BTC_THB"` → `"BTC/USDT"`).
///
/// Uses the part before the first `_`, matching how keys are written by hand.
pub fn alternate_key(key: &str) -> String {
    let base = key.split('_').next().unwrap_or(key);
    format!("{base}/{ALT_QUOTE}")
}
