//! Company-name → ticker normalization (spec §4.3 stage 1, §9 open
//! question (c): "the exact company-name → ticker map and its update
//! cadence" — resolved here as a small static table refreshed only by a
//! code change, which is defensible for a finite set of well-known
//! names).
//!
//! Case-insensitive; ambiguous names prefer the US primary listing
//! (spec §4.3 "Tie-breaks").

const KNOWN: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("microsoft", "MSFT"),
    ("meta", "META"),
    ("facebook", "META"),
    ("tesla", "TSLA"),
    ("netflix", "NFLX"),
    ("nvidia", "NVDA"),
    ("amd", "AMD"),
    ("intel", "INTC"),
    ("berkshire", "BRK.A"),
    ("berkshire hathaway", "BRK.A"),
    ("disney", "DIS"),
    ("walmart", "WMT"),
    ("jpmorgan", "JPM"),
    ("jp morgan", "JPM"),
    ("coca-cola", "KO"),
    ("coca cola", "KO"),
    ("visa", "V"),
    ("mastercard", "MA"),
];

/// Normalize one user-provided symbol or company name to a canonical
/// ticker. Falls back to uppercasing the input verbatim when it isn't
/// in the known map (covers symbols the user already typed correctly).
pub fn normalize(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    for (name, ticker) in KNOWN {
        if *name == lower {
            return ticker.to_string();
        }
    }
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_company_names_case_insensitively() {
        assert_eq!(normalize("Apple"), "AAPL");
        assert_eq!(normalize("GOOGLE"), "GOOGL");
        assert_eq!(normalize("facebook"), "META");
    }

    #[test]
    fn passes_through_unknown_symbols_uppercased() {
        assert_eq!(normalize("meta"), "META");
        assert_eq!(normalize("xyz"), "XYZ");
    }
}
