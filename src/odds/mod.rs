//! Odds parsing
//!
//! Turns free-text market odds into decimal prices and implied
//! probabilities. Every parser returns `None` on garbage; nothing here
//! panics or logs above `debug`.

pub mod probability;

pub use probability::{
    calibrated_win_probs, empirical_calibration, field_size_adjust, implied_from_decimal,
    overround_correction, CalibratedWinProb,
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    // "9/2", "9-2", "9 to 2", any case, any spacing
    static ref FRACTIONAL_RE: Regex =
        Regex::new(r"(?i)^\s*(\d+)\s*(?:/|-|to)\s*(\d+)\s*$").unwrap();
    // "(108*)", "(114)"
    static ref SPEED_FIG_RE: Regex = Regex::new(r"\((\d+)\*?\)").unwrap();
    // Looser fractional form used by the market parser; also takes "7:2" and "7 2"
    static ref MARKET_FRACTIONAL_RE: Regex =
        Regex::new(r"^(\d+)\s*(?:[/:\-]|\s|TO)\s*(\d+)$").unwrap();
    static ref MONEYLINE_RE: Regex = Regex::new(r"^[+-]\d+$").unwrap();
    static ref INTEGER_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref DECIMAL_RE: Regex = Regex::new(r"^\d*\.\d+$").unwrap();
}

/// Tokens that mean the runner will not start.
const SCRATCH_TOKENS: [&str; 6] = ["", "—", "SCR", "SCRATCHED", "WD", "WITHDRAWN"];
const EVEN_TOKENS: [&str; 4] = ["EVEN", "EVN", "1-1", "1/1"];

/// Fractional odds `A/B`: win `A` for every `B` staked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractionalOdds {
    pub numerator: u64,
    pub denominator: u64,
}

impl FractionalOdds {
    /// Decimal price `A/B + 1`
    pub fn decimal(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64 + 1.0
    }

    /// `B / (A + B)`, equal to `1 / decimal`
    pub fn implied_probability(&self) -> f64 {
        let a = self.numerator as f64;
        let b = self.denominator as f64;
        b / (a + b)
    }
}

impl fmt::Display for FractionalOdds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Parse an `A/B`, `A-B` or `A to B` token.
///
/// Returns `None` when the token is empty, does not match, overflows, or
/// either side is zero.
pub fn parse_fractional(token: &str) -> Option<FractionalOdds> {
    let caps = FRACTIONAL_RE.captures(token)?;
    let numerator: u64 = caps.get(1)?.as_str().parse().ok()?;
    let denominator: u64 = caps.get(2)?.as_str().parse().ok()?;
    if numerator == 0 || denominator == 0 {
        return None;
    }
    Some(FractionalOdds {
        numerator,
        denominator,
    })
}

/// Decimal price of a fractional token, if it parses.
pub fn decimal_odds(token: &str) -> Option<f64> {
    parse_fractional(token).map(|odds| odds.decimal())
}

/// Extract a speed figure such as `(108*)` from free text.
pub fn parse_speed_figure(text: &str) -> Option<i64> {
    let caps = SPEED_FIG_RE.captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}

/// Remove a parenthesised speed figure from a display name.
pub fn strip_speed_figure(text: &str) -> String {
    SPEED_FIG_RE.replace_all(text, "").trim().to_string()
}

/// How a market token was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsKind {
    Fractional,
    Decimal,
    Moneyline,
    Even,
}

/// Parsed market odds in any of the supported notations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub kind: OddsKind,
    pub raw: String,
    pub numerator: Option<u64>,
    pub denominator: Option<u64>,
    pub decimal: f64,
    pub implied_win: f64,
}

impl OddsQuote {
    fn fractional(raw: &str, odds: FractionalOdds) -> Self {
        Self {
            kind: OddsKind::Fractional,
            raw: raw.to_string(),
            numerator: Some(odds.numerator),
            denominator: Some(odds.denominator),
            decimal: odds.decimal(),
            implied_win: odds.implied_probability(),
        }
    }

    fn priced(kind: OddsKind, raw: &str, decimal: f64) -> Self {
        Self {
            kind,
            raw: raw.to_string(),
            numerator: None,
            denominator: None,
            decimal,
            implied_win: 1.0 / decimal,
        }
    }
}

/// Parse market odds in fractional, decimal, moneyline, even-money or
/// integer-shorthand notation.
///
/// Scratched or withdrawn runners yield `None`, as does anything unreadable.
pub fn parse_market_odds(raw: &str) -> Option<OddsQuote> {
    let upper = raw.trim().to_uppercase();
    let s = upper.strip_prefix("ML").map(str::trim).unwrap_or(&upper);

    if SCRATCH_TOKENS.contains(&s) {
        return None;
    }

    if EVEN_TOKENS.contains(&s) {
        return Some(OddsQuote {
            kind: OddsKind::Even,
            raw: raw.to_string(),
            numerator: Some(1),
            denominator: Some(1),
            decimal: 2.0,
            implied_win: 0.5,
        });
    }

    if let Some(caps) = MARKET_FRACTIONAL_RE.captures(s) {
        let numerator: u64 = caps.get(1)?.as_str().parse().ok()?;
        let denominator: u64 = caps.get(2)?.as_str().parse().ok()?;
        if numerator == 0 || denominator == 0 {
            return None;
        }
        return Some(OddsQuote::fractional(
            raw,
            FractionalOdds {
                numerator,
                denominator,
            },
        ));
    }

    if MONEYLINE_RE.is_match(s) {
        let line: i64 = s.parse().ok()?;
        let decimal = match line {
            l if l > 0 => l as f64 / 100.0 + 1.0,
            l if l < 0 => 100.0 / l.unsigned_abs() as f64 + 1.0,
            _ => return None,
        };
        return Some(OddsQuote::priced(OddsKind::Moneyline, raw, decimal));
    }

    if INTEGER_RE.is_match(s) {
        // "15" means 15/1
        let numerator: u64 = s.parse().ok()?;
        if numerator == 0 {
            return None;
        }
        return Some(OddsQuote::fractional(
            raw,
            FractionalOdds {
                numerator,
                denominator: 1,
            },
        ));
    }

    if DECIMAL_RE.is_match(s) {
        let decimal: f64 = s.parse().ok()?;
        if decimal.is_finite() && decimal >= 1.0 {
            return Some(OddsQuote::priced(OddsKind::Decimal, raw, decimal));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_separators() {
        assert_eq!(decimal_odds("9/2"), Some(5.5));
        assert_eq!(decimal_odds("5-2"), Some(3.5));
        assert_eq!(decimal_odds("7 TO 2"), Some(4.5));
        assert_eq!(decimal_odds("  7 / 2 "), Some(4.5));
        assert_eq!(decimal_odds("7to2"), Some(4.5));
    }

    #[test]
    fn test_fractional_rejects_garbage_and_zero() {
        assert!(parse_fractional("").is_none());
        assert!(parse_fractional("abc").is_none());
        assert!(parse_fractional("5/0").is_none());
        assert!(parse_fractional("0/5").is_none());
        assert!(parse_fractional("5/2/1").is_none());
        assert!(parse_fractional("99999999999999999999999/1").is_none());
    }

    #[test]
    fn test_implied_probability() {
        let odds = parse_fractional("1/1").unwrap();
        assert_eq!(odds.implied_probability(), 0.5);
        let odds = parse_fractional("20/1").unwrap();
        assert!((odds.implied_probability() - 1.0 / 21.0).abs() < 1e-12);
        assert!((odds.implied_probability() - 1.0 / odds.decimal()).abs() < 1e-12);
        assert_eq!(odds.to_string(), "20/1");
    }

    #[test]
    fn test_speed_figure() {
        assert_eq!(parse_speed_figure("Derek's Law (114*)"), Some(114));
        assert_eq!(parse_speed_figure("Closer (98)"), Some(98));
        assert_eq!(parse_speed_figure("No Figure"), None);
        assert_eq!(strip_speed_figure("Derek's Law (114*)"), "Derek's Law");
    }

    #[test]
    fn test_market_odds_notations() {
        assert_eq!(parse_market_odds("7/2").unwrap().decimal, 4.5);
        assert_eq!(parse_market_odds("5-2").unwrap().decimal, 3.5);
        assert_eq!(parse_market_odds("7:2").unwrap().decimal, 4.5);
        assert_eq!(parse_market_odds("ml 9/2").unwrap().decimal, 5.5);

        let shorthand = parse_market_odds("6").unwrap();
        assert_eq!(shorthand.kind, OddsKind::Fractional);
        assert_eq!(shorthand.decimal, 7.0);

        let dec = parse_market_odds("3.50").unwrap();
        assert_eq!(dec.kind, OddsKind::Decimal);
        assert_eq!(dec.decimal, 3.5);

        let even = parse_market_odds("even").unwrap();
        assert_eq!(even.kind, OddsKind::Even);
        assert_eq!(even.implied_win, 0.5);

        let plus = parse_market_odds("+350").unwrap();
        assert_eq!(plus.kind, OddsKind::Moneyline);
        assert_eq!(plus.decimal, 4.5);

        let minus = parse_market_odds("-200").unwrap();
        assert_eq!(minus.decimal, 1.5);
    }

    #[test]
    fn test_market_odds_scratches() {
        assert!(parse_market_odds("SCR").is_none());
        assert!(parse_market_odds(" scratched ").is_none());
        assert!(parse_market_odds("WD").is_none());
        assert!(parse_market_odds("—").is_none());
        assert!(parse_market_odds("").is_none());
        assert!(parse_market_odds("0.5").is_none());
        assert!(parse_market_odds("n/a").is_none());
    }
}
