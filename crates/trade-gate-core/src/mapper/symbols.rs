// trade-gate-core/src/mapper/symbols.rs
// ============================================================================
// Module: Trade Gate Symbol Resolution
// Description: Instrument symbol resolution from aliases and ticker patterns.
// Purpose: Map company names and tickers in free text onto market symbols.
// Dependencies: crate::core, regex
// ============================================================================

//! ## Overview
//! Symbol resolution runs an ordered strategy chain: an explicit context
//! override wins, then the alias table (longest alias first, so «сбербанк»
//! beats «сбер»), then a ticker pattern match. Resolved symbols are enriched
//! with the default market when the text carries a bare ticker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;

use crate::core::QueryContext;
use crate::core::Symbol;

// ============================================================================
// SECTION: Alias Table
// ============================================================================

/// Built-in instrument aliases (lowercase fragment, ticker).
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("сбербанк", "SBER"),
    ("сбер", "SBER"),
    ("газпром", "GAZP"),
    ("лукойл", "LKOH"),
    ("роснефт", "ROSN"),
    ("норникел", "GMKN"),
    ("новатэк", "NVTK"),
    ("татнефт", "TATN"),
    ("яндекс", "YDEX"),
    ("втб", "VTBR"),
    ("аэрофлот", "AFLT"),
    ("магнит", "MGNT"),
];

/// Returns the built-in alias table as owned pairs.
#[must_use]
pub fn default_aliases() -> Vec<(String, String)> {
    DEFAULT_ALIASES
        .iter()
        .map(|(alias, ticker)| ((*alias).to_string(), (*ticker).to_string()))
        .collect()
}

// ============================================================================
// SECTION: Symbol Resolver
// ============================================================================

/// Ticker token pattern: `SBER` or `SBER@MISX`.
const TICKER_PATTERN: &str = r"\b[A-Z][A-Z0-9]{1,11}(?:@[A-Z]{2,8})?\b";

/// Resolves instrument symbols from question text and session context.
#[derive(Debug)]
pub struct SymbolResolver {
    /// Alias table sorted longest-alias-first.
    aliases: Vec<(String, String)>,
    /// Market attached to bare tickers.
    default_market: String,
    /// Compiled ticker token pattern.
    ticker: Regex,
}

impl SymbolResolver {
    /// Creates a resolver with the given alias table and default market.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when the ticker pattern fails to compile.
    pub fn new(
        default_market: impl Into<String>,
        mut aliases: Vec<(String, String)>,
    ) -> Result<Self, regex::Error> {
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Ok(Self {
            aliases,
            default_market: default_market.into(),
            ticker: Regex::new(TICKER_PATTERN)?,
        })
    }

    /// Resolves a symbol for the question, preferring the context override.
    #[must_use]
    pub fn resolve(&self, question: &str, ctx: &QueryContext) -> Option<Symbol> {
        if let Some(symbol) = &ctx.symbol {
            return Some(self.enrich(symbol.clone()));
        }
        self.from_alias(question).or_else(|| self.from_pattern(question)).map(|s| self.enrich(s))
    }

    /// Attaches the default market to bare tickers.
    fn enrich(&self, symbol: Symbol) -> Symbol {
        symbol.with_default_market(&self.default_market)
    }

    /// Matches the alias table against the lowercased question.
    fn from_alias(&self, question: &str) -> Option<Symbol> {
        let lower = question.to_lowercase();
        self.aliases
            .iter()
            .find(|(alias, _)| lower.contains(alias))
            .map(|(_, ticker)| Symbol::new(ticker.clone()))
    }

    /// Matches an explicit ticker token in the question.
    fn from_pattern(&self, question: &str) -> Option<Symbol> {
        for token in self.ticker.find_iter(question) {
            let token = token.as_str();
            if is_ticker_stopword(token) {
                continue;
            }
            return Some(Symbol::new(token));
        }
        None
    }
}

/// Rejects tokens that match the ticker shape but are never instruments.
fn is_ticker_stopword(token: &str) -> bool {
    if token == "ISIN" {
        return true;
    }
    // Order identifiers such as ORD123456.
    token.starts_with("ORD") && token[3..].chars().all(|c| c.is_ascii_digit() || c == '-')
}
