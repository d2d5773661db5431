// trade-gate-core/src/mapper/mod.rs
// ============================================================================
// Module: Trade Gate Offline Mapper
// Description: Deterministic rule-based NL to endpoint mapping.
// Purpose: Resolve queries without any external model call, as fallback and baseline.
// Dependencies: crate::{core, normalize, registry}, regex
// ============================================================================

//! ## Overview
//! The offline mapper is a pure function of the query text, the registry
//! contents, and the caller-supplied `now` timestamp: same inputs, same intent
//! and parameters, always. It scores catalog trigger phrases (synonyms weigh
//! double, keywords single) with slot-availability boosts, picks the highest
//! score (ties fall to catalog declaration order), and extracts parameter
//! slots in the same pass. A query matching nothing yields the designated
//! unresolved intent rather than an error.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod symbols;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::core::AccountId;
use crate::core::EndpointSpec;
use crate::core::ExtractedParams;
use crate::core::ExtractionSource;
use crate::core::HttpMethod;
use crate::core::Intent;
use crate::core::ParamKind;
use crate::core::ParamValue;
use crate::core::QueryContext;
use crate::core::Timestamp;
use crate::interfaces::ExtractionError;
use crate::interfaces::IntentSource;
use crate::mapper::symbols::SymbolResolver;
use crate::mapper::symbols::default_aliases;
use crate::normalize::format_rfc3339;
use crate::normalize::normalize_timeframe;
use crate::normalize::parse_date_range;
use crate::registry::EndpointRegistry;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Offline mapper configuration.
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Market attached to bare tickers.
    pub default_market: String,
    /// Account used when the query names none.
    pub default_account: Option<AccountId>,
    /// Instrument alias table (lowercase fragment, ticker).
    pub aliases: Vec<(String, String)>,
    /// Default look-back window for bar requests without an interval.
    pub bars_default_days: u32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            default_market: "MISX".to_string(),
            default_account: None,
            aliases: default_aliases(),
            bars_default_days: 30,
        }
    }
}

/// Errors raised while building the offline mapper.
#[derive(Debug, Error)]
pub enum MapperBuildError {
    /// A token pattern failed to compile.
    #[error("pattern compilation failed: {0}")]
    Pattern(#[from] regex::Error),
}

// ============================================================================
// SECTION: Side Cues
// ============================================================================

/// Buy-side trigger fragments.
const BUY_CUES: &[&str] = &["купи", "покупа", "buy"];
/// Sell-side trigger fragments.
const SELL_CUES: &[&str] = &["прода", "sell"];
/// Cancel wording that boosts DELETE endpoints.
const CANCEL_CUES: &[&str] = &["отмен", "отозв", "сними", "cancel", "delete"];

// ============================================================================
// SECTION: Offline Mapper
// ============================================================================

/// Deterministic rule-based NL to endpoint mapper.
pub struct OfflineMapper {
    /// Shared endpoint registry.
    registry: Arc<EndpointRegistry>,
    /// Mapper configuration.
    config: MapperConfig,
    /// Instrument symbol resolver.
    symbols: SymbolResolver,
    /// Order identifier pattern (`ORD123456`).
    order_id: Regex,
    /// Structured account identifier pattern (`ACC-001-A`, `A12345`).
    account_id: Regex,
    /// Bare numeric account pattern, only used with explicit account wording.
    account_digits: Regex,
    /// Quantity token pattern.
    quantity: Regex,
    /// Price fragment pattern («по 250», «по цене 250.5»).
    price: Regex,
}

impl OfflineMapper {
    /// Creates a mapper over the given registry and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MapperBuildError`] when a token pattern fails to compile.
    pub fn new(registry: Arc<EndpointRegistry>, config: MapperConfig) -> Result<Self, MapperBuildError> {
        let symbols = SymbolResolver::new(config.default_market.clone(), config.aliases.clone())?;
        Ok(Self {
            registry,
            config,
            symbols,
            order_id: Regex::new(r"\bORD[A-Z0-9-]+\b")?,
            account_id: Regex::new(r"\b(?:ACC|USR|FIN)-\d{3}-[A-Z]\b|\b[A-Z]\d{5,}\b")?,
            account_digits: Regex::new(r"\b\d{3,}\b")?,
            quantity: Regex::new(r"\b\d{1,7}\b")?,
            price: Regex::new(r"по\s+(?:цене\s+)?(\d+(?:[.,]\d+)?)")?,
        })
    }

    /// Maps a query to an intent and extracted parameters.
    ///
    /// Pure function of the query, context, registry contents, and `now`.
    #[must_use]
    pub fn map(
        &self,
        query: &str,
        ctx: &QueryContext,
        now: Timestamp,
    ) -> (Intent, ExtractedParams) {
        let lower = query.to_lowercase();
        let Some((spec, score)) = self.match_intent(query, &lower, ctx) else {
            return (
                Intent::unresolved(query, ExtractionSource::Rules),
                ExtractedParams::new(ExtractionSource::Rules),
            );
        };

        let params = self.fill_slots(spec, query, &lower, ctx, now);
        let intent = Intent::candidate(query, spec.id.clone(), score, ExtractionSource::Rules);
        (intent, params)
    }

    /// Scores every catalog entry and returns the best match.
    fn match_intent(
        &self,
        query: &str,
        lower: &str,
        ctx: &QueryContext,
    ) -> Option<(&EndpointSpec, u32)> {
        let symbol_present = self.symbols.resolve(query, ctx).is_some();
        let account_present = self.find_account(query, lower, ctx).is_some();
        let order_present = self.find_order_id(query, ctx).is_some();
        let cancel_wording = CANCEL_CUES.iter().any(|cue| lower.contains(cue));

        let mut best: Option<(&EndpointSpec, u32)> = None;
        for spec in self.registry.iter() {
            let mut score = 0u32;
            score += 2 * count_hits(lower, &spec.synonyms);
            score += count_hits(lower, &spec.keywords);

            let uses_symbol = spec.path.contains("{symbol}") || spec.param("symbol").is_some();
            if uses_symbol && symbol_present {
                score += 1;
            }
            let uses_account = spec.path.contains("{account_id}");
            if uses_account && account_present {
                score += 1;
            }
            if spec.path.contains("{order_id}") && order_present {
                score += 2;
            }
            if cancel_wording && spec.method == HttpMethod::Delete {
                score += 2;
            }

            if score > 0 && best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((spec, score));
            }
        }
        best
    }

    /// Fills parameter slots for the chosen endpoint in one pass.
    fn fill_slots(
        &self,
        spec: &EndpointSpec,
        query: &str,
        lower: &str,
        ctx: &QueryContext,
        now: Timestamp,
    ) -> ExtractedParams {
        let mut params = ExtractedParams::new(ExtractionSource::Rules);
        let range = parse_date_range(query, now);

        for param in &spec.params {
            match param.kind {
                ParamKind::Symbol => {
                    if let Some(symbol) = self.symbols.resolve(query, ctx) {
                        params.insert(param.name.clone(), symbol.as_str());
                    }
                }
                ParamKind::AccountId => {
                    if let Some(account) = self.find_account(query, lower, ctx) {
                        params.insert(param.name.clone(), account.as_str());
                    }
                }
                ParamKind::OrderId => {
                    if let Some(order) = self.find_order_id(query, ctx) {
                        params.insert(param.name.clone(), order);
                    }
                }
                ParamKind::Timeframe => {
                    params.insert(param.name.clone(), normalize_timeframe(lower).as_str());
                }
                ParamKind::DateTime => {
                    if let Some((start, end)) = &range {
                        let value = if param.name == "end" { end } else { start };
                        params.insert(param.name.clone(), value.clone());
                    }
                }
                ParamKind::Side => {
                    if let Some(side) = side_from_cues(lower) {
                        params.insert(param.name.clone(), side);
                    }
                }
                ParamKind::Integer => {
                    if param.name == "quantity"
                        && let Some(quantity) = self.find_quantity(query)
                    {
                        params.insert(param.name.clone(), quantity);
                    }
                }
                ParamKind::Decimal => {
                    if param.name == "price"
                        && let Some(price) = self.find_price(lower)
                    {
                        params.insert(param.name.clone(), ParamValue::Number(price));
                    }
                }
                ParamKind::OrderType => {
                    let order_type =
                        if self.find_price(lower).is_some() { "limit" } else { "market" };
                    params.insert(param.name.clone(), order_type);
                }
                ParamKind::Text => {}
            }
        }

        // Bars without an explicit interval get a bounded default window.
        if spec.path.ends_with("/bars") && range.is_none() {
            let start = now.saturating_sub_days(self.config.bars_default_days);
            params.insert_missing("start", format_rfc3339(start));
            params.insert_missing("end", format_rfc3339(now));
        }

        params
    }

    /// Finds an account identifier from context, patterns, or configuration.
    fn find_account(&self, query: &str, lower: &str, ctx: &QueryContext) -> Option<AccountId> {
        if let Some(account) = &ctx.account_id {
            return Some(account.clone());
        }
        let upper = query.to_uppercase();
        if let Some(found) = self.account_id.find(&upper) {
            return Some(AccountId::new(found.as_str()));
        }
        let mentions_account = lower.contains("счет") || lower.contains("счёт") || lower.contains("account");
        if mentions_account
            && let Some(found) = self.account_digits.find(query)
        {
            return Some(AccountId::new(found.as_str()));
        }
        self.config.default_account.clone()
    }

    /// Finds an order identifier from context or the ORD pattern.
    fn find_order_id(&self, query: &str, ctx: &QueryContext) -> Option<String> {
        if let Some(order) = &ctx.order_id {
            return Some(order.as_str().to_string());
        }
        let upper = query.to_uppercase();
        self.order_id.find(&upper).map(|found| found.as_str().to_string())
    }

    /// Finds an order quantity token in the query.
    fn find_quantity(&self, query: &str) -> Option<i64> {
        self.quantity.find(query).and_then(|found| found.as_str().parse().ok())
    }

    /// Finds a limit price fragment in the lowercased query.
    fn find_price(&self, lower: &str) -> Option<f64> {
        let captures = self.price.captures(lower)?;
        captures.get(1)?.as_str().replace(',', ".").parse().ok()
    }
}

impl IntentSource for OfflineMapper {
    fn produce(
        &self,
        query: &str,
        ctx: &QueryContext,
        now: Timestamp,
    ) -> Result<(Intent, ExtractedParams), ExtractionError> {
        Ok(self.map(query, ctx, now))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Counts trigger fragments contained in the lowercased query.
fn count_hits(lower: &str, triggers: &[String]) -> u32 {
    let hits = triggers.iter().filter(|trigger| lower.contains(trigger.as_str())).count();
    u32::try_from(hits).unwrap_or(u32::MAX)
}

/// Derives an order side from wording cues.
fn side_from_cues(lower: &str) -> Option<&'static str> {
    if BUY_CUES.iter().any(|cue| lower.contains(cue)) {
        return Some("buy");
    }
    if SELL_CUES.iter().any(|cue| lower.contains(cue)) {
        return Some("sell");
    }
    None
}
