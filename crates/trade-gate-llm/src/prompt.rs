// trade-gate-llm/src/prompt.rs
// ============================================================================
// Module: Extraction Prompt Builder
// Description: Prompt assembly from the registry catalog and few-shot examples.
// Purpose: Ground model extraction in the declarative endpoint catalog (SSOT).
// Dependencies: trade-gate-core
// ============================================================================

//! ## Overview
//! Prompts are assembled from three registry-driven sections: the endpoint
//! catalog with slot tables, a known-symbols hint list mined from the few-shot
//! questions, and the few-shot examples themselves. A catalog change is
//! immediately reflected in the prompt without code changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use trade_gate_core::EndpointRegistry;

// ============================================================================
// SECTION: Few-Shot Examples
// ============================================================================

/// One few-shot example from the training set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FewShotExample {
    /// Natural-language question.
    pub question: String,
    /// Reference HTTP method.
    pub method: String,
    /// Reference path.
    pub path: String,
}

/// Parses `question;METHOD;path` lines into few-shot examples.
///
/// Header lines and lines without three fields are skipped; the training file
/// is advisory input, not a strict contract.
#[must_use]
pub fn parse_examples(source: &str) -> Vec<FewShotExample> {
    let mut examples = Vec::new();
    for line in source.lines() {
        let mut fields = line.trim().splitn(3, ';');
        let (Some(question), Some(method), Some(path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if question.is_empty() || question.eq_ignore_ascii_case("question") {
            continue;
        }
        if !path.trim().starts_with('/') {
            continue;
        }
        examples.push(FewShotExample {
            question: question.trim().to_string(),
            method: method.trim().to_uppercase(),
            path: path.trim().to_string(),
        });
    }
    examples
}

// ============================================================================
// SECTION: Prompt Sections
// ============================================================================

/// Maximum symbols listed in the known-symbols hint.
const MAX_KNOWN_SYMBOLS: usize = 100;

/// System instructions for structured extraction.
const SYSTEM_RULES: &str = "Ты — маршрутизатор торгового API. На вход — вопрос на русском или \
                            английском. Определи endpoint из каталога ниже и извлеки параметры.\n\
                            Верни СТРОГО один JSON-объект вида {\"endpoint\": \"id\", \"params\": \
                            {...}} без пояснений.\nИспользуй только перечисленные endpoint'ы и их \
                            слоты. Не выдумывай параметры.\nДаты — ISO8601 UTC, таймфреймы — \
                            TIME_FRAME_*, тикеры — как в вопросе или из списка известных символов.";

/// Renders the endpoint catalog section with slot tables.
#[must_use]
pub fn catalog_section(registry: &EndpointRegistry) -> String {
    let mut lines = vec!["API catalog:".to_string()];
    for spec in registry.iter() {
        lines.push(format!("- {} {} (endpoint: {})", spec.method, spec.path, spec.id));
        if spec.params.is_empty() {
            continue;
        }
        lines.push("    slot | required | kind".to_string());
        lines.push("    ---- | -------- | ----".to_string());
        for param in &spec.params {
            let required = if param.required { "yes" } else { "no" };
            lines.push(format!("    {} | {} | {}", param.name, required, param.kind.as_str()));
        }
    }
    lines.push(String::new());
    lines.push(
        "Timeframes: TIME_FRAME_M1, TIME_FRAME_M5, TIME_FRAME_M15, TIME_FRAME_M30, \
         TIME_FRAME_H1, TIME_FRAME_H4, TIME_FRAME_D, TIME_FRAME_W, TIME_FRAME_MN"
            .to_string(),
    );
    lines.join("\n")
}

/// Renders the known-symbols hint mined from few-shot questions.
#[must_use]
pub fn known_symbols_section(examples: &[FewShotExample]) -> String {
    let mut symbols = BTreeSet::new();
    for example in examples {
        for token in symbol_tokens(&example.question) {
            symbols.insert(token);
            if symbols.len() >= MAX_KNOWN_SYMBOLS {
                break;
            }
        }
    }
    if symbols.is_empty() {
        return String::new();
    }
    let list: Vec<String> = symbols.into_iter().collect();
    format!("Known symbols (use if relevant):\n- {}", list.join(", "))
}

/// Renders the few-shot example section.
#[must_use]
pub fn examples_section(examples: &[FewShotExample], limit: usize) -> String {
    let mut lines = Vec::new();
    for example in examples.iter().take(limit) {
        lines.push(format!("Вопрос: \"{}\"", example.question));
        lines.push(format!("Ответ: {} {}", example.method, example.path));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Assembles the full extraction prompt for one query.
#[must_use]
pub fn extraction_prompt(
    registry: &EndpointRegistry,
    examples: &[FewShotExample],
    query: &str,
) -> String {
    let mut sections = vec![SYSTEM_RULES.to_string(), catalog_section(registry)];
    let symbols = known_symbols_section(examples);
    if !symbols.is_empty() {
        sections.push(symbols);
    }
    if !examples.is_empty() {
        sections.push(examples_section(examples, 20));
    }
    sections.push(format!("Вопрос: \"{query}\"\nJSON:"));
    sections.join("\n\n")
}

// ============================================================================
// SECTION: Token Mining
// ============================================================================

/// Extracts ticker-shaped tokens (`SBER`, `SBER@MISX`) from a question.
fn symbol_tokens(question: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in question.split(|c: char| !(c.is_ascii_alphanumeric() || c == '@')) {
        let token = raw.trim_matches('@');
        if token.len() < 2 || token.len() > 12 {
            continue;
        }
        if !token.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            continue;
        }
        if !token.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '@') {
            continue;
        }
        if token.starts_with("ORD") && token[3..].chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        tokens.push(token.to_string());
    }
    tokens
}
