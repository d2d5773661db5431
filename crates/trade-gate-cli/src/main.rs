// trade-gate-cli/src/main.rs
// ============================================================================
// Module: Trade Gate CLI Entry Point
// Description: Command dispatcher for resolution, scoring, and execution.
// Purpose: Provide the scoring surface and the interactive assistant front end.
// Dependencies: clap, trade-gate-{core, llm, adapter, router}, serde_json
// ============================================================================

//! ## Overview
//! The CLI fronts the resolution pipeline in two roles: `resolve` and
//! `predict` serve the automated scorer (the terminal observable is exactly
//! `METHOD /path` on stdout), while `ask` runs the full pipeline including the
//! safety gate, interactive confirmation, and execution against the trading
//! backend. `catalog` validates and lists the endpoint registry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use trade_gate_adapter::AdapterConfig;
use trade_gate_adapter::AuthMode;
use trade_gate_adapter::HttpTradingAdapter;
use trade_gate_cli::config::ConfigError;
use trade_gate_cli::config::ResolutionMode;
use trade_gate_cli::config::TradeGateConfig;
use trade_gate_cli::config::access_token;
use trade_gate_cli::config::llm_api_key;
use trade_gate_cli::config::secret_token;
use trade_gate_cli::scoring::score_cases;
use trade_gate_core::BUNDLED_CATALOG;
use trade_gate_core::AccountId;
use trade_gate_core::ConfirmationCard;
use trade_gate_core::EndpointRegistry;
use trade_gate_core::ExtractedParams;
use trade_gate_core::ExtractionError;
use trade_gate_core::GateDecision;
use trade_gate_core::InMemoryConfirmationStore;
use trade_gate_core::Intent;
use trade_gate_core::IntentSource;
use trade_gate_core::MapperConfig;
use trade_gate_core::OfflineMapper;
use trade_gate_core::Pipeline;
use trade_gate_core::QueryContext;
use trade_gate_core::ResolutionOutcome;
use trade_gate_core::Resolver;
use trade_gate_core::ResolverConfig;
use trade_gate_core::SafetyGate;
use trade_gate_core::Timestamp;
use trade_gate_llm::LlmConfig;
use trade_gate_llm::LlmIntentExtractor;
use trade_gate_llm::OpenRouterClient;
use trade_gate_llm::parse_examples;
use trade_gate_router::AuditEvent;
use trade_gate_router::AuditSink;
use trade_gate_router::FileAuditSink;
use trade_gate_router::RouterConfig;
use trade_gate_router::StderrAuditSink;
use trade_gate_router::ToolRouter;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a catalog file read from disk.
const MAX_CATALOG_BYTES: usize = 1024 * 1024;
/// Maximum size of a reference or training file.
const MAX_REFERENCE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "trade-gate", about = "Natural-language trading API gateway")]
struct Cli {
    /// Configuration file path (defaults to TRADE_GATE_CONFIG, then
    /// trade-gate.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Resolution strategy override on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Deterministic offline mapper only.
    Offline,
    /// Model-backed extraction with offline fallback.
    Llm,
}

impl From<ModeArg> for ResolutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Offline => Self::Offline,
            ModeArg::Llm => Self::Llm,
        }
    }
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve one query and print `METHOD /path` (the scoring observable).
    Resolve {
        /// Natural-language trading question.
        query: String,
        /// Resolution strategy override.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
    /// Score the pipeline against a `question;METHOD;path` reference file.
    Predict {
        /// Reference file path.
        reference: PathBuf,
        /// Resolution strategy override.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Print each mismatching case.
        #[arg(long)]
        mismatches: bool,
    },
    /// Run the full pipeline: resolve, gate, confirm, execute.
    Ask {
        /// Natural-language trading question.
        query: String,
        /// Confirm mutating requests without prompting.
        #[arg(long)]
        yes: bool,
    },
    /// Endpoint catalog utilities.
    Catalog {
        /// Selected catalog subcommand.
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Load the configured catalog and report its size.
    Validate,
    /// List every endpoint with its route and policy.
    List,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug)]
struct CliError {
    /// Message shown on stderr.
    message: String,
}

impl CliError {
    /// Creates an error with the provided message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::new(err.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = TradeGateConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Resolve {
            query,
            mode,
        } => command_resolve(&config, &query, mode),
        Commands::Predict {
            reference,
            mode,
            mismatches,
        } => command_predict(&config, &reference, mode, mismatches),
        Commands::Ask {
            query,
            yes,
        } => command_ask(&config, &query, yes),
        Commands::Catalog {
            command,
        } => command_catalog(&config, &command),
    }
}

// ============================================================================
// SECTION: Resolve Command
// ============================================================================

/// Executes the `resolve` command.
fn command_resolve(
    config: &TradeGateConfig,
    query: &str,
    mode: Option<ModeArg>,
) -> CliResult<ExitCode> {
    let registry = build_registry(config)?;
    let pipeline = build_pipeline(config, resolve_mode(config, mode), &registry)?;
    let outcome = pipeline.resolve_query(query, &query_context(config), now_timestamp());
    match outcome.request() {
        Some(request) => {
            write_stdout_line(&format!("{} {}", request.method, request.path))?;
            Ok(ExitCode::SUCCESS)
        }
        None => Err(CliError::new(unresolved_message(&outcome))),
    }
}

/// Renders the unresolved reason for user display.
fn unresolved_message(outcome: &ResolutionOutcome) -> String {
    match outcome {
        ResolutionOutcome::Unresolved {
            reason,
        } => format!("could not resolve the query: {reason}"),
        ResolutionOutcome::Resolved {
            ..
        } => "could not resolve the query".to_string(),
    }
}

// ============================================================================
// SECTION: Predict Command
// ============================================================================

/// Executes the `predict` command.
fn command_predict(
    config: &TradeGateConfig,
    reference: &Path,
    mode: Option<ModeArg>,
    show_mismatches: bool,
) -> CliResult<ExitCode> {
    let source = read_file_with_limit(reference, MAX_REFERENCE_BYTES)?;
    let cases = parse_examples(&source);
    if cases.is_empty() {
        return Err(CliError::new(format!(
            "reference file {} contains no cases",
            reference.display()
        )));
    }

    let registry = build_registry(config)?;
    let pipeline = build_pipeline(config, resolve_mode(config, mode), &registry)?;
    let ctx = query_context(config);
    let now = now_timestamp();
    let report = score_cases(&cases, |question| {
        pipeline
            .resolve_query(question, &ctx, now)
            .request()
            .map(|request| (request.method.to_string(), request.path.clone()))
    });

    write_stdout_line(&format!(
        "exact-match accuracy: {}/{} ({:.1}%)",
        report.matched,
        report.total,
        report.accuracy() * 100.0
    ))?;
    if show_mismatches {
        for mismatch in &report.mismatches {
            write_stdout_line(&format!(
                "  {} | expected {} | got {}",
                mismatch.question, mismatch.expected, mismatch.predicted
            ))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Ask Command
// ============================================================================

/// Executes the `ask` command: resolve, gate, confirm, execute.
fn command_ask(config: &TradeGateConfig, query: &str, yes: bool) -> CliResult<ExitCode> {
    let registry = build_registry(config)?;
    let mode = config.resolution.mode;
    let audit = build_audit_sink(config)?;
    let extractor = build_extractor(config, mode, &registry)?;
    let pipeline = build_pipeline_with(config, &registry, extractor.clone())?;
    let gate = SafetyGate::new(
        config.safety.clone(),
        Arc::new(InMemoryConfirmationStore::new()),
    );
    let router = build_router(config, &registry, Arc::clone(&audit))?;
    let ctx = query_context(config);
    let now = now_timestamp();

    let outcome = pipeline.resolve_query(query, &ctx, now);
    record_resolution(&audit, query, &outcome, now);
    if let Some(extractor) = &extractor
        && let Some(usage) = extractor.last_usage()
    {
        let _ = audit.append(&AuditEvent::ModelUsage {
            at: now,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        });
    }

    let request = match outcome {
        ResolutionOutcome::Resolved {
            request, ..
        } => request,
        ResolutionOutcome::Unresolved {
            reason,
        } => {
            return Err(CliError::new(format!("could not resolve the query: {reason}")));
        }
    };

    let method = request.method.to_string();
    let path = request.path.clone();
    let decision = gate
        .check(request, ctx.last_price, now)
        .map_err(|err| CliError::new(format!("safety gate failed: {err}")))?;
    record_gate_decision(&audit, &method, &path, &decision, now);

    let cleared = match decision {
        GateDecision::Allow(cleared) => cleared,
        GateDecision::RequireConfirmation(card) => {
            present_card(&card)?;
            if !(yes || prompt_confirmation()?) {
                let _ = gate.reject(&card.token, now_timestamp());
                write_stdout_line("rejected; nothing was executed")?;
                return Ok(ExitCode::SUCCESS);
            }
            gate.confirm(&card.token, now_timestamp())
                .map_err(|err| CliError::new(format!("confirmation failed: {err}")))?
        }
        GateDecision::Deny {
            reasons,
        } => {
            return Err(CliError::new(format!("denied by policy: {}", reasons.join("; "))));
        }
    };

    let result = router.execute(&cleared, now_timestamp());
    let rendered = serde_json::to_string_pretty(&result)
        .map_err(|err| CliError::new(format!("result serialization failed: {err}")))?;
    write_stdout_line(&rendered)?;
    Ok(if result.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints a confirmation card for the pending mutating request.
fn present_card(card: &ConfirmationCard) -> CliResult<()> {
    write_stdout_line(&format!("pending action: {}", card.summary))?;
    for reason in &card.reasons {
        write_stdout_line(&format!("  reason: {reason}"))?;
    }
    for warning in &card.warnings {
        write_stdout_line(&format!("  warning: {warning}"))?;
    }
    write_stdout_line(&format!("  token: {}", card.token))?;
    Ok(())
}

/// Prompts for an explicit confirmation decision on stdin.
fn prompt_confirmation() -> CliResult<bool> {
    write_stdout("execute? [y/N]: ")?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|err| CliError::new(format!("stdin read failed: {err}")))?;
    let answer = answer.trim().to_lowercase();
    Ok(matches!(answer.as_str(), "y" | "yes" | "да"))
}

/// Records the resolution outcome in the audit trail.
fn record_resolution(
    audit: &Arc<dyn AuditSink>,
    query: &str,
    outcome: &ResolutionOutcome,
    now: Timestamp,
) {
    let event = match outcome {
        ResolutionOutcome::Resolved {
            request,
            source,
        } => AuditEvent::Resolution {
            at: now,
            query: query.to_string(),
            method: Some(request.method.to_string()),
            path: Some(request.path.clone()),
            source: Some(source.to_string()),
        },
        ResolutionOutcome::Unresolved {
            ..
        } => AuditEvent::Resolution {
            at: now,
            query: query.to_string(),
            method: None,
            path: None,
            source: None,
        },
    };
    let _ = audit.append(&event);
}

/// Records the gate decision in the audit trail.
fn record_gate_decision(
    audit: &Arc<dyn AuditSink>,
    method: &str,
    path: &str,
    decision: &GateDecision,
    now: Timestamp,
) {
    let (label, reasons) = match decision {
        GateDecision::Allow(_) => ("allow", Vec::new()),
        GateDecision::RequireConfirmation(card) => ("require_confirmation", card.reasons.clone()),
        GateDecision::Deny {
            reasons,
        } => ("deny", reasons.clone()),
    };
    let _ = audit.append(&AuditEvent::GateDecision {
        at: now,
        method: method.to_string(),
        path: path.to_string(),
        decision: label.to_string(),
        reasons,
    });
}

// ============================================================================
// SECTION: Catalog Command
// ============================================================================

/// Executes the `catalog` command.
fn command_catalog(config: &TradeGateConfig, command: &CatalogCommand) -> CliResult<ExitCode> {
    let registry = build_registry(config)?;
    match command {
        CatalogCommand::Validate => {
            write_stdout_line(&format!("catalog ok: {} endpoints", registry.len()))?;
        }
        CatalogCommand::List => {
            for spec in registry.iter() {
                let marker = if spec.mutating { " [mutating]" } else { "" };
                write_stdout_line(&format!(
                    "{}  {} {}  policy={}{}",
                    spec.id, spec.method, spec.path, spec.policy, marker
                ))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Pipeline Assembly
// ============================================================================

/// Returns the effective resolution mode after the CLI override.
fn resolve_mode(config: &TradeGateConfig, mode: Option<ModeArg>) -> ResolutionMode {
    mode.map_or(config.resolution.mode, Into::into)
}

/// Builds the endpoint registry from the configured catalog sources.
fn build_registry(config: &TradeGateConfig) -> CliResult<Arc<EndpointRegistry>> {
    let primary = match &config.registry.catalog_path {
        Some(path) => read_file_with_limit(path, MAX_CATALOG_BYTES)?,
        None => BUNDLED_CATALOG.to_string(),
    };
    let mut sources = vec![primary];
    if let Some(path) = &config.registry.extra_catalog_path {
        sources.push(read_file_with_limit(path, MAX_CATALOG_BYTES)?);
    }
    let refs: Vec<&str> = sources.iter().map(String::as_str).collect();
    let registry = EndpointRegistry::load(&refs)
        .map_err(|err| CliError::new(format!("catalog load failed: {err}")))?;
    Ok(Arc::new(registry))
}

/// Shared extractor handle kept outside the pipeline for usage reporting.
#[derive(Clone)]
struct SharedExtractor(Arc<LlmIntentExtractor>);

impl SharedExtractor {
    /// Returns the usage reported by the most recent extraction call.
    fn last_usage(&self) -> Option<trade_gate_llm::TokenUsage> {
        self.0.last_usage()
    }
}

impl IntentSource for SharedExtractor {
    fn produce(
        &self,
        query: &str,
        ctx: &QueryContext,
        now: Timestamp,
    ) -> Result<(Intent, ExtractedParams), ExtractionError> {
        self.0.produce(query, ctx, now)
    }
}

/// Builds the model-backed extractor when the mode calls for one.
fn build_extractor(
    config: &TradeGateConfig,
    mode: ResolutionMode,
    registry: &Arc<EndpointRegistry>,
) -> CliResult<Option<SharedExtractor>> {
    if mode != ResolutionMode::Llm {
        return Ok(None);
    }
    let api_key = llm_api_key().ok_or_else(|| {
        CliError::new("llm mode requires the OPENROUTER_API_KEY environment variable")
    })?;
    let client = OpenRouterClient::new(LlmConfig {
        base_url: config.llm.base_url.clone(),
        api_key,
        model: config.llm.model.clone(),
        timeout_ms: config.llm.timeout_ms,
    })
    .map_err(|err| CliError::new(format!("chat client build failed: {err}")))?;
    let examples = match &config.resolution.examples_path {
        Some(path) => parse_examples(&read_file_with_limit(path, MAX_REFERENCE_BYTES)?),
        None => Vec::new(),
    };
    let extractor =
        LlmIntentExtractor::new(Arc::clone(registry), Box::new(client), examples);
    Ok(Some(SharedExtractor(Arc::new(extractor))))
}

/// Builds the resolution pipeline for the given mode.
fn build_pipeline(
    config: &TradeGateConfig,
    mode: ResolutionMode,
    registry: &Arc<EndpointRegistry>,
) -> CliResult<Pipeline> {
    let extractor = build_extractor(config, mode, registry)?;
    build_pipeline_with(config, registry, extractor)
}

/// Builds the pipeline around an optional pre-built extractor.
fn build_pipeline_with(
    config: &TradeGateConfig,
    registry: &Arc<EndpointRegistry>,
    extractor: Option<SharedExtractor>,
) -> CliResult<Pipeline> {
    let mapper_config = MapperConfig {
        default_market: config.resolution.default_market.clone(),
        default_account: config.resolution.default_account.clone().map(AccountId::new),
        bars_default_days: config.resolution.bars_default_days,
        ..MapperConfig::default()
    };
    let mapper = OfflineMapper::new(Arc::clone(registry), mapper_config)
        .map_err(|err| CliError::new(format!("mapper build failed: {err}")))?;
    let resolver = Resolver::new(
        Arc::clone(registry),
        ResolverConfig {
            min_confidence: config.resolution.min_confidence,
            default_market: config.resolution.default_market.clone(),
        },
    );
    Ok(match extractor {
        Some(extractor) => Pipeline::with_extractor(mapper, Box::new(extractor), resolver),
        None => Pipeline::offline(mapper, resolver),
    })
}

/// Builds the audit sink from configuration.
fn build_audit_sink(config: &TradeGateConfig) -> CliResult<Arc<dyn AuditSink>> {
    match &config.router.audit_path {
        Some(path) => {
            let sink = FileAuditSink::open(path)
                .map_err(|err| CliError::new(format!("audit sink open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Builds the execution router over the HTTP adapter.
fn build_router(
    config: &TradeGateConfig,
    registry: &Arc<EndpointRegistry>,
    audit: Arc<dyn AuditSink>,
) -> CliResult<ToolRouter> {
    let auth = if let Some(token) = access_token() {
        AuthMode::AccessToken(token)
    } else if let Some(secret) = secret_token() {
        AuthMode::SecretExchange {
            secret,
            auth_path: config.adapter.auth_path.clone(),
        }
    } else {
        AuthMode::None
    };
    let adapter = HttpTradingAdapter::new(
        AdapterConfig {
            base_url: config.adapter.base_url.clone(),
            timeout_ms: config.adapter.timeout_ms,
            max_response_bytes: config.adapter.max_response_bytes,
            user_agent: config.adapter.user_agent.clone(),
        },
        auth,
    )
    .map_err(|err| CliError::new(format!("adapter build failed: {err}")))?;
    Ok(ToolRouter::new(
        Arc::clone(registry),
        Box::new(adapter),
        audit,
        RouterConfig {
            cache_ttl_secs: config.router.cache_ttl_secs,
            rate_per_sec: config.router.rate_per_sec,
            burst: config.router.burst,
            max_attempts: config.router.max_attempts,
            backoff_ms: config.router.backoff_ms.clone(),
        },
    ))
}

/// Builds the query context from configuration.
fn query_context(config: &TradeGateConfig) -> QueryContext {
    QueryContext {
        account_id: config.resolution.default_account.clone().map(AccountId::new),
        ..QueryContext::default()
    }
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Reads a UTF-8 file through a hard size limit.
fn read_file_with_limit(path: &Path, limit: usize) -> CliResult<String> {
    let bytes = fs::read(path)
        .map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    if bytes.len() > limit {
        return Err(CliError::new(format!(
            "{} exceeds the size limit ({limit} bytes)",
            path.display()
        )));
    }
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(format!("{} must be utf-8", path.display())))
}

/// Returns the current wall clock as a pipeline timestamp.
fn now_timestamp() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    Timestamp::from_unix_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a fragment to stdout without a trailing newline.
fn write_stdout(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(message.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("stdout write failed: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::FAILURE
}
