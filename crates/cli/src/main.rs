//! `stockflow`: operational tooling over a JSON record snapshot.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use stockflow_core::{DepartmentId, InventoryItemId};
use stockflow_departments::DepartmentRegistry;
use stockflow_events::InMemoryEventBus;
use stockflow_infra::{
    DepartmentFilter, InMemoryRecordStore, InventoryLedger, ReconciliationEngine, RecordStore,
    StockflowConfig, StoreSnapshot, TransferEnvelope, TransferRequest, TransferWorkflow,
};
use stockflow_observability::LogFormat;
use stockflow_transfers::TransferLine;

#[derive(Parser)]
#[command(name = "stockflow", version, about = "Department stock ledger tooling")]
struct Cli {
    /// JSON snapshot with departments, items, ledger rows and transfers.
    #[arg(long = "snapshot", short = 's')]
    snapshot: PathBuf,

    /// Overrides STOCKFLOW_LOG_FORMAT.
    #[arg(long = "log-format")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report every item whose ledger sum differs from its canonical total.
    Audit {
        /// Skip diagnosis of drifting items.
        #[arg(long = "no-diagnosis")]
        no_diagnosis: bool,
    },
    /// Explain one item's drift.
    Diagnose {
        item_id: InventoryItemId,
        /// Drift to explain; computed from current state when omitted.
        #[arg(long = "drift", allow_negative_numbers = true)]
        drift: Option<i64>,
    },
    /// List point-of-sale terminals derived from section departments.
    Terminals,
    /// Create a transfer, optionally approving it straight away.
    Transfer {
        #[arg(long = "from")]
        from: DepartmentId,
        #[arg(long = "to")]
        to: DepartmentId,
        /// Transfer line as ITEM_ID=QUANTITY (repeatable).
        #[arg(long = "line", required = true, value_parser = parse_line)]
        lines: Vec<(InventoryItemId, i64)>,
        #[arg(long = "product-type", default_value = "inventory")]
        product_type: String,
        #[arg(long = "approve")]
        approve: bool,
        /// Write the resulting snapshot here.
        #[arg(long = "output", short = 'o')]
        output: Option<PathBuf>,
    },
}

type Store = Arc<InMemoryRecordStore>;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = StockflowConfig::from_env().context("loading configuration")?;
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }
    stockflow_observability::init(&config.log);

    let store = load_snapshot(&cli.snapshot)?;
    let mut out = io::BufWriter::new(io::stdout());

    match cli.command {
        Commands::Audit { no_diagnosis } => {
            if no_diagnosis {
                config.reconciliation.diagnose_drift = false;
            }
            cmd_audit(&store, &config, &mut out)?;
        }
        Commands::Diagnose { item_id, drift } => {
            cmd_diagnose(&store, &config, item_id, drift, &mut out)?
        }
        Commands::Terminals => cmd_terminals(&store, &mut out)?,
        Commands::Transfer {
            from,
            to,
            lines,
            product_type,
            approve,
            output,
        } => {
            let request = TransferRequest {
                from_department_id: from,
                to_department_id: to,
                items: lines
                    .into_iter()
                    .map(|(item, quantity)| TransferLine::new(product_type.clone(), item, quantity))
                    .collect(),
            };
            cmd_transfer(&store, &config, request, approve, &mut out)?;
            if let Some(path) = output {
                save_snapshot(&store, &path)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn cmd_audit(store: &Store, config: &StockflowConfig, out: &mut dyn Write) -> Result<()> {
    let summary = engine(store, config).audit_all()?.summarize();
    info!(
        items_scanned = summary.items_scanned,
        drifting = summary.drifting(),
        failures = summary.failures.len(),
        "audit finished"
    );
    print_json(out, &summary)
}

fn cmd_diagnose(
    store: &Store,
    config: &StockflowConfig,
    item_id: InventoryItemId,
    drift: Option<i64>,
    out: &mut dyn Write,
) -> Result<()> {
    let engine = engine(store, config);
    let drift = match drift {
        Some(drift) => drift,
        None => engine.audit_item(item_id)?.drift,
    };
    let findings = engine.diagnose(item_id, drift)?;
    print_json(
        out,
        &serde_json::json!({
            "itemId": item_id,
            "drift": drift,
            "diagnosis": findings,
        }),
    )
}

fn cmd_terminals(store: &Store, out: &mut dyn Write) -> Result<()> {
    let registry = DepartmentRegistry::new(store.departments(&DepartmentFilter::all())?);
    print_json(out, &registry.terminals())
}

fn cmd_transfer(
    store: &Store,
    config: &StockflowConfig,
    request: TransferRequest,
    approve: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let workflow = TransferWorkflow::new(
        InventoryLedger::with_config(store.clone(), config.ledger.clone()),
        InMemoryEventBus::<TransferEnvelope>::new(),
    );

    let mut transfer = workflow.create(request)?;
    if approve {
        transfer = workflow.approve(transfer.id_typed())?;
    }
    print_json(out, &transfer)
}

fn engine(store: &Store, config: &StockflowConfig) -> ReconciliationEngine<Store> {
    ReconciliationEngine::with_config(
        InventoryLedger::with_config(store.clone(), config.ledger.clone()),
        config.reconciliation.clone(),
    )
}

fn load_snapshot(path: &Path) -> Result<Store> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot: StoreSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    let store = InMemoryRecordStore::from_snapshot(snapshot)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    Ok(Arc::new(store))
}

fn save_snapshot(store: &Store, path: &Path) -> Result<()> {
    let snapshot = store.snapshot()?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))?;
    info!(path = %path.display(), "snapshot written");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn parse_line(raw: &str) -> Result<(InventoryItemId, i64)> {
    let Some((item, quantity)) = raw.split_once('=') else {
        bail!("expected ITEM_ID=QUANTITY, got '{raw}'");
    };
    let item = item.trim().parse::<InventoryItemId>()?;
    let quantity = quantity
        .trim()
        .parse::<i64>()
        .with_context(|| format!("invalid quantity in '{raw}'"))?;
    Ok((item, quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transfer_lines() {
        let id = InventoryItemId::new();
        assert_eq!(parse_line(&format!("{id}=12")).unwrap(), (id, 12));
        assert_eq!(parse_line(&format!(" {id} = 3 ")).unwrap(), (id, 3));
        assert!(parse_line("nope").is_err());
        assert!(parse_line(&format!("{id}=ten")).is_err());
        assert!(parse_line("not-a-uuid=1").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
