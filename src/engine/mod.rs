//! The reconciliation pass: read the on-chain baseline, fold the declared
//! configuration into the pending ledger, then drive each stage of the
//! dependency graph until its delta is empty or its work is deferred to
//! the owner.

pub mod batch;
pub mod config;
pub mod delta;
pub mod error;
pub mod stage;

use std::collections::HashSet;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::Provider;
use alloy::sol_types::SolValue;
use anyhow::{Context, Result, anyhow};

use crate::chain::artifacts::{self, Artifacts};
use crate::chain::executor::{Authority, UnitExecutor, UnitOutcome, print_execute_instruction};
use crate::chain::provider::{make_provider, read_provider};
use crate::chain::registry::{self, CoreAddresses};
use crate::cli::TargetArgs;
use crate::desired;
use crate::model::deployments::MissingDeployment;
use crate::model::desired::{DesiredState, OracleWiring};
use crate::model::management::ManagementSet;
use crate::model::migration::PendingMigration;
use crate::model::resource::ContractKey;
use crate::model::{AddressBook, Deployments};
use crate::store::{MigrationLedger, StoreError};

use batch::Batch;
use config::RuntimeConfig;
use delta::{Delta, Disposition};
use error::PassError;
use stage::{Stage, StageOutcome, execution_order};

/// Whether a pass may submit transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    Plan,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Apply => write!(f, "apply"),
            RunMode::Plan => write!(f, "plan"),
        }
    }
}

/// Stage-by-stage record of what one pass did.
#[derive(Debug, Default)]
pub struct PassReport {
    pub outcomes: Vec<(Stage, StageOutcome)>,
}

impl PassReport {
    pub fn converged(&self) -> bool {
        !self.outcomes.is_empty()
            && self
                .outcomes
                .iter()
                .all(|(_, o)| *o == StageOutcome::Current)
    }

    pub fn deferred(&self) -> bool {
        self.outcomes.iter().any(|(_, o)| o.halts_pass())
    }

    pub fn planned(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, o)| *o == StageOutcome::Planned)
    }
}

/// Entry point for the `reconcile` and `plan` commands.
pub fn run(cli: &TargetArgs, mode: RunMode) -> Result<()> {
    let config = RuntimeConfig::from_cli(cli)?;

    println!("=== chainwright reconcile ===");
    println!(
        "Started:   {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Network:   {}", config.network);
    println!("Mode:      {mode}");
    match config.deployer {
        Some(deployer) => println!("Deployer:  {deployer}"),
        None => println!("Deployer:  (no signer)"),
    }
    println!("Ledger:    {}", config.migrations_file.display());
    println!("Max batch: {}", config.max_batch);
    println!(
        "Cleanup:   {}",
        if config.clean {
            "enabled"
        } else {
            "off (enable with --clean)"
        }
    );
    println!();

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let report = rt.block_on(reconcile(config, mode))?;
    print_report(&report);
    Ok(())
}

/// Print the stage graph in execution order.
pub fn print_stages(clean: bool) {
    println!("=== chainwright stages ===");
    for stage in execution_order(clean) {
        let deps = stage.deps();
        if deps.is_empty() {
            println!("  {stage}");
        } else {
            let names: Vec<&str> = deps.iter().map(|d| d.name()).collect();
            println!("  {stage} (after {})", names.join(", "));
        }
    }
}

/// One full reconciliation pass. Separated from [`run`] so tests can
/// drive it against a local node without going through the CLI.
pub async fn reconcile(config: RuntimeConfig, mode: RunMode) -> Result<PassReport, PassError> {
    let deployments = Deployments::load(&config.deployments_file)?;
    let book = AddressBook::load(&config.address_book_file)?;
    let desired = desired::build(&config.network.name, &deployments).map_err(flatten_missing)?;
    let core = CoreAddresses::resolve(&deployments)?;
    let artifacts = Artifacts::new(config.artifacts_dir.clone());

    let reader = read_provider(&config.network.rpc_url).map_err(PassError::BaselineRead)?;
    let wallet = match config.private_key.as_deref() {
        Some(key) => Some(make_provider(key, &config.network.rpc_url)?),
        None => {
            println!("WARNING: CHAINWRIGHT_PRIVATE_KEY is not set.");
            println!("The pass computes and persists the plan but cannot deploy units.");
            println!();
            None
        }
    };

    let current = registry::management_set(&reader, &core)
        .await
        .map_err(PassError::BaselineRead)?;
    let owner = registry::roles_owner(&reader, &core)
        .await
        .map_err(PassError::BaselineRead)?;
    let authority = Authority::resolve(config.deployer, owner, &config.network);

    println!("Owner:     {owner}");
    println!("Authority: {authority}");
    println!(
        "Baseline:  {} managed contracts, {} enabled strategies",
        current.managed.len(),
        current.enabled_strategies.len()
    );
    println!();

    // Fold declared intent into the ledger before anything executes, so
    // a pass that dies mid-way still leaves the full plan on disk. Plan
    // mode keeps the fold in memory; the file stays untouched.
    let mut ledger = MigrationLedger::load_or_new(&config.migrations_file)?;
    let mut pending = ledger.network(&config.network.name);
    merge_intent(
        &desired,
        &book,
        config.network.chain_id,
        &current,
        &mut pending,
    );
    ledger.set_network(&config.network.name, pending);
    if mode == RunMode::Apply {
        ledger.save(&config.migrations_file)?;
    }

    let include_cleanup = config.clean;
    let mut pass = Pass {
        config,
        mode,
        desired,
        deployments,
        book,
        core,
        artifacts,
        owner,
        authority,
        wallet,
        reader,
        ledger,
    };

    let mut report = PassReport::default();
    for stage in execution_order(include_cleanup) {
        println!("── Stage: {stage} ──");
        let outcome = pass.run_stage(stage).await?;
        println!("  outcome: {outcome}");
        println!();
        let halt = outcome.halts_pass();
        report.outcomes.push((stage, outcome));
        if halt {
            println!("HALTED: later stages depend on the deferred work above.");
            println!();
            break;
        }
    }
    Ok(report)
}

/// Fold the declared configuration into the pending ledger against a
/// fresh baseline. Idempotent; completed entries are pruned by the delta
/// computation, never here.
fn merge_intent(
    desired: &DesiredState,
    book: &AddressBook,
    chain_id: u64,
    current: &ManagementSet,
    pending: &mut PendingMigration,
) {
    for entry in &desired.managed {
        match delta::classify(current, book, chain_id, entry.key, entry.address) {
            Disposition::AlreadyManaged => {}
            Disposition::Manage => pending.merge_manage(entry.address),
            Disposition::Replace { outgoing } => pending.merge_replace(entry.address, outgoing),
        }
    }
    for strategy in &desired.strategies {
        if !current.is_enabled(strategy.address) {
            pending.merge_strategy(strategy.address);
        }
    }
}

fn flatten_missing(err: anyhow::Error) -> PassError {
    match err.downcast::<MissingDeployment>() {
        Ok(missing) => PassError::MissingDeployment(missing),
        Err(other) => PassError::Other(other),
    }
}

fn print_report(report: &PassReport) {
    println!("── Summary ──");
    for (stage, outcome) in &report.outcomes {
        println!("  {stage}: {outcome}");
    }
    println!();
    if report.converged() {
        println!("CONVERGED: on-chain state matches the declared configuration.");
    } else if report.deferred() {
        println!("DEFERRED: execute the printed owner calls, then rerun to converge.");
    } else if report.planned() {
        println!("PLANNED: no transactions sent. Run `reconcile` to apply.");
    } else {
        println!("APPLIED: rerun to confirm convergence.");
    }
}

// ── Pass state ───────────────────────────────────────────────────────

/// Everything one reconciliation pass works with. `wallet` signs as the
/// deployer when a key is configured; `reader` is the walletless provider
/// used for views and impersonated sends.
struct Pass<W, R> {
    config: RuntimeConfig,
    mode: RunMode,
    desired: DesiredState,
    deployments: Deployments,
    book: AddressBook,
    core: CoreAddresses,
    artifacts: Artifacts,
    owner: Address,
    authority: Authority,
    wallet: Option<W>,
    reader: R,
    ledger: MigrationLedger,
}

/// Fails when an executed batch left the outstanding work unchanged,
/// which would otherwise loop forever resubmitting the same delta.
struct ProgressGuard {
    label: &'static str,
    last: Option<usize>,
}

impl ProgressGuard {
    fn new(label: &'static str) -> Self {
        ProgressGuard { label, last: None }
    }

    fn check(&mut self, outstanding: usize) -> Result<(), PassError> {
        if let Some(prev) = self.last {
            if outstanding >= prev {
                return Err(PassError::Other(anyhow!(
                    "{} unit executed but outstanding work did not shrink ({prev} -> {outstanding})",
                    self.label
                )));
            }
        }
        self.last = Some(outstanding);
        Ok(())
    }
}

fn stage_done(executed: Vec<TxHash>) -> StageOutcome {
    if executed.is_empty() {
        StageOutcome::Current
    } else {
        StageOutcome::Executed(executed)
    }
}

fn combine_outcomes(a: StageOutcome, b: StageOutcome) -> StageOutcome {
    use StageOutcome::*;
    match (a, b) {
        (Deferred, _) | (_, Deferred) => Deferred,
        (Planned, _) | (_, Planned) => Planned,
        (Executed(mut x), Executed(y)) => {
            x.extend(y);
            Executed(x)
        }
        (Executed(x), Current) | (Current, Executed(x)) => Executed(x),
        (Current, Current) => Current,
    }
}

// ── Per-stage work descriptions ──────────────────────────────────────

/// Activation arguments for one oracle contract, in first-seen token
/// order. One migration unit per group.
struct OracleGroup {
    key: ContractKey,
    oracle: Address,
    tokens: Vec<Address>,
    pegs: Vec<Address>,
    col_ratios: Vec<U256>,
    data: Vec<Bytes>,
}

/// Tokens whose lending parameters differ from the declaration, as
/// parallel arrays matching the activation unit's constructor.
#[derive(Default)]
struct TokenWork {
    tokens: Vec<Address>,
    ceilings: Vec<U256>,
    fees: Vec<U256>,
}

impl TokenWork {
    fn chunks(&self, size: usize) -> Vec<(Vec<Address>, Vec<U256>, Vec<U256>)> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < self.tokens.len() {
            let end = (i + size).min(self.tokens.len());
            out.push((
                self.tokens[i..end].to_vec(),
                self.ceilings[i..end].to_vec(),
                self.fees[i..end].to_vec(),
            ));
            i = end;
        }
        out
    }
}

/// (token, strategy) pairs missing approval wiring, with the encoded
/// approval data each strategy reported.
#[derive(Default)]
struct StrategyWork {
    tokens: Vec<Address>,
    strategies: Vec<Address>,
    data: Vec<Bytes>,
}

impl StrategyWork {
    fn chunks(&self, size: usize) -> Vec<(Vec<Address>, Vec<Address>, Vec<Bytes>)> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < self.tokens.len() {
            let end = (i + size).min(self.tokens.len());
            out.push((
                self.tokens[i..end].to_vec(),
                self.strategies[i..end].to_vec(),
                self.data[i..end].to_vec(),
            ));
            i = end;
        }
        out
    }
}

/// (contract, role) pairs the cleaner must strip, parallel arrays.
#[derive(Default)]
struct CleanupWork {
    contracts: Vec<Address>,
    roles: Vec<U256>,
}

// ── Stage drivers ────────────────────────────────────────────────────

impl<W: Provider, R: Provider> Pass<W, R> {
    async fn run_stage(&mut self, stage: Stage) -> Result<StageOutcome, PassError> {
        match stage {
            Stage::BaseInfra => self.base_infra().await,
            Stage::Oracles => self.oracles().await,
            Stage::Tokens => self.tokens().await,
            Stage::Strategies => self.strategies().await,
            Stage::TrancheSlot => self.tranche_slot().await,
            Stage::Cleanup => self.cleanup().await,
        }
    }

    /// Manage and replace batches. One unit per loop turn, with a fresh
    /// baseline read in between: membership on chain, not local
    /// bookkeeping, decides what is still outstanding.
    async fn base_infra(&mut self) -> Result<StageOutcome, PassError> {
        let mut executed = Vec::new();
        let mut guard = ProgressGuard::new("contract management");
        loop {
            let current = self.baseline().await?;
            let pending = self.ledger.network(&self.config.network.name);
            let delta = delta::compute(&pending, &current);
            self.persist(delta.clone())?;

            let work = Delta {
                manage: delta.manage,
                replace: delta.replace,
                enable: Vec::new(),
            };
            if work.is_empty() {
                return Ok(stage_done(executed));
            }
            guard.check(work.op_count())?;

            let batches = batch::plan(&work, self.config.max_batch);
            print_management_plan(&work, &batches);

            if self.mode == RunMode::Plan {
                return Ok(StageOutcome::Planned);
            }
            let Some(wallet) = self.wallet.as_ref() else {
                println!(
                    "  NO SIGNER: work persisted to {}",
                    self.config.migrations_file.display()
                );
                return Ok(StageOutcome::Deferred);
            };

            if self.authority == Authority::Manual {
                for b in &batches {
                    let unit = self.deploy_management_unit(wallet, b).await?;
                    print_execute_instruction(
                        ContractKey::ContractManagement.as_str(),
                        self.core.dependency_controller,
                        unit,
                    );
                }
                return Ok(StageOutcome::Deferred);
            }

            let Some(first) = batches.first() else {
                return Ok(stage_done(executed));
            };
            let unit = self.deploy_management_unit(wallet, first).await?;
            if let Some(hash) = self
                .run_unit(unit, ContractKey::ContractManagement, first.clone())
                .await?
            {
                executed.push(hash);
            }
        }
    }

    /// Oracle parameter activation, one unit per oracle group, proxy
    /// group first. Work is recomputed from the chain each turn; nothing
    /// is persisted because the parameter checks are the source of truth.
    async fn oracles(&self) -> Result<StageOutcome, PassError> {
        let mut executed = Vec::new();
        let mut guard = ProgressGuard::new("oracle activation");
        loop {
            let groups = self.collect_oracle_work().await?;
            if groups.is_empty() {
                return Ok(stage_done(executed));
            }
            guard.check(groups.iter().map(|g| g.tokens.len()).sum())?;
            print_oracle_plan(&groups);

            if self.mode == RunMode::Plan {
                return Ok(StageOutcome::Planned);
            }
            let Some(wallet) = self.wallet.as_ref() else {
                println!("  NO SIGNER: oracle work is recomputed on the next run");
                return Ok(StageOutcome::Deferred);
            };

            if self.authority == Authority::Manual {
                for group in &groups {
                    let unit = self.deploy_oracle_unit(wallet, group).await?;
                    print_execute_instruction(
                        ContractKey::OracleActivation.as_str(),
                        self.core.dependency_controller,
                        unit,
                    );
                }
                return Ok(StageOutcome::Deferred);
            }

            let Some(first) = groups.first() else {
                return Ok(stage_done(executed));
            };
            let unit = self.deploy_oracle_unit(wallet, first).await?;
            if let Some(hash) = self
                .run_unit(unit, ContractKey::OracleActivation, Batch::default())
                .await?
            {
                executed.push(hash);
            }
        }
    }

    /// Lending parameter activation for tokens whose on-chain metadata
    /// disagrees with the declaration.
    async fn tokens(&self) -> Result<StageOutcome, PassError> {
        let mut executed = Vec::new();
        let mut guard = ProgressGuard::new("token activation");
        loop {
            let work = self.collect_token_work().await?;
            if work.tokens.is_empty() {
                return Ok(stage_done(executed));
            }
            guard.check(work.tokens.len())?;

            if self.mode == RunMode::Plan {
                return Ok(StageOutcome::Planned);
            }
            let Some(wallet) = self.wallet.as_ref() else {
                println!("  NO SIGNER: token work is recomputed on the next run");
                return Ok(StageOutcome::Deferred);
            };

            let chunks = work.chunks(self.config.max_batch);
            if self.authority == Authority::Manual {
                for (tokens, ceilings, fees) in &chunks {
                    let unit = self
                        .deploy_token_unit(wallet, tokens, ceilings, fees)
                        .await?;
                    print_execute_instruction(
                        ContractKey::TokenActivation.as_str(),
                        self.core.dependency_controller,
                        unit,
                    );
                }
                return Ok(StageOutcome::Deferred);
            }

            let Some((tokens, ceilings, fees)) = chunks.first() else {
                return Ok(stage_done(executed));
            };
            let unit = self.deploy_token_unit(wallet, tokens, ceilings, fees).await?;
            if let Some(hash) = self
                .run_unit(unit, ContractKey::TokenActivation, Batch::default())
                .await?
            {
                executed.push(hash);
            }
        }
    }

    /// Strategy enablement (through the ledger) followed by per-token
    /// approval activation.
    async fn strategies(&mut self) -> Result<StageOutcome, PassError> {
        let enabled = self.enable_strategies().await?;
        let activated = self.activate_strategy_tokens().await?;
        Ok(combine_outcomes(enabled, activated))
    }

    async fn enable_strategies(&mut self) -> Result<StageOutcome, PassError> {
        let mut executed = Vec::new();
        let mut guard = ProgressGuard::new("strategy enablement");
        loop {
            let current = self.baseline().await?;
            let pending = self.ledger.network(&self.config.network.name);
            let delta = delta::compute(&pending, &current);
            self.persist(delta.clone())?;

            if delta.enable.is_empty() {
                return Ok(stage_done(executed));
            }
            guard.check(delta.enable.len())?;

            let work = Delta {
                manage: Vec::new(),
                replace: Vec::new(),
                enable: delta.enable,
            };
            let batches = batch::plan(&work, self.config.max_batch);
            print_management_plan(&work, &batches);

            if self.mode == RunMode::Plan {
                return Ok(StageOutcome::Planned);
            }
            let Some(wallet) = self.wallet.as_ref() else {
                println!(
                    "  NO SIGNER: work persisted to {}",
                    self.config.migrations_file.display()
                );
                return Ok(StageOutcome::Deferred);
            };

            if self.authority == Authority::Manual {
                for b in &batches {
                    let unit = self.deploy_management_unit(wallet, b).await?;
                    print_execute_instruction(
                        ContractKey::ContractManagement.as_str(),
                        self.core.dependency_controller,
                        unit,
                    );
                }
                return Ok(StageOutcome::Deferred);
            }

            let Some(first) = batches.first() else {
                return Ok(stage_done(executed));
            };
            let unit = self.deploy_management_unit(wallet, first).await?;
            if let Some(hash) = self
                .run_unit(unit, ContractKey::ContractManagement, first.clone())
                .await?
            {
                executed.push(hash);
            }
        }
    }

    async fn activate_strategy_tokens(&self) -> Result<StageOutcome, PassError> {
        let mut executed = Vec::new();
        let mut guard = ProgressGuard::new("strategy token activation");
        loop {
            let work = self.collect_strategy_work().await?;
            if work.tokens.is_empty() {
                return Ok(stage_done(executed));
            }
            guard.check(work.tokens.len())?;

            if self.mode == RunMode::Plan {
                return Ok(StageOutcome::Planned);
            }
            let Some(wallet) = self.wallet.as_ref() else {
                println!("  NO SIGNER: approval work is recomputed on the next run");
                return Ok(StageOutcome::Deferred);
            };

            let chunks = work.chunks(self.config.max_batch);
            if self.authority == Authority::Manual {
                for (tokens, strategies, data) in &chunks {
                    let unit = self
                        .deploy_strategy_unit(wallet, tokens, strategies, data)
                        .await?;
                    print_execute_instruction(
                        ContractKey::StrategyTokenActivation.as_str(),
                        self.core.dependency_controller,
                        unit,
                    );
                }
                return Ok(StageOutcome::Deferred);
            }

            let Some((tokens, strategies, data)) = chunks.first() else {
                return Ok(stage_done(executed));
            };
            let unit = self
                .deploy_strategy_unit(wallet, tokens, strategies, data)
                .await?;
            if let Some(hash) = self
                .run_unit(unit, ContractKey::StrategyTokenActivation, Batch::default())
                .await?
            {
                executed.push(hash);
            }
        }
    }

    /// One-time tranche slot registration for the lending contract. Not a
    /// unit: the owner calls the lending contract itself.
    async fn tranche_slot(&self) -> Result<StageOutcome, PassError> {
        let slot = registry::tranche_slot(&self.reader, &self.core)
            .await
            .map_err(PassError::BaselineRead)?;
        if !slot.is_zero() {
            return Ok(StageOutcome::Current);
        }
        println!(
            "  tranche slot unset for lending contract {}",
            self.core.isolated_lending
        );
        if self.mode == RunMode::Plan {
            return Ok(StageOutcome::Planned);
        }

        let outcome = self
            .executor()
            .setup_tranche_slot(self.core.isolated_lending)
            .await?;
        match outcome {
            UnitOutcome::Executed(hash) => {
                let after = registry::tranche_slot(&self.reader, &self.core)
                    .await
                    .map_err(PassError::BaselineRead)?;
                if after.is_zero() {
                    return Err(PassError::Other(anyhow!(
                        "setupTrancheSlot executed but the slot is still unset"
                    )));
                }
                Ok(StageOutcome::Executed(vec![hash]))
            }
            UnitOutcome::AlreadyExecuted => Ok(StageOutcome::Current),
            UnitOutcome::Deferred => Ok(StageOutcome::Deferred),
        }
    }

    /// Strip known roles from managed contracts that neither the
    /// deployments file nor the address book recognizes. Opt-in.
    async fn cleanup(&self) -> Result<StageOutcome, PassError> {
        let mut executed = Vec::new();
        let mut guard = ProgressGuard::new("dependency cleanup");
        loop {
            let work = self.collect_cleanup_work().await?;
            if work.contracts.is_empty() {
                return Ok(stage_done(executed));
            }
            guard.check(work.contracts.len())?;
            println!("  {} (contract, role) pairs to strip", work.contracts.len());
            for (contract, role) in work.contracts.iter().zip(&work.roles) {
                println!("    {contract} holds role {role}");
            }

            if self.mode == RunMode::Plan {
                return Ok(StageOutcome::Planned);
            }
            let Some(wallet) = self.wallet.as_ref() else {
                println!("  NO SIGNER: cleanup is recomputed on the next run");
                return Ok(StageOutcome::Deferred);
            };

            let args = (work.contracts.clone(), work.roles.clone(), self.core.roles)
                .abi_encode_params();
            let unit = self
                .deploy_unit(wallet, ContractKey::DependencyCleaner, args)
                .await?;
            if self.authority == Authority::Manual {
                print_execute_instruction(
                    ContractKey::DependencyCleaner.as_str(),
                    self.core.dependency_controller,
                    unit,
                );
                return Ok(StageOutcome::Deferred);
            }
            if let Some(hash) = self
                .run_unit(unit, ContractKey::DependencyCleaner, Batch::default())
                .await?
            {
                executed.push(hash);
            }
        }
    }

    // ── Work collection ──────────────────────────────────────────────

    /// Run every declared oracle wiring through its on-chain parameter
    /// check. Mismatches group per oracle contract; within a token the
    /// additional oracles are checked before the primary.
    async fn collect_oracle_work(&self) -> Result<Vec<OracleGroup>, PassError> {
        let mut groups: Vec<OracleGroup> = Vec::new();
        for token in &self.desired.tokens {
            let record = &token.record;

            let mut wirings = Vec::new();
            for (priced, spec) in &record.additional_oracles {
                let wiring = spec
                    .resolve(record, &self.desired.token_addresses)
                    .with_context(|| {
                        format!("additional oracle for {priced} references an unlisted token")
                    })?;
                wirings.push((*priced, spec.oracle_key(), wiring));
            }
            let primary = record
                .oracle
                .resolve(record, &self.desired.token_addresses)
                .with_context(|| {
                    format!("oracle for {} references an unlisted token", token.symbol)
                })?;
            wirings.push((token.symbol, record.oracle.oracle_key(), primary));

            for (priced, key, wiring) in wirings {
                let priced_addr = *self
                    .desired
                    .token_addresses
                    .get(&priced)
                    .with_context(|| format!("{priced} has no address on this network"))?;
                let oracle = self.deployments.require(key)?;
                let peg = match &wiring {
                    OracleWiring::Twap { peg_token, .. } => *peg_token,
                    _ => self.core.stablecoin,
                };
                let (matches, encoded) =
                    registry::check_oracle(&self.reader, oracle, priced_addr, peg, &wiring)
                        .await
                        .map_err(PassError::BaselineRead)?;
                if matches {
                    continue;
                }
                let ratio = record.col_ratio_per_10k();
                match groups.iter_mut().find(|g| g.oracle == oracle) {
                    Some(group) => {
                        group.tokens.push(priced_addr);
                        group.pegs.push(peg);
                        group.col_ratios.push(ratio);
                        group.data.push(encoded);
                    }
                    None => groups.push(OracleGroup {
                        key,
                        oracle,
                        tokens: vec![priced_addr],
                        pegs: vec![peg],
                        col_ratios: vec![ratio],
                        data: vec![encoded],
                    }),
                }
            }
        }
        // The proxy oracle goes first: other oracles may be viewed
        // through it once registered. Stable sort keeps first-seen order
        // among the rest.
        groups.sort_by_key(|g| (g.key != ContractKey::ProxyOracle) as u8);
        Ok(groups)
    }

    async fn collect_token_work(&self) -> Result<TokenWork, PassError> {
        let mut work = TokenWork::default();
        for token in &self.desired.tokens {
            let meta = registry::il_metadata(&self.reader, &self.core, token.address)
                .await
                .map_err(PassError::BaselineRead)?;
            let want_ceiling = token.record.debt_ceiling_units();
            let want_fee = token.record.fee_per_mil();
            if meta.debt_ceiling == want_ceiling && meta.minting_fee == want_fee {
                continue;
            }
            println!(
                "  {}: ceiling {} -> {}, fee {} -> {}",
                token.symbol, meta.debt_ceiling, want_ceiling, meta.minting_fee, want_fee
            );
            work.tokens.push(token.address);
            work.ceilings.push(want_ceiling);
            work.fees.push(want_fee);
        }
        Ok(work)
    }

    async fn collect_strategy_work(&self) -> Result<StrategyWork, PassError> {
        let mut work = StrategyWork::default();
        for strategy in &self.desired.strategies {
            for symbol in &strategy.tokens {
                let token = *self
                    .desired
                    .token_addresses
                    .get(symbol)
                    .with_context(|| format!("{symbol} has no address on this network"))?;
                let (approved, data) =
                    registry::strategy_approved(&self.reader, strategy.address, token)
                        .await
                        .map_err(PassError::BaselineRead)?;
                if approved {
                    continue;
                }
                println!("  {} needs approval for {}", strategy.key, symbol);
                work.tokens.push(token);
                work.strategies.push(strategy.address);
                work.data.push(data);
            }
        }
        Ok(work)
    }

    async fn collect_cleanup_work(&self) -> Result<CleanupWork, PassError> {
        let managed = registry::managed_list(&self.reader, &self.core)
            .await
            .map_err(PassError::BaselineRead)?;
        let known: HashSet<Address> = self
            .deployments
            .addresses()
            .chain(self.book.chain_addresses(self.config.network.chain_id))
            .collect();
        let excess: Vec<Address> = managed.into_iter().filter(|a| !known.contains(a)).collect();
        if excess.is_empty() {
            return Ok(CleanupWork::default());
        }

        let roles = registry::known_roles(&self.reader, &self.core)
            .await
            .map_err(PassError::BaselineRead)?;
        let mut work = CleanupWork::default();
        for &contract in &excess {
            let mut held = 0usize;
            for &role in &roles {
                if registry::has_role(&self.reader, &self.core, role, contract)
                    .await
                    .map_err(PassError::BaselineRead)?
                {
                    work.contracts.push(contract);
                    work.roles.push(role);
                    held += 1;
                }
            }
            if held == 0 {
                println!("  unrecognized managed contract {contract} holds no known roles");
            }
        }
        Ok(work)
    }

    // ── Unit plumbing ────────────────────────────────────────────────

    fn executor(&self) -> UnitExecutor<'_, W, R> {
        UnitExecutor {
            authority: self.authority,
            wallet: self.wallet.as_ref(),
            reader: &self.reader,
            controller: self.core.dependency_controller,
            owner: self.owner,
        }
    }

    async fn baseline(&self) -> Result<ManagementSet, PassError> {
        registry::management_set(&self.reader, &self.core)
            .await
            .map_err(PassError::BaselineRead)
    }

    /// Rewrite this network's ledger entry from a freshly pruned delta.
    /// Plan mode updates memory only.
    fn persist(&mut self, delta: Delta) -> Result<(), StoreError> {
        self.ledger
            .set_network(&self.config.network.name, delta.into_pending());
        if self.mode == RunMode::Apply {
            self.ledger.save(&self.config.migrations_file)?;
        }
        Ok(())
    }

    async fn deploy_unit(
        &self,
        wallet: &W,
        key: ContractKey,
        ctor_args: Vec<u8>,
    ) -> Result<Address, PassError> {
        let code = self.artifacts.creation_code(key)?;
        let unit = artifacts::deploy_unit(wallet, key, code, ctor_args).await?;
        println!("  DEPLOYED: {key} unit at {unit}");
        Ok(unit)
    }

    async fn deploy_management_unit(
        &self,
        wallet: &W,
        batch: &Batch,
    ) -> Result<Address, PassError> {
        let args = (
            batch.manage.clone(),
            batch.disable.clone(),
            batch.enable.clone(),
            self.core.roles,
        )
            .abi_encode_params();
        self.deploy_unit(wallet, ContractKey::ContractManagement, args)
            .await
    }

    async fn deploy_oracle_unit(
        &self,
        wallet: &W,
        group: &OracleGroup,
    ) -> Result<Address, PassError> {
        let args = (
            group.oracle,
            group.tokens.clone(),
            group.pegs.clone(),
            group.col_ratios.clone(),
            group.data.clone(),
            self.core.roles,
        )
            .abi_encode_params();
        self.deploy_unit(wallet, ContractKey::OracleActivation, args)
            .await
    }

    async fn deploy_token_unit(
        &self,
        wallet: &W,
        tokens: &[Address],
        ceilings: &[U256],
        fees: &[U256],
    ) -> Result<Address, PassError> {
        let args = (
            tokens.to_vec(),
            ceilings.to_vec(),
            fees.to_vec(),
            self.core.roles,
        )
            .abi_encode_params();
        self.deploy_unit(wallet, ContractKey::TokenActivation, args)
            .await
    }

    async fn deploy_strategy_unit(
        &self,
        wallet: &W,
        tokens: &[Address],
        strategies: &[Address],
        data: &[Bytes],
    ) -> Result<Address, PassError> {
        let args = (
            tokens.to_vec(),
            strategies.to_vec(),
            data.to_vec(),
            self.core.roles,
        )
            .abi_encode_params();
        self.deploy_unit(wallet, ContractKey::StrategyTokenActivation, args)
            .await
    }

    async fn run_unit(
        &self,
        unit: Address,
        name: ContractKey,
        batch: Batch,
    ) -> Result<Option<TxHash>, PassError> {
        match self.executor().execute(unit, name).await {
            Ok(UnitOutcome::Executed(hash)) => {
                println!("  EXECUTED: {name} unit ({hash})");
                Ok(Some(hash))
            }
            Ok(UnitOutcome::AlreadyExecuted) => Ok(None),
            Ok(UnitOutcome::Deferred) => Ok(None),
            Err(err) => Err(PassError::unit_failure(name, batch, err)),
        }
    }
}

// ── Plan printing ────────────────────────────────────────────────────

fn print_management_plan(delta: &Delta, batches: &[Batch]) {
    println!("  management delta: {delta}");
    for (i, b) in batches.iter().enumerate() {
        println!("  batch {}/{}: {b}", i + 1, batches.len());
        for addr in &b.manage {
            println!("    manage  {addr}");
        }
        for addr in &b.disable {
            println!("    disable {addr}");
        }
        for addr in &b.enable {
            println!("    enable  {addr}");
        }
    }
}

fn print_oracle_plan(groups: &[OracleGroup]) {
    for group in groups {
        println!(
            "  {} group at {} ({} wirings)",
            group.key,
            group.oracle,
            group.tokens.len()
        );
        for (token, peg) in group.tokens.iter().zip(&group.pegs) {
            println!("    token {token} peg {peg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::management::ManagementSet;
    use alloy::primitives::Address;

    fn full_deployments() -> Deployments {
        let entries: Vec<(ContractKey, Address)> = ContractKey::ALL
            .iter()
            .filter(|k| !k.is_unit())
            .enumerate()
            .map(|(i, k)| (*k, Address::with_last_byte(i as u8 + 1)))
            .collect();
        Deployments::from_entries(&entries)
    }

    #[test]
    fn intent_covers_every_unmanaged_declaration() {
        let deployments = full_deployments();
        let desired = crate::desired::build("avalanche", &deployments).unwrap();
        let mut pending = PendingMigration::default();
        merge_intent(
            &desired,
            &AddressBook::default(),
            43114,
            &ManagementSet::default(),
            &mut pending,
        );
        assert_eq!(pending.manage.len(), desired.managed.len());
        assert_eq!(pending.strategies.len(), desired.strategies.len());
        assert!(pending.replace.is_empty());
        // Declaration order survives into the ledger.
        assert_eq!(pending.manage[0], desired.managed[0].address);
    }

    #[test]
    fn intent_detects_replacements_through_the_book() {
        let deployments = full_deployments();
        let desired = crate::desired::build("avalanche", &deployments).unwrap();
        let fresh = desired.managed[0].clone();
        let old = Address::with_last_byte(0xEE);
        let book = AddressBook::with_entry(43114, fresh.key, old);
        let current = ManagementSet::of(&[old], &[]);

        let mut pending = PendingMigration::default();
        merge_intent(&desired, &book, 43114, &current, &mut pending);

        assert_eq!(pending.replace.get(&fresh.address), Some(&old));
        assert!(!pending.manage.contains(&fresh.address));
    }

    #[test]
    fn repeated_merges_do_not_duplicate() {
        let deployments = full_deployments();
        let desired = crate::desired::build("localhost", &deployments).unwrap();
        let mut pending = PendingMigration::default();
        let baseline = ManagementSet::default();
        merge_intent(
            &desired,
            &AddressBook::default(),
            31337,
            &baseline,
            &mut pending,
        );
        let first = pending.clone();
        merge_intent(
            &desired,
            &AddressBook::default(),
            31337,
            &baseline,
            &mut pending,
        );
        assert_eq!(pending, first);
    }

    #[test]
    fn outcome_combination_prefers_deferral() {
        use StageOutcome::*;
        assert_eq!(combine_outcomes(Current, Deferred), Deferred);
        assert_eq!(combine_outcomes(Planned, Executed(vec![])), Planned);
        assert_eq!(combine_outcomes(Current, Current), Current);
        match combine_outcomes(
            Executed(vec![TxHash::with_last_byte(1)]),
            Executed(vec![TxHash::with_last_byte(2)]),
        ) {
            Executed(hashes) => assert_eq!(hashes.len(), 2),
            other => panic!("expected Executed, got {other}"),
        }
    }

    #[test]
    fn token_work_chunks_respect_the_bound() {
        let work = TokenWork {
            tokens: (0..5).map(Address::with_last_byte).collect(),
            ceilings: (0..5).map(U256::from).collect(),
            fees: (0..5).map(U256::from).collect(),
        };
        let chunks = work.chunks(2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].0.len(), 2);
        assert_eq!(chunks[2].0.len(), 1);
        // Parallel arrays stay aligned within each chunk.
        assert_eq!(chunks[1].1[0], U256::from(2));
    }
}
