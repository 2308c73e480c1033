//! Scenario runner: bootstrap, deployment phase, invocation phase

use crate::assertion::StepCheck;
use crate::error::{FixtureError, Phase, ScenarioResult};
use crate::executor::StepExecutor;
use crate::facade::LedgerFacade;
use crate::scenario::{Scenario, StepConfig};
use fugue_ledger::{
    AccountProtocol, ActionValidator, Blockchain, ChainConfig, EnvelopeValidator,
    ExecutionProtocol, GenericValidator, RollDposProtocol,
};
use fugue_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Span;

/// Runner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Parameters of the ledger created for each scenario
    #[serde(default)]
    pub chain: ChainConfig,
}

impl RunnerConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }
}

/// How the invocation phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// No contract was deployed, nothing ran
    Skipped,
    /// Every invocation step ran
    Completed {
        /// Number of steps executed
        executed: usize,
    },
    /// A read-only step ended the phase
    StoppedAtReadOnly {
        /// Position of the read-only step
        index: usize,
    },
}

/// Where a scenario run finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Deployment phase produced no addresses; invocations were skipped
    DeploymentOnly,
    /// Every invocation step ran
    Completed {
        /// Number of steps executed
        executed: usize,
    },
    /// A read-only step ended the invocation phase
    StoppedAtReadOnly {
        /// Position of the read-only step
        index: usize,
    },
}

impl From<InvokeOutcome> for PhaseOutcome {
    fn from(outcome: InvokeOutcome) -> Self {
        match outcome {
            InvokeOutcome::Skipped => PhaseOutcome::DeploymentOnly,
            InvokeOutcome::Completed { executed } => PhaseOutcome::Completed { executed },
            InvokeOutcome::StoppedAtReadOnly { index } => PhaseOutcome::StoppedAtReadOnly { index },
        }
    }
}

/// Result of a passing scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Contract addresses from the deployment phase, in step order
    pub deployed: Vec<Address>,
    /// Where the run finished
    pub phase_outcome: PhaseOutcome,
}

/// Drives one scenario at a time through a fresh ledger.
///
/// Runs move through `Bootstrap -> Deploying -> {Invoking | Done}`. An
/// expected deployment failure ends the run after the deployment phase, and
/// the first read-only invocation ends the invocation phase.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: RunnerConfig,
    executor: StepExecutor,
    span: Span,
}

impl ScenarioRunner {
    /// Create a runner
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            executor: StepExecutor::new(&config.chain),
            config,
            span: tracing::info_span!("runner"),
        }
    }

    /// Use `span` as the parent of scenario spans
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Runner configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every phase of `scenario` on a fresh ledger. The ledger is stopped
    /// afterwards whether or not the run passed.
    pub fn run(&self, scenario: &Scenario) -> ScenarioResult<RunReport> {
        let span = tracing::info_span!(parent: &self.span, "scenario", name = scenario.name());
        let _enter = span.enter();

        let mut ledger = self.bootstrap(scenario)?;
        let result = self.run_phases(&mut ledger, scenario);
        let stopped = LedgerFacade::stop(&mut ledger);
        let report = result?;
        stopped?;

        tracing::info!(
            deployed = report.deployed.len(),
            outcome = ?report.phase_outcome,
            "scenario passed"
        );
        Ok(report)
    }

    fn run_phases<L: LedgerFacade + ?Sized>(
        &self,
        ledger: &mut L,
        scenario: &Scenario,
    ) -> ScenarioResult<RunReport> {
        let deployed = self.deploy(ledger, scenario)?;
        let outcome = self.invoke(ledger, scenario, &deployed)?;
        Ok(RunReport {
            deployed,
            phase_outcome: outcome.into(),
        })
    }

    /// Create and start a ledger and credit the initial balances before the
    /// first block
    pub fn bootstrap(&self, scenario: &Scenario) -> ScenarioResult<Blockchain> {
        let chain = &self.config.chain;
        let mut ledger = Blockchain::new(chain.clone())?;
        ledger.register_protocol(Box::new(AccountProtocol::new()))?;
        ledger.register_protocol(Box::new(RollDposProtocol::new(
            chain.num_delegates,
            chain.num_sub_epochs,
        )))?;
        ledger.register_protocol(Box::new(ExecutionProtocol::new()))?;
        ledger.add_envelope_validators([
            Box::new(GenericValidator::new(chain.action_gas_limit)) as Box<dyn EnvelopeValidator>
        ]);
        ledger.add_action_validators([
            Box::new(AccountProtocol::new()) as Box<dyn ActionValidator>,
            Box::new(ExecutionProtocol::new()) as Box<dyn ActionValidator>,
        ]);

        let balances: Vec<(Address, U256)> = scenario
            .init_balances()
            .iter()
            .map(|entry| (entry.account, entry.balance))
            .collect();
        start_funded(&mut ledger, &balances)?;
        tracing::info!(accounts = balances.len(), "ledger bootstrapped");
        Ok(ledger)
    }

    /// Run the deployment steps in order and collect the contract addresses.
    ///
    /// A step marked failed must fail, and then ends the phase with no
    /// addresses so that the invocation phase is skipped.
    pub fn deploy<L: LedgerFacade + ?Sized>(
        &self,
        ledger: &mut L,
        scenario: &Scenario,
    ) -> ScenarioResult<Vec<Address>> {
        let mut deployed = Vec::with_capacity(scenario.deployments().len());
        for (index, step) in scenario.deployments().iter().enumerate() {
            let check = StepCheck::new(Phase::Deployment, index, step);
            let append = deployment_append(step, &deployed);
            tracing::info!(phase = "deployment", step = index, comment = %step.comment, "running step");

            let output = self.executor.execute(ledger, step, None, append.as_ref())?;
            if step.failed {
                check.failure(&output.receipt)?;
                tracing::info!(
                    step = index,
                    gas = output.receipt.gas_consumed,
                    "deployment failed as expected, skipping executions"
                );
                return Ok(Vec::new());
            }
            check.gas(&output.receipt)?;
            let address = check.contract_address(&output.receipt)?;
            let stored = ledger.code_at(&address)?;
            check.code(&stored)?;

            tracing::debug!(step = index, contract = %address, gas = output.receipt.gas_consumed, "contract deployed");
            deployed.push(address);
        }
        Ok(deployed)
    }

    /// Run the invocation steps against the deployed contracts.
    ///
    /// The first read-only step is the last one checked: once its output
    /// matches, the phase ends without running later steps.
    pub fn invoke<L: LedgerFacade + ?Sized>(
        &self,
        ledger: &mut L,
        scenario: &Scenario,
        deployed: &[Address],
    ) -> ScenarioResult<InvokeOutcome> {
        if deployed.is_empty() {
            return Ok(InvokeOutcome::Skipped);
        }

        for (index, step) in scenario.executions().iter().enumerate() {
            let check = StepCheck::new(Phase::Invocation, index, step);
            let target = resolve(deployed, index, "contractIndex", step.contract_index)?;
            let append = if step.append_contract_address {
                Some(resolve(
                    deployed,
                    index,
                    "contractIndexToAppend",
                    step.contract_index_to_append,
                )?)
            } else {
                None
            };
            tracing::info!(
                phase = "execution",
                step = index,
                contract = %target,
                comment = %step.comment,
                "running step"
            );

            let output = self
                .executor
                .execute(ledger, step, Some(&target), append.as_ref())?;
            check.status(&output.receipt)?;
            check.gas(&output.receipt)?;

            if step.read_only {
                check.return_value(&output.return_data)?;
                tracing::info!(step = index, "read-only step ends the execution phase");
                return Ok(InvokeOutcome::StoppedAtReadOnly { index });
            }

            for expected in &step.expected_balances {
                let account = expected.account.unwrap_or(target);
                let actual = ledger.balance(&account)?;
                check.balance(account, &expected.balance, actual)?;
            }
            check.log_count(&output.receipt)?;
        }

        Ok(InvokeOutcome::Completed {
            executed: scenario.executions().len(),
        })
    }
}

/// Start `ledger` and credit `balances` before the first block. The ledger
/// is stopped again when funding fails.
pub fn start_funded<L: LedgerFacade + ?Sized>(
    ledger: &mut L,
    balances: &[(Address, U256)],
) -> ScenarioResult<()> {
    ledger.start()?;
    if let Err(err) = ledger.fund_genesis(balances) {
        if let Err(stop_err) = ledger.stop() {
            tracing::warn!(error = %stop_err, "failed to stop ledger after bootstrap error");
        }
        return Err(err.into());
    }
    Ok(())
}

fn deployment_append(step: &StepConfig, deployed: &[Address]) -> Option<Address> {
    if !step.append_contract_address {
        return None;
    }
    step.contract_address_to_append
        .or_else(|| deployed.get(step.contract_index_to_append).copied())
}

fn resolve(
    deployed: &[Address],
    step: usize,
    field: &'static str,
    index: usize,
) -> Result<Address, FixtureError> {
    deployed
        .get(index)
        .copied()
        .ok_or_else(|| FixtureError::IndexOutOfRange {
            location: format!("executions[{step}]"),
            field,
            index,
            available: deployed.len(),
        })
}
