use std::sync::Arc;

use async_trait::async_trait;
use bank_client::BankClient;
use core_types::CoreError;
use execution_queue::ExecutionOutcome;
use local_store::LocalStore;
use rule_model::{ExecutionRecord, Rule, RuleConfig, RuleStore};
use tracing::{debug, warn};

use crate::{
    alert::FailureAlertSink, auto_topup::execute_auto_topup, autosorter::execute_autosorter,
    context::ExecutionContext, sweep::execute_sweep,
};

/// Turns one fired rule into bank client calls and records the outcome
/// (§4.6 "Rule Executors", §7 "Propagation").
#[async_trait]
pub trait RuleExecutor: Send + Sync {
    async fn run(&self, rule: &Rule, ctx: &ExecutionContext) -> Result<ExecutionOutcome, CoreError>;
}

/// The production [`RuleExecutor`]: dispatches on the rule's family, records
/// the outcome back onto the rule, and raises a failure alert for anything
/// that isn't a benign, expected outcome.
pub struct DefaultRuleExecutor {
    bank_client: Arc<dyn BankClient>,
    local_store: Arc<dyn LocalStore>,
    rule_store: Arc<dyn RuleStore>,
    alert_sink: Arc<dyn FailureAlertSink>,
}

impl DefaultRuleExecutor {
    #[must_use]
    pub fn new(
        bank_client: Arc<dyn BankClient>,
        local_store: Arc<dyn LocalStore>,
        rule_store: Arc<dyn RuleStore>,
        alert_sink: Arc<dyn FailureAlertSink>,
    ) -> Self {
        Self { bank_client, local_store, rule_store, alert_sink }
    }

    async fn dispatch(&self, rule: &Rule, ctx: &ExecutionContext) -> Result<ExecutionOutcome, CoreError> {
        match &rule.config {
            RuleConfig::PotSweep { config, .. } => {
                let result = execute_sweep(
                    self.bank_client.as_ref(),
                    self.local_store.as_ref(),
                    &rule.id,
                    config,
                    rule.last_executed,
                    ctx,
                )
                .await?;
                let summary = if result.errors.is_empty() {
                    format!("swept {} from {} source(s)", result.total_moved, result.sources.len())
                } else {
                    format!(
                        "swept {} from {} source(s), {} source(s) failed: {}",
                        result.total_moved,
                        result.sources.len(),
                        result.errors.len(),
                        result.errors.join("; ")
                    )
                };
                Ok(ExecutionOutcome::new(result.total_moved, summary))
            }
            RuleConfig::Autosorter { config, .. } => {
                let result = execute_autosorter(
                    self.bank_client.as_ref(),
                    self.local_store.as_ref(),
                    &rule.id,
                    config,
                    ctx,
                )
                .await?;
                let summary = result.reason.clone().unwrap_or_else(|| {
                    format!(
                        "allocated {} across {} pot(s)",
                        result.total_moved,
                        usize::from(result.bills_replenishment.is_some())
                            + result.priority_allocations.len()
                            + result.goal_allocations.len()
                            + result.investment_allocations.len()
                    )
                });
                Ok(ExecutionOutcome::new(result.total_moved, summary))
            }
            RuleConfig::AutoTopup { config, .. } => {
                let result =
                    execute_auto_topup(self.bank_client.as_ref(), config, rule.last_executed, ctx).await?;
                Ok(ExecutionOutcome::new(result.amount_moved, result.summary))
            }
        }
    }
}

#[async_trait]
impl RuleExecutor for DefaultRuleExecutor {
    async fn run(&self, rule: &Rule, ctx: &ExecutionContext) -> Result<ExecutionOutcome, CoreError> {
        let outcome = self.dispatch(rule, ctx).await;

        match &outcome {
            Ok(result) => {
                let record = ExecutionRecord::success(ctx.now, result.amount_moved, result.summary.clone());
                if let Err(err) = self.rule_store.record_execution(&rule.id, record).await {
                    warn!(target: "rule_executors", rule_id = %rule.id, %err, "failed to record execution outcome");
                }
            }
            // §7 "Propagation": only these two are handled locally — no
            // history entry, no alert, no change to `last_executed`.
            Err(CoreError::DuplicateSuppressed(reason)) => {
                debug!(target: "rule_executors", rule_id = %rule.id, reason, "execution suppressed");
            }
            Err(CoreError::DependencyUnmet(reason)) => {
                debug!(target: "rule_executors", rule_id = %rule.id, reason, "dependency unmet");
            }
            Err(err) => {
                let record = ExecutionRecord::failure(ctx.now, err.to_string());
                if let Err(store_err) = self.rule_store.record_execution(&rule.id, record).await {
                    warn!(
                        target: "rule_executors", rule_id = %rule.id, err = %store_err,
                        "failed to record execution failure"
                    );
                }
                if !err.is_benign_outcome() {
                    self.alert_sink
                        .send_failure_alert(&rule.user_id, &rule.name, rule.family(), &err.to_string())
                        .await;
                }
            }
        }

        outcome
    }
}
