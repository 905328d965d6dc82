use std::sync::Arc;

use core_types::{AccountId, RuleId, Timestamp, UserId};
use execution_queue::{ExecutionQueue, ItemMetadata, Priority, QueueItem, RuleFamilyTag};
use local_store::LocalStore;
use rule_executors::{ExecutionContext, RuleExecutor};
use rule_model::{AutosorterTrigger, Rule, RuleConfig, RuleFamily, RuleStore};
use tracing::{debug, warn};
use trigger_eval::{TriggerContext, TriggerEvaluator};

use crate::{account_resolve::resolve_account_for_rule, error::IntegrationError, priority::priority_hint_for};

/// Tally returned by one evaluate-and-enqueue pass (§4.7).
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub enqueued: usize,
    pub skipped: usize,
    pub automation_trigger_enqueued: usize,
}

/// One rule that made it into the primary batch, kept around long enough to
/// build the deferred `automation_trigger` batch's dependency list (§4.5
/// "`automation_trigger` autosorter rules declare dependencies on all
/// currently enqueued sweep and auto-topup rule ids").
struct Enqueued {
    rule_id: RuleId,
    family: RuleFamily,
}

/// Turns fired rules into [`QueueItem`]s (§4.7 "Sync-Automation
/// Integration").
///
/// Holds no dependency on `sync-engine`'s concrete engine type — only the
/// pieces needed to load rules, decide whether they fire, and enqueue them.
/// `crate::hook` implements `sync_engine::PostSyncHook` directly on this
/// type, so `sync-engine` only ever sees it through that narrow trait.
pub struct AutomationIntegration {
    local_store: Arc<dyn LocalStore>,
    rule_store: Arc<dyn RuleStore>,
    trigger_evaluator: Arc<dyn TriggerEvaluator>,
    executor: Arc<dyn RuleExecutor>,
    queue: ExecutionQueue,
}

impl std::fmt::Debug for AutomationIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutomationIntegration").field("queue", &self.queue).finish_non_exhaustive()
    }
}

impl AutomationIntegration {
    #[must_use]
    pub fn new(
        local_store: Arc<dyn LocalStore>,
        rule_store: Arc<dyn RuleStore>,
        trigger_evaluator: Arc<dyn TriggerEvaluator>,
        executor: Arc<dyn RuleExecutor>,
        queue: ExecutionQueue,
    ) -> Self {
        Self { local_store, rule_store, trigger_evaluator, executor, queue }
    }

    /// Evaluates and enqueues every enabled rule for one user (§4.7 steps
    /// 1-5), with no account restriction.
    pub async fn run_for_user(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<RunSummary, IntegrationError> {
        let rules = self.rule_store.list_enabled_rules(user_id).await?;
        self.evaluate_and_enqueue(&rules, now, None).await
    }

    /// The global automation ticker's entry point (§4.8 "Global automation
    /// ticker"): every enabled rule, across every user, with no preceding
    /// sync.
    pub async fn run_all_users(&self, now: Timestamp) -> Result<RunSummary, IntegrationError> {
        let rules = self.rule_store.list_all_enabled_rules().await?;
        self.evaluate_and_enqueue(&rules, now, None).await
    }

    /// A per-rule ticker's entry point (§4.8 "Per-rule tickers"): evaluates
    /// and, if it fires, enqueues exactly one rule. Fetched fresh from the
    /// rule store on every call so an edit or disable takes effect on the
    /// next tick without the ticker needing to know about it.
    pub async fn run_single_rule(
        &self,
        rule_id: &RuleId,
        now: Timestamp,
    ) -> Result<RunSummary, IntegrationError> {
        match self.rule_store.get_rule(rule_id).await? {
            Some(rule) if rule.enabled => self.evaluate_and_enqueue(&[rule], now, None).await,
            _ => Ok(RunSummary::default()),
        }
    }

    /// Invoked by the sync engine's post-sync hook (§4.7's opening
    /// paragraph): restricts the batch to rules resolving to the
    /// just-synced account, since those are the only ones with fresh local
    /// data backing their trigger evaluation.
    pub(crate) async fn handle_account_synced(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<RunSummary, IntegrationError> {
        let rules = self.rule_store.list_enabled_rules(user_id).await?;
        let now = chrono::Utc::now();
        self.evaluate_and_enqueue(&rules, now, Some(account_id)).await
    }

    /// Bypasses the trigger evaluator entirely and always enqueues, still
    /// going through the queue at NORMAL priority by default (§4.7 "Manual
    /// execution bypasses the trigger evaluator").
    pub async fn execute_manual(&self, rule_id: &RuleId, now: Timestamp) -> Result<(), IntegrationError> {
        let rule = self
            .rule_store
            .get_rule(rule_id)
            .await?
            .ok_or_else(|| IntegrationError::RuleNotFound(rule_id.clone()))?;

        let account_id = resolve_account_for_rule(self.local_store.as_ref(), &rule).await?;
        self.enqueue_rule(
            &rule,
            &account_id,
            Priority::Normal,
            vec![],
            "manual invocation".to_string(),
            true,
            now,
        )?;
        Ok(())
    }

    async fn evaluate_and_enqueue(
        &self,
        rules: &[Rule],
        now: Timestamp,
        account_filter: Option<&AccountId>,
    ) -> Result<RunSummary, IntegrationError> {
        self.queue.begin_cycle();
        let mut summary = RunSummary::default();

        let (deferred, primary): (Vec<&Rule>, Vec<&Rule>) =
            rules.iter().partition(|r| is_automation_trigger(r));

        let mut enqueued_primary = Vec::new();
        for rule in primary {
            match self.try_enqueue_primary(rule, now, account_filter).await {
                Ok(true) => {
                    summary.enqueued += 1;
                    enqueued_primary.push(Enqueued { rule_id: rule.id.clone(), family: rule.family() });
                }
                Ok(false) => summary.skipped += 1,
                Err(err) => {
                    warn!(target: "automation_integration", rule_id = %rule.id, %err, "failed to evaluate rule");
                    summary.skipped += 1;
                }
            }
        }

        let depends_on: Vec<RuleId> = enqueued_primary
            .iter()
            .filter(|e| matches!(e.family, RuleFamily::PotSweep | RuleFamily::AutoTopup))
            .map(|e| e.rule_id.clone())
            .collect();

        for rule in deferred {
            let account_id = match resolve_account_for_rule(self.local_store.as_ref(), rule).await {
                Ok(id) => id,
                Err(err) => {
                    warn!(target: "automation_integration", rule_id = %rule.id, %err, "failed to resolve account for automation_trigger rule");
                    summary.skipped += 1;
                    continue;
                }
            };
            if account_filter.is_some_and(|filter| filter != &account_id) {
                continue;
            }

            let priority = priority_hint_for(rule).default_priority();
            if self
                .enqueue_rule(
                    rule,
                    &account_id,
                    priority,
                    depends_on.clone(),
                    "automation_trigger: runs after this cycle's sweep and auto-topup rules".to_string(),
                    false,
                    now,
                )
                .is_ok()
            {
                summary.automation_trigger_enqueued += 1;
            } else {
                summary.skipped += 1;
            }
        }

        Ok(summary)
    }

    /// Returns `Ok(true)` if the rule fired and was enqueued, `Ok(false)` if
    /// it was evaluated and correctly did not fire (or falls outside
    /// `account_filter`) — neither case is an error.
    async fn try_enqueue_primary(
        &self,
        rule: &Rule,
        now: Timestamp,
        account_filter: Option<&AccountId>,
    ) -> Result<bool, IntegrationError> {
        let account_id = resolve_account_for_rule(self.local_store.as_ref(), rule).await?;
        if account_filter.is_some_and(|filter| filter != &account_id) {
            return Ok(false);
        }

        let ctx = TriggerContext { now, user_id: rule.user_id.clone(), primary_account_id: account_id.clone() };
        let decision = self.trigger_evaluator.evaluate(rule, &ctx).await?;
        debug!(
            target: "automation_integration", rule_id = %rule.id, should_fire = decision.should_fire,
            reason = %decision.reason, "evaluated trigger",
        );
        if !decision.should_fire {
            return Ok(false);
        }

        let priority = priority_hint_for(rule).default_priority();
        self.enqueue_rule(rule, &account_id, priority, vec![], decision.reason, false, now)?;
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    fn enqueue_rule(
        &self,
        rule: &Rule,
        account_id: &AccountId,
        priority: Priority,
        depends_on: Vec<RuleId>,
        trigger_reason: String,
        manual: bool,
        now: Timestamp,
    ) -> Result<(), IntegrationError> {
        let ctx = ExecutionContext { now, user_id: rule.user_id.clone(), account_id: account_id.clone() };
        let executor = self.executor.clone();
        let rule_for_job = rule.clone();
        let job: execution_queue::Job =
            Box::new(move || Box::pin(async move { executor.run(&rule_for_job, &ctx).await }));

        let item = QueueItem::new(
            rule.id.clone(),
            rule.user_id.clone(),
            account_id.clone(),
            family_tag(rule.family()),
            priority,
            depends_on,
            ItemMetadata { trigger_reason, manual, rule_name: rule.name.clone() },
            now,
            job,
        );
        self.queue.enqueue(item)?;
        Ok(())
    }
}

fn is_automation_trigger(rule: &Rule) -> bool {
    matches!(
        &rule.config,
        RuleConfig::Autosorter { config, .. } if matches!(config.trigger, AutosorterTrigger::AutomationTrigger)
    )
}

fn family_tag(family: RuleFamily) -> RuleFamilyTag {
    match family {
        RuleFamily::PotSweep => RuleFamilyTag::PotSweep,
        RuleFamily::Autosorter => RuleFamilyTag::Autosorter,
        RuleFamily::AutoTopup => RuleFamilyTag::AutoTopup,
    }
}
