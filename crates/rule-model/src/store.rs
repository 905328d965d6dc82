use async_trait::async_trait;
use core_types::{RuleId, UserId};

use crate::{error::RuleModelError, execution::ExecutionRecord, rule::Rule};

/// CRUD and execution-outcome recording for [`Rule`]s (§4.3 "Rule Model").
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn get_rule(&self, rule_id: &RuleId) -> Result<Option<Rule>, RuleModelError>;

    /// All rules for a user, enabled or not (§3: "disabled rules ... remain
    /// queryable").
    async fn list_rules_for_user(&self, user_id: &UserId) -> Result<Vec<Rule>, RuleModelError>;

    /// Only `enabled` rules for a user.
    async fn list_enabled_rules(&self, user_id: &UserId) -> Result<Vec<Rule>, RuleModelError>;

    /// Every enabled rule across all users, used by schedulers at startup
    /// and by the global automation ticker (§4.8).
    async fn list_all_enabled_rules(&self) -> Result<Vec<Rule>, RuleModelError>;

    /// Inserts a new rule. `rule.config` is validated and normalized before
    /// the row is written.
    async fn create_rule(&self, rule: Rule) -> Result<(), RuleModelError>;

    /// Replaces an existing rule's mutable fields (name, enabled, config).
    /// `config` is validated and normalized before the row is written.
    async fn update_rule(&self, rule: Rule) -> Result<(), RuleModelError>;

    /// Hard-deletes a rule. Callers are responsible for removing its
    /// scheduler and any queued executions (§3 "Ownership & lifecycle").
    async fn delete_rule(&self, rule_id: &RuleId) -> Result<(), RuleModelError>;

    /// Appends an [`ExecutionRecord`] to the rule's rolling history, bumps
    /// its execution count, and stamps `last_executed`.
    async fn record_execution(
        &self,
        rule_id: &RuleId,
        record: ExecutionRecord,
    ) -> Result<(), RuleModelError>;
}
