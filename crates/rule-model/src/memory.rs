use std::collections::HashMap;

use async_trait::async_trait;
use core_types::{RuleId, UserId};
use parking_lot::Mutex;

use crate::{
    error::RuleModelError, execution::ExecutionRecord, rule::Rule, store::RuleStore,
    validate::validate_and_normalize,
};

/// An in-memory [`RuleStore`] for tests in this crate and downstream
/// consumers (`trigger-eval`, `execution-queue`, `rule-executors`,
/// `automation-integration`). Never used in production.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: Mutex<HashMap<RuleId, Rule>>,
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn get_rule(&self, rule_id: &RuleId) -> Result<Option<Rule>, RuleModelError> {
        Ok(self.rules.lock().get(rule_id).cloned())
    }

    async fn list_rules_for_user(&self, user_id: &UserId) -> Result<Vec<Rule>, RuleModelError> {
        Ok(self.rules.lock().values().filter(|r| &r.user_id == user_id).cloned().collect())
    }

    async fn list_enabled_rules(&self, user_id: &UserId) -> Result<Vec<Rule>, RuleModelError> {
        Ok(self
            .rules
            .lock()
            .values()
            .filter(|r| &r.user_id == user_id && r.is_eligible())
            .cloned()
            .collect())
    }

    async fn list_all_enabled_rules(&self) -> Result<Vec<Rule>, RuleModelError> {
        Ok(self.rules.lock().values().filter(|r| r.is_eligible()).cloned().collect())
    }

    async fn create_rule(&self, mut rule: Rule) -> Result<(), RuleModelError> {
        validate_and_normalize(&rule.id, &mut rule.config);
        self.rules.lock().insert(rule.id.clone(), rule);
        Ok(())
    }

    async fn update_rule(&self, mut rule: Rule) -> Result<(), RuleModelError> {
        validate_and_normalize(&rule.id, &mut rule.config);
        let mut rules = self.rules.lock();
        if !rules.contains_key(&rule.id) {
            return Err(RuleModelError::RuleNotFound(rule.id));
        }
        rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    async fn delete_rule(&self, rule_id: &RuleId) -> Result<(), RuleModelError> {
        self.rules.lock().remove(rule_id);
        Ok(())
    }

    async fn record_execution(
        &self,
        rule_id: &RuleId,
        record: ExecutionRecord,
    ) -> Result<(), RuleModelError> {
        let mut rules = self.rules.lock();
        let rule = rules.get_mut(rule_id).ok_or_else(|| RuleModelError::RuleNotFound(rule_id.clone()))?;
        rule.last_executed = Some(record.timestamp);
        rule.execution_metadata.record(record);
        Ok(())
    }
}
