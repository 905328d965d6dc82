use chrono::{DateTime, Utc};
use core_types::{RuleId, UserId};
use sqlx::SqlitePool;

use crate::{
    error::RuleModelError,
    execution::{ExecutionMetadata, ExecutionRecord},
    rule::Rule,
    store::RuleStore,
    validate::validate_and_normalize,
};

/// A [`RuleStore`] backed by the `automation_rules` table via `sqlx`/SQLite.
/// Schema creation/migration is out of scope for the core (§1 Non-goals).
#[derive(Debug, Clone)]
pub struct SqlxRuleStore {
    pool: SqlitePool,
}

impl SqlxRuleStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RuleStore for SqlxRuleStore {
    async fn get_rule(&self, rule_id: &RuleId) -> Result<Option<Rule>, RuleModelError> {
        let row = sqlx::query_as::<_, RuleRow>(
            "SELECT id, user_id, family, name, enabled, config, created, updated, \
             last_executed, execution_metadata FROM automation_rules WHERE id = ?",
        )
        .bind(rule_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_rules_for_user(&self, user_id: &UserId) -> Result<Vec<Rule>, RuleModelError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            "SELECT id, user_id, family, name, enabled, config, created, updated, \
             last_executed, execution_metadata FROM automation_rules WHERE user_id = ?",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_enabled_rules(&self, user_id: &UserId) -> Result<Vec<Rule>, RuleModelError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            "SELECT id, user_id, family, name, enabled, config, created, updated, \
             last_executed, execution_metadata FROM automation_rules \
             WHERE user_id = ? AND enabled = 1",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_all_enabled_rules(&self) -> Result<Vec<Rule>, RuleModelError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            "SELECT id, user_id, family, name, enabled, config, created, updated, \
             last_executed, execution_metadata FROM automation_rules WHERE enabled = 1",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_rule(&self, mut rule: Rule) -> Result<(), RuleModelError> {
        validate_and_normalize(&rule.id, &mut rule.config);
        let config_json = serde_json::to_string(&rule.config)
            .map_err(|e| RuleModelError::InvalidConfig(e.to_string()))?;
        let metadata_json = serde_json::to_string(&rule.execution_metadata)
            .map_err(|e| RuleModelError::InvalidConfig(e.to_string()))?;

        sqlx::query(
            "INSERT INTO automation_rules (id, user_id, family, name, enabled, config, \
             created, updated, last_executed, execution_metadata) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rule.id.as_str())
        .bind(rule.user_id.as_str())
        .bind(rule.family().as_str())
        .bind(&rule.name)
        .bind(rule.enabled)
        .bind(config_json)
        .bind(rule.created)
        .bind(rule.updated)
        .bind(rule.last_executed)
        .bind(metadata_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_rule(&self, mut rule: Rule) -> Result<(), RuleModelError> {
        validate_and_normalize(&rule.id, &mut rule.config);
        let config_json = serde_json::to_string(&rule.config)
            .map_err(|e| RuleModelError::InvalidConfig(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE automation_rules SET name = ?, enabled = ?, family = ?, config = ?, \
             updated = ? WHERE id = ?",
        )
        .bind(&rule.name)
        .bind(rule.enabled)
        .bind(rule.family().as_str())
        .bind(config_json)
        .bind(rule.updated)
        .bind(rule.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RuleModelError::RuleNotFound(rule.id));
        }
        Ok(())
    }

    async fn delete_rule(&self, rule_id: &RuleId) -> Result<(), RuleModelError> {
        sqlx::query("DELETE FROM automation_rules WHERE id = ?")
            .bind(rule_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_execution(
        &self,
        rule_id: &RuleId,
        record: ExecutionRecord,
    ) -> Result<(), RuleModelError> {
        let current = self
            .get_rule(rule_id)
            .await?
            .ok_or_else(|| RuleModelError::RuleNotFound(rule_id.clone()))?;

        let mut metadata = current.execution_metadata;
        let timestamp = record.timestamp;
        metadata.record(record);
        let metadata_json = serde_json::to_string(&metadata)
            .map_err(|e| RuleModelError::InvalidConfig(e.to_string()))?;

        sqlx::query(
            "UPDATE automation_rules SET last_executed = ?, execution_metadata = ? WHERE id = ?",
        )
        .bind(timestamp)
        .bind(metadata_json)
        .bind(rule_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: String,
    user_id: String,
    #[allow(dead_code)]
    family: String,
    name: String,
    enabled: bool,
    config: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    last_executed: Option<DateTime<Utc>>,
    execution_metadata: String,
}

impl TryFrom<RuleRow> for Rule {
    type Error = RuleModelError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let config = serde_json::from_str(&row.config)
            .map_err(|e| RuleModelError::InvalidConfig(e.to_string()))?;
        let execution_metadata: ExecutionMetadata = serde_json::from_str(&row.execution_metadata)
            .map_err(|e| RuleModelError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            id: RuleId::from(row.id),
            user_id: UserId::from(row.user_id),
            name: row.name,
            enabled: row.enabled,
            config,
            created: row.created,
            updated: row.updated,
            last_executed: row.last_executed,
            execution_metadata,
        })
    }
}
