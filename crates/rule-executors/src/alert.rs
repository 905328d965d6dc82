use async_trait::async_trait;
use core_types::UserId;
use rule_model::RuleFamily;
use tracing::info;

/// Delivers the "rule failed" notification described in §7 "User-visible
/// behavior". Alert transport (push, email, in-app) is out of scope here;
/// this crate only owns the decision of *when* to call it.
#[async_trait]
pub trait FailureAlertSink: Send + Sync {
    async fn send_failure_alert(
        &self,
        user_id: &UserId,
        rule_name: &str,
        family: RuleFamily,
        message: &str,
    );
}

/// Logs the alert instead of delivering it anywhere. Used wherever no real
/// alert transport is wired up (tests, and as a safe default).
#[derive(Debug, Default)]
pub struct NoopAlertSink;

#[async_trait]
impl FailureAlertSink for NoopAlertSink {
    async fn send_failure_alert(
        &self,
        user_id: &UserId,
        rule_name: &str,
        family: RuleFamily,
        message: &str,
    ) {
        info!(
            target: "rule_executors", %user_id, rule_name, family = family.as_str(), message,
            "rule execution failure alert (no sink configured)"
        );
    }
}
