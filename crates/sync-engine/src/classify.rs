use bank_client::BankTransaction;
use local_store::BillsTransactionType;

/// Classifies one transaction posted against a bills pot (§4.2 "Bills pot
/// sync (specialized)").
#[must_use]
pub fn classify_bills_transaction(
    txn: &BankTransaction,
    subscription_merchants: &[String],
    pot_transfer_prefix: &str,
) -> BillsTransactionType {
    let description = txn.description.to_lowercase();
    if subscription_merchants.iter().any(|m| description.contains(&m.to_lowercase())) {
        BillsTransactionType::Subscription
    } else if description.starts_with(&pot_transfer_prefix.to_lowercase()) {
        BillsTransactionType::PotTransfer
    } else {
        BillsTransactionType::Other
    }
}

#[cfg(test)]
mod tests {
    use core_types::{Amount, Timestamp};

    use super::*;

    fn txn(description: &str) -> BankTransaction {
        BankTransaction {
            id: "txn_1".into(),
            created: Timestamp::default(),
            settled: None,
            amount: Amount::minor_units(-500),
            currency: "GBP".into(),
            description: description.into(),
            category: None,
            merchant: None,
            notes: None,
            is_load: false,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn matches_subscription_merchant_case_insensitively() {
        let merchants = vec!["Netflix".to_string(), "Spotify".to_string()];
        assert_eq!(
            classify_bills_transaction(&txn("NETFLIX.COM"), &merchants, "pot:"),
            BillsTransactionType::Subscription
        );
    }

    #[test]
    fn matches_pot_transfer_prefix() {
        let merchants = vec![];
        assert_eq!(
            classify_bills_transaction(&txn("pot:savings transfer"), &merchants, "pot:"),
            BillsTransactionType::PotTransfer
        );
    }

    #[test]
    fn falls_back_to_other() {
        let merchants = vec!["Netflix".to_string()];
        assert_eq!(
            classify_bills_transaction(&txn("Tesco Express"), &merchants, "pot:"),
            BillsTransactionType::Other
        );
    }
}
