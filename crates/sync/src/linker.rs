//! Upserts provider accounts into the local store.

use finsync_core::ledger::AccountKind;
use finsync_core::sync::{ExternalAccount, LinkedItem};
use finsync_db::{AccountRepository, LedgerService, LedgerStore};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::SyncError;

/// What a linking pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Accounts created.
    pub created: usize,
    /// Existing accounts whose name changed.
    pub renamed: usize,
    /// Existing accounts left as they were.
    pub unchanged: usize,
}

/// Account linking.
///
/// New provider accounts are opened with the provider's current balance.
/// Existing accounts keep their ledger balance; only the name is refreshed.
pub struct AccountLinker;

impl AccountLinker {
    /// Links every provider account of an item.
    ///
    /// # Errors
    ///
    /// Returns a store error if a lookup or commit fails.
    pub async fn link<S: LedgerStore>(
        ledger: &LedgerService<S>,
        item: &LinkedItem,
        accounts: &[ExternalAccount],
    ) -> Result<LinkReport, SyncError> {
        let mut report = LinkReport::default();

        for external in accounts {
            let existing = ledger
                .store()
                .accounts()
                .find_by_external_account_id(&external.external_id)
                .await?;

            match existing {
                Some(account) if account.name == external.name => report.unchanged += 1,
                Some(account) => {
                    ledger.rename_account(account.id, &external.name).await?;
                    report.renamed += 1;
                }
                None => {
                    let account = ledger
                        .open_linked_account(
                            item.owner_id,
                            &external.name,
                            Self::kind_for(external),
                            Self::opening_balance(external),
                            &external.external_id,
                        )
                        .await?;
                    info!(
                        item_id = %item.id,
                        account_id = %account.id,
                        "Linked provider account"
                    );
                    report.created += 1;
                }
            }
        }

        Ok(report)
    }

    /// Maps provider type and subtype to an account kind.
    ///
    /// The subtype only refines generic types such as `depository`.
    #[must_use]
    pub fn kind_for(external: &ExternalAccount) -> AccountKind {
        match AccountKind::from_provider_type(&external.account_type) {
            AccountKind::Checking => external
                .subtype
                .as_deref()
                .map_or(AccountKind::Checking, AccountKind::from_provider_type),
            kind => kind,
        }
    }

    fn opening_balance(external: &ExternalAccount) -> Decimal {
        if external.current_balance.is_sign_negative() {
            warn!(
                external_account_id = %external.external_id,
                balance = %external.current_balance,
                "Negative provider balance, opening at zero"
            );
            return Decimal::ZERO;
        }
        external.current_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use finsync_core::ledger::{CreateTransactionRequest, TransactionType};
    use finsync_core::sync::AccessToken;
    use finsync_db::InMemoryStore;
    use finsync_shared::types::UserId;
    use rust_decimal_macros::dec;

    fn external(
        id: &str,
        name: &str,
        account_type: &str,
        subtype: Option<&str>,
    ) -> ExternalAccount {
        ExternalAccount {
            external_id: id.to_string(),
            name: name.to_string(),
            account_type: account_type.to_string(),
            subtype: subtype.map(str::to_string),
            current_balance: dec!(250),
        }
    }

    #[test]
    fn test_kind_mapping() {
        let kind = |t, s| AccountLinker::kind_for(&external("a", "A", t, s));
        assert_eq!(kind("depository", Some("savings")), AccountKind::Savings);
        assert_eq!(kind("depository", Some("checking")), AccountKind::Checking);
        assert_eq!(kind("depository", None), AccountKind::Checking);
        assert_eq!(kind("credit", Some("credit card")), AccountKind::Credit);
        assert_eq!(kind("loan", Some("student")), AccountKind::Loan);
        assert_eq!(kind("investment", None), AccountKind::Investment);
        assert_eq!(kind("other", None), AccountKind::Checking);
    }

    #[tokio::test]
    async fn test_link_creates_then_refreshes_name_only() {
        let ledger = LedgerService::new(Arc::new(InMemoryStore::new()));
        let item = LinkedItem::new("item-1", UserId::new(), AccessToken::new("token"));

        let report = AccountLinker::link(
            &ledger,
            &item,
            &[external("acc-1", "Everyday", "depository", Some("checking"))],
        )
        .await
        .unwrap();
        assert_eq!(report.created, 1);

        let account = ledger
            .store()
            .accounts()
            .find_by_external_account_id("acc-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.balance, dec!(250));
        assert_eq!(account.owner_id, item.owner_id);

        let request = CreateTransactionRequest {
            account_id: Some(account.id),
            amount: Some(dec!(160)),
            transaction_type: Some(TransactionType::Expense),
            occurred_at: Some(chrono::Utc::now()),
            ..Default::default()
        };
        ledger.create_transaction(&request).await.unwrap();

        let mut renamed = external("acc-1", "Everyday Plus", "depository", Some("checking"));
        renamed.current_balance = dec!(999);
        let report = AccountLinker::link(&ledger, &item, &[renamed.clone()])
            .await
            .unwrap();
        assert_eq!(report.renamed, 1);

        let account = ledger.account(account.id).await.unwrap();
        assert_eq!(account.name, "Everyday Plus");
        assert_eq!(account.balance, dec!(90));

        let report = AccountLinker::link(&ledger, &item, &[renamed])
            .await
            .unwrap();
        assert_eq!(report.unchanged, 1);
    }

    #[tokio::test]
    async fn test_negative_provider_balance_opens_at_zero() {
        let ledger = LedgerService::new(Arc::new(InMemoryStore::new()));
        let item = LinkedItem::new("item-1", UserId::new(), AccessToken::new("token"));
        let mut card = external("card-1", "Card", "credit", None);
        card.current_balance = dec!(-42);

        AccountLinker::link(&ledger, &item, &[card]).await.unwrap();
        let account = ledger
            .store()
            .accounts()
            .find_by_external_account_id("card-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.balance, Decimal::ZERO);
        assert_eq!(account.kind, AccountKind::Credit);
    }
}
