use gigpay_common::FeeBreakdown;
use gigpay_engine::{
    db_types::{Contract, ContractStatus, NewContract, NewPayment, Payment, PaymentStatus},
    traits::{
        DashboardSummary,
        SettledPayment,
        SettlementDatabase,
        SettlementDatabaseError,
        SettlementQuery,
        SettlementQueryError,
    },
};
use mockall::mock;

mock! {
    pub SettlementDb {}

    impl Clone for SettlementDb {
        fn clone(&self) -> Self;
    }

    impl SettlementQuery for SettlementDb {
        async fn fetch_contract(&self, contract_id: i64) -> Result<Option<Contract>, SettlementQueryError>;
        async fn fetch_active_contract_for_gig(&self, gig_id: &str) -> Result<Option<Contract>, SettlementQueryError>;
        async fn fetch_contracts_for_user(&self, user_id: &str) -> Result<Vec<Contract>, SettlementQueryError>;
        async fn fetch_payment(&self, payment_id: i64) -> Result<Option<Payment>, SettlementQueryError>;
        async fn fetch_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, SettlementQueryError>;
        async fn fetch_payments_for_contract(&self, contract_id: i64) -> Result<Vec<Payment>, SettlementQueryError>;
        async fn dashboard_summary(&self, user_id: &str) -> Result<DashboardSummary, SettlementQueryError>;
    }

    impl SettlementDatabase for SettlementDb {
        fn url(&self) -> &str;
        async fn create_accepted_contract(
            &self,
            offer: NewContract,
            ledger: FeeBreakdown,
        ) -> Result<(Contract, bool), SettlementDatabaseError>;
        async fn transition_contract(
            &self,
            contract_id: i64,
            expected: &[ContractStatus],
            new_status: ContractStatus,
            reason: Option<String>,
        ) -> Result<Contract, SettlementDatabaseError>;
        async fn record_actual_hours(&self, contract_id: i64, hours: i64) -> Result<Contract, SettlementDatabaseError>;
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementDatabaseError>;
        async fn attach_payment_intent(&self, payment_id: i64, intent_id: &str)
            -> Result<Payment, SettlementDatabaseError>;
        async fn attach_refund(&self, payment_id: i64, refund_id: &str) -> Result<Payment, SettlementDatabaseError>;
        async fn claim_payout(&self, payment_id: i64, payout_id: &str) -> Result<Payment, SettlementDatabaseError>;
        async fn mark_payment_failed(&self, payment_id: i64) -> Result<Payment, SettlementDatabaseError>;
        async fn settle_payment(
            &self,
            payment_id: i64,
            new_status: PaymentStatus,
        ) -> Result<SettledPayment, SettlementDatabaseError>;
        async fn record_anomaly(
            &self,
            external_id: &str,
            gateway: &str,
            detail: &str,
        ) -> Result<(), SettlementDatabaseError>;
    }
}
