//! The money/fee calculator.
//!
//! Every money movement in the settlement engine gets its ledger numbers from [`FeeSchedule::compute`]. The function
//! is pure: integer arithmetic in basis points, no I/O, no floating point, and identical inputs always produce
//! identical outputs, so a breakdown can be recomputed at any time for auditing.
//!
//! The fee policy is:
//! * platform fee = round(service_amount × fee_bps) + fixed_fee
//! * tax is charged to the paying party only, on (service_amount + platform fee), rounded independently rather than
//!   derived by subtraction, so rounding error never accumulates across fields.
//! * the payee always receives the full requested service amount.
//!
//! Withdrawals bypass the calculator entirely: see [`FeeBreakdown::withdrawal`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MoneyCents;

/// Maximum rate accepted for either the platform fee or the tax, in basis points (100%).
pub const MAX_RATE_BPS: i64 = 10_000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeeCalculationError {
    #[error("Service amount must be at least 1 cent, got {0}")]
    NonPositiveAmount(MoneyCents),
    #[error("Fixed fee may not be negative, got {0}")]
    NegativeFixedFee(MoneyCents),
    #[error("{field} must be between 0 and {MAX_RATE_BPS} basis points, got {value}")]
    RateOutOfRange { field: &'static str, value: i64 },
}

/// The platform's pricing parameters. Rates are in basis points (1 bps = 0.01%, so 10% = 1000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub fixed_fee: MoneyCents,
    pub fee_bps: i64,
    pub tax_bps: i64,
}

impl FeeSchedule {
    pub fn new(fixed_fee: MoneyCents, fee_bps: i64, tax_bps: i64) -> Self {
        Self { fixed_fee, fee_bps, tax_bps }
    }

    /// Computes the full ledger breakdown for a contract payment of `service_amount`.
    pub fn compute(&self, service_amount: MoneyCents) -> Result<FeeBreakdown, FeeCalculationError> {
        if !service_amount.is_positive() {
            return Err(FeeCalculationError::NonPositiveAmount(service_amount));
        }
        if self.fixed_fee.value() < 0 {
            return Err(FeeCalculationError::NegativeFixedFee(self.fixed_fee));
        }
        if !(0..=MAX_RATE_BPS).contains(&self.fee_bps) {
            return Err(FeeCalculationError::RateOutOfRange { field: "fee_bps", value: self.fee_bps });
        }
        if !(0..=MAX_RATE_BPS).contains(&self.tax_bps) {
            return Err(FeeCalculationError::RateOutOfRange { field: "tax_bps", value: self.tax_bps });
        }
        let application_fee_amount = service_amount.scale_bps(self.fee_bps) + self.fixed_fee;
        // Tax is levied on the payer, on the service amount plus the platform fee. The payee never absorbs it.
        let provider_tax_amount = (service_amount + application_fee_amount).scale_bps(self.tax_bps);
        let total_provider_payment = service_amount + application_fee_amount + provider_tax_amount;
        Ok(FeeBreakdown {
            application_fee_amount,
            provider_tax_amount,
            tasker_tax_amount: MoneyCents::default(),
            total_provider_payment,
            amount_received_by_payee: service_amount,
        })
    }
}

/// The computed ledger fields for a single money movement.
///
/// Invariant: `amount_received_by_payee + application_fee_amount + provider_tax_amount == total_provider_payment`,
/// exactly, in integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub application_fee_amount: MoneyCents,
    pub provider_tax_amount: MoneyCents,
    /// Payee-side tax. The current policy taxes the payer only, so this is always zero; the field exists so the
    /// ledger schema can carry payee-side tax without reshaping every record.
    pub tasker_tax_amount: MoneyCents,
    pub total_provider_payment: MoneyCents,
    pub amount_received_by_payee: MoneyCents,
}

impl FeeBreakdown {
    /// The breakdown for a withdrawal: no fee, no tax, the payee receives exactly what was requested.
    pub fn withdrawal(amount: MoneyCents) -> Self {
        Self {
            application_fee_amount: MoneyCents::default(),
            provider_tax_amount: MoneyCents::default(),
            tasker_tax_amount: MoneyCents::default(),
            total_provider_payment: amount,
            amount_received_by_payee: amount,
        }
    }

    /// Checks the ledger identity. A breakdown loaded from storage that fails this check has been tampered with or
    /// corrupted.
    pub fn balances(&self) -> bool {
        self.amount_received_by_payee + self.application_fee_amount + self.provider_tax_amount
            == self.total_provider_payment
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn standard_schedule() -> FeeSchedule {
        // $5.00 fixed + 10% fee, 13% tax
        FeeSchedule::new(MoneyCents::from(500), 1000, 1300)
    }

    #[test]
    fn hundred_dollar_contract() {
        let breakdown = standard_schedule().compute(MoneyCents::from(10_000)).unwrap();
        assert_eq!(breakdown.application_fee_amount, MoneyCents::from(1500));
        assert_eq!(breakdown.provider_tax_amount, MoneyCents::from(1495));
        assert_eq!(breakdown.total_provider_payment, MoneyCents::from(12_995));
        assert_eq!(breakdown.amount_received_by_payee, MoneyCents::from(10_000));
        assert_eq!(breakdown.tasker_tax_amount, MoneyCents::from(0));
        assert!(breakdown.balances());
    }

    #[test]
    fn payee_always_receives_service_amount() {
        let schedule = standard_schedule();
        for amount in [1i64, 99, 100, 101, 9_999, 123_457, 10_000_000] {
            let breakdown = schedule.compute(MoneyCents::from(amount)).unwrap();
            assert_eq!(breakdown.amount_received_by_payee, MoneyCents::from(amount));
            assert!(breakdown.balances(), "ledger must balance for amount {amount}");
        }
    }

    #[test]
    fn tax_is_rounded_independently() {
        // 33 cents: fee = round(3.3) + 500 = 503, tax = round(536 * 0.13) = round(69.68) = 70
        let breakdown = standard_schedule().compute(MoneyCents::from(33)).unwrap();
        assert_eq!(breakdown.application_fee_amount, MoneyCents::from(503));
        assert_eq!(breakdown.provider_tax_amount, MoneyCents::from(70));
        assert_eq!(breakdown.total_provider_payment, MoneyCents::from(606));
    }

    #[test]
    fn deterministic() {
        let schedule = standard_schedule();
        let a = schedule.compute(MoneyCents::from(77_777)).unwrap();
        let b = schedule.compute(MoneyCents::from(77_777)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn withdrawals_bypass_fees() {
        let breakdown = FeeBreakdown::withdrawal(MoneyCents::from(25_000));
        assert_eq!(breakdown.application_fee_amount, MoneyCents::from(0));
        assert_eq!(breakdown.provider_tax_amount, MoneyCents::from(0));
        assert_eq!(breakdown.amount_received_by_payee, MoneyCents::from(25_000));
        assert!(breakdown.balances());
    }

    #[test]
    fn rejects_invalid_inputs() {
        let schedule = standard_schedule();
        assert!(matches!(
            schedule.compute(MoneyCents::from(0)),
            Err(FeeCalculationError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            schedule.compute(MoneyCents::from(-5)),
            Err(FeeCalculationError::NonPositiveAmount(_))
        ));
        let bad_rate = FeeSchedule::new(MoneyCents::from(0), 10_001, 0);
        assert!(matches!(
            bad_rate.compute(MoneyCents::from(100)),
            Err(FeeCalculationError::RateOutOfRange { field: "fee_bps", .. })
        ));
        let negative_fixed = FeeSchedule::new(MoneyCents::from(-1), 0, 0);
        assert!(matches!(
            negative_fixed.compute(MoneyCents::from(100)),
            Err(FeeCalculationError::NegativeFixedFee(_))
        ));
    }
}
