//! Domain models for the earnings ledger.

pub mod analytics;
pub mod charge;
pub mod money;
pub mod payout;
pub mod provider;

pub use analytics::{AnalyticsBucket, AnalyticsReport, FunnelMetrics, Granularity, MethodBreakdown};
pub use charge::{ChargeId, ChargeRecord, ChargeStatus, CustomerId, LedgerAdjustment, PaymentMethod};
pub use money::Money;
pub use payout::{PayoutRequest, PayoutStatus};
pub use provider::{ProviderAccount, ProviderBalance, ProviderId, Reservation, ReservationToken};
