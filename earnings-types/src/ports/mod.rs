//! Port traits implemented by adapters.

pub mod gateway;
pub mod repository;

pub use gateway::{PaymentGateway, TransferReceipt, TransferStatus};
pub use repository::LedgerRepository;
