pub mod bank_loader;
pub mod persistence;

pub use bank_loader::BankLoader;
pub use persistence::{PersistencePort, SessionHistoryEntry, UserRecord};

#[cfg(any(test, feature = "testing"))]
pub use bank_loader::MockBankLoader;
#[cfg(any(test, feature = "testing"))]
pub use persistence::MockPersistencePort;
