//! Device side of BudgetBox: the locally persisted budget, the HTTP sync
//! client and the session that ties them together.

pub mod client;
pub mod error;
pub mod storage;
pub mod store;
pub mod sync;

pub use client::{EndpointStatus, LoginOutcome, PushOutcome, SyncClient};
pub use error::{AppError, Result};
pub use storage::{FileStorage, MemoryStorage, NoopStorage, Storage};
pub use store::BudgetStore;
pub use sync::{InFlight, PullPolicy, ServerStatus, SyncError, SyncSession, UnknownPolicy};
