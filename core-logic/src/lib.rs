//! # Core Logic - Randomized Token Dispatch
//!
//! Chain-agnostic pieces of the dispatcher: the data model, the endpoint
//! pool, retry escalation, the randomized dispatch loop and the daily
//! session scheduler. Chain crates plug in a [`TransferClient`] and an
//! [`EndpointProbe`].
//!
//! ## Modules
//!
//! - [`config`] - Validated, immutable dispatch configuration
//! - [`dispatch`] - The randomized dispatch loop
//! - [`error`] - Typed error handling with thiserror
//! - [`scheduler`] - Daily session scheduler
//! - [`traits`] - Seams for transfer clients, probes and stores
//! - [`types`] - Token targets, amounts and receipts

pub mod config;
pub mod dispatch;
pub mod error;
pub mod scheduler;
pub mod traits;
pub mod types;
pub(crate) mod utils;

pub use config::{
    AmountRange, CredentialScope, DelayRange, DispatchConfig, ScheduleConfig, SessionPlan,
};
pub use dispatch::Dispatcher;
pub use error::{
    ConfigError, ContractQueryError, DispatchError, FailureReason, NetworkError,
    TransferError, WalletError,
};
pub use scheduler::{SchedulerState, SessionScheduler};
pub use traits::{
    CredentialStore, DispatchStats, EndpointProbe, RecipientStore, TransferClient,
};
pub use types::{Asset, Receipt, TokenAmount, TokenTarget, NATIVE_DECIMALS};

pub use utils::address_book::{parse_address, parse_address_list, FileRecipientStore};
pub use utils::clock::{next_occurrence, pause, until, Clock, TokioClock};
pub use utils::endpoint_pool::{EndpointPool, EndpointSlot, RpcEndpoint, RpcHealthStatus};
pub use utils::logger::{SESSION_TARGET, TRANSFER_TARGET};
pub use utils::retry::{escalate, Escalation, EscalationPolicy, RetryStep};
pub use utils::wallet_manager::{
    parse_account_pairs, Account, Credential, FileCredentialStore, ParsedAccounts,
};
pub use utils::{setup_logger, WorkerRunner};
