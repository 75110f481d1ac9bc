//! Long-poll waiters
//!
//! Each outstanding long-poll is a `Waiter` holding a oneshot completion
//! handle and a `ResolutionClaim`. The claim is the small state machine that
//! keeps the publish path and the deadline path from both answering the
//! same request:
//!
//! ```text
//!                 ┌──► ResolvedByUpdate   (resolve_all)
//!   Pending ──────┼──► ResolvedByTimeout  (deadline)
//!                 └──► Abandoned          (caller dropped the future)
//! ```

pub mod entry;
pub mod manager;

pub use entry::{ResolutionClaim, WaiterState};
pub use manager::{
    LongPollResponse, Resolution, ResolveReport, UnsatisfiedWaiterPolicy, WaiterManager,
};
