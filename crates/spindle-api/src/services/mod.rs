//! Background services.

pub mod stale_claim_reaper;

pub use stale_claim_reaper::StaleClaimReaper;
