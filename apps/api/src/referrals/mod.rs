// Referral quality: scoring, lifecycle, analytics and their HTTP surface.
// All database access goes through `store::ReferralStore`.

pub mod analytics;
pub mod codes;
pub mod handlers;
pub mod lifecycle;
#[cfg(test)]
pub mod memory_store;
pub mod pg_store;
pub mod quality;
pub mod store;
