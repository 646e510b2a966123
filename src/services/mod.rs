/// Raid candidate source backed by the report-channel listings
pub mod candidates;
/// Health check HTTP endpoints
pub mod health;
/// Travel time estimation between raid sites
pub mod travel;

pub use candidates::RaidCandidateSource;
pub use travel::TravelTimeService;
