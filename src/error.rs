use thiserror::Error;

/// Failure of a whole resolution.
///
/// Only an unreachable geodata provider ends up here; malformed elements and
/// geocoder failures degrade to absent values inside a successful result.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("building data provider unavailable")]
    GeodataUnavailable(#[source] anyhow::Error),
    #[error("geodata worker panicked")]
    WorkerPanicked,
}
