//! Mock collaborators for pipeline and orchestrator tests.
//!
//! The mocks record every call, can inject errors, and can delay their
//! answers to open up interleaving windows; both track how many calls
//! were in flight at once, which the gate-saturation tests assert on.

mod mock_subtitle_fetcher;
mod mock_transport;

pub use mock_subtitle_fetcher::{MockSubtitleFetcher, RecordedFetch};
pub use mock_transport::{MockTransport, RecordedRequest};
