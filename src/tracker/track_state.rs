use serde::{Deserialize, Serialize};

/// Track state enumeration for object tracking lifecycle.
///
/// A track whose misses exceed the configured limit is destroyed outright;
/// there is no state for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackState {
    /// Created this cycle from an unmatched detection
    #[default]
    New,
    /// Matched to a detection this cycle
    Tracked,
    /// Unmatched this cycle, surviving on prediction alone
    Coasting,
}
