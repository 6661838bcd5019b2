pub mod demux;
pub mod events;

pub use demux::{DemuxedOutput, OutputDemuxer};
pub use events::{normalize_addr, split_sentinel, TraceAction, TraceEvent, SENTINEL};
