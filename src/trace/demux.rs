use crate::trace::events::{split_sentinel, TraceEvent};

/// Everything one run produced, separated: real program output, the ordered
/// trace-event log, and warnings for trace lines that failed to decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemuxedOutput {
    pub output: String,
    pub events: Vec<TraceEvent>,
    pub warnings: Vec<String>,
}

/// Splits the sandboxed program's stdout into plain output and trace events.
///
/// Bytes arrive in arbitrary chunks; they are buffered until a full line is
/// available. A line containing the sentinel yields its prefix (if non-empty)
/// as output and its suffix as one decoded event. Decode failures drop the
/// event with a warning but keep the prefix; the run continues.
#[derive(Debug, Default)]
pub struct OutputDemuxer {
    pending: Vec<u8>,
    output: String,
    events: Vec<TraceEvent>,
    warnings: Vec<String>,
}

impl OutputDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw stdout bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.push_line(&line);
        }
    }

    /// Feed one complete line (without its terminator).
    pub fn push_line(&mut self, line: &str) {
        match split_sentinel(line) {
            Some((prefix, payload)) => {
                if !prefix.is_empty() {
                    self.output.push_str(prefix);
                    self.output.push('\n');
                }
                match serde_json::from_str::<TraceEvent>(payload) {
                    Ok(TraceEvent::Unknown) => {
                        tracing::warn!("dropping trace event with unknown kind: {payload}");
                        self.warnings
                            .push(format!("unknown trace event kind: {payload}"));
                    }
                    Ok(event) => {
                        tracing::trace!("trace event: {}", event.kind_name());
                        self.events.push(event);
                    }
                    Err(e) => {
                        tracing::warn!("failed to decode trace line: {e}. Payload: {payload}");
                        self.warnings.push(format!("malformed trace line: {e}"));
                    }
                }
            }
            None => {
                self.output.push_str(line);
                self.output.push('\n');
            }
        }
    }

    /// Number of events decoded so far.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Flush any unterminated trailing line and return the separated streams.
    pub fn finish(mut self) -> DemuxedOutput {
        if !self.pending.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            // A trailing line without a terminator is still demultiplexed;
            // partial sentinel payloads decode or warn like any other.
            let line = tail;
            match split_sentinel(&line) {
                Some(_) => self.push_line(&line),
                None => self.output.push_str(&line),
            }
        }
        DemuxedOutput {
            output: self.output,
            events: self.events,
            warnings: self.warnings,
        }
    }
}
