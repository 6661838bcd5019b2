use rand::RngCore;

use crate::sandbox::error::Trap;
use crate::trace::{DemuxedOutput, OutputDemuxer};

/// Standard stream identifiers exposed to the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamId {
    Stdin,
    Stdout,
    Stderr,
}

/// The sandbox's entire system-call surface: the module sees nothing else.
///
/// Stdout writes are intercepted line-by-line into the demultiplexer; reads
/// are served byte-for-byte from the accumulated input buffer and abort the
/// run with `Trap::InputExhausted` when the cursor reaches the end.
/// Environment, argument, and filesystem queries are explicit "not
/// supported" stubs. One host instance serves exactly one run and is then
/// discarded.
#[derive(Debug)]
pub struct SyscallHost {
    input: Vec<u8>,
    cursor: usize,
    demux: OutputDemuxer,
    stderr: String,
    exit_code: Option<i32>,
}

impl SyscallHost {
    pub fn new(accumulated_input: &str) -> Self {
        Self {
            input: accumulated_input.as_bytes().to_vec(),
            cursor: 0,
            demux: OutputDemuxer::new(),
            stderr: String::new(),
            exit_code: None,
        }
    }

    /// Write bytes to an output stream; returns the count written.
    pub fn write(&mut self, stream: StreamId, bytes: &[u8]) -> Result<usize, Trap> {
        match stream {
            StreamId::Stdout => self.demux.push_bytes(bytes),
            StreamId::Stderr => self.stderr.push_str(&String::from_utf8_lossy(bytes)),
            StreamId::Stdin => return Err(Trap::NotSupported("writing to stdin")),
        }
        Ok(bytes.len())
    }

    /// Read up to `len` bytes from stdin. Serves from the accumulated input
    /// buffer; a read at the end of the buffer exhausts, it never blocks.
    pub fn read(&mut self, stream: StreamId, len: usize) -> Result<Vec<u8>, Trap> {
        if stream != StreamId::Stdin {
            return Err(Trap::NotSupported("reading from an output stream"));
        }
        if self.cursor >= self.input.len() {
            tracing::debug!("input exhausted at byte {}", self.cursor);
            return Err(Trap::InputExhausted);
        }
        let end = (self.cursor + len.max(1)).min(self.input.len());
        let bytes = self.input[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(bytes)
    }

    /// Wall-clock milliseconds. Differs across restarted runs by design.
    pub fn clock(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Unseeded random bytes. Differs across restarted runs by design.
    pub fn random(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        rand::rng().fill_bytes(&mut buf);
        buf
    }

    /// Terminate the run. The module returns the produced trap from `run`.
    pub fn exit(&mut self, code: i32) -> Trap {
        self.exit_code = Some(code);
        Trap::Exit(code)
    }

    pub fn environ(&self) -> Result<Vec<(String, String)>, Trap> {
        Err(Trap::NotSupported("environment queries"))
    }

    pub fn args(&self) -> Result<Vec<String>, Trap> {
        Err(Trap::NotSupported("argument queries"))
    }

    pub fn open(&mut self, _path: &str) -> Result<u32, Trap> {
        Err(Trap::NotSupported("filesystem access"))
    }

    /// Convenience for modules: write a whole string to stdout.
    pub fn print(&mut self, text: &str) -> Result<usize, Trap> {
        self.write(StreamId::Stdout, text.as_bytes())
    }

    /// Convenience for modules: read stdin byte-for-byte up to a newline.
    pub fn read_line(&mut self) -> Result<String, Trap> {
        let mut line = String::new();
        loop {
            let byte = self.read(StreamId::Stdin, 1)?;
            if byte[0] == b'\n' {
                return Ok(line);
            }
            line.push(byte[0] as char);
        }
    }

    /// How many input bytes have been consumed so far.
    pub fn input_consumed(&self) -> usize {
        self.cursor
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Tear down after the run: the demultiplexed stdout plus raw stderr.
    pub fn finish(self) -> (DemuxedOutput, String, Option<i32>) {
        (self.demux.finish(), self.stderr, self.exit_code)
    }
}
