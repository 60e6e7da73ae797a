//! One-shot DMA capture into the receive buffer.
//!
//! The engine is polling-only: interrupts stay masked and completion is
//! discovered by spinning on status registers from the calling thread. A
//! capture walks three waits in order: the start bit clearing (transfer
//! queued), the start/end-of-transfer flags landing together, and finally the
//! done bit for this transfer's own ID. The last wait matters because the
//! pending flags only say that *some* transfer started and ended.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::mmio::RegisterPort;
use crate::regs::dmac;
use crate::GROUP_BYTES;

/// Which wait the engine was in when it gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPoint {
    /// Start bit clearing once the transfer is accepted into the queue
    Queued,
    /// Start-of-transfer and end-of-transfer flags pending together
    TransferFlags,
    /// Done bit for the snapshotted transfer ID
    TransferDone,
}

impl fmt::Display for WaitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaitPoint::Queued => "transfer queue acceptance",
            WaitPoint::TransferFlags => "start/end-of-transfer flags",
            WaitPoint::TransferDone => "completion of this transfer ID",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("timed out waiting for {0} after {1:?}")]
    TransferTimeout(WaitPoint, Duration),
    #[error("capture aborted")]
    Aborted,
}

/// One-shot capture engine over the RX DMA register window.
///
/// The hardware has a single engine instance and the transfer-ID snapshot in
/// [`capture`](Self::capture) is only correct for one in-flight transfer, so
/// concurrent callers must serialize externally.
pub struct DmaEngine<P> {
    port: P,
    timeout: Option<Duration>,
    abort: Option<Arc<AtomicBool>>,
}

impl<P: RegisterPort> DmaEngine<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            timeout: None,
            abort: None,
        }
    }

    /// Bound every wait; without a bound the engine polls forever, exactly
    /// like the reference flow, and an unreachable device hangs the caller.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Check `flag` on every poll pass and bail out once it is raised
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Run one scatter-free transfer of `sample_count` sample groups (8 bytes
    /// each) into physical address `dest`, returning once the captured window
    /// is stable and safe to read.
    ///
    /// `sample_count` must be nonzero and sized to the receive buffer; both
    /// are enforced at the command-line boundary.
    pub fn capture(&mut self, sample_count: u32, dest: u32) -> Result<(), CaptureError> {
        debug_assert!(sample_count > 0, "zero-length capture");

        // Cycle the engine so state from an earlier transfer can't leak in
        self.port.write(dmac::REG_CTRL, 0);
        self.port.write(dmac::REG_CTRL, dmac::CTRL_ENABLE);

        self.port.write(dmac::REG_IRQ_MASK, 0);

        // The ID register reads as the ID this transfer will be assigned.
        // The done bitmap is 32 bits wide, so IDs occupy the low 5 bits.
        let transfer_id = self.port.read(dmac::REG_TRANSFER_ID) & 0x1f;
        let stale = self.port.read(dmac::REG_IRQ_PENDING);
        self.port.write(dmac::REG_IRQ_PENDING, stale);

        self.port.write(dmac::REG_DEST_ADDRESS, dest);
        self.port.write(dmac::REG_DEST_STRIDE, 0);
        // The length registers hold length minus one
        self.port
            .write(dmac::REG_X_LENGTH, sample_count * GROUP_BYTES as u32 - 1);
        self.port.write(dmac::REG_Y_LENGTH, 0);

        self.port.write(dmac::REG_START_TRANSFER, 1);
        debug!(transfer_id, sample_count, dest, "transfer armed");

        // Hardware clears the start bit once the transfer is queued
        self.poll(dmac::REG_START_TRANSFER, WaitPoint::Queued, |v| v == 0)?;

        // Wait for SOT and EOT together. The equality is exact: any other
        // pending combination, related or not, keeps us waiting.
        let flags = self.poll(dmac::REG_IRQ_PENDING, WaitPoint::TransferFlags, |v| {
            v == (dmac::IRQ_SOT | dmac::IRQ_EOT)
        })?;
        self.port.write(dmac::REG_IRQ_PENDING, flags);

        // Pin completion to our own transfer via the done bitmap
        let done_bit = 1u32 << transfer_id;
        self.poll(dmac::REG_TRANSFER_DONE, WaitPoint::TransferDone, |v| {
            v & done_bit == done_bit
        })?;

        debug!(transfer_id, "transfer complete");
        Ok(())
    }

    /// Busy-poll `offset` until `accept` passes, returning the accepted
    /// value. No backoff and no yielding: queue and completion latencies are
    /// expected to be sub-microsecond, and a yield costs orders of magnitude
    /// more than the wait itself.
    fn poll(
        &mut self,
        offset: usize,
        at: WaitPoint,
        accept: impl Fn(u32) -> bool,
    ) -> Result<u32, CaptureError> {
        let deadline = self.timeout.map(|t| (Instant::now() + t, t));
        loop {
            let value = self.port.read(offset);
            if accept(value) {
                return Ok(value);
            }
            if let Some(flag) = &self.abort {
                if flag.load(Ordering::Relaxed) {
                    return Err(CaptureError::Aborted);
                }
            }
            if let Some((deadline, bound)) = deadline {
                if Instant::now() >= deadline {
                    return Err(CaptureError::TransferTimeout(at, bound));
                }
            }
        }
    }
}
