//! Deterministic read/write interleaving
//!
//! Drives one "primary" read-modify-write so that each of a list of "other"
//! writers runs to completion between the primary's READ and its WRITE. The
//! primary therefore loses every race while other writers remain, and its
//! retry loop is exercised exactly once per other writer.
//!
//! The primary thread and the coordinating (calling) thread hand off through a
//! pair of `mpsc` channels with named phases:
//!
//! ```text
//! primary                          coordinator
//! -------                          -----------
//! READ, enter transform
//!   --- PrimaryPaused ------------>
//!                                   run other writer i to completion
//!   <-- RunTransform --------------
//! compute new value
//!   --- PrimaryComputed ---------->
//!   <-- ProceedToWrite ------------
//! WRITE (conflicts), retry, READ...
//! ```
//!
//! Once every other writer has run, the next pause is answered with `Release`
//! and the primary finishes undisturbed. If the primary finishes early (for
//! example with an error), the remaining writers run directly.

use std::cell::Cell;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use tracing::trace;

/// Messages from the primary to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Primary has read and is waiting inside its transform
    PrimaryPaused,
    /// Primary computed its new value and is waiting to write
    PrimaryComputed,
    /// Primary operation returned
    PrimaryFinished,
}

/// Messages from the coordinator to the primary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// An other writer finished; compute against the stale read
    RunTransform,
    /// Go ahead and write
    ProceedToWrite,
    /// No more interleaving; run freely from now on
    Release,
}

/// Handle given to the primary operation
///
/// Call [`PrimaryGate::around`] from inside the primary's transform.
pub struct PrimaryGate {
    to_coordinator: Sender<Phase>,
    from_coordinator: Receiver<Signal>,
    active: Cell<bool>,
}

impl PrimaryGate {
    /// Run `compute` at the interleaving point
    ///
    /// While interleaving is active this blocks until the next other writer
    /// has finished, runs `compute`, then blocks again until the coordinator
    /// lets the write proceed.
    pub fn around<R>(&self, compute: impl FnOnce() -> R) -> R {
        if !self.active.get() {
            return compute();
        }

        self.send(Phase::PrimaryPaused);
        match self.recv() {
            Some(Signal::RunTransform) => {}
            _ => {
                self.active.set(false);
                return compute();
            }
        }

        let result = compute();

        self.send(Phase::PrimaryComputed);
        if self.recv() != Some(Signal::ProceedToWrite) {
            self.active.set(false);
        }
        result
    }

    fn send(&self, phase: Phase) {
        trace!(target: "slotdb::interleave", ?phase, "Primary phase");
        if self.to_coordinator.send(phase).is_err() {
            self.active.set(false);
        }
    }

    fn recv(&self) -> Option<Signal> {
        self.from_coordinator.recv().ok()
    }
}

/// Results of an interleaved run
#[derive(Debug)]
pub struct Interleaved<P, O> {
    /// Result of the primary operation
    pub primary: P,
    /// Results of the other writers, in order
    pub others: Vec<O>,
    /// Number of other writers that ran between a primary read and write
    pub interleaved: usize,
}

/// Run `primary` on a scoped thread with each of `others` interleaved
///
/// `others` run on the calling thread, one per primary attempt.
pub fn run_interleaved<P, O, FP, FO>(primary: FP, others: Vec<FO>) -> Interleaved<P, O>
where
    FP: FnOnce(&PrimaryGate) -> P + Send,
    P: Send,
    FO: FnOnce() -> O,
{
    let (phase_tx, phase_rx) = channel::<Phase>();
    let (signal_tx, signal_rx) = channel::<Signal>();

    thread::scope(|scope| {
        let primary_thread = scope.spawn(move || {
            let gate = PrimaryGate {
                to_coordinator: phase_tx,
                from_coordinator: signal_rx,
                active: Cell::new(true),
            };
            let result = primary(&gate);
            let _ = gate.to_coordinator.send(Phase::PrimaryFinished);
            result
        });

        let mut results = Vec::with_capacity(others.len());
        let mut interleaved = 0;
        let mut primary_done = false;

        for other in others {
            if !primary_done && wait_for(&phase_rx, Phase::PrimaryPaused) {
                results.push(other());
                interleaved += 1;
                let _ = signal_tx.send(Signal::RunTransform);
                if wait_for(&phase_rx, Phase::PrimaryComputed) {
                    let _ = signal_tx.send(Signal::ProceedToWrite);
                } else {
                    primary_done = true;
                }
            } else {
                primary_done = true;
                results.push(other());
            }
        }

        // Release any further pauses until the primary returns
        if !primary_done {
            while let Ok(phase) = phase_rx.recv() {
                match phase {
                    Phase::PrimaryPaused => {
                        let _ = signal_tx.send(Signal::Release);
                    }
                    Phase::PrimaryComputed => {
                        let _ = signal_tx.send(Signal::ProceedToWrite);
                    }
                    Phase::PrimaryFinished => break,
                }
            }
        }

        let primary = match primary_thread.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        Interleaved {
            primary,
            others: results,
            interleaved,
        }
    })
}

/// Block for `expected`; `false` if the primary finished or went away first
fn wait_for(rx: &Receiver<Phase>, expected: Phase) -> bool {
    matches!(rx.recv(), Ok(phase) if phase == expected)
}
