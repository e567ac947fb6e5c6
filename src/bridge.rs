//! Hands coefficient sets from the control side to the audio thread.
//!
//! The control side (GUI, automation, host) calls [`ParameterBridge::on_parameter_changed`] from
//! any thread, including the audio thread during automation. That call stores the new value and
//! publishes a recomputed set into a single versioned slot. The audio thread takes one snapshot of
//! the slot per block with [`ParameterBridge::try_load`].
//!
//! The slot is six [`AtomicF32`] cells behind a sequence counter. An odd sequence means a publish
//! is in flight. Neither side ever waits on the other:
//!
//! - A publisher marks the bridge dirty and tries to move the sequence from even to odd. If
//!   somebody else already owns the slot it returns right away, and the owner picks the change up.
//! - The owner keeps recomputing from the latest stored parameters while the dirty flag is set,
//!   releases the slot, and takes it again if a change slipped in after the release.
//! - The reader gives up after [`LOAD_ATTEMPTS`] overlapping reads and the caller keeps the set it
//!   already has.
//!
//! Nothing here allocates.

use atomic_float::AtomicF32;
use std::fmt;
use std::sync::atomic::{fence, AtomicBool, AtomicU32, Ordering};

use crate::coefficients::{self, FilterCoefficients, ParameterSnapshot};

/// How many times the audio thread retries a read that overlapped a publish.
pub const LOAD_ATTEMPTS: usize = 4;

/// Publishes never let the cutoff reach Nyquist.
pub const MAX_CUTOFF_RATIO: f32 = 0.49;

/// The parameters the bridge listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterParam {
    Cutoff,
    Q,
}

/// Whether the published set matches the stored parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Stable,
    /// A publish is in flight.
    Stale,
}

pub struct ParameterBridge {
    cutoff_hz: AtomicF32,
    q: AtomicF32,
    sample_rate: AtomicF32,

    /// Even: slot is consistent. Odd: a publisher owns the slot.
    sequence: AtomicU32,
    /// Set by every publish request, cleared by the slot owner before it recomputes.
    dirty: AtomicBool,
    /// `[a0, a1, a2, b0, b1, b2]`
    slot: [AtomicF32; 6],
}

impl ParameterBridge {
    pub fn new(snapshot: ParameterSnapshot, sample_rate: f32) -> Self {
        let bridge = Self {
            cutoff_hz: AtomicF32::new(snapshot.cutoff_hz),
            q: AtomicF32::new(snapshot.q),
            sample_rate: AtomicF32::new(sample_rate),

            sequence: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            slot: FilterCoefficients::IDENTITY.to_array().map(AtomicF32::new),
        };
        bridge.publish();

        bridge
    }

    /// Control-rate entry point. Stores `value` and republishes, or leaves the republish to a
    /// publish that is already in flight. Never waits.
    pub fn on_parameter_changed(&self, param: FilterParam, value: f32) {
        match param {
            FilterParam::Cutoff => self.cutoff_hz.store(value, Ordering::Relaxed),
            FilterParam::Q => self.q.store(value, Ordering::Relaxed),
        }
        self.publish();
    }

    /// Replaces both parameters at once, e.g. after the host restored a saved state.
    pub fn set_snapshot(&self, snapshot: ParameterSnapshot) {
        self.cutoff_hz.store(snapshot.cutoff_hz, Ordering::Relaxed);
        self.q.store(snapshot.q, Ordering::Relaxed);
        self.publish();
    }

    /// The same cutoff/Q pair maps to different coefficients at a different rate, so this always
    /// republishes even when the parameters didn't move.
    pub fn set_sample_rate(&self, sample_rate: f32) {
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.publish();
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            cutoff_hz: self.cutoff_hz.load(Ordering::Relaxed),
            q: self.q.load(Ordering::Relaxed),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> BridgeState {
        if self.sequence.load(Ordering::Acquire) & 1 == 0 {
            BridgeState::Stable
        } else {
            BridgeState::Stale
        }
    }

    /// Number of times the slot was taken and released, including the publish done by
    /// [`ParameterBridge::new`]. Requests that overlap a publish are folded into it.
    pub fn publish_count(&self) -> u32 {
        self.sequence.load(Ordering::Acquire) / 2
    }

    /// Takes a consistent copy of the published set, or `None` if every attempt overlapped a
    /// publish. Bounded and lock-free, safe to call on the audio thread.
    pub fn try_load(&self) -> Option<FilterCoefficients> {
        for _ in 0..LOAD_ATTEMPTS {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let values = [
                self.slot[0].load(Ordering::Relaxed),
                self.slot[1].load(Ordering::Relaxed),
                self.slot[2].load(Ordering::Relaxed),
                self.slot[3].load(Ordering::Relaxed),
                self.slot[4].load(Ordering::Relaxed),
                self.slot[5].load(Ordering::Relaxed),
            ];

            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return Some(FilterCoefficients::from_array(values));
            }
        }

        None
    }

    /// Stable -> Stale -> Stable: take the slot, compute from the newest stored parameters until no
    /// request is pending, release. Returns immediately when another publisher owns the slot.
    fn publish(&self) {
        // SeqCst on both `dirty` and `sequence`: a request that sees the slot taken must be seen by
        // the owner's check after it releases.
        self.dirty.store(true, Ordering::SeqCst);

        loop {
            let current = self.sequence.load(Ordering::SeqCst);
            if current & 1 == 1 {
                return;
            }
            if self
                .sequence
                .compare_exchange(
                    current,
                    current.wrapping_add(1),
                    Ordering::SeqCst,
                    Ordering::Relaxed,
                )
                .is_err()
            {
                continue;
            }
            fence(Ordering::Release);

            while self.dirty.swap(false, Ordering::SeqCst) {
                self.write_slot();
            }

            self.sequence.store(current.wrapping_add(2), Ordering::SeqCst);
            if !self.dirty.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    fn write_slot(&self) {
        let sample_rate = self.sample_rate.load(Ordering::Relaxed);
        let mut snapshot = self.snapshot();
        snapshot.cutoff_hz = snapshot.cutoff_hz.min(sample_rate * MAX_CUTOFF_RATIO);

        let values = coefficients::compute(snapshot, sample_rate).to_array();
        for (cell, value) in self.slot.iter().zip(values) {
            cell.store(value, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for ParameterBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBridge")
            .field("snapshot", &self.snapshot())
            .field("sample_rate", &self.sample_rate())
            .field("state", &self.state())
            .field("publish_count", &self.publish_count())
            .finish()
    }
}
