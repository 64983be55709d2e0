//! Explicit single-flight state for each kind of remote call.
//!
//! A [`FlightGate`] is shared by every clone of the client that owns it, so at
//! most one call of a given kind is outstanding at any time. The state moves
//! `Idle -> InFlight -> Settled`, and back to `InFlight` on the next call.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Idle,
    InFlight,
    Settled,
}

impl FlightState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => FlightState::InFlight,
            2 => FlightState::Settled,
            _ => FlightState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            FlightState::Idle => 0,
            FlightState::InFlight => 1,
            FlightState::Settled => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlightGate {
    kind: &'static str,
    state: Arc<AtomicU8>,
}

impl FlightGate {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            state: Arc::new(AtomicU8::new(FlightState::Idle.as_u8())),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn state(&self) -> FlightState {
        FlightState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_in_flight(&self) -> bool {
        self.state() == FlightState::InFlight
    }

    /// Marks the gate in flight. Returns `None` if a call of this kind is
    /// already outstanding.
    pub fn begin(&self) -> Option<FlightGuard> {
        let in_flight = FlightState::InFlight.as_u8();
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == in_flight {
                return None;
            }
            match self.state.compare_exchange_weak(
                current,
                in_flight,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(FlightGuard {
                        state: Arc::clone(&self.state),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Held for the duration of one call; settles the gate when dropped, whatever
/// the outcome.
#[derive(Debug)]
pub struct FlightGuard {
    state: Arc<AtomicU8>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.state
            .store(FlightState::Settled.as_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_lifecycle() {
        let gate = FlightGate::new("detect");
        assert_eq!(gate.state(), FlightState::Idle);

        let guard = gate.begin().expect("idle gate should open");
        assert_eq!(gate.state(), FlightState::InFlight);
        assert!(gate.begin().is_none());

        drop(guard);
        assert_eq!(gate.state(), FlightState::Settled);

        let again = gate.begin();
        assert!(again.is_some());
        assert!(gate.is_in_flight());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = FlightGate::new("recipes");
        let other = gate.clone();
        let _guard = gate.begin().unwrap();
        assert!(other.begin().is_none());
        assert_eq!(other.kind(), "recipes");
    }
}
