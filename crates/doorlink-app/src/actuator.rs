//! Timed relay activation
//!
//! Energize, hold, de-energize. The hold suspends the caller, so the control
//! loop performs no sampling or channel handling while the door is unlocked.

use std::time::Duration;

use doorlink_core::prelude::*;

use crate::hal::{RelayOutput, RelayState};

pub struct Actuator {
    relay: Box<dyn RelayOutput>,
    state: RelayState,
}

impl Actuator {
    pub fn new(relay: Box<dyn RelayOutput>) -> Self {
        Self {
            relay,
            state: RelayState::DeEnergized,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Drive the relay de-energized regardless of the tracked state.
    pub fn force_safe(&mut self) -> Result<()> {
        self.relay.set_energized(false)?;
        self.state = RelayState::DeEnergized;
        Ok(())
    }

    /// Energize the relay for `hold`, then de-energize it.
    ///
    /// A zero hold still pulses the relay. If the driver fails while the
    /// relay may be energized, a de-energize is attempted before the error
    /// is returned.
    pub async fn activate(&mut self, hold: Duration) -> Result<()> {
        info!("[relay] unlocking for {}ms", hold.as_millis());

        if let Err(e) = self.relay.set_energized(true) {
            error!("[relay] failed to energize: {}", e);
            self.restore_safe();
            return Err(e);
        }
        self.state = RelayState::Energized;

        tokio::time::sleep(hold).await;

        if let Err(e) = self.relay.set_energized(false) {
            error!("[relay] failed to de-energize: {}", e);
            self.restore_safe();
            return Err(e);
        }
        self.state = RelayState::DeEnergized;

        info!("[relay] locked");
        Ok(())
    }

    fn restore_safe(&mut self) {
        match self.relay.set_energized(false) {
            Ok(()) => self.state = RelayState::DeEnergized,
            Err(e) => error!("[relay] could not restore safe state: {}", e),
        }
    }
}

impl std::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeRelay;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_activate_holds_for_duration() {
        let relay = FakeRelay::new();
        let mut actuator = Actuator::new(Box::new(relay.clone()));

        let start = Instant::now();
        actuator.activate(Duration::from_secs(5)).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(relay.writes(), vec![true, false]);
        assert_eq!(actuator.state(), RelayState::DeEnergized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_energized_during_hold() {
        let relay = FakeRelay::new();
        let observer = relay.clone();
        let mut actuator = Actuator::new(Box::new(relay));

        let handle = tokio::spawn(async move {
            actuator.activate(Duration::from_secs(12)).await.unwrap();
            actuator
        });

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(observer.is_energized());

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(!observer.is_energized());
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_still_pulses() {
        let relay = FakeRelay::new();
        let mut actuator = Actuator::new(Box::new(relay.clone()));

        actuator.activate(Duration::ZERO).await.unwrap();
        assert_eq!(relay.writes(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_energize_failure_restores_safe_state() {
        let relay = FakeRelay::new();
        relay.fail_next_energize();
        let mut actuator = Actuator::new(Box::new(relay.clone()));

        let err = actuator.activate(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, Error::Hardware { .. }));
        assert!(!relay.is_energized());
        assert_eq!(actuator.state(), RelayState::DeEnergized);
    }

    #[test]
    fn test_force_safe_writes_even_when_tracked_safe() {
        let relay = FakeRelay::new();
        let mut actuator = Actuator::new(Box::new(relay.clone()));

        actuator.force_safe().unwrap();
        assert_eq!(relay.writes(), vec![false]);
    }
}
