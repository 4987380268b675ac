//! EWMA-based transmit duty-cycle limiter with temperature backoff.
//!
//! Grounded in the shape of a duty-cycle manager that tracks a running
//! average against a configured limit, but replaced the teacher's
//! wall-clock transmission window with a per-round EWMA evaluated in
//! ticks, as the tick source here has no `Instant` to anchor a real-time
//! window against.

use crate::constants::{DUTY_CYCLE_FLOOR_BELOW_TARGET, MAX_PA_TEMPERATURE};

/// Tracks transmitted-tick fraction per round and whether the configured
/// duty cycle currently permits transmission.
pub struct DutyCycleController {
    /// Configured target duty cycle, 0..=100.
    duty_cycle: u8,
    /// Temperature-driven derate added on top of the floor logic below.
    duty_cycle_offset: u8,
    /// EWMA of `100 * transmitted_ticks / round_ticks`, same scale as
    /// `duty_cycle`.
    average: f32,
}

impl DutyCycleController {
    pub fn new(duty_cycle: u8) -> Self {
        Self {
            duty_cycle: duty_cycle.min(100),
            duty_cycle_offset: 0,
            average: 0.0,
        }
    }

    /// Folds in one round's transmitted-tick count. `round_ticks` is
    /// `2 * (silence_period + tx_window_width)`.
    pub fn note_round(&mut self, transmitted_ticks: u32, round_ticks: u32) {
        let sample = if round_ticks == 0 {
            0.0
        } else {
            100.0 * transmitted_ticks as f32 / round_ticks as f32
        };
        self.average = 0.95 * self.average + 0.05 * sample;
    }

    /// Whether the long-term duty cycle cap currently blocks transmission.
    pub fn is_waiting(&self) -> bool {
        let effective_target = self.effective_target();
        self.average >= effective_target as f32
    }

    fn effective_target(&self) -> u8 {
        let floor = self.duty_cycle.saturating_sub(DUTY_CYCLE_FLOOR_BELOW_TARGET);
        self.duty_cycle
            .saturating_sub(self.duty_cycle_offset)
            .max(floor)
    }

    /// Updates `duty_cycle_offset` from a measured PA temperature (°C above
    /// [`MAX_PA_TEMPERATURE`]): +1 above 0°C over max, +5 above 5°C over,
    /// +10 above 10°C over; decays by 1 per period when cool.
    pub fn temperature_update(&mut self, temperature_c: i16) {
        let over = temperature_c - MAX_PA_TEMPERATURE;
        let wanted = if over > 10 {
            10
        } else if over > 5 {
            5
        } else if over > 0 {
            1
        } else {
            0
        };
        if wanted > self.duty_cycle_offset {
            self.duty_cycle_offset = wanted;
        } else if self.duty_cycle_offset > 0 {
            self.duty_cycle_offset -= 1;
        }
    }

    pub fn average(&self) -> f32 {
        self.average
    }

    pub fn duty_cycle_offset(&self) -> u8 {
        self.duty_cycle_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_cap_does_not_wait() {
        let mut ctrl = DutyCycleController::new(50);
        ctrl.note_round(10, 1000);
        assert!(!ctrl.is_waiting());
    }

    #[test]
    fn converges_towards_cap_with_full_duty_rounds() {
        let mut ctrl = DutyCycleController::new(20);
        for _ in 0..200 {
            ctrl.note_round(1000, 1000);
        }
        assert!(ctrl.average() > 90.0);
        assert!(ctrl.is_waiting());
    }

    #[test]
    fn temperature_backoff_floor_keeps_link_alive() {
        let mut ctrl = DutyCycleController::new(20);
        ctrl.temperature_update(MAX_PA_TEMPERATURE + 50);
        assert_eq!(ctrl.duty_cycle_offset(), 10);
        assert_eq!(ctrl.effective_target(), 10);
    }

    #[test]
    fn temperature_offset_decays_when_cool() {
        let mut ctrl = DutyCycleController::new(20);
        ctrl.temperature_update(MAX_PA_TEMPERATURE + 50);
        assert_eq!(ctrl.duty_cycle_offset(), 10);
        for _ in 0..10 {
            ctrl.temperature_update(0);
        }
        assert_eq!(ctrl.duty_cycle_offset(), 0);
    }
}
