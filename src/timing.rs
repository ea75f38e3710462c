use spin_sleep::LoopHelper;
use tracing::debug;

use crate::config::Config;

/// Splits the instruction rate into per-tick budgets. One tick is one timer
/// decrement and one display refresh; the instructions run inside it, as fast
/// as they go, and the remainder of the tick is slept off.
///
/// Budgets are whole instructions. The fractional part carries over so that,
/// e.g., 700Hz over 60Hz ticks alternates 11s and 12s and averages out.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    cpu_hz: u32,
    timer_hz: u32,
    // in units of 1/timer_hz instructions
    carry: u32,
}

impl Scheduler {
    pub fn new(cpu_hz: u32, timer_hz: u32) -> Self {
        let timer_hz = timer_hz.max(1);
        debug!(cpu_hz, timer_hz, "scheduler configured");
        Scheduler {
            cpu_hz,
            timer_hz,
            carry: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cpu_hz, config.timer_hz)
    }

    pub fn timer_hz(&self) -> u32 {
        self.timer_hz
    }

    /// instructions to run in the next tick
    pub fn cycles_for_tick(&mut self) -> u64 {
        let total = self.cpu_hz as u64 + self.carry as u64;
        self.carry = (total % self.timer_hz as u64) as u32;
        total / self.timer_hz as u64
    }

    /// a loop helper pacing ticks at the timer rate
    pub fn pacer(&self) -> LoopHelper {
        LoopHelper::builder()
            .report_interval_s(1.0)
            .build_with_target_rate(self.timer_hz as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let mut s = Scheduler::new(600, 60);
        for _ in 0..5 {
            assert_eq!(s.cycles_for_tick(), 10);
        }
    }

    #[test]
    fn test_remainder_carries() {
        let mut s = Scheduler::new(700, 60);
        let budgets: Vec<u64> = (0..60).map(|_| s.cycles_for_tick()).collect();
        assert_eq!(budgets.iter().sum::<u64>(), 700);
        assert!(budgets.iter().all(|&b| b == 11 || b == 12));
    }

    #[test]
    fn test_reference_one_per_tick() {
        let mut s = Scheduler::new(60, 60);
        assert_eq!(s.cycles_for_tick(), 1);
        assert_eq!(s.cycles_for_tick(), 1);
    }

    #[test]
    fn test_slower_than_timer() {
        let mut s = Scheduler::new(30, 60);
        let budgets: Vec<u64> = (0..4).map(|_| s.cycles_for_tick()).collect();
        assert_eq!(budgets, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_zero_timer_rate_is_clamped() {
        let s = Scheduler::new(700, 0);
        assert_eq!(s.timer_hz(), 1);
    }
}
