//! Per-trace execution budget
//!
//! Bounds the total work a tracer program may perform across all events of
//! one transaction. The budget is charged once per dispatched event; the
//! clock starts at the first charge.

use crate::errors::HostFault;
use std::time::{Duration, Instant};

/// Default wall-clock budget of a trace
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ExecutionBudget {
    max_steps: Option<u64>,
    timeout: Option<Duration>,
    steps: u64,
    started: Option<Instant>,
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self::new(None, Some(DEFAULT_TIMEOUT))
    }
}

impl ExecutionBudget {
    pub fn new(max_steps: Option<u64>, timeout: Option<Duration>) -> Self {
        Self { max_steps, timeout, steps: 0, started: None }
    }

    /// A budget that never runs out
    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    pub fn max_steps(&self) -> Option<u64> {
        self.max_steps
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Events charged so far
    pub fn consumed(&self) -> u64 {
        self.steps
    }

    /// Charges one event
    pub fn charge(&mut self) -> Result<(), HostFault> {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.steps += 1;
        if let Some(limit) = self.max_steps {
            if self.steps > limit {
                return Err(HostFault::StepLimit { limit });
            }
        }
        if let Some(limit) = self.timeout {
            if started.elapsed() > limit {
                return Err(HostFault::Timeout { limit });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_limit() {
        let mut budget = ExecutionBudget::new(Some(3), None);
        assert!(budget.charge().is_ok());
        assert!(budget.charge().is_ok());
        assert!(budget.charge().is_ok());
        assert_eq!(budget.charge(), Err(HostFault::StepLimit { limit: 3 }));
        assert_eq!(budget.consumed(), 4);
    }

    #[test]
    fn test_timeout() {
        let mut budget = ExecutionBudget::new(None, Some(Duration::from_millis(1)));
        assert!(budget.charge().is_ok());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(
            budget.charge(),
            Err(HostFault::Timeout { limit: Duration::from_millis(1) })
        );
    }

    #[test]
    fn test_unlimited() {
        let mut budget = ExecutionBudget::unlimited();
        for _ in 0..10_000 {
            assert!(budget.charge().is_ok());
        }
    }
}
