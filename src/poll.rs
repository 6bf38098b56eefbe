//! Bounded polling: check a condition every interval until a deadline

use embedded_hal::delay::DelayNs;

use crate::Error;

/// Poll interval and overall deadline, both in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PollPolicy {
    interval_ms: u32,
    deadline_ms: u32,
}

impl PollPolicy {
    /// Power-up handshake: every 10ms for up to 2s
    pub const POWER_UP: Self = Self::new(10, 2_000);

    /// Create a policy; a zero interval is treated as 1ms
    pub const fn new(interval_ms: u32, deadline_ms: u32) -> Self {
        let interval_ms = if interval_ms == 0 { 1 } else { interval_ms };
        Self {
            interval_ms,
            deadline_ms,
        }
    }

    /// Wait between two checks
    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Total wait after which polling gives up
    pub const fn deadline_ms(&self) -> u32 {
        self.deadline_ms
    }

    pub(crate) const fn budget(self) -> PollBudget {
        PollBudget {
            policy: self,
            elapsed_ms: 0,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::POWER_UP
    }
}

/// Time spent waiting so far.
///
/// Only the delays are counted: the driver has no clock of its own, so bus
/// latency does not eat into the deadline.
#[derive(Debug)]
pub(crate) struct PollBudget {
    policy: PollPolicy,
    elapsed_ms: u32,
}

impl PollBudget {
    /// Length of the next wait, or `None` once the deadline has been spent
    pub(crate) fn next_wait(&mut self) -> Option<u32> {
        let remaining = self.policy.deadline_ms.saturating_sub(self.elapsed_ms);
        if remaining == 0 {
            return None;
        }
        let wait = self.policy.interval_ms.max(1).min(remaining);
        self.elapsed_ms += wait;
        Some(wait)
    }

    /// Sleep for the next interval, or fail with [`Error::Timeout`]
    pub(crate) fn wait<D: DelayNs, E>(&mut self, delay: &mut D) -> Result<(), Error<E>> {
        let wait_ms = self.next_wait().ok_or(Error::Timeout)?;
        delay.delay_ms(wait_ms);
        Ok(())
    }

    /// Sleep for the next interval, or fail with [`Error::Timeout`] (async version)
    #[cfg(feature = "async")]
    pub(crate) async fn wait_async<D, E>(&mut self, delay: &mut D) -> Result<(), Error<E>>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        let wait_ms = self.next_wait().ok_or(Error::Timeout)?;
        delay.delay_ms(wait_ms).await;
        Ok(())
    }
}

/// Call `ready` until it returns `true`, sleeping `policy.interval_ms()`
/// between calls.
///
/// The condition is checked once more when the deadline is reached, then
/// [`Error::Timeout`] is returned. An error from `ready` ends the poll
/// immediately.
pub fn poll_until<D, E, F>(delay: &mut D, policy: PollPolicy, mut ready: F) -> Result<(), Error<E>>
where
    D: DelayNs,
    F: FnMut() -> Result<bool, Error<E>>,
{
    let mut budget = policy.budget();
    while !ready()? {
        budget.wait(delay)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;

    /// Delay that records how long it was asked to sleep
    #[derive(Debug, Default)]
    pub(crate) struct CountingDelay {
        pub total_ns: u64,
        pub calls: u32,
    }

    impl CountingDelay {
        pub(crate) fn total_ms(&self) -> u64 {
            self.total_ns / 1_000_000
        }
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
            self.calls += 1;
        }

        fn delay_us(&mut self, us: u32) {
            self.total_ns += u64::from(us) * 1_000;
            self.calls += 1;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ns += u64::from(ms) * 1_000_000;
            self.calls += 1;
        }
    }

    #[cfg(feature = "async")]
    impl embedded_hal_async::delay::DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            DelayNs::delay_ns(self, ns);
        }

        async fn delay_us(&mut self, us: u32) {
            DelayNs::delay_us(self, us);
        }

        async fn delay_ms(&mut self, ms: u32) {
            DelayNs::delay_ms(self, ms);
        }
    }

    #[test]
    fn budget_spends_whole_deadline() {
        let mut budget = PollPolicy::POWER_UP.budget();
        let mut waits = 0;
        while let Some(wait) = budget.next_wait() {
            assert_eq!(wait, 10);
            waits += 1;
        }
        assert_eq!(waits, 200);
    }

    #[test]
    fn budget_truncates_last_wait() {
        let mut budget = PollPolicy::new(30, 70).budget();
        assert_eq!(budget.next_wait(), Some(30));
        assert_eq!(budget.next_wait(), Some(30));
        assert_eq!(budget.next_wait(), Some(10));
        assert_eq!(budget.next_wait(), None);
    }

    #[test]
    fn zero_interval_still_advances() {
        let policy = PollPolicy::new(0, 3);
        assert_eq!(policy.interval_ms(), 1);
        let mut budget = policy.budget();
        assert_eq!(budget.next_wait(), Some(1));
    }

    #[test]
    fn returns_as_soon_as_ready() {
        let mut delay = CountingDelay::default();
        let mut checks = 0;

        let result: Result<(), Error<ErrorKind>> = poll_until(&mut delay, PollPolicy::POWER_UP, || {
            checks += 1;
            Ok(checks == 3)
        });

        assert!(result.is_ok());
        assert_eq!(checks, 3);
        assert_eq!(delay.total_ms(), 20);
    }

    #[test]
    fn times_out_after_deadline() {
        let mut delay = CountingDelay::default();
        let mut checks = 0;

        let result: Result<(), Error<ErrorKind>> = poll_until(&mut delay, PollPolicy::POWER_UP, || {
            checks += 1;
            Ok(false)
        });

        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(checks, 201);
        assert_eq!(delay.calls, 200);
        assert_eq!(delay.total_ms(), 2_000);
    }

    #[test]
    fn check_error_stops_polling() {
        let mut delay = CountingDelay::default();
        let mut checks = 0;

        let result = poll_until(&mut delay, PollPolicy::POWER_UP, || {
            checks += 1;
            Err(Error::I2c(ErrorKind::Bus))
        });

        assert!(matches!(result, Err(Error::I2c(ErrorKind::Bus))));
        assert_eq!(checks, 1);
        assert_eq!(delay.calls, 0);
    }

    #[test]
    fn zero_interval_literal_still_times_out() {
        let policy = PollPolicy {
            interval_ms: 0,
            deadline_ms: 10,
        };
        let mut delay = CountingDelay::default();
        let mut checks = 0;

        let result: Result<(), Error<ErrorKind>> = poll_until(&mut delay, policy, || {
            checks += 1;
            Ok(checks == 100_000)
        });

        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(checks, 11);
        assert_eq!(delay.total_ms(), 10);
    }

    #[cfg(feature = "async")]
    #[test]
    fn async_wait_spends_budget_then_times_out() {
        let mut delay = CountingDelay::default();
        let mut budget = PollPolicy::new(30, 70).budget();

        pollster::block_on(async {
            for _ in 0..3 {
                let step: Result<(), Error<ErrorKind>> = budget.wait_async(&mut delay).await;
                assert!(step.is_ok());
            }
            let last: Result<(), Error<ErrorKind>> = budget.wait_async(&mut delay).await;
            assert!(matches!(last, Err(Error::Timeout)));
        });

        assert_eq!(delay.calls, 3);
        assert_eq!(delay.total_ms(), 70);
    }
}
