use std::time::{Duration, Instant};

/// A re-armable deferred callback driven by the host loop.
///
/// The task never runs anything itself: the owner asks whether it is due,
/// does its work, then re-arms. `cancel` drops the pending deadline so a
/// stopped loop cannot fire again.
#[derive(Debug, Clone)]
pub struct RepeatingTask {
    interval: Duration,
    deadline: Option<Instant>,
}

impl RepeatingTask {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Schedule the next run one interval after `now`
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Consume the deadline if it has passed. The task stays disarmed until re-armed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// How long the host may sleep before the task is due; None when disarmed
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_arm() {
        let start = Instant::now();
        let mut task = RepeatingTask::new(Duration::from_millis(25));
        assert!(!task.take_due(start + Duration::from_secs(1)));

        task.arm(start);
        assert!(!task.take_due(start + Duration::from_millis(10)));
        assert!(task.take_due(start + Duration::from_millis(25)));
        assert!(!task.is_armed());
        assert!(!task.take_due(start + Duration::from_millis(60)));
    }

    #[test]
    fn cancel_prevents_firing() {
        let start = Instant::now();
        let mut task = RepeatingTask::new(Duration::from_millis(25));
        task.arm(start);
        task.cancel();
        assert!(!task.take_due(start + Duration::from_secs(5)));
        assert_eq!(task.time_until_due(start), None);
    }

    #[test]
    fn reports_remaining_time() {
        let start = Instant::now();
        let mut task = RepeatingTask::new(Duration::from_millis(25));
        task.arm(start);
        assert_eq!(
            task.time_until_due(start + Duration::from_millis(5)),
            Some(Duration::from_millis(20))
        );
        assert_eq!(
            task.time_until_due(start + Duration::from_millis(40)),
            Some(Duration::ZERO)
        );
    }
}
