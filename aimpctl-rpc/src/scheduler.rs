//! Single-slot timer: `idle | armed{action, deadline} -> idle`. Replacing an
//! armed timer releases the prior one; cancellation swallows silently.

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::player::{PlayerBackend, SchedulerAction, SchedulerCapabilities};

#[derive(Debug, Clone, Copy, PartialEq)]
struct ArmedTimer {
    action: SchedulerAction,
    deadline: SystemTime,
}

/// Either form `set` accepts: an absolute deadline, or a delay relative to
/// the moment `set` is called. Mutually exclusive at the call site.
#[derive(Debug, Clone, Copy)]
pub enum Expiration {
    At(SystemTime),
    Delay(Duration),
}

#[derive(Default)]
pub struct Scheduler {
    armed: Mutex<Option<ArmedTimer>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerStatus {
    pub capabilities: SchedulerCapabilities,
    pub armed: Option<(SchedulerAction, SystemTime)>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler action is not supported by this host")]
    Unsupported,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer for `action`, replacing whatever was previously armed.
    pub fn set(&self, backend: &dyn PlayerBackend, action: SchedulerAction, expiration: Expiration) -> Result<(), SchedulerError> {
        if !backend.scheduler_capabilities().supports(action) {
            return Err(SchedulerError::Unsupported);
        }
        let deadline = match expiration {
            Expiration::At(deadline) => deadline,
            Expiration::Delay(delay) => SystemTime::now() + delay,
        };
        *self.armed.lock().unwrap() = Some(ArmedTimer { action, deadline });
        Ok(())
    }

    pub fn cancel(&self) {
        *self.armed.lock().unwrap() = None;
    }

    pub fn status(&self, backend: &dyn PlayerBackend) -> SchedulerStatus {
        SchedulerStatus {
            capabilities: backend.scheduler_capabilities(),
            armed: self.armed.lock().unwrap().map(|t| (t.action, t.deadline)),
        }
    }

    /// Called by the event loop's timer tick; executes and disarms if the
    /// deadline has passed, otherwise does nothing.
    pub fn tick(&self, backend: &dyn PlayerBackend) {
        let due = {
            let mut armed = self.armed.lock().unwrap();
            match *armed {
                Some(timer) if timer.deadline <= SystemTime::now() => {
                    *armed = None;
                    Some(timer.action)
                }
                _ => None,
            }
        };
        if let Some(action) = due {
            let _ = backend.execute_scheduler_action(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::tests::StubBackend;

    #[test]
    fn setting_an_unsupported_action_is_rejected() {
        let scheduler = Scheduler::new();
        let backend = StubBackend::default();
        let err = scheduler
            .set(&backend, SchedulerAction::MachineHibernate, Expiration::Delay(Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Unsupported));
    }

    #[test]
    fn setting_twice_replaces_the_prior_timer() {
        let scheduler = Scheduler::new();
        let backend = StubBackend::default();
        scheduler
            .set(&backend, SchedulerAction::StopPlayback, Expiration::Delay(Duration::from_secs(60)))
            .unwrap();
        scheduler
            .set(&backend, SchedulerAction::PausePlayback, Expiration::Delay(Duration::from_secs(5)))
            .unwrap();
        let status = scheduler.status(&backend);
        assert_eq!(status.armed.unwrap().0, SchedulerAction::PausePlayback);
    }

    #[test]
    fn cancel_disarms() {
        let scheduler = Scheduler::new();
        let backend = StubBackend::default();
        scheduler
            .set(&backend, SchedulerAction::StopPlayback, Expiration::Delay(Duration::from_secs(60)))
            .unwrap();
        scheduler.cancel();
        assert!(scheduler.status(&backend).armed.is_none());
    }

    #[test]
    fn tick_before_deadline_leaves_timer_armed() {
        let scheduler = Scheduler::new();
        let backend = StubBackend::default();
        scheduler
            .set(&backend, SchedulerAction::StopPlayback, Expiration::Delay(Duration::from_secs(3600)))
            .unwrap();
        scheduler.tick(&backend);
        assert!(scheduler.status(&backend).armed.is_some());
    }

    #[test]
    fn tick_after_deadline_executes_and_disarms() {
        let scheduler = Scheduler::new();
        let backend = StubBackend::default();
        scheduler
            .set(&backend, SchedulerAction::StopPlayback, Expiration::Delay(Duration::from_millis(0)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(5));
        scheduler.tick(&backend);
        assert!(scheduler.status(&backend).armed.is_none());
        assert!(*backend.stopped.lock().unwrap());
    }

    #[test]
    fn setting_an_absolute_deadline_arms_for_that_instant() {
        let scheduler = Scheduler::new();
        let backend = StubBackend::default();
        let deadline = SystemTime::now() + Duration::from_secs(30);
        scheduler.set(&backend, SchedulerAction::StopPlayback, Expiration::At(deadline)).unwrap();
        let status = scheduler.status(&backend);
        assert_eq!(status.armed.unwrap(), (SchedulerAction::StopPlayback, deadline));
    }
}
