use std::time::Duration;

/// What to do when a transient graph display runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAction {
    ResetZoom,
    Nothing,
}

/// Frame-paced single-slot timer. Arming again supersedes the previous arm,
/// whose token then never fires.
#[derive(Debug, Clone, Default)]
pub struct DisplayTimer {
    generation: u64,
    pending: Option<Pending>,
}

#[derive(Debug, Clone)]
struct Pending {
    token: u64,
    remaining: Duration,
    action: ExpiryAction,
}

impl DisplayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, duration: Duration, action: ExpiryAction) -> u64 {
        self.generation += 1;
        self.pending = Some(Pending {
            token: self.generation,
            remaining: duration,
            action,
        });
        self.generation
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Token of the arm that is still waiting, if any.
    pub fn active(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.token)
    }

    pub fn tick(&mut self, dt: Duration) -> Option<(u64, ExpiryAction)> {
        let pending = self.pending.as_mut()?;
        pending.remaining = pending.remaining.saturating_sub(dt);
        if !pending.remaining.is_zero() {
            return None;
        }
        self.pending.take().map(|p| (p.token, p.action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_duration() {
        let mut timer = DisplayTimer::new();
        let token = timer.arm(Duration::from_secs(2), ExpiryAction::ResetZoom);
        assert_eq!(timer.tick(Duration::from_secs(1)), None);
        assert_eq!(
            timer.tick(Duration::from_secs(1)),
            Some((token, ExpiryAction::ResetZoom))
        );
        assert_eq!(timer.tick(Duration::from_secs(5)), None);
    }

    #[test]
    fn superseded_arm_never_fires() {
        let mut timer = DisplayTimer::new();
        let first = timer.arm(Duration::from_secs(1), ExpiryAction::ResetZoom);
        let second = timer.arm(Duration::from_secs(3), ExpiryAction::Nothing);
        assert_ne!(first, second);

        let mut fired = Vec::new();
        for _ in 0..4 {
            if let Some((token, _)) = timer.tick(Duration::from_secs(1)) {
                fired.push(token);
            }
        }
        assert_eq!(fired, vec![second]);
    }

    #[test]
    fn cancel_clears_the_slot() {
        let mut timer = DisplayTimer::new();
        timer.arm(Duration::from_millis(10), ExpiryAction::ResetZoom);
        timer.cancel();
        assert_eq!(timer.active(), None);
        assert_eq!(timer.tick(Duration::from_secs(1)), None);
    }
}
