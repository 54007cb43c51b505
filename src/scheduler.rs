use parking_lot::Mutex;
use std::time::Duration;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

/// Fixed-cadence timer driving the streaming loop.
///
/// Holds at most one timer task. Stopping aborts the timer only; work the
/// tick callback already spawned keeps running.
pub struct Scheduler {
    period: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            timer: Mutex::new(None),
        }
    }

    /// Returns `false` without doing anything when a timer is already running.
    pub fn start<F>(&self, on_tick: F) -> bool
    where
        F: Fn() + Send + 'static,
    {
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let period = self.period;
        *timer = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                on_tick();
            }
        }));
        tracing::info!("Streaming started with a {:?} interval", period);

        true
    }

    /// Returns `false` when no timer was running.
    pub fn stop(&self) -> bool {
        match self.timer.lock().take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("Streaming stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Clone + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let ticks = count.clone();
        (count, move || {
            ticks.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let scheduler = Scheduler::new(Duration::from_millis(100));
        let (count, on_tick) = counter();

        assert!(scheduler.start(on_tick));
        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_keeps_one_timer() {
        let scheduler = Scheduler::new(Duration::from_millis(100));
        let (count, on_tick) = counter();

        assert!(scheduler.start(on_tick.clone()));
        assert!(!scheduler.start(on_tick));
        assert!(scheduler.is_active());

        sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks_and_restart_creates_one_timer() {
        let scheduler = Scheduler::new(Duration::from_millis(100));
        let (count, on_tick) = counter();

        scheduler.start(on_tick.clone());
        sleep(Duration::from_millis(250)).await;
        assert!(scheduler.stop());
        assert!(!scheduler.is_active());
        assert!(!scheduler.stop());

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(scheduler.start(on_tick));
        sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_timer() {
        let (count, on_tick) = counter();
        {
            let scheduler = Scheduler::new(Duration::from_millis(100));
            scheduler.start(on_tick);
        }

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
