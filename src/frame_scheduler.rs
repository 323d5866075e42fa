use std::time::Instant;

/// One step of the animation clock
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Seconds since the clock was created
    pub t: f32,
}

/// Monotonic source of animation ticks
///
/// One tick is produced per display frame by the redraw handler. Resizing
/// the surface does not touch the clock, so the animation phase survives
/// resizes.
pub struct FrameClock {
    start: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn tick(&self) -> Tick {
        Tick {
            t: self.start.elapsed().as_secs_f32(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier handed out for each scheduler subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type TickFn = Box<dyn FnMut(Tick)>;

/// Per-frame callback dispatcher
///
/// Subscribers run in registration order, one after another, within the
/// same frame callback; there is no parallelism. Cancellation is modeled
/// as unsubscription: once a subscription is removed its callback never
/// runs again, and removing it twice is a no-op.
pub struct FrameScheduler {
    subscribers: Vec<(SubscriptionId, TickFn)>,
    next_id: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(Tick) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscription. Returns false if it was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.subscribers.iter().position(|(sid, _)| *sid == id) {
            Some(idx) => {
                self.subscribers.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every subscription at once.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    /// Run all subscriber callbacks for one frame.
    pub fn tick(&mut self, tick: Tick) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(tick);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tick_at(t: f32) -> Tick {
        Tick { t }
    }

    #[test]
    fn test_subscriber_receives_every_tick() {
        let count = Rc::new(RefCell::new(0));
        let count_in_cb = count.clone();

        let mut scheduler = FrameScheduler::new();
        scheduler.subscribe(move |_| *count_in_cb.borrow_mut() += 1);

        for i in 0..5 {
            scheduler.tick(tick_at(i as f32));
        }
        assert_eq!(*count.borrow(), 5);
    }

    #[test]
    fn test_subscribers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let a = order.clone();
        let b = order.clone();

        let mut scheduler = FrameScheduler::new();
        scheduler.subscribe(move |_| a.borrow_mut().push("tracker"));
        scheduler.subscribe(move |_| b.borrow_mut().push("model"));

        scheduler.tick(tick_at(0.0));
        assert_eq!(*order.borrow(), vec!["tracker", "model"]);
    }

    #[test]
    fn test_unsubscribed_callback_never_runs_again() {
        let count = Rc::new(RefCell::new(0));
        let count_in_cb = count.clone();

        let mut scheduler = FrameScheduler::new();
        let id = scheduler.subscribe(move |_| *count_in_cb.borrow_mut() += 1);

        scheduler.tick(tick_at(0.0));
        assert!(scheduler.unsubscribe(id));
        scheduler.tick(tick_at(1.0));
        scheduler.tick(tick_at(2.0));

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_double_unsubscribe_is_noop() {
        let mut scheduler = FrameScheduler::new();
        let id = scheduler.subscribe(|_| {});

        assert!(scheduler.unsubscribe(id));
        assert!(!scheduler.unsubscribe(id));
        assert_eq!(scheduler.subscriber_count(), 0);
    }

    #[test]
    fn test_clear_removes_all_subscriptions() {
        let count = Rc::new(RefCell::new(0));
        let a = count.clone();
        let b = count.clone();

        let mut scheduler = FrameScheduler::new();
        scheduler.subscribe(move |_| *a.borrow_mut() += 1);
        scheduler.subscribe(move |_| *b.borrow_mut() += 1);

        scheduler.clear();
        scheduler.tick(tick_at(0.0));
        assert_eq!(*count.borrow(), 0);
        assert_eq!(scheduler.subscriber_count(), 0);
    }

    #[test]
    fn test_clock_time_is_monotonic() {
        let clock = FrameClock::new();
        let first = clock.tick();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = clock.tick();

        assert!(first.t >= 0.0);
        assert!(second.t >= first.t);
    }
}
