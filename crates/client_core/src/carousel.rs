//! Rotating display of a fixed set of items, e.g. testimonials.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Carousel<T> {
    items: Vec<T>,
    index: usize,
}

impl<T> Carousel<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    pub fn advance(&mut self) -> Option<&T> {
        if !self.items.is_empty() {
            self.index = (self.index + 1) % self.items.len();
        }
        self.current()
    }

    pub fn back(&mut self) -> Option<&T> {
        if !self.items.is_empty() {
            self.index = (self.index + self.items.len() - 1) % self.items.len();
        }
        self.current()
    }

    pub fn select(&mut self, index: usize) -> Option<&T> {
        if index < self.items.len() {
            self.index = index;
        }
        self.current()
    }
}

/// Timer that advances a shared [`Carousel`] every `period`.
///
/// The timer task lives exactly as long as this guard: dropping it (or
/// calling [`AutoRotate::stop`]) aborts the task, and subscribers then see
/// the index channel close.
pub struct AutoRotate {
    handle: JoinHandle<()>,
    index_rx: watch::Receiver<usize>,
}

impl AutoRotate {
    pub fn start<T: Send + 'static>(carousel: Arc<Mutex<Carousel<T>>>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(10));
        let (index_tx, index_rx) = watch::channel(0);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let index = {
                    let mut guard = carousel.lock().await;
                    guard.advance();
                    guard.index()
                };
                debug!(index, "carousel advanced");
                if index_tx.send(index).is_err() {
                    break;
                }
            }
        });
        Self { handle, index_rx }
    }

    /// Receiver for the index after each rotation.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.index_rx.clone()
    }

    /// Aborts the rotation task now instead of at end of scope.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for AutoRotate {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_and_back_wrap_around() {
        let mut carousel = Carousel::new(vec!["a", "b", "c"]);
        assert_eq!(carousel.current(), Some(&"a"));
        assert_eq!(carousel.back(), Some(&"c"));
        assert_eq!(carousel.advance(), Some(&"a"));
        assert_eq!(carousel.advance(), Some(&"b"));
        assert_eq!(carousel.select(7), Some(&"b"));
        assert_eq!(carousel.select(2), Some(&"c"));
        assert_eq!(carousel.advance(), Some(&"a"));
    }

    #[test]
    fn empty_carousel_has_no_current_item() {
        let mut carousel: Carousel<u8> = Carousel::new(Vec::new());
        assert!(carousel.is_empty());
        assert_eq!(carousel.advance(), None);
        assert_eq!(carousel.back(), None);
        assert_eq!(carousel.index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_stops_when_guard_is_dropped() {
        let carousel = Arc::new(Mutex::new(Carousel::new(vec![1, 2, 3, 4])));
        let rotate = AutoRotate::start(carousel.clone(), Duration::from_secs(1));
        let mut index_rx = rotate.subscribe();

        for expected in [1, 2, 3] {
            index_rx.changed().await.expect("rotation tick");
            assert_eq!(*index_rx.borrow_and_update(), expected);
        }

        drop(rotate);
        assert!(index_rx.changed().await.is_err());

        let index_after_stop = carousel.lock().await.index();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(carousel.lock().await.index(), index_after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_stop_ends_rotation() {
        let carousel = Arc::new(Mutex::new(Carousel::new(vec!["a", "b", "c"])));
        let rotate = AutoRotate::start(carousel.clone(), Duration::from_secs(1));
        let mut index_rx = rotate.subscribe();
        index_rx.changed().await.expect("rotation tick");

        rotate.stop();
        assert!(index_rx.changed().await.is_err());
        let index_after_stop = carousel.lock().await.index();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(carousel.lock().await.index(), index_after_stop);
    }
}
