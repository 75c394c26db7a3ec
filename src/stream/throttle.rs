//! Latest-wins throttling for report streams

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Adds [`Throttle`] to any stream.
pub trait ThrottleExt: Stream {
    /// Emit at most once per `period`.
    ///
    /// Items arriving within one period collapse to the most recent one. A
    /// report stream only cares about the newest snapshot, so intermediate
    /// items are dropped rather than queued.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Stream combinator returned by [`ThrottleExt::throttle`].
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        latest: Option<S::Item>,
        finished: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { stream, interval, latest: None, finished: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // Keep pulling between ticks so only the newest item is retained
            while !*this.finished {
                match this.stream.as_mut().poll_next(cx) {
                    Poll::Ready(Some(item)) => *this.latest = Some(item),
                    Poll::Ready(None) => *this.finished = true,
                    Poll::Pending => break,
                }
            }

            if this.latest.is_none() {
                if *this.finished {
                    return Poll::Ready(None);
                }
                return Poll::Pending;
            }

            ready!(this.interval.poll_tick(cx));
            if let Some(item) = this.latest.take() {
                return Poll::Ready(Some(item));
            }
        }
    }
}
