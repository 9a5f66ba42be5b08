//! Bounded concurrent fan-out
//!
//! Two shapes of fan-out are used by the scraper:
//! - [`map_concurrent_ordered`] runs work under a concurrency limit and
//!   collects every result in submission order.
//! - [`map_concurrent_streaming`] runs work on a spawned driver task and hands
//!   results to the caller through an unbounded channel as they complete.
//!
//! Both observe a [`CancellationToken`].

use crate::config::FailureMode;
use crate::{Result, ScrapeError};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Applies `f` to every item with at most `limit` futures in flight
///
/// Results come back in the order the items were given. The first error
/// drops all outstanding work and is returned.
///
/// # Example
///
/// ```
/// use edgar_ripple::crawler::map_concurrent_ordered;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cancel = CancellationToken::new();
/// let doubled = map_concurrent_ordered(1..=3, 2, &cancel, |n| async move { Ok(n * 2) })
///     .await
///     .unwrap();
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # }
/// ```
pub async fn map_concurrent_ordered<I, T, F, Fut>(
    items: I,
    limit: usize,
    cancel: &CancellationToken,
    f: F,
) -> Result<Vec<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let work = stream::iter(items)
        .map(f)
        .buffered(limit.max(1))
        .try_collect::<Vec<T>>();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
        result = work => result,
    }
}

/// Applies `f` to every item on a background task, streaming results as they complete
///
/// At most `limit` futures are in flight. Results arrive in completion order.
/// Under [`FailureMode::FailFast`] the first error is delivered and the stream
/// then ends; under [`FailureMode::Continue`] errors are delivered as items and
/// the remaining work carries on. Cancellation delivers
/// [`ScrapeError::Cancelled`] and ends the stream.
pub fn map_concurrent_streaming<I, T, F, Fut>(
    items: I,
    limit: usize,
    mode: FailureMode,
    cancel: CancellationToken,
    f: F,
) -> ResultStream<T>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    F: FnMut(I::Item) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let items = items.into_iter();

    let driver = tokio::spawn(async move {
        let mut results = stream::iter(items).map(f).buffer_unordered(limit.max(1));

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = sender.send(Err(ScrapeError::Cancelled));
                    return;
                }
                next = results.next() => next,
            };

            let Some(result) = next else {
                return;
            };

            let failed = result.is_err();
            if sender.send(result).is_err() {
                tracing::debug!("Result consumer went away, stopping fan-out");
                return;
            }
            if failed && mode == FailureMode::FailFast {
                return;
            }
        }
    });

    ResultStream {
        receiver,
        driver: Some(driver),
    }
}

/// Results of a streaming fan-out, pulled by the caller
///
/// Dropping the stream aborts any outstanding work.
#[derive(Debug)]
pub struct ResultStream<T> {
    receiver: mpsc::UnboundedReceiver<Result<T>>,
    driver: Option<JoinHandle<()>>,
}

impl<T> ResultStream<T> {
    /// Waits for the next completed result; `None` once the fan-out is finished
    pub async fn next(&mut self) -> Option<Result<T>> {
        std::future::poll_fn(|cx| self.poll_item(cx)).await
    }

    fn poll_item(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<T>>> {
        if let Some(item) = std::task::ready!(self.receiver.poll_recv(cx)) {
            return Poll::Ready(Some(item));
        }

        // Channel closed: surface a driver panic instead of ending quietly
        let Some(driver) = self.driver.as_mut() else {
            return Poll::Ready(None);
        };
        let outcome = std::task::ready!(Pin::new(driver).poll(cx));
        self.driver = None;

        match outcome {
            Err(e) if e.is_panic() => Poll::Ready(Some(Err(ScrapeError::Task(e.to_string())))),
            _ => Poll::Ready(None),
        }
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_item(cx)
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}
