//! Streamed invoke results.
//!
//! `StreamInvoke` hands the caller a finite, non-restartable sequence of
//! property maps. The producer pushes items into a bounded channel and stops
//! as soon as the consumer closes (or drops) its end.

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{PluginError, Result};
use crate::resource::PropertyMap;

use super::check::CheckFailure;

/// Default channel capacity for streamed results.
pub const DEFAULT_STREAM_CAPACITY: usize = 16;

/// Consumer side of a streamed invoke.
#[derive(Debug)]
pub struct InvokeStream {
    rx: mpsc::Receiver<Result<PropertyMap>>,
    /// Argument validation failures reported before streaming began.
    pub failures: Vec<CheckFailure>,
}

/// Producer side of a streamed invoke.
#[derive(Debug, Clone)]
pub struct StreamSender {
    tx: mpsc::Sender<Result<PropertyMap>>,
}

impl InvokeStream {
    /// Creates a connected sender/stream pair.
    #[must_use]
    pub fn channel(capacity: usize) -> (StreamSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            StreamSender { tx },
            Self {
                rx,
                failures: Vec::new(),
            },
        )
    }

    /// Creates an already-finished stream that only reports failures.
    #[must_use]
    pub fn failed(failures: Vec<CheckFailure>) -> Self {
        let (_, mut stream) = Self::channel(1);
        stream.failures = failures;
        stream
    }

    /// Waits for the next item. Returns `None` once the stream is finished.
    pub async fn next(&mut self) -> Option<Result<PropertyMap>> {
        self.rx.recv().await
    }

    /// Stops the stream. Items already buffered can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Feeds every item to `on_next` in order.
    ///
    /// An error from `on_next` stops the stream and is returned, as is any
    /// error pushed by the producer.
    ///
    /// # Errors
    ///
    /// Returns the first error from either side.
    pub async fn for_each<F>(mut self, mut on_next: F) -> Result<()>
    where
        F: FnMut(PropertyMap) -> Result<()> + Send,
    {
        while let Some(item) = self.next().await {
            if let Err(e) = item.and_then(&mut on_next) {
                debug!("Stopping invoke stream: {e}");
                self.close();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Collects every item into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first error pushed by the producer.
    pub async fn collect(self) -> Result<Vec<PropertyMap>> {
        let mut items = Vec::new();
        self.for_each(|item| {
            items.push(item);
            Ok(())
        })
        .await?;
        Ok(items)
    }
}

impl StreamSender {
    /// Sends an item, waiting for room in the channel.
    ///
    /// Returns false once the consumer has stopped listening; the producer
    /// should stop emitting.
    pub async fn send(&self, item: PropertyMap) -> bool {
        self.tx.send(Ok(item)).await.is_ok()
    }

    /// Terminates the stream with an error.
    pub async fn fail(&self, error: PluginError) -> bool {
        self.tx.send(Err(error)).await.is_ok()
    }

    /// Returns true once the consumer has stopped listening.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
