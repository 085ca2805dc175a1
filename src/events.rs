// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-owner fan-out of browser-control events.
//!
//! Every owner subject gets its own bounded broadcast channel. A subscriber
//! that falls behind skips the oldest events instead of blocking the
//! publisher. The channel is dropped together with its last subscriber.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::Stream;

use crate::models::BrowserControlEvent;

/// Events buffered per owner before the oldest are dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

type Channels = HashMap<String, broadcast::Sender<BrowserControlEvent>>;

#[derive(Clone, Default)]
pub struct EventHub {
    channels: Arc<Mutex<Channels>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, Channels> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start receiving events for `owner_subject`.
    pub fn subscribe(&self, owner_subject: &str) -> Subscription {
        let receiver = self
            .channels()
            .entry(owner_subject.to_string())
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
            .subscribe();

        tracing::debug!(owner = owner_subject, "browser-control subscriber attached");
        Subscription {
            owner_subject: owner_subject.to_string(),
            hub: self.clone(),
            stream: Some(BroadcastStream::new(receiver)),
        }
    }

    /// Deliver `event` to every current subscriber of its owner.
    ///
    /// Returns the number of subscribers reached; zero is not an error.
    pub fn publish(&self, event: BrowserControlEvent) -> usize {
        let mut channels = self.channels();
        let Some(sender) = channels.get(&event.owner_subject) else {
            return 0;
        };
        match sender.send(event) {
            Ok(reached) => reached,
            Err(broadcast::error::SendError(event)) => {
                channels.remove(&event.owner_subject);
                0
            }
        }
    }

    pub fn subscriber_count(&self, owner_subject: &str) -> usize {
        self.channels()
            .get(owner_subject)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of owners with at least one live subscriber.
    pub fn owner_count(&self) -> usize {
        self.channels().len()
    }
}

/// Live subscription; unsubscribes on drop.
pub struct Subscription {
    owner_subject: String,
    hub: EventHub,
    stream: Option<BroadcastStream<BrowserControlEvent>>,
}

impl Stream for Subscription {
    type Item = BrowserControlEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let Some(stream) = this.stream.as_mut() else {
            return Poll::Ready(None);
        };
        loop {
            match Pin::new(&mut *stream).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::warn!(
                        owner = %this.owner_subject,
                        skipped,
                        "browser-control subscriber lagged, oldest events dropped"
                    );
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.hub.channels();
        // Receivers are released under the lock, so exactly one drop sees zero.
        drop(self.stream.take());
        let last = channels
            .get(&self.owner_subject)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if last {
            channels.remove(&self.owner_subject);
            tracing::debug!(owner = %self.owner_subject, "last browser-control subscriber left");
        }
    }
}
