//! Stack growth for recursive evaluation
//!
//! Every nested call polls a chain of boxed futures inside one another on the
//! native stack of whichever thread drives the run. `grow` wraps the recursive
//! futures so that each poll first checks for at least `RED_ZONE` bytes of
//! headroom and moves onto a fresh heap-allocated segment when there is less.
//! Recursion is then bounded by `max_call_depth`, not by the thread's stack.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::BoxFuture;

/// Headroom that must remain before polling further; covers one call level
/// of unoptimized builds with a wide margin
const RED_ZONE: usize = 256 * 1024;

/// Size of each additional stack segment
const SEGMENT_SIZE: usize = 4 * 1024 * 1024;

struct GrowStack<'a, T> {
    inner: BoxFuture<'a, T>,
}

impl<T> Future for GrowStack<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let inner = &mut self.get_mut().inner;
        stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, || inner.as_mut().poll(cx))
    }
}

/// Poll `inner` on a stack with enough headroom for another level
pub(crate) fn grow<'a, T: 'a>(inner: BoxFuture<'a, T>) -> BoxFuture<'a, T> {
    Box::pin(GrowStack { inner })
}
