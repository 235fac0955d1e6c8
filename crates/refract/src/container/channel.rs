//! Channel storage and channel operations on values
//!
//! A thread-safe FIFO channel built on parking_lot's `Mutex` and `Condvar`:
//! - buffered channels (capacity > 0) hold up to `capacity` values
//! - unbuffered channels hand a value directly from a sender to a receiver
//! - blocking send and receive, plus non-blocking `try_*` variants

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::{invalid, raise, ReflectError};
use crate::types::{ChanDir, Kind, Type};
use crate::value::{corrupt, Data, Value};

/// Channel misuse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Send on a closed channel, or close while a send is blocked
    #[error("send on closed channel")]
    Closed,
    /// Close of a closed channel
    #[error("close of closed channel")]
    AlreadyClosed,
    /// Operation on a nil channel, which would block forever
    #[error("{op} on nil channel")]
    NilChannel {
        /// Operation name
        op: &'static str,
    },
    /// Operation not permitted by the channel's direction
    #[error("{op} on {dir} channel")]
    WrongDirection {
        /// Operation name
        op: &'static str,
        /// Direction of the channel type
        dir: ChanDir,
    },
}

/// Shared channel storage
pub(crate) type ChanRef = Arc<ChannelObject>;

pub(crate) struct ChannelObject {
    inner: Mutex<ChannelInner>,
    /// Signalled when a sender's value is taken or the channel closes
    not_full: Condvar,
    /// Signalled when a value becomes available or the channel closes
    not_empty: Condvar,
}

struct ChannelInner {
    /// Buffer capacity (0 = unbuffered)
    capacity: usize,
    queue: VecDeque<Data>,
    closed: bool,
    /// Values offered by senders that could not buffer them, by ticket
    waiting_senders: VecDeque<(u64, Data)>,
    /// Receivers blocked on an empty channel
    waiting_receivers: usize,
    next_ticket: u64,
}

impl ChannelInner {
    /// Next value in FIFO order, refilling the buffer from a waiting sender.
    ///
    /// Once closed only buffered values are delivered; pending offers are
    /// withdrawn by their senders with `Closed`.
    fn take(&mut self) -> Option<Data> {
        if self.closed {
            return self.queue.pop_front();
        }
        match self.queue.pop_front() {
            Some(data) => {
                if let Some((_, offered)) = self.waiting_senders.pop_front() {
                    self.queue.push_back(offered);
                }
                Some(data)
            }
            None => self.waiting_senders.pop_front().map(|(_, data)| data),
        }
    }

    /// Whether a receiver is blocked with no value yet offered to it
    fn has_idle_receiver(&self) -> bool {
        self.waiting_receivers > self.waiting_senders.len()
    }

    fn offered(&self, ticket: u64) -> bool {
        self.waiting_senders.iter().any(|(t, _)| *t == ticket)
    }
}

/// Outcome of a non-blocking receive
#[derive(Debug)]
pub enum TryRecv {
    /// A value was received
    Value(Value),
    /// The channel is closed and drained; carries the element zero value
    Closed(Value),
    /// No value is ready
    Empty,
}

impl TryRecv {
    /// `(value, ok, received)`: `value` is the zero handle when nothing was
    /// received, `ok` is false for the zero value of a closed channel
    pub fn into_parts(self) -> (Value, bool, bool) {
        match self {
            TryRecv::Value(v) => (v, true, true),
            TryRecv::Closed(zero) => (zero, false, true),
            TryRecv::Empty => (Value::default(), false, false),
        }
    }
}

impl fmt::Debug for ChannelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ChannelObject")
            .field("capacity", &inner.capacity)
            .field("length", &inner.queue.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

impl ChannelObject {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                capacity,
                queue: VecDeque::with_capacity(capacity),
                closed: false,
                waiting_senders: VecDeque::new(),
                waiting_receivers: 0,
                next_ticket: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of buffered values
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Close the channel, waking every waiter
    pub(crate) fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ChannelError::AlreadyClosed);
        }
        inner.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
        Ok(())
    }

    /// Send without blocking; `Ok(false)` when the value cannot be taken now
    pub(crate) fn try_send(&self, data: Data) -> Result<bool, ChannelError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ChannelError::Closed);
        }
        if inner.queue.len() < inner.capacity {
            inner.queue.push_back(data);
        } else if inner.has_idle_receiver() {
            let ticket = inner.next_ticket;
            inner.next_ticket += 1;
            inner.waiting_senders.push_back((ticket, data));
        } else {
            return Ok(false);
        }
        self.not_empty.notify_one();
        Ok(true)
    }

    /// Send, blocking until the value is buffered or taken by a receiver
    pub(crate) fn send(&self, data: Data) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ChannelError::Closed);
        }
        if inner.queue.len() < inner.capacity {
            inner.queue.push_back(data);
            self.not_empty.notify_one();
            return Ok(());
        }
        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        inner.waiting_senders.push_back((ticket, data));
        self.not_empty.notify_one();
        loop {
            self.not_full.wait(&mut inner);
            if !inner.offered(ticket) {
                return Ok(());
            }
            if inner.closed {
                inner.waiting_senders.retain(|(t, _)| *t != ticket);
                return Err(ChannelError::Closed);
            }
        }
    }

    /// Receive, blocking until a value is available; `None` once the
    /// channel is closed and drained
    pub(crate) fn recv(&self) -> Option<Data> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(data) = inner.take() {
                self.not_full.notify_all();
                return Some(data);
            }
            if inner.closed {
                return None;
            }
            inner.waiting_receivers += 1;
            self.not_empty.wait(&mut inner);
            inner.waiting_receivers -= 1;
        }
    }

    /// Receive without blocking: `Ok(Some)` on a value, `Ok(None)` when
    /// closed and drained, `Err(())` when nothing is ready
    pub(crate) fn try_recv(&self) -> Result<Option<Data>, ()> {
        let mut inner = self.inner.lock();
        if let Some(data) = inner.take() {
            self.not_full.notify_all();
            return Ok(Some(data));
        }
        if inner.closed {
            Ok(None)
        } else {
            Err(())
        }
    }
}

impl Value {
    /// New channel of type `ty` with room for `buffer` values
    pub fn make_chan(ty: Type, buffer: usize) -> Value {
        if ty.kind() != Kind::Chan {
            raise(ReflectError::KindMismatch {
                method: "Value::make_chan",
                kind: ty.kind(),
            });
        }
        if ty.chan_dir() != ChanDir::Both {
            invalid("Value::make_chan: unidirectional channel type");
        }
        Value::direct(ty, Data::Chan(Some(Arc::new(ChannelObject::new(buffer)))))
    }

    /// The channel, checked for direction and nil
    fn channel(&self, method: &'static str, op: &'static str, send: bool) -> ChanRef {
        let h = self.expect_kind(method, Kind::Chan);
        let dir = h.ty.chan_dir();
        if (send && !dir.can_send()) || (!send && !dir.can_recv()) {
            raise(ChannelError::WrongDirection { op, dir }.into());
        }
        let chan = self.read(|d| match d {
            Data::Chan(c) => c.clone(),
            _ => corrupt(),
        });
        match chan {
            Some(chan) => chan,
            None => raise(ChannelError::NilChannel { op }.into()),
        }
    }

    fn offer(&self, method: &'static str, x: &Value) -> (ChanRef, Data) {
        self.must_be_exported(method);
        let chan = self.channel(method, "send", true);
        x.must_be_exported(method);
        let data = x.assign_to(method, self.ty().elem());
        (chan, data)
    }

    /// Send `x`, blocking until it is taken or buffered
    pub fn send(&self, x: &Value) {
        let (chan, data) = self.offer("Value::send", x);
        if let Err(err) = chan.send(data) {
            raise(err.into());
        }
    }

    /// Send `x` if that can be done without blocking
    pub fn try_send(&self, x: &Value) -> bool {
        let (chan, data) = self.offer("Value::try_send", x);
        chan.try_send(data).unwrap_or_else(|err| raise(err.into()))
    }

    /// Receive a value, blocking until one is available.
    ///
    /// `ok` is false when the channel is closed and drained; the value is
    /// then the element zero value.
    pub fn recv(&self) -> (Value, bool) {
        self.must_be_exported("Value::recv");
        let chan = self.channel("Value::recv", "receive", false);
        let elem = self.ty().elem();
        match chan.recv() {
            Some(data) => (Value::direct(elem, data), true),
            None => (Value::zero(elem), false),
        }
    }

    /// Receive a value if one is ready
    pub fn try_recv(&self) -> TryRecv {
        self.must_be_exported("Value::try_recv");
        let chan = self.channel("Value::try_recv", "receive", false);
        let elem = self.ty().elem();
        match chan.try_recv() {
            Ok(Some(data)) => TryRecv::Value(Value::direct(elem, data)),
            Ok(None) => TryRecv::Closed(Value::zero(elem)),
            Err(()) => TryRecv::Empty,
        }
    }

    /// Close the channel
    pub fn close(&self) {
        self.must_be_exported("Value::close");
        let chan = self.channel("Value::close", "close", true);
        if let Err(err) = chan.close() {
            raise(err.into());
        }
    }
}
