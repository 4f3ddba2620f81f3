//! In-process broadcast medium
//!
//! Every endpoint attached to a hub receives every datagram sent on it,
//! the sender included unless loopback is switched off. Single-threaded,
//! like the frame loop that drives a session.

use bytes::Bytes;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::Transport;

#[derive(Default)]
struct HubState {
    queues: Vec<VecDeque<Bytes>>,
    loopback: bool,
    sent: usize,
}

/// Shared broadcast medium that hands out `MemoryTransport` endpoints
#[derive(Clone)]
pub struct MemoryHub {
    state: Rc<RefCell<HubState>>,
}

impl MemoryHub {
    /// A hub that loops datagrams back to their sender, like UDP broadcast
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HubState {
                loopback: true,
                ..Default::default()
            })),
        }
    }

    /// A hub that never delivers a datagram to its own sender
    pub fn without_loopback() -> Self {
        let hub = Self::new();
        hub.state.borrow_mut().loopback = false;
        hub
    }

    /// Attach a new participant
    pub fn endpoint(&self) -> MemoryTransport {
        let mut state = self.state.borrow_mut();
        state.queues.push(VecDeque::new());
        MemoryTransport {
            hub: self.clone(),
            index: state.queues.len() - 1,
        }
    }

    /// Deliver a datagram from outside the session (foreign or replayed traffic)
    pub fn inject(&self, payload: &[u8]) {
        let datagram = Bytes::copy_from_slice(payload);
        for queue in self.state.borrow_mut().queues.iter_mut() {
            queue.push_back(datagram.clone());
        }
    }

    /// Number of datagrams sent by attached endpoints so far
    pub fn sent_count(&self) -> usize {
        self.state.borrow().sent
    }

    fn broadcast(&self, from: usize, payload: &[u8]) {
        let datagram = Bytes::copy_from_slice(payload);
        let mut state = self.state.borrow_mut();
        state.sent += 1;

        let loopback = state.loopback;
        for (index, queue) in state.queues.iter_mut().enumerate() {
            if index != from || loopback {
                queue.push_back(datagram.clone());
            }
        }
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One participant's view of a `MemoryHub`
pub struct MemoryTransport {
    hub: MemoryHub,
    index: usize,
}

impl Transport for MemoryTransport {
    fn is_enabled(&self) -> bool {
        true
    }

    fn loops_back(&self) -> bool {
        self.hub.state.borrow().loopback
    }

    fn send(&mut self, payload: &[u8]) {
        self.hub.broadcast(self.index, payload);
    }

    fn try_recv(&mut self) -> Option<Bytes> {
        self.hub.state.borrow_mut().queues[self.index].pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_everyone_including_sender() {
        let hub = MemoryHub::new();
        let mut a = hub.endpoint();
        let mut b = hub.endpoint();

        a.send(b"one");
        b.send(b"two");

        let at_a: Vec<Bytes> = a.poll_receive().collect();
        let at_b: Vec<Bytes> = b.poll_receive().collect();
        assert_eq!(at_a, vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]);
        assert_eq!(at_a, at_b);
        assert_eq!(hub.sent_count(), 2);

        // Drained; the next poll starts empty
        assert_eq!(a.poll_receive().count(), 0);
    }

    #[test]
    fn test_without_loopback_skips_sender() {
        let hub = MemoryHub::without_loopback();
        let mut a = hub.endpoint();
        let mut b = hub.endpoint();
        assert!(!a.loops_back());

        a.send(b"one");
        assert_eq!(a.poll_receive().count(), 0);
        assert_eq!(b.poll_receive().count(), 1);
    }

    #[test]
    fn test_inject_is_not_counted_as_sent() {
        let hub = MemoryHub::new();
        let mut a = hub.endpoint();
        hub.inject(b"\xff");
        assert_eq!(hub.sent_count(), 0);
        assert_eq!(a.try_recv(), Some(Bytes::from_static(b"\xff")));
    }
}
