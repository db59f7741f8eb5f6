//! An in-process transport pair, for tests and the CLI demo.
//!
//! Mirrors the channel-bridge shape of the teacher's `ConnectedClient`
//! (`to_server`/`from_server` `mpsc` channels around the real QUIC I/O):
//! here there is no I/O to bridge, so the channel pair *is* the transport.

use tokio::sync::mpsc;

use sonicframe_core::ProtocolTag;

use crate::{AcousticTransport, FrameSource, TransportError};

/// The sending half of an in-memory transport pair.
#[derive(Clone)]
pub struct InMemorySender {
    tx: mpsc::Sender<String>,
}

impl AcousticTransport for InMemorySender {
    async fn transmit(&self, frame: &str, _protocol_tag: &ProtocolTag) -> Result<(), TransportError> {
        self.tx.send(frame.to_string()).await.map_err(|_| TransportError::Closed)
    }
}

/// The receiving half of an in-memory transport pair.
pub struct InMemoryReceiver {
    rx: mpsc::Receiver<String>,
}

impl FrameSource for InMemoryReceiver {
    async fn recv_frame(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Build a connected sender/receiver pair with the given channel capacity.
#[must_use]
pub fn channel(capacity: usize) -> (InMemorySender, InMemoryReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (InMemorySender { tx }, InMemoryReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transmitted_frames_arrive_in_order() {
        let (sender, mut receiver) = channel(8);
        sender.transmit("S:a:b:1", &ProtocolTag::Normal).await.expect("send 1");
        sender.transmit("D:a:1:xx", &ProtocolTag::Normal).await.expect("send 2");

        assert_eq!(receiver.recv_frame().await, Some("S:a:b:1".to_string()));
        assert_eq!(receiver.recv_frame().await, Some("D:a:1:xx".to_string()));
    }

    #[tokio::test]
    async fn dropping_the_receiver_closes_the_sender() {
        let (sender, receiver) = channel(1);
        drop(receiver);
        assert!(matches!(sender.transmit("x", &ProtocolTag::Normal).await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn closing_the_sender_ends_the_frame_stream() {
        let (sender, mut receiver) = channel(1);
        drop(sender);
        assert_eq!(receiver.recv_frame().await, None);
    }
}
