//! Lock-free hand-off of outgoing messages to a synth or port thread.

use ls_engine::{OutputSink, SinkError};
use ls_ir::MidiMessage;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Producer half, owned by the session thread.
///
/// Never blocks: a full buffer rejects the message and the session counts it.
pub struct RingSink {
    producer: HeapProd<MidiMessage>,
    connected: Arc<AtomicBool>,
}

/// Consumer half, owned by whatever turns messages into sound.
pub struct MidiReceiver {
    consumer: HeapCons<MidiMessage>,
    connected: Arc<AtomicBool>,
}

impl RingSink {
    /// Create a sink buffering up to `capacity` messages.
    pub fn new(capacity: usize) -> (Self, MidiReceiver) {
        let rb = HeapRb::<MidiMessage>::new(capacity);
        let (producer, consumer) = rb.split();
        let connected = Arc::new(AtomicBool::new(true));
        let sink = Self { producer, connected: connected.clone() };
        (sink, MidiReceiver { consumer, connected })
    }

    /// Messages waiting to be read.
    pub fn pending(&self) -> usize {
        self.producer.occupied_len()
    }
}

impl OutputSink for RingSink {
    fn send(&mut self, message: MidiMessage) -> Result<(), SinkError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(SinkError::Disconnected);
        }
        self.producer.try_push(message).map_err(|_| SinkError::Full)
    }
}

impl MidiReceiver {
    pub fn try_recv(&mut self) -> Option<MidiMessage> {
        self.consumer.try_pop()
    }

    /// Hand every waiting message to `f`. Returns how many there were.
    pub fn drain(&mut self, mut f: impl FnMut(MidiMessage)) -> usize {
        let mut count = 0;
        while let Some(message) = self.consumer.try_pop() {
            f(message);
            count += 1;
        }
        count
    }
}

impl Drop for MidiReceiver {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Relaxed);
    }
}
