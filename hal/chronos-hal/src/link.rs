//! Outgoing packet transport
//!
//! The phone link delivers raw command packets to the watch through a
//! callback and accepts small notification packets in the other direction.
//! Only the outgoing half is abstracted here; incoming packets are pushed
//! into the pipeline by whoever owns the radio.

/// Packet transmitter
///
/// Sends one complete packet to the peer. Packets are small (well under
/// the link MTU), so implementations are expected to write them in one
/// notification.
pub trait PacketTx {
    /// Error type for transmit operations
    type Error;

    /// Send a single packet
    ///
    /// Blocks until the packet has been queued on the link or an error occurs.
    fn send(&mut self, packet: &[u8]) -> Result<(), Self::Error>;
}

impl<T: PacketTx + ?Sized> PacketTx for &mut T {
    type Error = T::Error;

    fn send(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        (**self).send(packet)
    }
}
