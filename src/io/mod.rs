//! Buffer helpers and the codec traits every packet type implements.

mod buf;
mod buf_mut;

pub use buf::BufExt;
pub use buf_mut::BufMutExt;

use bytes::Bytes;

use crate::error::Error;

/// Decoding half of the packet codec.
///
/// A MySQL payload is not self-describing: OK, ERR and EOF change layout
/// with the negotiated capability flags, and a `COM_STMT_EXECUTE` can only
/// be read with the parameter count from its prepare response. `Context`
/// carries exactly that per-packet state. Packets that need none use the
/// default `()` and get the [`decode`](ProtocolDecode::decode) shorthand.
///
/// Which *type* a payload decodes into is a separate, connection-state
/// question answered by [`crate::codec::decode_payload`].
pub trait ProtocolDecode<'de, Context = ()>: Sized {
    fn decode(buf: Bytes) -> Result<Self, Error>
    where
        Self: ProtocolDecode<'de, ()>,
    {
        Self::decode_with(buf, ())
    }

    fn decode_with(buf: Bytes, context: Context) -> Result<Self, Error>;
}

/// Encoding half of the packet codec.
///
/// Encoders are infallible and length-exact: almost every byte this engine
/// writes is a recorded packet replayed back to the client, so an encoder
/// must reproduce what its decoder consumed. The matching frame header is
/// written by [`crate::codec::encode_packet`], not here.
pub trait ProtocolEncode<'en, Context = ()> {
    fn encode(&self, buf: &mut Vec<u8>)
    where
        Self: ProtocolEncode<'en, ()>,
    {
        self.encode_with(buf, ())
    }

    fn encode_with(&self, buf: &mut Vec<u8>, context: Context);
}
