use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_ssl_request.html
//
// Sent by the client instead of a full handshake response when it wants to
// upgrade to TLS first. Exactly 32 bytes of payload.
#[derive(Debug, Clone)]
pub struct SslRequest {
    pub capabilities: Capabilities,
    pub max_packet_size: u32,
    pub collation: u8,

    /// Reserved tail; all zeroes from a well-behaved client but replayed
    /// verbatim and compared during handshake mock selection.
    pub filler: Bytes,
}

impl SslRequest {
    /// An SSLRequest payload is exactly this long; used to tell it apart
    /// from a full handshake response carrying the same capability bit.
    pub const PAYLOAD_SIZE: usize = 32;
}

impl ProtocolDecode<'_> for SslRequest {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let capabilities =
            Capabilities::from_bits_retain(u64::from(buf.get_bytes(4)?.get_u32_le()));
        let max_packet_size = buf.get_bytes(4)?.get_u32_le();
        let collation = buf.get_bytes(1)?.get_u8();
        let filler = buf.get_bytes(23)?;

        Ok(Self {
            capabilities,
            max_packet_size,
            collation,
            filler,
        })
    }
}

impl ProtocolEncode<'_> for SslRequest {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.extend_from_slice(&((self.capabilities.bits() & 0xffff_ffff) as u32).to_le_bytes());
        buf.extend_from_slice(&self.max_packet_size.to_le_bytes());
        buf.push(self.collation);
        buf.extend_from_slice(&self.filler);
    }
}

#[cfg(test)]
mod tests {
    use super::SslRequest;
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use crate::protocol::Capabilities;
    use bytes::Bytes;

    const SSL_REQUEST: &[u8] = b"\x05\xae\x0f\x00\x00\x00\x00\x01!\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";

    #[test]
    fn it_decodes_ssl_request() {
        let p = SslRequest::decode(Bytes::from_static(SSL_REQUEST)).unwrap();

        assert!(p.capabilities.contains(Capabilities::SSL));
        assert_eq!(p.max_packet_size, 16777216);
        assert_eq!(p.collation, 33);
    }

    #[test]
    fn it_round_trips_ssl_request() {
        let p = SslRequest::decode(Bytes::from_static(SSL_REQUEST)).unwrap();

        let mut buf = Vec::new();
        p.encode(&mut buf);

        assert_eq!(&buf[..], SSL_REQUEST);
    }
}
