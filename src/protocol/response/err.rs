use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_err_packet.html
// https://mariadb.com/kb/en/err_packet/
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: Option<String>,
    pub error_message: String,
}

impl ProtocolDecode<'_, Capabilities> for ErrPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let header = buf.get_bytes(1)?.get_u8();
        if header != 0xff {
            return Err(err_protocol!(
                "expected 0xff (ERR) but found 0x{:x}",
                header
            ));
        }

        let error_code = buf.get_bytes(2)?.get_u16_le();

        let sql_state = if capabilities.contains(Capabilities::PROTOCOL_41) {
            // '#' marker : string<1>
            buf.get_bytes(1)?;
            Some(buf.get_str(5)?)
        } else {
            None
        };

        let error_message = buf.get_str(buf.len())?;

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

impl ProtocolEncode<'_, Capabilities> for ErrPacket {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) {
        buf.push(0xff);
        buf.extend_from_slice(&self.error_code.to_le_bytes());

        if let Some(state) = &self.sql_state {
            buf.push(b'#');
            buf.extend_from_slice(state.as_bytes());
        }

        buf.extend_from_slice(self.error_message.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::ErrPacket;
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use crate::protocol::Capabilities;
    use bytes::Bytes;

    const ERR_HANDSHAKE_UNKNOWN_DB: &[u8] = b"\xff\x19\x04#42000Unknown database 'unknown'";

    #[test]
    fn it_decodes_err_unknown_db() {
        let p = ErrPacket::decode_with(
            Bytes::from_static(ERR_HANDSHAKE_UNKNOWN_DB),
            Capabilities::PROTOCOL_41,
        )
        .unwrap();

        assert_eq!(p.error_code, 1049);
        assert_eq!(p.sql_state.as_deref(), Some("42000"));
        assert_eq!(p.error_message, "Unknown database 'unknown'");
    }

    #[test]
    fn it_round_trips_err() {
        let p = ErrPacket::decode_with(
            Bytes::from_static(ERR_HANDSHAKE_UNKNOWN_DB),
            Capabilities::PROTOCOL_41,
        )
        .unwrap();

        let mut buf = Vec::new();
        p.encode_with(&mut buf, Capabilities::PROTOCOL_41);

        assert_eq!(&buf[..], ERR_HANDSHAKE_UNKNOWN_DB);
    }
}
