use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::{Capabilities, Status};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_eof_packet.html
// https://mariadb.com/kb/en/eof_packet/
//
// Appears between the column definitions and the rows of a result set (and
// after the rows) unless `CLIENT_DEPRECATE_EOF` was negotiated.
#[derive(Debug, Clone)]
pub struct EofPacket {
    pub warnings: u16,
    pub status: Status,
}

impl ProtocolDecode<'_, Capabilities> for EofPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self, Error> {
        let header = buf.get_bytes(1)?.get_u8();
        if header != 0xfe {
            return Err(err_protocol!(
                "expected 0xfe (EOF) but found 0x{:x}",
                header
            ));
        }

        let (warnings, status) = if capabilities.contains(Capabilities::PROTOCOL_41) {
            let warnings = buf.get_bytes(2)?.get_u16_le();
            let status = Status::from_bits_retain(buf.get_bytes(2)?.get_u16_le());

            (warnings, status)
        } else {
            (0, Status::empty())
        };

        Ok(Self { warnings, status })
    }
}

impl ProtocolEncode<'_, Capabilities> for EofPacket {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        buf.push(0xfe);

        if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.extend_from_slice(&self.warnings.to_le_bytes());
            buf.extend_from_slice(&self.status.bits().to_le_bytes());
        }
    }
}
