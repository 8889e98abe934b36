use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::text::command::COM_STMT_SEND_LONG_DATA;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_send_long_data.html
//
// No response follows this command.
#[derive(Debug, Clone)]
pub struct ComStmtSendLongData {
    pub statement_id: u32,
    pub param_index: u16,
    pub data: Bytes,
}

impl ProtocolDecode<'_> for ComStmtSendLongData {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let command = buf.get_bytes(1)?.get_u8();
        if command != COM_STMT_SEND_LONG_DATA {
            return Err(err_protocol!(
                "expected COM_STMT_SEND_LONG_DATA (0x18) but found 0x{:x}",
                command
            ));
        }

        let statement_id = buf.get_bytes(4)?.get_u32_le();
        let param_index = buf.get_bytes(2)?.get_u16_le();
        let data = buf;

        Ok(Self {
            statement_id,
            param_index,
            data,
        })
    }
}

impl ProtocolEncode<'_> for ComStmtSendLongData {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(COM_STMT_SEND_LONG_DATA);
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.extend_from_slice(&self.param_index.to_le_bytes());
        buf.extend_from_slice(&self.data);
    }
}
