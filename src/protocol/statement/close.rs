use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::text::command::COM_STMT_CLOSE;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_close.html
//
// No response follows this command.
#[derive(Debug, Clone)]
pub struct ComStmtClose {
    pub statement_id: u32,
}

impl ProtocolDecode<'_> for ComStmtClose {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let command = buf.get_bytes(1)?.get_u8();
        if command != COM_STMT_CLOSE {
            return Err(err_protocol!(
                "expected COM_STMT_CLOSE (0x19) but found 0x{:x}",
                command
            ));
        }

        let statement_id = buf.get_bytes(4)?.get_u32_le();

        Ok(Self { statement_id })
    }
}

impl ProtocolEncode<'_> for ComStmtClose {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(COM_STMT_CLOSE);
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
    }
}
