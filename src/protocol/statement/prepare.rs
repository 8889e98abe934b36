use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::text::command::COM_STMT_PREPARE;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_prepare.html
#[derive(Debug, Clone)]
pub struct ComStmtPrepare {
    pub query: String,
}

impl ProtocolDecode<'_> for ComStmtPrepare {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let command = buf.get_bytes(1)?.get_u8();
        if command != COM_STMT_PREPARE {
            return Err(err_protocol!(
                "expected COM_STMT_PREPARE (0x16) but found 0x{:x}",
                command
            ));
        }

        let query = buf.get_str(buf.len())?;

        Ok(Self { query })
    }
}

impl ProtocolEncode<'_> for ComStmtPrepare {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(COM_STMT_PREPARE);
        buf.extend_from_slice(self.query.as_bytes());
    }
}
