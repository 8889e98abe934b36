use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::text::command::COM_INIT_DB;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_init_db.html
#[derive(Debug, Clone)]
pub struct ComInitDb {
    pub schema: String,
}

impl ProtocolDecode<'_> for ComInitDb {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let command = buf.get_bytes(1)?.get_u8();
        if command != COM_INIT_DB {
            return Err(err_protocol!(
                "expected COM_INIT_DB (0x02) but found 0x{:x}",
                command
            ));
        }

        let schema = buf.get_str(buf.len())?;

        Ok(Self { schema })
    }
}

impl ProtocolEncode<'_> for ComInitDb {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(COM_INIT_DB);
        buf.extend_from_slice(self.schema.as_bytes());
    }
}
