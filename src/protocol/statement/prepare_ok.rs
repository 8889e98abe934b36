use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_prepare.html#sect_protocol_com_stmt_prepare_response_ok
//
// The statement id in a replayed copy is rewritten to the runtime id before
// it leaves the engine; the recorded id only matters for the recorded-PREP
// index.
#[derive(Debug, Clone)]
pub struct ComStmtPrepareOk {
    pub statement_id: u32,

    /// Number of columns in the result set (0 if the statement returns none).
    pub columns: u16,

    /// Number of '?' placeholders.
    pub params: u16,

    pub warnings: u16,
}

impl ProtocolDecode<'_> for ComStmtPrepareOk {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.get_bytes(1)?.get_u8();
        if header != 0x00 {
            return Err(err_protocol!(
                "expected COM_STMT_PREPARE_OK (0x00) but found 0x{:x}",
                header
            ));
        }

        let statement_id = buf.get_bytes(4)?.get_u32_le();
        let columns = buf.get_bytes(2)?.get_u16_le();
        let params = buf.get_bytes(2)?.get_u16_le();

        // reserved : string<1>
        buf.get_bytes(1)?;

        let warnings = buf.get_bytes(2)?.get_u16_le();

        Ok(Self {
            statement_id,
            columns,
            params,
            warnings,
        })
    }
}

impl ProtocolEncode<'_> for ComStmtPrepareOk {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(0x00);
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.extend_from_slice(&self.columns.to_le_bytes());
        buf.extend_from_slice(&self.params.to_le_bytes());
        buf.push(0x00);
        buf.extend_from_slice(&self.warnings.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::ComStmtPrepareOk;
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use bytes::Bytes;

    const PREPARE_OK: &[u8] = b"\x00\x01\x00\x00\x00\x02\x00\x01\x00\x00\x00\x00";

    #[test]
    fn it_round_trips_prepare_ok() {
        let p = ComStmtPrepareOk::decode(Bytes::from_static(PREPARE_OK)).unwrap();

        assert_eq!(p.statement_id, 1);
        assert_eq!(p.columns, 2);
        assert_eq!(p.params, 1);
        assert_eq!(p.warnings, 0);

        let mut buf = Vec::new();
        p.encode(&mut buf);
        assert_eq!(&buf[..], PREPARE_OK);
    }
}
