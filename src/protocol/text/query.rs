use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::text::command::COM_QUERY;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_query.html
#[derive(Debug, Clone)]
pub struct ComQuery {
    pub query: String,
}

impl ProtocolDecode<'_> for ComQuery {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let command = buf.get_bytes(1)?.get_u8();
        if command != COM_QUERY {
            return Err(err_protocol!(
                "expected COM_QUERY (0x03) but found 0x{:x}",
                command
            ));
        }

        // query : string<EOF>
        let query = buf.get_str(buf.len())?;

        Ok(Self { query })
    }
}

impl ProtocolEncode<'_> for ComQuery {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(COM_QUERY);
        buf.extend_from_slice(self.query.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::ComQuery;
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use bytes::Bytes;

    #[test]
    fn it_round_trips_query() {
        let raw: &[u8] = b"\x03SELECT 1";
        let p = ComQuery::decode(Bytes::from_static(raw)).unwrap();

        assert_eq!(p.query, "SELECT 1");

        let mut buf = Vec::new();
        p.encode(&mut buf);
        assert_eq!(&buf[..], raw);
    }
}
