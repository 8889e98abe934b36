use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::auth::Sha2AuthState;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_auth_more_data.html
//
// In the `caching_sha2_password` exchange a single data byte selects the
// sub-state; during full auth the same packet kind later carries the
// server's RSA public key.
#[derive(Debug, Clone)]
pub struct AuthMoreData {
    pub data: Bytes,
}

impl AuthMoreData {
    pub fn sha2_state(&self) -> Option<Sha2AuthState> {
        self.data.first().copied().and_then(Sha2AuthState::from_u8)
    }
}

impl ProtocolDecode<'_> for AuthMoreData {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.get_bytes(1)?.get_u8();
        if header != 0x01 {
            return Err(err_protocol!(
                "expected 0x01 (AUTH_MORE_DATA) but found 0x{:x}",
                header
            ));
        }

        Ok(Self { data: buf })
    }
}

impl ProtocolEncode<'_> for AuthMoreData {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(0x01);
        buf.extend_from_slice(&self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::AuthMoreData;
    use crate::io::ProtocolDecode;
    use crate::protocol::auth::Sha2AuthState;
    use bytes::Bytes;

    #[test]
    fn it_decodes_fast_auth_success() {
        let p = AuthMoreData::decode(Bytes::from_static(b"\x01\x03")).unwrap();
        assert_eq!(p.sha2_state(), Some(Sha2AuthState::FastAuthSuccess));
    }

    #[test]
    fn it_decodes_perform_full_authentication() {
        let p = AuthMoreData::decode(Bytes::from_static(b"\x01\x04")).unwrap();
        assert_eq!(p.sha2_state(), Some(Sha2AuthState::PerformFullAuthentication));
    }
}
