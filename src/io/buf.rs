use bytes::{Buf, Bytes};
use memchr::memchr;

use crate::error::Result;

/// Reads for the MySQL flavors of length-encoded and NUL-terminated data.
///
/// All methods are bounds-checked: underflow surfaces as a protocol error
/// rather than a panic, since the bytes come straight off the wire.
pub trait BufExt: Buf {
    fn get_bytes(&mut self, n: usize) -> Result<Bytes>;

    fn get_str(&mut self, n: usize) -> Result<String>;

    /// Read a NUL-terminated string and discard the terminator.
    fn get_str_nul(&mut self) -> Result<String>;

    // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_dt_integers.html#sect_protocol_basic_dt_int_le
    fn get_uint_lenenc(&mut self) -> Result<u64>;

    fn get_bytes_lenenc(&mut self) -> Result<Bytes>;

    fn get_str_lenenc(&mut self) -> Result<String>;
}

impl BufExt for Bytes {
    fn get_bytes(&mut self, n: usize) -> Result<Bytes> {
        if self.len() < n {
            return Err(err_protocol!(
                "expected {} bytes but only {} remain",
                n,
                self.len()
            ));
        }

        Ok(self.split_to(n))
    }

    fn get_str(&mut self, n: usize) -> Result<String> {
        let buf = self.get_bytes(n)?;

        String::from_utf8(buf.to_vec())
            .map_err(|err| err_protocol!("invalid utf-8 in string: {}", err))
    }

    fn get_str_nul(&mut self) -> Result<String> {
        let nul = memchr(b'\0', self)
            .ok_or_else(|| err_protocol!("expected NUL-terminated string"))?;

        let s = self.get_str(nul)?;
        self.advance(1);

        Ok(s)
    }

    fn get_uint_lenenc(&mut self) -> Result<u64> {
        if self.is_empty() {
            return Err(err_protocol!("expected length-encoded integer"));
        }

        Ok(match self.get_u8() {
            // 0xFB is NULL in a text resultset row; tolerated here as 0 so a
            // stray row byte does not kill the connection
            0xfb => 0,
            0xfc => u64::from(self.get_bytes(2)?.get_u16_le()),
            0xfd => {
                let mut buf = self.get_bytes(3)?;
                let low = u64::from(buf.get_u16_le());
                low | (u64::from(buf.get_u8()) << 16)
            }
            0xfe => self.get_bytes(8)?.get_u64_le(),
            value => u64::from(value),
        })
    }

    fn get_bytes_lenenc(&mut self) -> Result<Bytes> {
        let len = self.get_uint_lenenc()?;
        self.get_bytes(len as usize)
    }

    fn get_str_lenenc(&mut self) -> Result<String> {
        let len = self.get_uint_lenenc()?;
        self.get_str(len as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::BufExt;
    use bytes::Bytes;

    #[test]
    fn it_gets_str_nul() {
        let mut buf = Bytes::from_static(b"caching_sha2_password\0rest");

        assert_eq!(buf.get_str_nul().unwrap(), "caching_sha2_password");
        assert_eq!(&buf[..], b"rest");
    }

    #[test]
    fn it_gets_uint_lenenc() {
        let mut buf = Bytes::from_static(b"\xfa");
        assert_eq!(buf.get_uint_lenenc().unwrap(), 250);

        let mut buf = Bytes::from_static(b"\xfc\xfb\x00");
        assert_eq!(buf.get_uint_lenenc().unwrap(), 251);

        let mut buf = Bytes::from_static(b"\xfd\x01\x00\x01");
        assert_eq!(buf.get_uint_lenenc().unwrap(), 65537);

        let mut buf = Bytes::from_static(b"\xfe\x01\x00\x00\x00\x00\x00\x00\x01");
        assert_eq!(buf.get_uint_lenenc().unwrap(), (1 << 56) + 1);
    }

    #[test]
    fn it_rejects_underflow() {
        let mut buf = Bytes::from_static(b"\x01");
        assert!(buf.get_bytes(2).is_err());
    }
}
