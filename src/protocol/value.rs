use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::io::{BufExt, BufMutExt};
use crate::protocol::TypeId;

/// A single bound parameter value from the binary protocol.
///
/// Recorded mocks and live packets both decode into this representation;
/// equality between the two (including numeric widening) lives in the
/// matcher, not here.
///
/// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_binary_resultset.html#sect_protocol_binary_resultset_row_value
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Int(i64),
    UInt(u64),
    Double(f64),
    Text(String),
    Bytes(Bytes),
    Bool(bool),
}

impl BindValue {
    /// Decode one value for a parameter of the given type.
    pub(crate) fn decode(buf: &mut Bytes, type_id: TypeId, unsigned: bool) -> Result<Self> {
        Ok(match type_id {
            TypeId::NULL => BindValue::Null,

            TypeId::TINY_INT => {
                let raw = buf.get_bytes(1)?.get_u8();
                if unsigned {
                    BindValue::UInt(raw.into())
                } else {
                    BindValue::Int((raw as i8).into())
                }
            }

            TypeId::SMALL_INT | TypeId::YEAR => {
                let raw = buf.get_bytes(2)?.get_u16_le();
                if unsigned {
                    BindValue::UInt(raw.into())
                } else {
                    BindValue::Int((raw as i16).into())
                }
            }

            TypeId::INT | TypeId::MEDIUM_INT => {
                let raw = buf.get_bytes(4)?.get_u32_le();
                if unsigned {
                    BindValue::UInt(raw.into())
                } else {
                    BindValue::Int((raw as i32).into())
                }
            }

            TypeId::BIG_INT => {
                let raw = buf.get_bytes(8)?.get_u64_le();
                if unsigned {
                    BindValue::UInt(raw)
                } else {
                    BindValue::Int(raw as i64)
                }
            }

            TypeId::FLOAT => {
                let raw = buf.get_bytes(4)?.get_f32_le();
                BindValue::Double(raw.into())
            }

            TypeId::DOUBLE => BindValue::Double(buf.get_bytes(8)?.get_f64_le()),

            // temporal types are a 1-byte length followed by a packed body;
            // the body is never interpreted, only replayed
            TypeId::DATE | TypeId::TIME | TypeId::DATETIME | TypeId::TIMESTAMP => {
                let len = buf.get_bytes(1)?.get_u8() as usize;
                BindValue::Bytes(buf.get_bytes(len)?)
            }

            // everything else is a length-encoded string or blob
            _ => {
                let raw = buf.get_bytes_lenenc()?;
                match std::str::from_utf8(&raw) {
                    Ok(s) => BindValue::Text(s.to_owned()),
                    Err(_) => BindValue::Bytes(raw),
                }
            }
        })
    }

    /// Encode one value for a parameter of the given type. Inverse of
    /// [`BindValue::decode`] for every value that decoder produces.
    pub(crate) fn encode(&self, buf: &mut Vec<u8>, type_id: TypeId) {
        match self {
            BindValue::Null => {}

            BindValue::Int(v) => match type_id {
                TypeId::TINY_INT => buf.push(*v as u8),
                TypeId::SMALL_INT | TypeId::YEAR => {
                    buf.extend_from_slice(&(*v as i16).to_le_bytes())
                }
                TypeId::INT | TypeId::MEDIUM_INT => {
                    buf.extend_from_slice(&(*v as i32).to_le_bytes())
                }
                _ => buf.extend_from_slice(&v.to_le_bytes()),
            },

            BindValue::UInt(v) => match type_id {
                TypeId::TINY_INT => buf.push(*v as u8),
                TypeId::SMALL_INT | TypeId::YEAR => {
                    buf.extend_from_slice(&(*v as u16).to_le_bytes())
                }
                TypeId::INT | TypeId::MEDIUM_INT => {
                    buf.extend_from_slice(&(*v as u32).to_le_bytes())
                }
                _ => buf.extend_from_slice(&v.to_le_bytes()),
            },

            BindValue::Double(v) => match type_id {
                TypeId::FLOAT => buf.extend_from_slice(&(*v as f32).to_le_bytes()),
                _ => buf.extend_from_slice(&v.to_le_bytes()),
            },

            BindValue::Text(s) => match type_id {
                TypeId::DATE | TypeId::TIME | TypeId::DATETIME | TypeId::TIMESTAMP => {
                    buf.push(s.len() as u8);
                    buf.extend_from_slice(s.as_bytes());
                }
                _ => buf.put_str_lenenc(s),
            },

            BindValue::Bytes(b) => match type_id {
                TypeId::DATE | TypeId::TIME | TypeId::DATETIME | TypeId::TIMESTAMP => {
                    buf.push(b.len() as u8);
                    buf.extend_from_slice(b);
                }
                _ => buf.put_bytes_lenenc(b),
            },

            BindValue::Bool(v) => buf.push(*v as u8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BindValue, TypeId};
    use bytes::Bytes;

    #[test]
    fn it_decodes_signed_long() {
        let mut buf = Bytes::from_static(b"\x07\x00\x00\x00");
        let value = BindValue::decode(&mut buf, TypeId::INT, false).unwrap();

        assert_eq!(value, BindValue::Int(7));
    }

    #[test]
    fn it_decodes_unsigned_bigint() {
        let mut buf = Bytes::from_static(b"\xff\xff\xff\xff\xff\xff\xff\xff");
        let value = BindValue::decode(&mut buf, TypeId::BIG_INT, true).unwrap();

        assert_eq!(value, BindValue::UInt(u64::MAX));
    }

    #[test]
    fn it_decodes_text() {
        let mut buf = Bytes::from_static(b"\x05hello");
        let value = BindValue::decode(&mut buf, TypeId::VAR_CHAR, false).unwrap();

        assert_eq!(value, BindValue::Text("hello".into()));
    }

    #[test]
    fn it_round_trips_double() {
        let mut buf = Vec::new();
        BindValue::Double(2.5).encode(&mut buf, TypeId::DOUBLE);

        let mut bytes = Bytes::from(buf);
        let value = BindValue::decode(&mut bytes, TypeId::DOUBLE, false).unwrap();

        assert_eq!(value, BindValue::Double(2.5));
    }
}
