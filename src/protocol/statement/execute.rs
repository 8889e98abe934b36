use bytes::{Buf, Bytes};

use crate::error::Error;
use crate::io::{BufExt, ProtocolDecode, ProtocolEncode};
use crate::protocol::text::command::COM_STMT_EXECUTE;
use crate::protocol::{BindValue, TypeId};

/// One bound parameter of a `COM_STMT_EXECUTE`.
#[derive(Debug, Clone)]
pub struct BindParameter {
    pub type_id: TypeId,

    /// Only populated when the client negotiated `CLIENT_QUERY_ATTRIBUTES`.
    pub name: String,

    pub unsigned: bool,
    pub value: BindValue,
}

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_stmt_execute.html
//
// The parameter count is not on the wire; the server-side knows it from the
// prepare response, which is why decoding takes it as context.
#[derive(Debug, Clone)]
pub struct ComStmtExecute {
    pub statement_id: u32,
    pub flags: u8,
    pub iterations: u32,
    pub new_params_bind_flag: u8,
    pub parameters: Vec<BindParameter>,
}

impl ProtocolDecode<'_, u16> for ComStmtExecute {
    fn decode_with(mut buf: Bytes, param_count: u16) -> Result<Self, Error> {
        let command = buf.get_bytes(1)?.get_u8();
        if command != COM_STMT_EXECUTE {
            return Err(err_protocol!(
                "expected COM_STMT_EXECUTE (0x17) but found 0x{:x}",
                command
            ));
        }

        let statement_id = buf.get_bytes(4)?.get_u32_le();
        let flags = buf.get_bytes(1)?.get_u8();
        let iterations = buf.get_bytes(4)?.get_u32_le();

        let mut new_params_bind_flag = 0;
        let mut parameters = Vec::with_capacity(param_count as usize);

        if param_count > 0 {
            // null bitmap : byte<(param_count + 7) / 8>
            let null_bitmap = buf.get_bytes((param_count as usize + 7) / 8)?;

            new_params_bind_flag = buf.get_bytes(1)?.get_u8();
            if new_params_bind_flag != 1 {
                // without fresh type information the values cannot be
                // interpreted; nothing in the live session gets here unless
                // the client re-executes without rebinding
                return Ok(Self {
                    statement_id,
                    flags,
                    iterations,
                    new_params_bind_flag,
                    parameters,
                });
            }

            let mut types = Vec::with_capacity(param_count as usize);
            for _ in 0..param_count {
                let type_id = TypeId(buf.get_bytes(1)?.get_u8());
                let param_flags = buf.get_bytes(1)?.get_u8();

                types.push((type_id, param_flags & 0x80 != 0));
            }

            for (index, (type_id, unsigned)) in types.into_iter().enumerate() {
                let is_null = null_bitmap[index / 8] & (1 << (index % 8)) != 0;

                let value = if is_null {
                    BindValue::Null
                } else {
                    BindValue::decode(&mut buf, type_id, unsigned)?
                };

                parameters.push(BindParameter {
                    type_id,
                    name: String::new(),
                    unsigned,
                    value,
                });
            }
        }

        Ok(Self {
            statement_id,
            flags,
            iterations,
            new_params_bind_flag,
            parameters,
        })
    }
}

impl ProtocolEncode<'_> for ComStmtExecute {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(COM_STMT_EXECUTE);
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.push(self.flags);
        buf.extend_from_slice(&self.iterations.to_le_bytes());

        if self.parameters.is_empty() {
            return;
        }

        let mut null_bitmap = vec![0u8; (self.parameters.len() + 7) / 8];
        for (index, param) in self.parameters.iter().enumerate() {
            if matches!(param.value, BindValue::Null) {
                null_bitmap[index / 8] |= 1 << (index % 8);
            }
        }
        buf.extend_from_slice(&null_bitmap);

        buf.push(self.new_params_bind_flag);

        if self.new_params_bind_flag == 1 {
            for param in &self.parameters {
                buf.push(param.type_id.0);
                buf.push(if param.unsigned { 0x80 } else { 0 });
            }

            for param in &self.parameters {
                param.value.encode(buf, param.type_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BindValue, ComStmtExecute, TypeId};
    use crate::io::{ProtocolDecode, ProtocolEncode};
    use bytes::Bytes;

    // EXECUTE(stmt=2, no cursor, 1 iteration, one LONG param = 42)
    const EXECUTE: &[u8] =
        b"\x17\x02\x00\x00\x00\x00\x01\x00\x00\x00\x00\x01\x03\x00\x2a\x00\x00\x00";

    #[test]
    fn it_decodes_execute_with_long_param() {
        let p = ComStmtExecute::decode_with(Bytes::from_static(EXECUTE), 1).unwrap();

        assert_eq!(p.statement_id, 2);
        assert_eq!(p.flags, 0);
        assert_eq!(p.iterations, 1);
        assert_eq!(p.new_params_bind_flag, 1);
        assert_eq!(p.parameters.len(), 1);
        assert_eq!(p.parameters[0].type_id, TypeId::INT);
        assert_eq!(p.parameters[0].value, BindValue::Int(42));
    }

    #[test]
    fn it_round_trips_execute() {
        let p = ComStmtExecute::decode_with(Bytes::from_static(EXECUTE), 1).unwrap();

        let mut buf = Vec::new();
        p.encode(&mut buf);
        assert_eq!(&buf[..], EXECUTE);
    }

    #[test]
    fn it_decodes_null_parameter() {
        // one NULL param: bitmap bit 0 set, type NULL
        const EXECUTE_NULL: &[u8] =
            b"\x17\x01\x00\x00\x00\x00\x01\x00\x00\x00\x01\x01\x06\x00";

        let p = ComStmtExecute::decode_with(Bytes::from_static(EXECUTE_NULL), 1).unwrap();

        assert_eq!(p.parameters[0].value, BindValue::Null);
    }
}
