//! Single-byte utility commands.

use crate::io::ProtocolEncode;
use crate::protocol::text::command;

macro_rules! simple_command {
    ($(#[$meta:meta])* $name:ident, $code:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name;

        impl ProtocolEncode<'_> for $name {
            fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
                buf.push($code);
            }
        }
    };
}

simple_command!(
    // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_quit.html
    ComQuit,
    command::COM_QUIT
);

simple_command!(
    // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_ping.html
    ComPing,
    command::COM_PING
);

simple_command!(
    // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_statistics.html
    ComStatistics,
    command::COM_STATISTICS
);

simple_command!(
    // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_debug.html
    ComDebug,
    command::COM_DEBUG
);

simple_command!(
    // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_reset_connection.html
    ComResetConnection,
    command::COM_RESET_CONNECTION
);
