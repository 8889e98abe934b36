mod socket;
mod tls;

pub use socket::{BufferedSocket, Socket};
pub use tls::TlsUpgrade;
