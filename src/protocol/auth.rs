use std::fmt::{self, Display, Formatter};

/// An authentication plugin named by the server greeting or an auth-switch
/// request.
///
/// Recorded mocks occasionally carry garbled or truncated plugin names, so
/// parsing never fails; anything unrecognized is preserved verbatim in
/// [`AuthPlugin::Other`] and handled by the tolerant comparison in the
/// matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPlugin {
    MySqlNativePassword,
    CachingSha2Password,
    MySqlClearPassword,
    Other(Box<str>),
}

impl AuthPlugin {
    pub fn parse(s: &str) -> Self {
        match s {
            "mysql_native_password" => AuthPlugin::MySqlNativePassword,
            "caching_sha2_password" => AuthPlugin::CachingSha2Password,
            "mysql_clear_password" => AuthPlugin::MySqlClearPassword,
            _ => AuthPlugin::Other(s.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuthPlugin::MySqlNativePassword => "mysql_native_password",
            AuthPlugin::CachingSha2Password => "caching_sha2_password",
            AuthPlugin::MySqlClearPassword => "mysql_clear_password",
            AuthPlugin::Other(name) => name,
        }
    }
}

impl Display for AuthPlugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-state byte carried in `AuthMoreData` during `caching_sha2_password`
/// authentication.
///
/// See <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_caching_sha2_authentication_exchanges.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sha2AuthState {
    /// `0x03`: the scramble matched the cache; an OK or ERR follows.
    FastAuthSuccess,

    /// `0x04`: the server demands the cleartext password, over TLS or via
    /// the RSA public-key exchange.
    PerformFullAuthentication,
}

impl Sha2AuthState {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x03 => Some(Sha2AuthState::FastAuthSuccess),
            0x04 => Some(Sha2AuthState::PerformFullAuthentication),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthPlugin, Sha2AuthState};

    #[test]
    fn it_parses_known_plugins() {
        assert_eq!(
            AuthPlugin::parse("caching_sha2_password"),
            AuthPlugin::CachingSha2Password
        );
        assert_eq!(
            AuthPlugin::parse("mysql_native_password"),
            AuthPlugin::MySqlNativePassword
        );
    }

    #[test]
    fn it_preserves_unknown_plugins() {
        let plugin = AuthPlugin::parse("sha256_password");
        assert_eq!(plugin.as_str(), "sha256_password");
    }

    #[test]
    fn it_maps_sha2_state_bytes() {
        assert_eq!(
            Sha2AuthState::from_u8(0x03),
            Some(Sha2AuthState::FastAuthSuccess)
        );
        assert_eq!(
            Sha2AuthState::from_u8(0x04),
            Some(Sha2AuthState::PerformFullAuthentication)
        );
        assert_eq!(Sha2AuthState::from_u8(0x05), None);
    }
}
