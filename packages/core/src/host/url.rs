//! Host string parsing
//!
//! Host strings look like `[protocol://][user[:password]@]hostname[:port][?key=value&...]`.
//! Query variables may repeat; every value is kept in order.

use percent_encoding::percent_decode_str;
use url::Url;

use super::error::HostError;
use crate::vars::Variables;

/// A parsed host string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUrl {
    /// Scheme, e.g. `telnet` or `ssh2`
    pub protocol: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub hostname: String,
    pub port: Option<u16>,
    /// Query-style variables attached to the host string
    pub vars: Variables,
}

impl HostUrl {
    /// Parse a raw host string, using `default_protocol` when it carries no scheme
    pub fn parse(raw: &str, default_protocol: &str) -> Result<Self, HostError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HostError::invalid_host(raw, "empty host string"));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("{default_protocol}://{trimmed}")
        };
        let url = Url::parse(&with_scheme).map_err(|e| HostError::invalid_host(raw, e.to_string()))?;

        let hostname = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| HostError::invalid_host(raw, "missing hostname"))?
            .to_string();

        let username = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(decode);
        let password = url.password().map(decode);

        let mut vars = Variables::new();
        for (key, value) in url.query_pairs() {
            vars.entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        Ok(Self {
            protocol: url.scheme().to_string(),
            username,
            password,
            hostname,
            port: url.port(),
            vars,
        })
    }
}

fn decode(component: &str) -> String {
    percent_decode_str(component).decode_utf8_lossy().into_owned()
}
