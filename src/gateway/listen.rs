#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedListenAddress {
    pub(crate) host: String,
    pub(crate) port: Option<u16>,
}

pub(crate) fn is_wildcard_host(host: &str) -> bool {
    matches!(host.trim(), "0.0.0.0" | "::")
}

pub(crate) fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

pub(crate) const MIN_LISTEN_PORT: u16 = 1024;

/// Port 0 asks the OS for an ephemeral port; privileged ports are refused.
pub(crate) fn validate_port(port: u16) -> Result<u16, String> {
    if port != 0 && port < MIN_LISTEN_PORT {
        return Err(format!("listen port must be >= {MIN_LISTEN_PORT} (got {port})"));
    }
    Ok(port)
}

fn parse_port(raw: &str) -> Result<u16, String> {
    let port: u16 = raw
        .trim()
        .parse()
        .map_err(|_| "invalid listen port".to_string())?;
    validate_port(port)
}

pub(crate) fn parse_listen_address(input: &str) -> Result<ParsedListenAddress, String> {
    let raw = input.trim();
    if raw.is_empty() {
        return Ok(ParsedListenAddress {
            host: "0.0.0.0".to_string(),
            port: None,
        });
    }
    if raw.contains("://") || raw.contains('/') {
        return Err("listen address must be host or host:port".to_string());
    }

    if let Some(rest) = raw.strip_prefix('[') {
        let idx = rest
            .find(']')
            .ok_or_else(|| "invalid IPv6 address: missing closing ']'".to_string())?;
        let host = rest[..idx].trim();
        if host.is_empty() {
            return Err("listen address missing host".to_string());
        }
        let tail = rest[idx + 1..].trim();
        if tail.is_empty() {
            return Ok(ParsedListenAddress {
                host: host.to_string(),
                port: None,
            });
        }
        let port_raw = tail
            .strip_prefix(':')
            .ok_or_else(|| "listen address must be [ipv6]:port".to_string())?;
        return Ok(ParsedListenAddress {
            host: host.to_string(),
            port: Some(parse_port(port_raw)?),
        });
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() == 1 {
        return Ok(ParsedListenAddress {
            host: raw.to_string(),
            port: None,
        });
    }
    if parts.len() == 2 {
        let host = parts[0].trim();
        if host.is_empty() {
            return Err("listen address missing host".to_string());
        }
        return Ok(ParsedListenAddress {
            host: host.to_string(),
            port: Some(parse_port(parts[1])?),
        });
    }

    Err("IPv6 must use [addr]:port".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_means_all_interfaces() {
        let parsed = parse_listen_address("  ").expect("parsed");
        assert_eq!(parsed.host, "0.0.0.0");
        assert_eq!(parsed.port, None);
    }

    #[test]
    fn host_only_and_host_port() {
        assert_eq!(
            parse_listen_address("127.0.0.1").expect("parsed"),
            ParsedListenAddress {
                host: "127.0.0.1".to_string(),
                port: None
            }
        );
        assert_eq!(
            parse_listen_address("localhost:8080").expect("parsed"),
            ParsedListenAddress {
                host: "localhost".to_string(),
                port: Some(8080)
            }
        );
    }

    #[test]
    fn bracketed_ipv6_with_port() {
        let parsed = parse_listen_address("[::1]:9000").expect("parsed");
        assert_eq!(parsed.host, "::1");
        assert_eq!(parsed.port, Some(9000));
    }

    #[test]
    fn rejects_urls_bare_ipv6_and_bad_ports() {
        assert!(parse_listen_address("http://0.0.0.0:80").is_err());
        assert!(parse_listen_address("::1").is_err());
        assert!(parse_listen_address("[::1").is_err());
        assert!(parse_listen_address("0.0.0.0:80").is_err());
        assert!(parse_listen_address("[::]:1023").is_err());
        assert!(parse_listen_address("0.0.0.0:http").is_err());
    }

    #[test]
    fn accepts_unprivileged_and_ephemeral_ports() {
        assert_eq!(
            parse_listen_address("0.0.0.0:1024").expect("parsed").port,
            Some(1024)
        );
        assert_eq!(
            parse_listen_address("127.0.0.1:0").expect("parsed").port,
            Some(0)
        );
        assert_eq!(validate_port(3000), Ok(3000));
        assert!(validate_port(443).is_err());
    }

    #[test]
    fn format_host_port_brackets_ipv6() {
        assert_eq!(format_host_port("::", 3000), "[::]:3000");
        assert_eq!(format_host_port("0.0.0.0", 3000), "0.0.0.0:3000");
        assert!(is_wildcard_host("::"));
        assert!(!is_wildcard_host("127.0.0.1"));
    }
}
