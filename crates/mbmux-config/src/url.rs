// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device URL and bind address interpretation.
//!
//! Device URLs take the form `scheme://address`. A URL without a scheme
//! defaults to `tcp://`, an empty host means all interfaces and a
//! missing port means the standard Modbus port 502. Serial URLs carry
//! the device path and an optional `?baudrate=` query.

use mbmux_core::{DeviceAddress, TransportKind, DEFAULT_BAUD_RATE};

use crate::error::{ConfigError, ConfigResult};

/// Standard Modbus TCP port.
pub const DEFAULT_MODBUS_PORT: u16 = 502;

/// Host meaning "all interfaces".
const ANY_HOST: &str = "0.0.0.0";

/// Parses a device URL into its transport kind and address.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedScheme`] for unknown schemes and
/// for `tcp+rtu://`, which is recognized but cannot be served without
/// frame translation. Returns [`ConfigError::InvalidUrl`] for malformed
/// hosts, ports or serial queries.
pub fn parse_device_url(url: &str) -> ConfigResult<(TransportKind, DeviceAddress)> {
    let full = if url.contains("://") {
        url.to_string()
    } else {
        format!("tcp://{}", url)
    };

    let (scheme, rest) = full
        .split_once("://")
        .ok_or_else(|| ConfigError::invalid_url(url, "missing scheme separator"))?;

    let kind = TransportKind::from_scheme(scheme)
        .ok_or_else(|| ConfigError::unsupported_scheme(scheme, "unrecognized scheme"))?;
    if !kind.is_supported() {
        return Err(ConfigError::unsupported_scheme(
            scheme,
            "requires TCP-to-RTU frame translation, which this relay does not perform",
        ));
    }

    let address = match kind {
        TransportKind::Serial => parse_serial_address(url, rest)?,
        _ => parse_net_address(url, rest)?,
    };
    Ok((kind, address))
}

fn parse_net_address(url: &str, rest: &str) -> ConfigResult<DeviceAddress> {
    let authority = rest.split(['/', '?']).next().unwrap_or("");

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| ConfigError::invalid_url(url, format!("invalid port '{}'", port_str)))?;
            (host, port)
        }
        None => (authority, DEFAULT_MODBUS_PORT),
    };

    let host = if host.is_empty() || host == "0" {
        ANY_HOST.to_string()
    } else {
        host.to_string()
    };
    Ok(DeviceAddress::Net { host, port })
}

fn parse_serial_address(url: &str, rest: &str) -> ConfigResult<DeviceAddress> {
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    if path.is_empty() {
        return Err(ConfigError::invalid_url(url, "missing serial device path"));
    }

    let mut baud_rate = DEFAULT_BAUD_RATE;
    if let Some(query) = query {
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("baudrate", value)) => {
                    baud_rate = value.parse::<u32>().map_err(|_| {
                        ConfigError::invalid_url(url, format!("invalid baudrate '{}'", value))
                    })?;
                }
                _ => {
                    return Err(ConfigError::invalid_url(
                        url,
                        format!("unrecognized query parameter '{}'", pair),
                    ))
                }
            }
        }
    }

    Ok(DeviceAddress::Serial {
        path: path.to_string(),
        baud_rate,
    })
}

/// Normalizes a listen address to `host:port` form.
///
/// Accepts `host:port`, `:port` and `0:port`; an empty or `0` host
/// becomes all interfaces. An optional `tcp://` prefix is tolerated.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBind`] when the port is missing or not
/// a number.
pub fn normalize_bind(bind: &str) -> ConfigResult<String> {
    let stripped = bind.strip_prefix("tcp://").unwrap_or(bind);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .ok_or_else(|| ConfigError::invalid_bind(bind, "missing port"))?;
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ConfigError::invalid_bind(bind, format!("invalid port '{}'", port_str)))?;

    let host = if host.is_empty() || host == "0" {
        ANY_HOST
    } else {
        host
    };
    Ok(format!("{}:{}", host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_host_defaults() {
        let (kind, address) = parse_device_url("plc.example.org").unwrap();
        assert_eq!(kind, TransportKind::Tcp);
        assert_eq!(
            address,
            DeviceAddress::Net {
                host: "plc.example.org".to_string(),
                port: 502
            }
        );
    }

    #[test]
    fn test_explicit_tcp_url() {
        let (kind, address) = parse_device_url("tcp://10.0.0.5:5020").unwrap();
        assert_eq!(kind, TransportKind::Tcp);
        assert_eq!(
            address,
            DeviceAddress::Net {
                host: "10.0.0.5".to_string(),
                port: 5020
            }
        );
    }

    #[test]
    fn test_empty_host_means_any() {
        let (_, address) = parse_device_url("tcp://:502").unwrap();
        assert_eq!(
            address,
            DeviceAddress::Net {
                host: "0.0.0.0".to_string(),
                port: 502
            }
        );

        let (_, address) = parse_device_url("tcp://0:9000").unwrap();
        assert_eq!(
            address,
            DeviceAddress::Net {
                host: "0.0.0.0".to_string(),
                port: 9000
            }
        );
    }

    #[test]
    fn test_serial_url() {
        let (kind, address) = parse_device_url("serial:///dev/ttyS0").unwrap();
        assert_eq!(kind, TransportKind::Serial);
        assert_eq!(
            address,
            DeviceAddress::Serial {
                path: "/dev/ttyS0".to_string(),
                baud_rate: DEFAULT_BAUD_RATE
            }
        );

        let (_, address) = parse_device_url("serial:///dev/ttyUSB0?baudrate=19200").unwrap();
        assert_eq!(
            address,
            DeviceAddress::Serial {
                path: "/dev/ttyUSB0".to_string(),
                baud_rate: 19200
            }
        );
    }

    #[test]
    fn test_remote_serial_bridges_are_net() {
        let (kind, address) = parse_device_url("rfc2217://moxa.local:4001").unwrap();
        assert_eq!(kind, TransportKind::Rfc2217);
        assert!(matches!(address, DeviceAddress::Net { .. }));

        let (kind, _) = parse_device_url("serial+tcp://bridge:7000").unwrap();
        assert_eq!(kind, TransportKind::SerialTcp);
    }

    #[test]
    fn test_rejected_schemes() {
        assert!(matches!(
            parse_device_url("tcp+rtu://plc:502"),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            parse_device_url("udp://plc:502"),
            Err(ConfigError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_malformed_urls() {
        assert!(matches!(
            parse_device_url("tcp://plc:not-a-port"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_device_url("serial://"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_device_url("serial:///dev/ttyS0?baudrate=fast"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_normalize_bind() {
        assert_eq!(normalize_bind(":502").unwrap(), "0.0.0.0:502");
        assert_eq!(normalize_bind("0:502").unwrap(), "0.0.0.0:502");
        assert_eq!(normalize_bind("127.0.0.1:9502").unwrap(), "127.0.0.1:9502");
        assert_eq!(normalize_bind("tcp://:8502").unwrap(), "0.0.0.0:8502");

        assert!(matches!(
            normalize_bind("just-a-host"),
            Err(ConfigError::InvalidBind { .. })
        ));
        assert!(matches!(
            normalize_bind("host:port"),
            Err(ConfigError::InvalidBind { .. })
        ));
    }
}
