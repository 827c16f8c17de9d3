//! Device discovery
//!
//! Optional autodetection layered on top of [`Bioshake`]: every candidate
//! port is opened, asked for its description and version, and kept when the
//! answer identifies a BioShake. The driver itself never calls into this
//! module unless no explicit port is configured.

use serde::Serialize;

use crate::protocol::{list_ports, Bioshake, ConnectionConfig, ProtocolError, Transport};

/// A device that answered the identification queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    /// Port the device answered on
    pub port_name: String,
    /// `getDescription` payload
    pub description: String,
    /// `getVersion` payload
    pub version: String,
}

/// Whether a `getDescription` payload identifies a BioShake
pub fn is_bioshake_description(description: &str) -> bool {
    description.to_ascii_lowercase().contains("bioshake")
}

/// Query an open device and classify it.
///
/// Returns `Ok(None)` when the device answers but is not a BioShake.
pub fn identify<T: Transport>(
    device: &mut Bioshake<T>,
) -> Result<Option<DeviceIdentity>, ProtocolError> {
    let description = device.get_description()?;
    if !is_bioshake_description(&description) {
        tracing::debug!(
            "'{}' answered with unrelated description {:?}",
            device.port_name(),
            description
        );
        return Ok(None);
    }
    let version = device.get_version()?;
    Ok(Some(DeviceIdentity {
        port_name: device.port_name().to_string(),
        description,
        version,
    }))
}

/// Serial ports worth probing.
///
/// Uses `try_ports` when given, otherwise every enumerated port. On macOS only
/// USB modem and USB serial devices are kept.
pub fn candidate_ports(try_ports: Option<&[String]>) -> Vec<String> {
    let ports: Vec<String> = match try_ports {
        Some(ports) => ports.to_vec(),
        None => list_ports().into_iter().map(|p| p.name).collect(),
    };

    if cfg!(target_os = "macos") {
        ports
            .into_iter()
            .filter(|p| p.contains("tty.usbmodem") || p.contains("tty.usbserial"))
            .collect()
    } else {
        ports
    }
}

/// Probe candidate ports and return every BioShake found.
///
/// Ports that cannot be opened or do not answer are skipped.
pub fn find_device_ports(
    config: &ConnectionConfig,
    try_ports: Option<&[String]>,
) -> Vec<DeviceIdentity> {
    let mut found = Vec::new();

    for port in candidate_ports(try_ports) {
        let probe_config = ConnectionConfig {
            port_name: Some(port.clone()),
            ..config.clone()
        };
        let mut device = match Bioshake::open(probe_config) {
            Ok(device) => device,
            Err(e) => {
                tracing::debug!("skipping '{}': {}", port, e);
                continue;
            }
        };

        match identify(&mut device) {
            Ok(Some(identity)) => {
                tracing::info!("found {} on '{}'", identity.description, port);
                found.push(identity);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("'{}' did not identify: {}", port, e),
        }
        device.close();
    }

    found
}

/// Pick the single matching port out of a discovery result
pub fn select_single(found: &[DeviceIdentity], tried: &[String]) -> Result<String, ProtocolError> {
    match found {
        [only] => Ok(only.port_name.clone()),
        [] => Err(ProtocolError::PortNotFound(tried.join(", "))),
        many => Err(ProtocolError::PortAmbiguous(
            many.iter().map(|d| d.port_name.clone()).collect(),
        )),
    }
}

/// Find the port of the single attached BioShake
pub fn find_device_port(
    config: &ConnectionConfig,
    try_ports: Option<&[String]>,
) -> Result<String, ProtocolError> {
    let tried = candidate_ports(try_ports);
    let found = find_device_ports(config, Some(&tried));
    select_single(&found, &tried)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(port: &str) -> DeviceIdentity {
        DeviceIdentity {
            port_name: port.to_string(),
            description: "BioShake 3000 elm".to_string(),
            version: "2.0.5".to_string(),
        }
    }

    #[test]
    fn test_description_classifier() {
        assert!(is_bioshake_description("BioShake 3000 elm"));
        assert!(is_bioshake_description("BIOSHAKE iQ"));
        assert!(!is_bioshake_description("ColdPlate"));
        assert!(!is_bioshake_description(""));
    }

    #[test]
    fn test_select_single_match() {
        let found = vec![identity("/dev/ttyUSB0")];
        assert_eq!(select_single(&found, &[]).unwrap(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_select_no_match() {
        let tried = vec!["/dev/ttyUSB0".to_string(), "/dev/ttyUSB1".to_string()];
        match select_single(&[], &tried) {
            Err(ProtocolError::PortNotFound(ports)) => {
                assert_eq!(ports, "/dev/ttyUSB0, /dev/ttyUSB1")
            }
            other => panic!("expected PortNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_select_ambiguous() {
        let found = vec![identity("/dev/ttyUSB0"), identity("/dev/ttyUSB1")];
        match select_single(&found, &[]) {
            Err(ProtocolError::PortAmbiguous(ports)) => {
                assert_eq!(ports, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"])
            }
            other => panic!("expected PortAmbiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_candidates() {
        let ports = vec!["/dev/tty.usbserial-A1".to_string()];
        assert_eq!(candidate_ports(Some(&ports)), ports);
    }

    #[test]
    fn test_unopenable_ports_are_skipped() {
        let config = ConnectionConfig {
            settle_delay_ms: 0,
            ..ConnectionConfig::default()
        };
        let ports = vec!["/dev/bioshake-missing-port".to_string()];
        assert!(find_device_ports(&config, Some(&ports)).is_empty());
        assert!(matches!(
            find_device_port(&config, Some(&ports)),
            Err(ProtocolError::PortNotFound(_))
        ));
    }
}
