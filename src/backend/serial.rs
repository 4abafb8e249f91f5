//! Serial port transport backed by the `serialport` crate

use super::transport::Transport;
use crate::config::SerialConfig;
use crate::error::{Result, SerialGraphError};
use serialport::SerialPort;
use std::io::Read;
use std::time::Duration;

/// Information about a detected serial port (for `--list-ports`)
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// OS name of the port (e.g. "/dev/ttyACM0", "COM3")
    pub name: String,
    /// Short description of the port type
    pub kind: String,
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

/// List the serial ports visible to the OS
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let kind = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => match usb.product {
                    Some(product) => format!("USB {:04x}:{:04x} {}", usb.vid, usb.pid, product),
                    None => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
                },
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                serialport::SerialPortType::Unknown => "Unknown".to_string(),
            };
            PortInfo {
                name: p.port_name,
                kind,
            }
        })
        .collect())
}

/// Transport reading from a physical or virtual serial port
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create an unopened transport
    pub fn new(port_name: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            read_timeout,
            port: None,
        }
    }

    /// Create from the serial section of the application config
    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(
            config.port.clone(),
            config.baud_rate,
            Duration::from_millis(config.read_timeout_ms),
        )
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        let name = &self.port_name;
        self.port.as_mut().ok_or_else(|| SerialGraphError::Connection {
            port: name.clone(),
            message: "port is not open".to_string(),
        })
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        tracing::info!(
            "Opening serial port {} at {} baud",
            self.port_name,
            self.baud_rate
        );

        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| SerialGraphError::Connection {
                port: self.port_name.clone(),
                message: e.to_string(),
            })?;

        self.port = Some(port);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let waiting = self.port_mut()?.bytes_to_read()?;
        Ok(waiting as usize)
    }

    fn read_available(&mut self) -> Result<Vec<u8>> {
        let port = self.port_mut()?;
        let waiting = port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; waiting];
        match port.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("Closed serial port {}", self.port_name);
        }
    }

    fn description(&self) -> String {
        format!("{} @ {} baud", self.port_name, self.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unopened_transport_reports_closed() {
        let mut transport =
            SerialTransport::new("/dev/does-not-exist", 115_200, Duration::from_secs(1));
        assert!(!transport.is_open());
        assert!(transport.bytes_available().is_err());
        assert!(transport.description().contains("115200"));
        // closing an unopened port is a no-op
        transport.close();
    }

    #[test]
    fn test_open_missing_port_is_connection_error() {
        let mut transport =
            SerialTransport::new("/dev/serialgraph-missing-port", 9600, Duration::from_millis(10));
        match transport.open() {
            Err(SerialGraphError::Connection { port, .. }) => {
                assert_eq!(port, "/dev/serialgraph-missing-port")
            }
            other => panic!("expected connection error, got {:?}", other.map(|_| ())),
        }
        assert!(!transport.is_open());
    }
}
