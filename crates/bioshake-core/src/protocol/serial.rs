//! Serial port handling
//!
//! Provides low-level serial port access and the serial [`Transport`] used
//! to talk to BioShake devices.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use super::transport::{Transport, WriteThrottle};
use super::ProtocolError;

/// Per-read blocking bound on the OS port; the overall line deadline is
/// enforced by [`SerialTransport::read_line`].
const PORT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,

    /// Serial number (if available)
    pub serial_number: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
                serial_number: usb_info.serial_number,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Sort key so that ttyUSB* ports (the BioShake FTDI bridge) come first,
/// then ttyACM*, each numerically, then everything else by name.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // Linux-only: the enumeration API can miss ports without udev metadata
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Open a serial port at the given baud rate
pub fn open_port(name: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, ProtocolError> {
    serialport::new(name, baud_rate)
        .timeout(PORT_POLL_TIMEOUT)
        .open()
        .map_err(|e| ProtocolError::OpenFailed {
            port: name.to_string(),
            reason: e.to_string(),
        })
}

/// Configure a serial port for BioShake communication (8-N-1, no flow control)
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    Ok(())
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All)
        .map_err(|e| ProtocolError::SerialError(e.to_string()))
}

/// Byte port a [`SerialTransport`] can drive
pub trait LinePort: Read + Write {
    /// Drop bytes received but not yet read
    fn clear_input(&mut self) -> io::Result<()>;

    /// Bound how long a single `read` may block. Ports without a
    /// configurable timeout may ignore this.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        let _ = timeout;
        Ok(())
    }
}

impl LinePort for Box<dyn SerialPort> {
    fn clear_input(&mut self) -> io::Result<()> {
        self.clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout).map_err(io::Error::from)
    }
}

/// Line-oriented [`Transport`] over a byte port.
///
/// Generic over the port so any [`LinePort`] can be driven the same way;
/// [`SerialTransport::open`] produces one backed by a real serial port.
pub struct SerialTransport<P = Box<dyn SerialPort>> {
    port: Option<P>,
    port_name: String,
    throttle: WriteThrottle,
}

impl SerialTransport<Box<dyn SerialPort>> {
    /// Open, configure and flush a serial port
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        min_write_spacing: Duration,
    ) -> Result<Self, ProtocolError> {
        let mut port = open_port(port_name, baud_rate)?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;

        tracing::debug!("Serial port '{}' opened at {} baud", port_name, baud_rate);
        Ok(Self::from_port(port, port_name, min_write_spacing))
    }
}

impl<P: LinePort> SerialTransport<P> {
    /// Wrap an already open port
    pub fn from_port(port: P, port_name: impl Into<String>, min_write_spacing: Duration) -> Self {
        Self {
            port: Some(port),
            port_name: port_name.into(),
            throttle: WriteThrottle::new(min_write_spacing),
        }
    }

    /// Name of the underlying port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Minimum spacing enforced between writes
    pub fn min_write_spacing(&self) -> Duration {
        self.throttle.min_spacing()
    }

    /// Access the underlying port, if still open
    pub fn port(&self) -> Option<&P> {
        self.port.as_ref()
    }
}

impl<P: LinePort> Transport for SerialTransport<P> {
    fn write(&mut self, frame: &[u8]) -> Result<usize, ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;

        self.throttle.wait();
        port.write_all(frame)
            .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
        port.flush()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
        self.throttle.mark();

        Ok(frame.len())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;

        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        let mut poll_timeout = None;
        let start = Instant::now();

        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                tracing::trace!(
                    "read_line: timed out after {}ms with {} partial bytes",
                    timeout.as_millis(),
                    line.len()
                );
                return Err(ProtocolError::Timeout);
            }

            // A blocking read must not outlive the line deadline
            let poll = remaining.min(PORT_POLL_TIMEOUT);
            if poll_timeout != Some(poll) {
                port.set_read_timeout(poll)
                    .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
                poll_timeout = Some(poll);
            }

            match port.read(&mut byte) {
                Ok(0) => {
                    // Nothing buffered yet
                    std::thread::sleep(Duration::from_millis(1).min(remaining));
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        return Ok(line);
                    }
                    line.push(byte[0]);
                }
                Err(ref e)
                    if e.kind() == ErrorKind::TimedOut
                        || e.kind() == ErrorKind::WouldBlock
                        || e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(ProtocolError::SerialError(e.to_string())),
            }
        }
    }

    fn discard_input(&mut self) -> Result<(), ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;

        // Clear only once the next write is allowed, so nothing that lands
        // during the spacing wait survives into the next reply
        self.throttle.wait();
        port.clear_input()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::debug!("Serial port '{}' closed", self.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory port: reads drain `input`, writes append to `output`
    struct LoopPort {
        input: VecDeque<u8>,
        output: Vec<u8>,
    }

    impl LoopPort {
        fn with_input(input: &[u8]) -> Self {
            Self {
                input: input.iter().copied().collect(),
                output: Vec::new(),
            }
        }
    }

    impl Read for LoopPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.input.pop_front() {
                Some(b) if !buf.is_empty() => {
                    buf[0] = b;
                    Ok(1)
                }
                Some(b) => {
                    self.input.push_front(b);
                    Ok(0)
                }
                None => Err(io::Error::new(ErrorKind::TimedOut, "no data")),
            }
        }
    }

    impl Write for LoopPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LinePort for LoopPort {
        fn clear_input(&mut self) -> io::Result<()> {
            self.input.clear();
            Ok(())
        }
    }

    /// Silent port whose reads block for the configured read timeout,
    /// like an OS serial port with nothing to deliver
    struct SilentPort {
        read_timeout: Duration,
    }

    impl Read for SilentPort {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(self.read_timeout);
            Err(io::Error::new(ErrorKind::TimedOut, "no data"))
        }
    }

    impl Write for SilentPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LinePort for SilentPort {
        fn clear_input(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.read_timeout = timeout;
            Ok(())
        }
    }

    #[test]
    fn test_list_ports() {
        // This test just ensures the function doesn't panic
        let ports = list_ports();
        for port in &ports {
            println!("Found port: {} - {:?}", port.name, port.product);
        }
    }

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyUSB10",
        ];
        let mut ports: Vec<PortInfo> = names
            .into_iter()
            .map(|n| PortInfo::bare(n.to_string()))
            .collect();

        ports.sort_by_key(|p| port_sort_key(&p.name));
        let ordered: Vec<String> = ports.into_iter().map(|p| p.name).collect();

        assert_eq!(
            ordered,
            vec![
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/ttyUSB10",
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_read_line_excludes_newline() {
        let port = LoopPort::with_input(b"1.2.3\r\nrest");
        let mut transport = SerialTransport::from_port(port, "loop", Duration::ZERO);

        let line = transport.read_line(Duration::from_millis(100)).unwrap();
        assert_eq!(line, b"1.2.3\r".to_vec());
    }

    #[test]
    fn test_read_line_times_out_without_terminator() {
        let port = LoopPort::with_input(b"partial");
        let mut transport = SerialTransport::from_port(port, "loop", Duration::ZERO);

        let start = Instant::now();
        let result = transport.read_line(Duration::from_millis(20));
        assert!(matches!(result, Err(ProtocolError::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_read_line_does_not_overrun_deadline() {
        let port = SilentPort {
            read_timeout: Duration::from_millis(100),
        };
        let mut transport = SerialTransport::from_port(port, "silent", Duration::ZERO);

        let start = Instant::now();
        let result = transport.read_line(Duration::from_millis(25));
        let elapsed = start.elapsed();
        assert!(matches!(result, Err(ProtocolError::Timeout)));
        assert!(elapsed >= Duration::from_millis(25));
        assert!(elapsed < Duration::from_millis(80), "took {:?}", elapsed);
        assert!(transport.port().unwrap().read_timeout <= PORT_POLL_TIMEOUT);
    }

    #[test]
    fn test_discard_input_drops_stale_bytes() {
        let port = LoopPort::with_input(b"e\r\n");
        let mut transport = SerialTransport::from_port(port, "loop", Duration::ZERO);

        transport.discard_input().unwrap();
        assert!(transport.port().unwrap().input.is_empty());
        assert!(matches!(
            transport.read_line(Duration::from_millis(5)),
            Err(ProtocolError::Timeout)
        ));
    }

    #[test]
    fn test_write_passes_frame_through() {
        let port = LoopPort::with_input(b"");
        let mut transport = SerialTransport::from_port(port, "loop", Duration::ZERO);

        assert_eq!(transport.write(b"shakeOn\r").unwrap(), 8);
        assert_eq!(transport.port().unwrap().output, b"shakeOn\r".to_vec());
    }

    #[test]
    fn test_closed_transport_rejects_io() {
        let port = LoopPort::with_input(b"ok\n");
        let mut transport = SerialTransport::from_port(port, "loop", Duration::ZERO);

        transport.close();
        transport.close();
        assert!(!transport.is_open());
        assert!(matches!(
            transport.write(b"shakeOff\r"),
            Err(ProtocolError::NotConnected)
        ));
        assert!(matches!(
            transport.discard_input(),
            Err(ProtocolError::NotConnected)
        ));
        assert!(matches!(
            transport.read_line(Duration::from_millis(5)),
            Err(ProtocolError::NotConnected)
        ));
    }
}
