use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serde::Deserialize;
use tokio_serial::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::{Connector, HwError, Transport};

#[derive(Debug, Clone, Deserialize)]
pub struct RadioConfig {
    /// Serial device of the radio modem, e.g. a `/dev/serial/by-id/...` path.
    pub device: String,
    pub baud: Option<u32>,
}

impl RadioConfig {
    pub fn baud(&self) -> u32 {
        self.baud.unwrap_or(115_200)
    }
}

pub struct SerialConnector {
    cfg: RadioConfig,
}

impl SerialConnector {
    pub fn new(cfg: RadioConfig) -> Self {
        Self { cfg }
    }
}

impl Connector for SerialConnector {
    fn connect(&self) -> Result<Box<dyn Transport>, HwError> {
        let port = tokio_serial::new(&self.cfg.device, self.cfg.baud())
            .timeout(Duration::ZERO)
            .open()?;
        debug!("radio: opened {} @ {}", self.cfg.device, self.cfg.baud());
        Ok(Box::new(SerialTransport { port: Some(port) }))
    }

    fn describe(&self) -> String {
        format!("serial:{}:{}", self.cfg.device, self.cfg.baud())
    }
}

/// 8N1 serial radio modem.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, HwError> {
        self.port.as_mut().ok_or(HwError::TransportUnavailable)
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, n: usize) -> Result<Vec<u8>, HwError> {
        let port = self.port()?;
        let available = port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; n.min(available)];
        match port.read(&mut buf) {
            Ok(k) => buf.truncate(k),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => buf.clear(),
            Err(e) => return Err(e.into()),
        }
        Ok(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), HwError> {
        self.port()?.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), HwError> {
        self.port()?.flush()?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<(), HwError> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        self.port = None;
    }
}
