use std::sync::Mutex;

use auv_hw::{lock, Connector, HwError, Transport};
use auv_proto::{codec, CodecError, Frame, FRAME_LEN};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("transport unavailable")]
    TransportUnavailable,
    #[error("transport: {0}")]
    Transport(#[from] HwError),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// The radio transport shared by the receive, ping and telemetry loops.
///
/// The transport lock is held for a single read, write or flush. Any I/O
/// failure closes the transport; the receive loop reconnects on its next tick.
pub struct Radio {
    connector: Box<dyn Connector>,
    transport: Mutex<Option<Box<dyn Transport>>>,
}

impl Radio {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self { connector, transport: Mutex::new(None) }
    }

    pub fn is_available(&self) -> bool {
        lock(&self.transport).as_ref().map(|t| t.is_open()).unwrap_or(false)
    }

    pub fn reconnect(&self) -> Result<(), LinkError> {
        let mut slot = lock(&self.transport);
        if slot.as_ref().map(|t| t.is_open()).unwrap_or(false) {
            return Ok(());
        }
        let t = self.connector.connect()?;
        *slot = Some(t);
        info!("radio: device found ({})", self.connector.describe());
        Ok(())
    }

    /// Next whole frame, if one is buffered. A short read is discarded so the
    /// next read starts on a frame boundary.
    pub fn read_frame(&self) -> Result<Option<Frame>, LinkError> {
        let bytes = self.with_transport(|t| t.read(FRAME_LEN))?;
        match bytes.len() {
            0 => Ok(None),
            FRAME_LEN => {
                let mut frame = [0u8; FRAME_LEN];
                frame.copy_from_slice(&bytes);
                Ok(Some(frame))
            }
            n => {
                debug!("radio: dropped {} byte partial frame", n);
                Ok(None)
            }
        }
    }

    pub fn send_payload(&self, payload: u32) -> Result<(), LinkError> {
        let frame = codec::encode(payload)?;
        self.with_transport(|t| t.write(&frame))
    }

    pub fn flush(&self) -> Result<(), LinkError> {
        self.with_transport(|t| t.flush())
    }

    pub fn clear_input(&self) -> Result<(), LinkError> {
        self.with_transport(|t| t.clear_input())
    }

    fn with_transport<T>(
        &self,
        f: impl FnOnce(&mut dyn Transport) -> Result<T, HwError>,
    ) -> Result<T, LinkError> {
        let mut slot = lock(&self.transport);
        let t = slot.as_mut().ok_or(LinkError::TransportUnavailable)?;
        match f(&mut **t) {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("radio: {}; closing, will reconnect", e);
                t.close();
                *slot = None;
                Err(e.into())
            }
        }
    }
}
