use std::time::Duration;

use embedded_io::{Read, Write};
use log::{debug, info, warn};

use crate::config::ImportConfig;
use crate::error::DiscoveryError;
use crate::serial::SerialLink;
use crate::transport::{CMD_READ_VERSION, TelegramTransport};

/// Platform serial access: list interface names and open one of them.
pub trait PortProvider {
    type Link: Read + Write;

    fn port_names(&mut self) -> Result<Vec<String>, DiscoveryError>;

    fn open(
        &mut self,
        name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self::Link, DiscoveryError>;
}

/// The serial ports the operating system reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortProvider for SystemPorts {
    type Link = SerialLink;

    fn port_names(&mut self) -> Result<Vec<String>, DiscoveryError> {
        Ok(serialport::available_ports()?
            .into_iter()
            .map(|p| p.port_name)
            .collect())
    }

    fn open(
        &mut self,
        name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self::Link, DiscoveryError> {
        Ok(SerialLink::open(name, baud_rate, timeout)?)
    }
}

/// An interface that answered the version query. Dropping it closes the
/// port.
#[derive(Debug)]
pub struct DeviceLink<L> {
    pub port_name: String,
    pub transport: TelegramTransport<L>,
}

/// Find the interface the watch is attached to.
///
/// Every candidate is opened and sent one version query. The first one
/// that returns any valid telegram is kept open and returned; the others
/// are closed again.
pub fn discover<P: PortProvider>(
    provider: &mut P,
    config: &ImportConfig,
) -> Option<DeviceLink<P::Link>> {
    let candidates = match &config.port {
        Some(port) => vec![port.clone()],
        None => match provider.port_names() {
            Ok(names) => names,
            Err(e) => {
                warn!("listing serial ports failed: {e}");
                Vec::new()
            }
        },
    };
    debug!("serial port candidates: {candidates:?}");

    for name in candidates {
        debug!("trying {name}");
        let link = match provider.open(&name, config.baud_rate, config.read_timeout()) {
            Ok(link) => link,
            Err(e) => {
                debug!("{name}: {e}");
                continue;
            }
        };
        let mut transport = TelegramTransport::new(link, config.transport());
        match transport.send(&[CMD_READ_VERSION], config.probe_retries) {
            Ok(_) => {
                info!("found watch on {name}");
                return Some(DeviceLink {
                    port_name: name,
                    transport,
                });
            }
            Err(e) => debug!("{name}: no watch ({e})"),
        }
    }
    None
}
