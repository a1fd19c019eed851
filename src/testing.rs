//! In-memory stand-ins for the serial link, the port list, the progress
//! sink and the watch itself.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use embedded_io::ErrorKind;

use crate::discovery::PortProvider;
use crate::error::DiscoveryError;
use crate::monitor::ProgressMonitor;
use crate::telegram::Telegram;
use crate::transport::{CMD_READ_MEMORY, CMD_READ_VERSION, TransportConfig};
use crate::{Decode, Encode};

/// Transport timing without any sleeps.
pub fn instant() -> TransportConfig {
    TransportConfig {
        settle_per_byte: Duration::ZERO,
        timeout_pause: Duration::ZERO,
    }
}

pub fn response_frame(payload: &[u8]) -> Vec<u8> {
    let t = Telegram::new(payload).unwrap();
    let mut buf = vec![0; t.len()];
    t.encode(&mut buf).unwrap();
    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Byte(u8),
    Timeout,
    Fault(ErrorKind),
}

#[derive(Debug)]
pub struct ScriptError(pub ErrorKind);

impl embedded_io::Error for ScriptError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>>>;

/// A link that answers each flushed request with the next scripted answer,
/// or with whatever its responder computes from the request frame. Reading
/// past the queued bytes times out.
pub struct ScriptedLink {
    answers: VecDeque<Vec<Step>>,
    responder: Option<Responder>,
    pending: Vec<u8>,
    rx: VecDeque<Step>,
    writes: Vec<Vec<u8>>,
}

impl core::fmt::Debug for ScriptedLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScriptedLink")
            .field("answers", &self.answers.len())
            .field("writes", &self.writes.len())
            .finish()
    }
}

impl ScriptedLink {
    pub fn new() -> ScriptedLink {
        ScriptedLink {
            answers: VecDeque::new(),
            responder: None,
            pending: Vec::new(),
            rx: VecDeque::new(),
            writes: Vec::new(),
        }
    }

    pub fn answer(self, bytes: Vec<u8>) -> ScriptedLink {
        self.answer_steps(bytes.into_iter().map(Step::Byte).collect())
    }

    pub fn answer_steps(mut self, steps: Vec<Step>) -> ScriptedLink {
        self.answers.push_back(steps);
        self
    }

    pub fn responder(mut self, f: impl FnMut(&[u8]) -> Option<Vec<u8>> + 'static) -> ScriptedLink {
        self.responder = Some(Box::new(f));
        self
    }

    /// Every request frame written so far.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }
}

impl embedded_io::ErrorType for ScriptedLink {
    type Error = ScriptError;
}

impl embedded_io::Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.rx.pop_front() {
            Some(Step::Byte(b)) => {
                buf[0] = b;
                Ok(1)
            }
            Some(Step::Fault(kind)) => Err(ScriptError(kind)),
            Some(Step::Timeout) | None => Err(ScriptError(ErrorKind::TimedOut)),
        }
    }
}

impl embedded_io::Write for ScriptedLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let request = core::mem::take(&mut self.pending);
        if let Some(steps) = self.answers.pop_front() {
            self.rx.extend(steps);
        } else if let Some(responder) = self.responder.as_mut() {
            if let Some(bytes) = responder(&request) {
                self.rx.extend(bytes.into_iter().map(Step::Byte));
            }
        }
        self.writes.push(request);
        Ok(())
    }
}

/// Answers like a watch holding `image`: a version for the version query
/// and `[status, data...]` for memory reads. Memory past the image reads
/// as erased flash.
pub fn watch(image: Vec<u8>) -> impl FnMut(&[u8]) -> Option<Vec<u8>> + 'static {
    move |request: &[u8]| {
        let telegram = Telegram::decode(request).ok()?;
        let payload = telegram.payload();
        match payload.first()? {
            &CMD_READ_VERSION => Some(response_frame(b"NAVRUN 1.07")),
            &CMD_READ_MEMORY if payload.len() == 5 => {
                let address = u32::from_le_bytes([payload[1], payload[2], payload[3], 0]) as usize;
                let size = payload[4] as usize;
                let mut answer = vec![0x00];
                answer.extend((address..address + size).map(|a| image.get(a).copied().unwrap_or(0xFF)));
                Some(response_frame(&answer))
            }
            _ => None,
        }
    }
}

pub fn watch_link(image: Vec<u8>) -> ScriptedLink {
    ScriptedLink::new().responder(watch(image))
}

/// Port list where each name maps to a link, or to `None` when opening it
/// fails.
pub struct ScriptedPorts {
    names: Vec<String>,
    links: HashMap<String, Option<ScriptedLink>>,
    pub opened: Vec<String>,
    pub opened_with: Vec<(u32, Duration)>,
}

impl ScriptedPorts {
    pub fn new() -> ScriptedPorts {
        ScriptedPorts {
            names: Vec::new(),
            links: HashMap::new(),
            opened: Vec::new(),
            opened_with: Vec::new(),
        }
    }

    pub fn port(mut self, name: &str, link: Option<ScriptedLink>) -> ScriptedPorts {
        self.names.push(name.to_string());
        self.links.insert(name.to_string(), link);
        self
    }
}

impl PortProvider for ScriptedPorts {
    type Link = ScriptedLink;

    fn port_names(&mut self) -> Result<Vec<String>, DiscoveryError> {
        Ok(self.names.clone())
    }

    fn open(
        &mut self,
        name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self::Link, DiscoveryError> {
        self.opened.push(name.to_string());
        self.opened_with.push((baud_rate, timeout));
        self.links
            .get_mut(name)
            .and_then(Option::take)
            .ok_or_else(|| {
                DiscoveryError::Serial(serialport::Error::new(
                    serialport::ErrorKind::NoDevice,
                    format!("{name} unavailable"),
                ))
            })
    }
}

#[derive(Debug, Default)]
pub struct RecordingMonitor {
    pub percents: Vec<f32>,
    pub statuses: Vec<String>,
    pub errors: Vec<String>,
}

impl ProgressMonitor for RecordingMonitor {
    fn set_percent_complete(&mut self, fraction: f32) {
        self.percents.push(fraction);
    }

    fn set_status_text(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }

    fn set_error_text(&mut self, text: &str) {
        self.errors.push(text.to_string());
    }
}

/// Synthetic memory image, erased (0xFF) unless written.
pub struct ImageBuilder {
    bytes: Vec<u8>,
}

impl ImageBuilder {
    pub fn new(pages: usize) -> ImageBuilder {
        ImageBuilder {
            bytes: vec![0xFF; pages * 0x1000],
        }
    }

    /// Write the activity index table at 0x100.
    pub fn index(self, entries: &[u8]) -> ImageBuilder {
        self.put(0x100, entries)
    }

    pub fn put(mut self, offset: usize, data: &[u8]) -> ImageBuilder {
        if self.bytes.len() < offset + data.len() {
            self.bytes.resize(offset + data.len(), 0xFF);
        }
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub struct SummaryBytes {
    pub samples: u16,
    pub laps: u8,
    /// `{sec, min, hour, day, month, year - 2000}`
    pub start: [u8; 6],
    /// `{sec, min, hour}`
    pub elapsed: [u8; 3],
    /// Decimetres
    pub distance: u32,
    /// Hundredths of a kilocalorie
    pub calories: u32,
    pub heart_rate: [u8; 3],
}

impl SummaryBytes {
    pub fn new(samples: u16, laps: u8) -> SummaryBytes {
        SummaryBytes {
            samples,
            laps,
            start: [30, 15, 12, 3, 7, 11],
            elapsed: [10, 45, 0],
            distance: 100_255,
            calories: 61_250,
            heart_rate: [142, 171, 95],
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut b = vec![0; 47];
        b[0..2].copy_from_slice(&self.samples.to_le_bytes());
        b[2] = self.laps;
        b[3..9].copy_from_slice(&self.start);
        b[9..12].copy_from_slice(&self.elapsed);
        b[16..20].copy_from_slice(&self.distance.to_le_bytes());
        b[20..22].copy_from_slice(&1_050u16.to_le_bytes());
        b[22..24].copy_from_slice(&1_620u16.to_le_bytes());
        b[28..31].copy_from_slice(&self.heart_rate);
        b[32..36].copy_from_slice(&self.calories.to_le_bytes());
        b[36..39].copy_from_slice(&[20, 5, 0]);
        b[40..43].copy_from_slice(&[10, 30, 1]);
        b[44..47].copy_from_slice(&[0, 10, 0]);
        b
    }
}

/// `split` is `{hour, min, sec, hundredths as BCD}`.
pub fn lap_bytes(split: [u8; 4], heart_rate: u8, distance: u32) -> Vec<u8> {
    let mut b = vec![0; 16];
    b[0..4].copy_from_slice(&split);
    b[4] = heart_rate;
    b[8..12].copy_from_slice(&distance.to_le_bytes());
    b[12..14].copy_from_slice(&980u16.to_le_bytes());
    b
}

/// `time` is `{year - 2000, month, day, hour, min, sec}`.
pub fn full_sample(
    sat: u8,
    time: [u8; 6],
    longitude: i32,
    latitude: i32,
    altitude: i16,
    heart_rate: u8,
) -> Vec<u8> {
    let mut b = vec![0x80, sat];
    b.extend_from_slice(&time);
    b.extend_from_slice(&longitude.to_le_bytes());
    b.extend_from_slice(&latitude.to_le_bytes());
    b.extend_from_slice(&altitude.to_le_bytes());
    b.extend_from_slice(&270u16.to_le_bytes());
    b.extend_from_slice(&12u16.to_le_bytes());
    b.extend_from_slice(&310u16.to_le_bytes());
    b.push(heart_rate);
    b
}

pub fn short_sample(
    sat: u8,
    minute: u8,
    second: u8,
    d_longitude: i32,
    d_latitude: i32,
    d_altitude: i16,
    heart_rate: u8,
) -> Vec<u8> {
    let mut b = vec![0x01, sat, minute, second];
    b.extend_from_slice(&d_longitude.to_le_bytes());
    b.extend_from_slice(&d_latitude.to_le_bytes());
    b.extend_from_slice(&d_altitude.to_le_bytes());
    b.extend_from_slice(&265u16.to_le_bytes());
    b.extend_from_slice(&9u16.to_le_bytes());
    b.extend_from_slice(&305u16.to_le_bytes());
    b.push(heart_rate);
    b
}

pub fn empty_sample(time: [u8; 6], heart_rate: u8) -> Vec<u8> {
    let mut b = vec![0x03];
    b.extend_from_slice(&time);
    b.push(heart_rate);
    b
}

pub fn no_data_sample(minute: u8, second: u8) -> Vec<u8> {
    vec![0x02, minute, second]
}
