//! Recording bus and chip select used by the unit tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::bus::{OpenBus, SpiBus, Transfer};
use crate::config::SpiConfig;
use crate::error::{ConfigStep, Error, Result};

/// Snapshot of one descriptor as seen by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub tx: Option<Vec<u8>>,
    pub rx_len: Option<usize>,
    pub len: usize,
    pub cs_change: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Cs(bool),
    Call(Vec<Recorded>),
}

/// Shared, ordered log of bus calls and chip-select edges
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Vec<Recorded>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Call(c) => Some(c),
                Event::Cs(_) => None,
            })
            .collect()
    }

    pub fn cs_edges(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Cs(v) => Some(v),
                Event::Call(_) => None,
            })
            .collect()
    }

    /// Chip select that logs into this log, failing assertion if asked to
    pub fn chip_select(&self, fail_assert: bool) -> impl FnMut(bool) -> std::io::Result<()> {
        let log = self.clone();
        move |enable| {
            log.push(Event::Cs(enable));
            if enable && fail_assert {
                Err(std::io::Error::other("cs stuck"))
            } else {
                Ok(())
            }
        }
    }
}

/// Bus that records every call
///
/// Receive buffers are filled with the transmitted byte when there is one,
/// otherwise with an incrementing counter so chunk order is observable.
pub struct RecordingBus {
    pub log: EventLog,
    pub fail_call: Option<usize>,
    pub closed: Arc<AtomicBool>,
    calls: usize,
    counter: u8,
}

impl RecordingBus {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_call: None,
            closed: Arc::new(AtomicBool::new(false)),
            calls: 0,
            counter: 0,
        }
    }

    pub fn failing_at(log: &EventLog, call: usize) -> Self {
        let mut bus = Self::new(log);
        bus.fail_call = Some(call);
        bus
    }
}

impl Drop for RecordingBus {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl SpiBus for RecordingBus {
    fn transfer(&mut self, transfers: &mut [Transfer<'_>]) -> std::io::Result<()> {
        let index = self.calls;
        self.calls += 1;

        let recorded = transfers
            .iter()
            .map(|t| Recorded {
                tx: t.tx.map(|b| b[..t.len].to_vec()),
                rx_len: t.rx.as_ref().map(|b| b.len()),
                len: t.len,
                cs_change: t.cs_change,
            })
            .collect();
        self.log.push(Event::Call(recorded));

        if self.fail_call == Some(index) {
            return Err(std::io::Error::other("bus fault"));
        }

        for t in transfers.iter_mut() {
            if let Some(rx) = t.rx.as_deref_mut() {
                for (i, byte) in rx[..t.len].iter_mut().enumerate() {
                    *byte = match t.tx {
                        Some(tx) => tx[i],
                        None => {
                            self.counter = self.counter.wrapping_add(1);
                            self.counter
                        }
                    };
                }
            }
        }
        Ok(())
    }
}

impl OpenBus for RecordingBus {
    fn open(config: &SpiConfig) -> Result<Self> {
        match config.device.as_str() {
            "missing" => Err(Error::Open {
                path: config.device.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            "bad-speed" => Err(Error::Configure {
                step: ConfigStep::WriteSpeed,
                source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
            }),
            _ => Ok(RecordingBus::new(&EventLog::default())),
        }
    }
}
