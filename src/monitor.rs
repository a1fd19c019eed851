use log::{debug, error, info};

/// Progress and status collaborator updated during discovery and the dump.
pub trait ProgressMonitor {
    /// Fraction complete in `[0, 1]`.
    fn set_percent_complete(&mut self, fraction: f32);
    fn set_status_text(&mut self, text: &str);
    fn set_error_text(&mut self, text: &str);
}

/// Monitor that only writes to the log.
#[derive(Debug, Default)]
pub struct LogMonitor {
    last_tenth: Option<u8>,
}

impl ProgressMonitor for LogMonitor {
    fn set_percent_complete(&mut self, fraction: f32) {
        let tenth = (fraction * 10.0) as u8;
        if self.last_tenth != Some(tenth) {
            self.last_tenth = Some(tenth);
            info!("{:3.0}% complete", fraction * 100.0);
        } else {
            debug!("{:5.1}% complete", fraction * 100.0);
        }
    }

    fn set_status_text(&mut self, text: &str) {
        info!("{text}");
    }

    fn set_error_text(&mut self, text: &str) {
        error!("{text}");
    }
}

/// Keeps reported progress inside `[0, 1]` and never lets it go backwards.
#[derive(Debug, Default)]
pub(crate) struct Progress {
    current: f32,
}

impl Progress {
    pub(crate) fn report(&mut self, monitor: &mut dyn ProgressMonitor, fraction: f32) {
        self.current = fraction.clamp(self.current, 1.0);
        monitor.set_percent_complete(self.current);
    }
}
