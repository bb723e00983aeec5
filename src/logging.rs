use crate::common::*;

/// Line-oriented sink for the pipeline's diagnostics. Returning `None` from
/// `line_writer` disables logging for that line.
pub trait Logger: Debug {
    fn line_writer(&mut self) -> Option<&mut dyn std::io::Write>;
}

/// Logger that throws everything away.
#[derive(Debug, Default)]
pub struct DummyLogger;

/// Logger that keeps all lines in memory. Optionally dumps them to stderr when
/// dropped, which is convenient while chasing a failing test.
#[derive(Debug)]
pub struct VecLogger {
    unit_id: UnitId,
    buf: Vec<u8>,
    dump_on_drop: bool,
}

/// Logger writing every line to a file.
#[derive(Debug)]
pub struct FileLogger(UnitId, std::fs::File);

fn secs_since_unix_epoch() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64())
        .unwrap_or(0.)
}

impl FileLogger {
    pub fn new(unit_id: UnitId, file: std::fs::File) -> Self {
        Self(unit_id, file)
    }
}

impl VecLogger {
    pub fn new(unit_id: UnitId) -> Self {
        Self { unit_id, buf: Vec::new(), dump_on_drop: false }
    }

    pub fn dumping_on_drop(mut self) -> Self {
        self.dump_on_drop = true;
        self
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buf).lines().map(|l| l.to_string()).collect()
    }
}

impl Logger for DummyLogger {
    fn line_writer(&mut self) -> Option<&mut dyn std::io::Write> {
        None
    }
}

impl Logger for VecLogger {
    fn line_writer(&mut self) -> Option<&mut dyn std::io::Write> {
        let _ = write!(&mut self.buf, "UNIT({}) at {:.6} ", self.unit_id, secs_since_unix_epoch());
        Some(self)
    }
}

impl Logger for FileLogger {
    fn line_writer(&mut self) -> Option<&mut dyn std::io::Write> {
        let _ = write!(&mut self.1, "UNIT({}) at {:.6} ", self.0, secs_since_unix_epoch());
        Some(&mut self.1)
    }
}

impl Drop for VecLogger {
    fn drop(&mut self) {
        if !self.dump_on_drop {
            return;
        }
        let stderr = std::io::stderr();
        let mut lock = stderr.lock();
        let _ = writeln!(lock, "--- DROP LOG DUMP ---");
        let _ = std::io::Write::write(&mut lock, self.buf.as_slice());
    }
}

impl std::io::Write for VecLogger {
    fn flush(&mut self) -> Result<(), std::io::Error> {
        Ok(())
    }
    fn write(&mut self, data: &[u8]) -> Result<usize, std::io::Error> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }
}
