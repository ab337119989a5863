use std::io;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

use crate::PiiRedactor;

/// `io::Write` adapter that redacts each buffer before forwarding it.
///
/// The fmt layer formats a whole event into one buffer before writing, so a
/// value is never split across two `write` calls.
pub struct RedactingWriter<W> {
    inner: W,
    redactor: Arc<PiiRedactor>,
}

impl<W: io::Write> RedactingWriter<W> {
    pub fn new(inner: W, redactor: Arc<PiiRedactor>) -> Self {
        Self { inner, redactor }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let redacted = self.redactor.redact(&text);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// [`MakeWriter`] handing out redacting stdout writers
#[derive(Clone)]
pub struct RedactingMakeWriter {
    redactor: Arc<PiiRedactor>,
}

impl RedactingMakeWriter {
    pub fn stdout(redactor: PiiRedactor) -> Self {
        Self {
            redactor: Arc::new(redactor),
        }
    }
}

impl<'a> MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(io::stdout(), Arc::clone(&self.redactor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RedactionConfig;
    use std::io::Write;

    #[test]
    fn test_writer_redacts_and_reports_full_length() {
        let redactor = Arc::new(PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        }));
        let mut writer = RedactingWriter::new(Vec::new(), redactor);

        let line = b"notify nurse@ward.example.com\n";
        let written = writer.write(line).unwrap();
        assert_eq!(written, line.len());

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "notify n***@w***\n");
    }
}
