//! The depth guard reports a dropped push through `tracing`.

use pathtrace::{ManualClock, MemorySink, TraceState};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Formatted log output shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn warning_fires_only_past_the_limit() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let root = TraceState::builder()
        .clock(Arc::new(ManualClock::new(0)))
        .sink(Arc::new(MemorySink::new()))
        .build();
    let deep = (0..201)
        .try_fold(root, |state, i| state.push(&format!("level {i}")))
        .unwrap();
    assert_eq!(deep.depth(), 201);
    assert!(!logs.contents().contains("WARN"), "{}", logs.contents());

    let same = deep.push("overflow").unwrap();
    assert_eq!(same.depth(), 201);
    assert_eq!(same.current_segment_name().unwrap(), "level 200");

    let output = logs.contents();
    assert_eq!(output.matches("path exceeds depth limit").count(), 1, "{output}");
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("depth=201"), "{output}");
    assert!(output.contains("limit=200"), "{output}");
    assert!(output.contains("section=") && output.contains("overflow"), "{output}");
    assert!(output.contains("backtrace="), "{output}");
}
