#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(snapshot) = agentline::snapshot::Snapshot::parse(text) {
            let _ = agentline::render::SessionMetrics::from_snapshot(&snapshot);
        }
    }
});
