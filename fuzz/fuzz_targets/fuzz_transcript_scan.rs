#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as scanned text, and as a file read through a small tail window
    let text = String::from_utf8_lossy(data);
    let _ = agentline::agent::transcript::scan_text(&text);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fuzz.jsonl");
    {
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
    }
    let _ = agentline::agent::transcript::scan_tail(&path, 64);
});
