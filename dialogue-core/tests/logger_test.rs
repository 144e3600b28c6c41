//! Tests for [`dialogue_core::init_tracing`].

use dialogue_core::init_tracing;

/// **Test: init_tracing creates missing parent directories and the log file.**
///
/// **Setup:** Temp dir; log path nested two levels below it.
/// **Action:** `init_tracing(path)`.
/// **Expected:** Returns Ok (first global init in this test binary) and the file exists.
#[test]
fn init_tracing_creates_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("nested").join("dialogue.log");

    init_tracing(path.to_str().unwrap()).unwrap();
    tracing::info!("logger test line");

    assert!(path.exists());
}
