use assert_cmd::Command;

fn mobile_pdf() -> Command {
    Command::cargo_bin("mobile-pdf").expect("binary should be built")
}

#[test]
fn test_missing_url_prints_usage() {
    let output = mobile_pdf().output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "stderr was: {}", stderr);
    assert!(stderr.contains("<URL>"));
}

#[test]
fn test_help_lists_capture_options() {
    let output = mobile_pdf().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let flags = [
        "--output",
        "--png",
        "--mode",
        "--width",
        "--scale",
        "--no-reflow",
        "--headed",
        "--no-sandbox",
    ];
    for flag in flags {
        assert!(stdout.contains(flag), "--help is missing {}", flag);
    }
}

#[test]
fn test_invalid_url_fails_before_launch() {
    let output = mobile_pdf()
        .args(["ftp://example.com/page", "--chrome", "/nonexistent/chrome"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported URL scheme"), "stderr was: {}", stderr);
}

#[test]
fn test_zero_width_rejected() {
    let output = mobile_pdf()
        .args(["https://example.com", "--width", "0"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Viewport must be non-empty"), "stderr was: {}", stderr);
}
