use std::process::Command;

fn main() {
    // Prefer the nearest git tag (e.g. "v0.3.0-4-gdeadbee") as the reported
    // version; fall back to the Cargo version outside a checkout.
    let described = Command::new("git")
        .args(["describe", "--tags"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim_end().to_string())
        .filter(|s| !s.is_empty());

    let version = described.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    println!("cargo:rustc-env=KRUEGER_VERSION={version}");
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/tags");
}
