use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let mut label = version.clone();
    if let Ok(output) = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output()
        && output.status.success()
    {
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !sha.is_empty() {
            println!("cargo:rustc-env=BULBSWAP_BUILD_GIT_SHA={sha}");
            label = format!("{version} ({sha})");
        }
    }
    println!("cargo:rustc-env=BULBSWAP_VERSION_LABEL={label}");
}
