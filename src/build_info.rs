/// Build-time git commit SHA stamped by build.rs when available.
pub fn git_sha() -> Option<&'static str> {
    option_env!("BULBSWAP_BUILD_GIT_SHA")
}

/// Package version plus the commit SHA when the build was stamped.
pub const VERSION_LABEL: &str = env!("BULBSWAP_VERSION_LABEL");

pub fn version_label() -> String {
    VERSION_LABEL.to_string()
}
