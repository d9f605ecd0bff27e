//! Version information with embedded git metadata.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit SHA (short) at build time, or "unknown" if unavailable.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Full version string: `{version}+{sha}`, or just `{version}` when built
/// outside a git tree (vergen emits a sentinel value there).
pub fn version_string() -> String {
    if GIT_SHA == "unknown" || GIT_SHA.starts_with("VERGEN") {
        return PKG_VERSION.to_string();
    }
    format!("{PKG_VERSION}+{}", &GIT_SHA[..7.min(GIT_SHA.len())])
}
