//! Version information for termrun

/// Crate version, e.g. `0.4.2`
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Version plus build metadata
///
/// `TERMRUN_GIT_HASH` and `TERMRUN_BUILD_DATE` are read at compile time and
/// reported as "unknown" when unset.
pub fn get_version_long() -> String {
    let git_hash = option_env!("TERMRUN_GIT_HASH").unwrap_or("unknown");
    let build_date = option_env!("TERMRUN_BUILD_DATE").unwrap_or("unknown");
    format!("{} (git: {git_hash}, built: {build_date})", get_version())
}
