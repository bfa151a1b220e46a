/// Service name used when the caller does not pick one.
pub static DEFAULT_SERVICE: &str = "keyshelf";

/// File name of the simulated keychain snapshot kept by developer tooling.
pub static DEFAULT_STATE_FILE: &str = "keychain.json";
