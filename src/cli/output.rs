//! Shared output helpers honoring the global `--json` / `--quiet` flags.
//!
//! The flags are propagated through env vars by `main` so every subcommand
//! can check them without threading state around.

/// Whether machine-readable JSON output was requested.
pub fn is_json() -> bool {
    std::env::var("FORAGE_JSON").is_ok()
}

/// Whether non-essential output is suppressed.
pub fn is_quiet() -> bool {
    std::env::var("FORAGE_QUIET").is_ok()
}

/// Print a serializable value as pretty JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: could not serialize output: {e}"),
    }
}

/// Print a human-readable status line unless quiet/JSON mode is active.
pub fn status(message: &str) {
    if !is_quiet() && !is_json() {
        println!("{message}");
    }
}
