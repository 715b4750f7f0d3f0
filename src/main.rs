//! Entry point for the CSVW command-line tool.
//!
//! Delegates to [`csvw::run()`] and translates its `Result` into process
//! exit codes: `0` on success, `1` on any error.

fn main() {
    if csvw::run().is_err() {
        std::process::exit(1);
    }
}
