pub mod progress;

/// Printed on stderr so the report on stdout stays machine-readable.
pub fn print_banner() {
    eprintln!("doppler-rx {}", env!("CARGO_PKG_VERSION"));
}
