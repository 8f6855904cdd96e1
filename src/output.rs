//! Output verbosity shared by the CLI and the `ui` helpers

use std::sync::atomic::{AtomicU8, Ordering};

const UNSET: u8 = 0;
const LOUD: u8 = 1;
const QUIET: u8 = 2;

static VERBOSITY: AtomicU8 = AtomicU8::new(UNSET);

/// Whether decorative output (banners, headers) is suppressed.
///
/// An explicit [`set_quiet`] wins; otherwise `SESSDB_QUIET=1|true` decides.
pub fn is_quiet() -> bool {
    match VERBOSITY.load(Ordering::Relaxed) {
        QUIET => true,
        LOUD => false,
        _ => {
            let quiet = quiet_from_env(std::env::var("SESSDB_QUIET").ok().as_deref());
            VERBOSITY.store(if quiet { QUIET } else { LOUD }, Ordering::Relaxed);
            quiet
        }
    }
}

pub fn set_quiet(quiet: bool) {
    VERBOSITY.store(if quiet { QUIET } else { LOUD }, Ordering::Relaxed);
}

fn quiet_from_env(value: Option<&str>) -> bool {
    value
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
