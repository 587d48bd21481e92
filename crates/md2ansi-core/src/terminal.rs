//! Terminal width resolution.

use std::io::IsTerminal;

use crate::options::Width;

/// Width used when nothing else is known.
pub const FALLBACK_WIDTH: usize = 80;
/// Narrowest width the renderer will lay out for.
pub const MIN_WIDTH: usize = 20;
/// Widest width the renderer will lay out for.
pub const MAX_WIDTH: usize = 500;

/// Resolve the output width from its possible sources.
///
/// Order: explicit width, then a numeric `COLUMNS` value, then the live
/// terminal size, then [`FALLBACK_WIDTH`]. Zero counts as absent at every
/// step. The result is clamped to `MIN_WIDTH..=MAX_WIDTH`.
pub fn resolve_width(explicit: Width, columns_env: Option<&str>, live: Option<usize>) -> usize {
    let fixed = match explicit {
        Width::Fixed(n) if n > 0 => Some(n),
        _ => None,
    };
    let from_env = columns_env
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0);

    fixed
        .or(from_env)
        .or(live.filter(|&n| n > 0))
        .unwrap_or(FALLBACK_WIDTH)
        .clamp(MIN_WIDTH, MAX_WIDTH)
}

/// Query the width of the terminal attached to stdout, if any.
pub fn live_terminal_width() -> Option<usize> {
    if !std::io::stdout().is_terminal() {
        return None;
    }
    crossterm::terminal::size()
        .ok()
        .map(|(cols, _rows)| cols as usize)
}

/// Detect the terminal width from the environment.
pub fn detect_terminal_width() -> usize {
    width_for(Width::Auto)
}

/// Resolve `width` against the process environment.
pub fn width_for(width: Width) -> usize {
    let columns = std::env::var("COLUMNS").ok();
    let live = match (width, columns.as_deref()) {
        (Width::Fixed(n), _) if n > 0 => None,
        _ => live_terminal_width(),
    };
    resolve_width(width, columns.as_deref(), live)
}
