use std::io::{self, Write};

/// Writes one human-readable status line for iteration `m` of the current
/// run, or nothing.
///
/// A line is emitted when `refresh > 0` and either `m` is a multiple of
/// `refresh` or the absolute position `start + m` is the last iteration of
/// the `[start, finish)` window. `warmup` selects the phase tag, and
/// `prefix`/`suffix` wrap the line so several chains can share one sink.
#[allow(clippy::too_many_arguments)]
pub fn print_progress<W: Write + ?Sized>(
    m: u64,
    start: u64,
    finish: u64,
    refresh: u64,
    warmup: bool,
    prefix: &str,
    suffix: &str,
    out: &mut W,
) -> io::Result<()> {
    if refresh == 0 {
        return Ok(());
    }
    let it = start + m + 1;
    if m % refresh != 0 && it != finish {
        return Ok(());
    }
    let width = finish.to_string().len();
    let percent = if finish > 0 { 100 * it / finish } else { 100 };
    let phase = if warmup { "Warmup" } else { "Sampling" };
    writeln!(
        out,
        "{prefix}Iteration: {it:>width$} / {finish} [{percent:3}%]  ({phase}){suffix}"
    )
}
