//! Query Windows
//!
//! Heatmap requests carry their time window as signed offsets from now:
//!
//! ```text
//! ?start=-60m&end=-1m
//! ?start=-1h30m
//! ?start=-1.5h&end=0
//! ```
//!
//! Offsets are sequences of `<number><unit>` with units `ns`, `us`, `ms`,
//! `s`, `m`, `h`, optionally signed. Unparseable offsets fall back to the
//! default window.

use chrono::{DateTime, Duration, Utc};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1},
    combinator::{all_consuming, map, map_res, opt, value},
    multi::many1,
    sequence::{pair, preceded, tuple},
    IResult,
};

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Parse a signed offset such as `-1h30m` or `90s`
pub fn parse_offset(input: &str) -> Result<Duration, String> {
    match all_consuming(offset)(input.trim()) {
        Ok((_, nanos)) => Ok(Duration::nanoseconds(nanos)),
        Err(_) => Err(format!("Invalid time offset: '{}'", input)),
    }
}

/// Resolve `[start, end)` from optional offsets relative to `now`
///
/// Defaults: `start = now - interval`, `end = now`.
pub fn resolve_window(
    now: DateTime<Utc>,
    start: Option<&str>,
    end: Option<&str>,
    interval: Duration,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let resolve = |offset: Option<&str>, default: DateTime<Utc>| match offset {
        None | Some("") => default,
        Some(raw) => match parse_offset(raw) {
            Ok(delta) => now + delta,
            Err(e) => {
                tracing::debug!(error = %e, "Using default window bound");
                default
            }
        },
    };

    (resolve(start, now - interval), resolve(end, now))
}

fn offset(input: &str) -> IResult<&str, i64> {
    let (input, sign) = opt(alt((char('-'), char('+'))))(input)?;
    let (input, magnitude) = alt((components, value(0, char('0'))))(input)?;

    Ok((input, if sign == Some('-') { -magnitude } else { magnitude }))
}

fn components(input: &str) -> IResult<&str, i64> {
    map_res(many1(component), |parts: Vec<i64>| {
        parts
            .into_iter()
            .try_fold(0i64, |total, part| total.checked_add(part))
            .ok_or("offset overflows")
    })(input)
}

/// One `<number><unit>` in nanoseconds
fn component(input: &str) -> IResult<&str, i64> {
    map_res(tuple((number, unit)), |((whole, fraction), unit)| {
        scale(whole, fraction, unit).ok_or("offset overflows")
    })(input)
}

/// `12`, `1.5`, `2.`, `.5` as (whole digits, fraction digits)
fn number(input: &str) -> IResult<&str, (&str, &str)> {
    alt((
        pair(
            digit1,
            map(opt(preceded(char('.'), digit0)), |f: Option<&str>| {
                f.unwrap_or("")
            }),
        ),
        map(preceded(char('.'), digit1), |f| ("", f)),
    ))(input)
}

fn unit(input: &str) -> IResult<&str, i64> {
    alt((
        value(1, tag("ns")),
        value(NANOS_PER_MICRO, alt((tag("us"), tag("µs"), tag("μs")))),
        value(NANOS_PER_MILLI, tag("ms")),
        value(NANOS_PER_SEC, tag("s")),
        value(60 * NANOS_PER_SEC, tag("m")),
        value(3600 * NANOS_PER_SEC, tag("h")),
    ))(input)
}

fn scale(whole: &str, fraction: &str, unit: i64) -> Option<i64> {
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(unit)?;

    if !fraction.is_empty() {
        let digits = fraction.len().min(18);
        let numerator: f64 = fraction[..digits].parse().ok()?;
        let part = numerator / 10f64.powi(digits as i32) * unit as f64;
        nanos = nanos.checked_add(part as i64)?;
    }

    Some(nanos)
}
