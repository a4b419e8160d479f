// Human-readable timeout strings ("15m", "1h") to milliseconds.

use regex::Regex;
use std::sync::OnceLock;

/// Fallback timeout applied whenever an agent's configured timeout is
/// absent or unparseable: 10 minutes.
pub const DEFAULT_SESSION_TIMEOUT_MS: i64 = 10 * 60 * 1000;

static DURATION_RE: OnceLock<Regex> = OnceLock::new();

/// Parse a duration string like `15m`, `1h`, `30s` or `2d` to milliseconds.
///
/// Anything that does not match `<integer><unit>` (unit one of s/m/h/d,
/// case-insensitive) resolves to [`DEFAULT_SESSION_TIMEOUT_MS`] with a
/// warning. This never fails the caller: a badly configured agent should
/// degrade to the default, not break session creation.
pub fn parse_duration_ms(input: &str) -> i64 {
    if input.is_empty() {
        return DEFAULT_SESSION_TIMEOUT_MS;
    }

    let re = DURATION_RE
        .get_or_init(|| Regex::new(r"^(\d+)([smhd])$").expect("duration pattern is valid"));

    let lowered = input.to_lowercase();
    let Some(caps) = re.captures(&lowered) else {
        tracing::warn!(duration = %input, "invalid duration format, using default 10m");
        return DEFAULT_SESSION_TIMEOUT_MS;
    };

    let Ok(value) = caps[1].parse::<i64>() else {
        tracing::warn!(duration = %input, "duration value out of range, using default 10m");
        return DEFAULT_SESSION_TIMEOUT_MS;
    };

    let multiplier = match &caps[2] {
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        _ => unreachable!("unit constrained by the pattern"),
    };

    value.saturating_mul(multiplier)
}
