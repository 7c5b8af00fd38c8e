use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Exponential backoff with up to 50% jitter, clamped to `[min, max]`.
pub(crate) fn backoff_delay(min: Duration, max: Duration, attempt: u32) -> Duration {
    let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis())
        .unwrap_or(u64::MAX)
        .max(min_ms);

    let backoff_multiplier = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let base = min_ms.saturating_mul(backoff_multiplier);

    let jitter_upper_bound = base / 2;
    let jitter = if jitter_upper_bound == 0 {
        0
    } else {
        let now_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        (attempt as u64).hash(&mut hasher);
        now_nanos.hash(&mut hasher);
        hasher.finish() % jitter_upper_bound
    };

    let total_delay_ms = base.saturating_add(jitter).clamp(min_ms, max_ms);
    Duration::from_millis(total_delay_ms)
}
