/// Parse an ISO-8601 duration as returned by the videos endpoint
/// (e.g. "PT1H2M10S", "P1DT3M", "P0D") into whole seconds.
///
/// Only the day/hour/minute/second designators occur in practice; year, month
/// and week designators are rejected rather than guessed at.
pub fn parse_iso8601_duration(s: &str) -> Result<u64, String> {
    let rest = s.strip_prefix('P').ok_or_else(|| format!("expected leading 'P' in {s:?}"))?;

    let mut total: u64 = 0;
    let mut num = String::new();
    let mut in_time = false;
    let mut saw_designator = false;

    for ch in rest.chars() {
        match ch {
            'T' => {
                if in_time {
                    return Err(format!("duplicate 'T' in {s:?}"));
                }
                in_time = true;
            }
            '0'..='9' => num.push(ch),
            'D' | 'H' | 'M' | 'S' => {
                let value: u64 = num
                    .parse()
                    .map_err(|_| format!("missing number before '{ch}' in {s:?}"))?;
                num.clear();
                let factor = match (ch, in_time) {
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    // 'M' outside the time part would mean months.
                    _ => return Err(format!("unsupported designator '{ch}' in {s:?}")),
                };
                total = total
                    .checked_add(value.saturating_mul(factor))
                    .ok_or_else(|| format!("duration overflow in {s:?}"))?;
                saw_designator = true;
            }
            _ => return Err(format!("unexpected character '{ch}' in {s:?}")),
        }
    }
    if !num.is_empty() {
        return Err(format!("trailing number without designator in {s:?}"));
    }
    if !saw_designator {
        return Err(format!("no duration components in {s:?}"));
    }
    Ok(total)
}
