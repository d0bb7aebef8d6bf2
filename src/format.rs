/// Percentage for display. Only a clinched spot reads as 100%; anything short of it is
/// capped at 99.9%.
pub fn format_top_odds(prob: f64, decimals: usize) -> String {
    if prob >= 1.0 - 1e-9 {
        return format!("{:.decimals$}%", 100.0);
    }
    let capped = prob.min(0.999);
    format!("{:.decimals$}%", capped * 100.0)
}

pub fn format_pct(prob: f64) -> String {
    format!("{:.1}%", prob * 100.0)
}

pub fn format_delta(delta: f64) -> String {
    format!("{:+.1} pts", delta * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clinched_reads_full() {
        assert_eq!(format_top_odds(1.0, 1), "100.0%");
        assert_eq!(format_top_odds(0.999_999_999_9, 0), "100%");
    }

    #[test]
    fn near_certain_is_capped() {
        assert_eq!(format_top_odds(0.9996, 1), "99.9%");
        assert_eq!(format_top_odds(0.4567, 1), "45.7%");
        assert_eq!(format_top_odds(0.0, 2), "0.00%");
    }

    #[test]
    fn delta_is_signed() {
        assert_eq!(format_delta(0.053), "+5.3 pts");
        assert_eq!(format_delta(-0.1), "-10.0 pts");
    }
}
