use crate::models::DisplayMode;

// Label shown next to an option button
pub fn vote_text(votes_for_option: u64, total_votes: u64, display_mode: DisplayMode) -> String {
    match display_mode {
        DisplayMode::Percentage => format!("{}%", percentage(votes_for_option, total_votes)),
        DisplayMode::Count => format!("{} votes", votes_for_option),
    }
}

/// Whole-number share of the total, 0 when nobody has voted.
pub fn percentage(votes_for_option: u64, total_votes: u64) -> u64 {
    if total_votes == 0 {
        return 0;
    }
    (votes_for_option as f64 / total_votes as f64 * 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_with_no_votes_is_zero() {
        assert_eq!(vote_text(0, 0, DisplayMode::Percentage), "0%");
        assert_eq!(vote_text(5, 0, DisplayMode::Percentage), "0%");
    }

    #[test]
    fn percentage_is_rounded() {
        assert_eq!(vote_text(1, 3, DisplayMode::Percentage), "33%");
        assert_eq!(vote_text(2, 3, DisplayMode::Percentage), "67%");
        assert_eq!(vote_text(1, 8, DisplayMode::Percentage), "13%");
        assert_eq!(vote_text(4, 4, DisplayMode::Percentage), "100%");
    }

    #[test]
    fn count_mode() {
        assert_eq!(vote_text(0, 0, DisplayMode::Count), "0 votes");
        assert_eq!(vote_text(7, 9, DisplayMode::Count), "7 votes");
    }
}
