//! Think-time allocation.
//!
//! Converts the front end's time control into a wall-clock budget for one
//! move. Clock-based controls spend a fortieth of the remaining time plus
//! the increment, never more than half the clock.

use chess::Color;

/// Time control for a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// No deadline; the search runs until stopped or the depth cap.
    #[default]
    Infinite,
    /// Fixed time for this move.
    MoveTime { time_ms: u64 },
    /// Remaining clock and increment for both sides.
    Clock {
        wtime_ms: u64,
        btime_ms: u64,
        winc_ms: u64,
        binc_ms: u64,
    },
}

impl TimeControl {
    #[must_use]
    pub fn move_time_ms(time_ms: u64) -> Self {
        TimeControl::MoveTime { time_ms }
    }

    /// Milliseconds to think for the side to move, or `None` when the
    /// search should not be time-bounded.
    #[must_use]
    pub fn think_time_ms(&self, side: Color) -> Option<u64> {
        match *self {
            TimeControl::Infinite => None,
            TimeControl::MoveTime { time_ms } => Some(time_ms),
            TimeControl::Clock {
                wtime_ms,
                btime_ms,
                winc_ms,
                binc_ms,
            } => {
                let (remaining, increment) = match side {
                    Color::White => (wtime_ms as f64, winc_ms as f64),
                    Color::Black => (btime_ms as f64, binc_ms as f64),
                };
                let budget = (remaining / 40.0 + increment)
                    .min(remaining / 2.0 - 1.0)
                    .ceil()
                    .max(0.0);
                Some(budget as u64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_allocation() {
        let control = TimeControl::Clock {
            wtime_ms: 60_000,
            btime_ms: 5_000,
            winc_ms: 1_000,
            binc_ms: 0,
        };
        // 60000/40 + 1000 = 2500, well under half the clock.
        assert_eq!(control.think_time_ms(Color::White), Some(2500));
        // 5000/40 + 0 = 125 for Black.
        assert_eq!(control.think_time_ms(Color::Black), Some(125));
    }

    #[test]
    fn test_half_clock_cap() {
        let control = TimeControl::Clock {
            wtime_ms: 1_000,
            btime_ms: 1_000,
            winc_ms: 10_000,
            binc_ms: 10_000,
        };
        // The huge increment is capped at remaining/2 - 1 = 499.
        assert_eq!(control.think_time_ms(Color::White), Some(499));
    }

    #[test]
    fn test_empty_clock_never_goes_negative() {
        let control = TimeControl::Clock {
            wtime_ms: 0,
            btime_ms: 0,
            winc_ms: 0,
            binc_ms: 0,
        };
        assert_eq!(control.think_time_ms(Color::White), Some(0));
    }

    #[test]
    fn test_move_time_passes_through() {
        assert_eq!(
            TimeControl::move_time_ms(3000).think_time_ms(Color::Black),
            Some(3000)
        );
        assert_eq!(TimeControl::Infinite.think_time_ms(Color::White), None);
    }
}
