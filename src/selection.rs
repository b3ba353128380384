// src/selection.rs

use crate::audio::SelectionRange;
use crate::error::AudioError;
use crate::session::SessionError;

/// Holds the user's selection against the loaded audio's duration
///
/// `Unset` until a file is loaded; `Active` afterwards, with every
/// adjustment clamped to `[0, duration]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RangeSelector {
    #[default]
    Unset,
    Active {
        duration_seconds: f64,
        range: SelectionRange,
    },
}

impl RangeSelector {
    /// Enter `Active` for a freshly loaded file, selecting all of it
    pub fn activate(&mut self, duration_seconds: f64) {
        *self = RangeSelector::Active {
            duration_seconds,
            range: SelectionRange::full(duration_seconds),
        };
    }

    pub fn reset(&mut self) {
        *self = RangeSelector::Unset;
    }

    pub fn range(&self) -> Option<SelectionRange> {
        match self {
            RangeSelector::Unset => None,
            RangeSelector::Active { range, .. } => Some(*range),
        }
    }

    /// Apply a user adjustment and return the clamped range now in effect
    pub fn adjust(&mut self, start_seconds: f64, end_seconds: f64) -> Result<SelectionRange, SessionError> {
        let RangeSelector::Active {
            duration_seconds,
            range,
        } = self
        else {
            return Err(SessionError::NoAudioLoaded);
        };

        if !start_seconds.is_finite() || !end_seconds.is_finite() {
            return Err(AudioError::InvalidRange(format!(
                "bounds must be finite: {} to {}",
                start_seconds, end_seconds
            ))
            .into());
        }

        *range = SelectionRange::clamped(start_seconds, end_seconds, *duration_seconds);
        Ok(*range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unset() {
        let selector = RangeSelector::default();
        assert_eq!(selector, RangeSelector::Unset);
        assert_eq!(selector.range(), None);
    }

    #[test]
    fn test_adjust_while_unset_fails() {
        let mut selector = RangeSelector::Unset;
        assert!(matches!(
            selector.adjust(0.0, 1.0),
            Err(SessionError::NoAudioLoaded)
        ));
    }

    #[test]
    fn test_activate_selects_everything() {
        let mut selector = RangeSelector::Unset;
        selector.activate(12.5);
        assert_eq!(selector.range(), Some(SelectionRange::full(12.5)));
    }

    #[test]
    fn test_adjust_clamps_to_duration() {
        let mut selector = RangeSelector::Unset;
        selector.activate(10.0);

        let range = selector.adjust(2.0, 5.0).unwrap();
        assert_eq!(range, SelectionRange::new(2.0, 5.0).unwrap());

        let range = selector.adjust(-4.0, 99.0).unwrap();
        assert_eq!(range, SelectionRange::full(10.0));
        assert_eq!(selector.range(), Some(range));
    }

    #[test]
    fn test_adjust_rejects_nan_and_keeps_previous() {
        let mut selector = RangeSelector::Unset;
        selector.activate(10.0);
        selector.adjust(1.0, 2.0).unwrap();

        let result = selector.adjust(f64::NAN, 2.0);
        assert!(matches!(
            result,
            Err(SessionError::Audio(AudioError::InvalidRange(_)))
        ));
        assert_eq!(selector.range(), Some(SelectionRange::new(1.0, 2.0).unwrap()));
    }

    #[test]
    fn test_replacement_resets_range() {
        let mut selector = RangeSelector::Unset;
        selector.activate(10.0);
        selector.adjust(3.0, 4.0).unwrap();

        selector.activate(6.0);
        assert_eq!(selector.range(), Some(SelectionRange::full(6.0)));

        selector.reset();
        assert_eq!(selector.range(), None);
    }
}
