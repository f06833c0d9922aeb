use crate::error::{BoothError, BoothResult};
use std::fmt;
use std::str::FromStr;

/// One of the six cosmetic adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturation,
    Grayscale,
    Sepia,
    Invert,
}

/// Order in which the render pipeline applies the stages.
///
/// The stages do not commute (sepia then grayscale is not grayscale then
/// sepia), so every render walks this list front to back.
pub const FILTER_ORDER: [FilterKind; 6] = [
    FilterKind::Brightness,
    FilterKind::Contrast,
    FilterKind::Saturation,
    FilterKind::Grayscale,
    FilterKind::Sepia,
    FilterKind::Invert,
];

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Saturation => "saturation",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Invert => "invert",
        }
    }

    /// Value at which the stage leaves pixels untouched
    pub fn neutral(&self) -> f32 {
        match self {
            FilterKind::Brightness | FilterKind::Contrast | FilterKind::Saturation => 100.0,
            FilterKind::Grayscale | FilterKind::Sepia | FilterKind::Invert => 0.0,
        }
    }

    /// Range offered by the input controls, as (min, max) percent
    pub fn input_range(&self) -> (f32, f32) {
        match self {
            FilterKind::Brightness | FilterKind::Contrast | FilterKind::Saturation => (0.0, 200.0),
            FilterKind::Grayscale | FilterKind::Sepia | FilterKind::Invert => (0.0, 100.0),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FILTER_ORDER
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BoothError::UnknownFilter(s.to_string()))
    }
}

/// Current adjustment values, in percent.
///
/// Values are stored exactly as given; range handling happens in the
/// render stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub grayscale: f32,
    pub sepia: f32,
    pub invert: f32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            grayscale: 0.0,
            sepia: 0.0,
            invert: 0.0,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturation => self.saturation,
            FilterKind::Grayscale => self.grayscale,
            FilterKind::Sepia => self.sepia,
            FilterKind::Invert => self.invert,
        }
    }

    pub fn set(&mut self, kind: FilterKind, value: f32) {
        tracing::debug!("filter {} = {}", kind, value);
        let slot = match kind {
            FilterKind::Brightness => &mut self.brightness,
            FilterKind::Contrast => &mut self.contrast,
            FilterKind::Saturation => &mut self.saturation,
            FilterKind::Grayscale => &mut self.grayscale,
            FilterKind::Sepia => &mut self.sepia,
            FilterKind::Invert => &mut self.invert,
        };
        *slot = value;
    }

    /// Set a parameter by its control name (e.g. "brightness")
    pub fn set_by_name(&mut self, name: &str, value: f32) -> BoothResult<()> {
        let kind = name.parse::<FilterKind>()?;
        self.set(kind, value);
        Ok(())
    }

    /// Parameters paired with their values, in pipeline order
    pub fn stages(&self) -> impl Iterator<Item = (FilterKind, f32)> + '_ {
        FILTER_ORDER.iter().map(move |&kind| (kind, self.get(kind)))
    }

    /// Stages whose value lies outside the range the input controls offer
    pub fn out_of_range(&self) -> impl Iterator<Item = (FilterKind, f32)> + '_ {
        self.stages().filter(|(kind, value)| {
            let (min, max) = kind.input_range();
            *value < min || *value > max
        })
    }

    /// True when every parameter sits at its neutral value
    pub fn is_neutral(&self) -> bool {
        self.stages().all(|(kind, value)| value == kind.neutral())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .stages()
            .map(|(kind, value)| format!("{}({}%)", kind, value))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_neutral() {
        let state = FilterState::default();
        assert!(state.is_neutral());
        for kind in FILTER_ORDER {
            assert_eq!(state.get(kind), kind.neutral());
        }
    }

    #[test]
    fn set_is_idempotent_and_observable() {
        let mut state = FilterState::new();
        state.set(FilterKind::Sepia, 40.0);
        state.set(FilterKind::Sepia, 40.0);
        assert_eq!(state.sepia, 40.0);
        assert!(!state.is_neutral());
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let mut state = FilterState::new();
        state.set(FilterKind::Invert, 250.0);
        state.set(FilterKind::Brightness, -20.0);
        assert_eq!(state.invert, 250.0);
        assert_eq!(state.brightness, -20.0);

        state.set(FilterKind::Saturation, 200.0);
        let flagged: Vec<FilterKind> = state.out_of_range().map(|(kind, _)| kind).collect();
        assert_eq!(flagged, [FilterKind::Brightness, FilterKind::Invert]);
        assert_eq!(FilterState::new().out_of_range().count(), 0);
    }

    #[test]
    fn set_by_name_accepts_control_ids() {
        let mut state = FilterState::new();
        state.set_by_name("Contrast", 130.0).unwrap();
        assert_eq!(state.contrast, 130.0);

        let err = state.set_by_name("blur", 3.0).unwrap_err();
        assert!(matches!(err, BoothError::UnknownFilter(name) if name == "blur"));
    }

    #[test]
    fn stages_follow_declared_order() {
        let names: Vec<&str> = FilterState::new().stages().map(|(k, _)| k.name()).collect();
        assert_eq!(
            names,
            ["brightness", "contrast", "saturation", "grayscale", "sepia", "invert"]
        );
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = FilterState::new();
        state.set(FilterKind::Grayscale, 100.0);
        state.reset();
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn display_reads_like_a_filter_chain() {
        let text = FilterState::new().to_string();
        assert!(text.starts_with("brightness(100%) contrast(100%)"));
        assert!(text.ends_with("invert(0%)"));
    }
}
