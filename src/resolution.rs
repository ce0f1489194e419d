use crate::backend::ResolutionConfig;

pub const LOCKED_RESOLUTION: (u32, u32) = (1024, 768);

const PRESETS: &[(u32, u32)] = &[
    (800, 600),
    (1024, 768),
    (1280, 720),
    (1280, 800),
    (1366, 768),
    (1600, 900),
    (1920, 1080),
];

pub fn win_mode_label(win_mode: u8) -> &'static str {
    match win_mode {
        0 => "Fullscreen",
        1 => "Windowed",
        2 => "Borderless",
        _ => "Unknown",
    }
}

/// Editable copy of the game's display settings, shown in the resolution overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionForm {
    win_mode: u8,
    presets: Vec<(u32, u32)>,
    selected: usize,
}

impl ResolutionForm {
    /// Loads a form from the backend's current config. A size outside the
    /// preset list is appended so it can still be kept.
    pub fn from_config(config: ResolutionConfig) -> Self {
        let mut presets = PRESETS.to_vec();
        let current = (config.width, config.height);
        let selected = match presets.iter().position(|preset| *preset == current) {
            Some(index) => index,
            None => {
                presets.push(current);
                presets.len() - 1
            }
        };
        let mut form = Self {
            win_mode: config.win_mode.min(2),
            presets,
            selected,
        };
        form.apply_lock();
        form
    }

    pub fn win_mode(&self) -> u8 {
        self.win_mode
    }

    /// Fullscreen and borderless run at a fixed size.
    pub fn is_locked(&self) -> bool {
        matches!(self.win_mode, 0 | 2)
    }

    pub fn size(&self) -> (u32, u32) {
        self.presets[self.selected]
    }

    pub fn presets(&self) -> &[(u32, u32)] {
        &self.presets
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn set_win_mode(&mut self, win_mode: u8) {
        self.win_mode = win_mode.min(2);
        self.apply_lock();
    }

    pub fn cycle_win_mode(&mut self) {
        self.set_win_mode((self.win_mode + 1) % 3);
    }

    /// Moves the size selection. Ignored while locked.
    pub fn step_size(&mut self, forward: bool) {
        if self.is_locked() || self.presets.is_empty() {
            return;
        }
        let len = self.presets.len();
        self.selected = if forward {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
    }

    pub fn to_config(&self) -> ResolutionConfig {
        let (width, height) = self.size();
        ResolutionConfig {
            win_mode: self.win_mode,
            width,
            height,
        }
    }

    fn apply_lock(&mut self) {
        if !self.is_locked() {
            return;
        }
        if let Some(index) = self
            .presets
            .iter()
            .position(|preset| *preset == LOCKED_RESOLUTION)
        {
            self.selected = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullscreen_and_borderless_lock_size() {
        let mut form = ResolutionForm::from_config(ResolutionConfig {
            win_mode: 1,
            width: 1920,
            height: 1080,
        });
        assert!(!form.is_locked());
        assert_eq!(form.size(), (1920, 1080));

        form.set_win_mode(0);
        assert_eq!(form.size(), LOCKED_RESOLUTION);
        form.step_size(true);
        assert_eq!(form.size(), LOCKED_RESOLUTION);

        form.set_win_mode(1);
        form.step_size(true);
        assert_eq!(form.size(), (1280, 720));
        form.set_win_mode(2);
        assert_eq!(form.to_config().width, 1024);
    }

    #[test]
    fn unknown_size_is_kept_as_extra_preset() {
        let form = ResolutionForm::from_config(ResolutionConfig {
            win_mode: 1,
            width: 1440,
            height: 900,
        });
        assert_eq!(form.size(), (1440, 900));
        assert_eq!(form.presets().len(), PRESETS.len() + 1);
    }
}
