use eframe::egui::Color32;

/// Named colors consumed by the render worker. Resampled as a whole when the
/// theme toggles and pushed across the worker boundary in one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemeColors {
    pub background: Color32,
    pub link: Color32,
    pub node: Color32,
    pub outline: Color32,
    pub text: Color32,
    pub accent: Color32,
}

impl ThemeColors {
    pub fn dark() -> Self {
        Self {
            background: Color32::from_rgb(25, 25, 28),
            link: Color32::from_rgb(110, 110, 118),
            node: Color32::from_rgb(180, 180, 190),
            outline: Color32::from_rgb(110, 110, 118),
            text: Color32::from_rgb(224, 224, 230),
            accent: Color32::from_rgb(124, 109, 235),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color32::from_rgb(243, 243, 246),
            link: Color32::from_rgb(165, 165, 172),
            node: Color32::from_rgb(96, 96, 108),
            outline: Color32::from_rgb(165, 165, 172),
            text: Color32::from_rgb(34, 34, 40),
            accent: Color32::from_rgb(94, 80, 208),
        }
    }
}
