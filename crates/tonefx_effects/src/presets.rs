//! Built-in Platform Presets

/// Named equalizer preset with five band levels in millibels
pub type SystemPreset = (&'static str, [i16; 5]);

/// Presets shipped by the reference five-band platform equalizer
pub const SYSTEM_PRESETS: &[SystemPreset] = &[
    ("Normal", [300, 0, 0, 0, 300]),
    ("Classical", [500, 300, -200, 400, 400]),
    ("Dance", [600, 0, 200, 400, 100]),
    ("Flat", [0, 0, 0, 0, 0]),
    ("Folk", [300, 0, 0, 200, -100]),
    ("Heavy Metal", [400, 100, 900, 300, 0]),
    ("Hip Hop", [500, 300, 0, 100, 300]),
    ("Jazz", [400, 200, -200, 200, 500]),
    ("Pop", [-100, 200, 500, 100, -200]),
    ("Rock", [500, 300, -100, 300, 500]),
];
