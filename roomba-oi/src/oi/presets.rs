//! Named, ordered packet id lists for common streaming and query needs

/// Immutable named list of sensor packet ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub ids: &'static [u8],
}

/// Bumps, wall, cliffs, voltage, charge
pub const BASIC: Preset = Preset {
    name: "basic",
    ids: &[7, 8, 9, 10, 11, 12, 22, 25],
};

/// Requested velocity/radius and wheel encoders
pub const NAVIGATION: Preset = Preset {
    name: "navigation",
    ids: &[39, 40, 42, 41, 43, 44],
};

/// Everything that should stop the robot
pub const SAFETY: Preset = Preset {
    name: "safety",
    ids: &[7, 9, 10, 11, 12, 14, 13, 8],
};

pub const BATTERY: Preset = Preset {
    name: "battery",
    ids: &[22, 23, 25, 26, 24, 21],
};

pub const BUTTONS: Preset = Preset {
    name: "buttons",
    ids: &[18, 17, 52, 53],
};

pub const LIGHT_BUMPERS: Preset = Preset {
    name: "light_bumpers",
    ids: &[45, 46, 47, 48, 49, 50, 51],
};

pub const ALL_SENSORS: Preset = Preset {
    name: "all_sensors",
    ids: &[35, 24, 22, 25, 7, 8, 9, 10, 12, 11, 21, 23, 26, 18, 39],
};

pub const ALL: [Preset; 7] = [
    BASIC,
    NAVIGATION,
    SAFETY,
    BATTERY,
    BUTTONS,
    LIGHT_BUMPERS,
    ALL_SENSORS,
];

impl Preset {
    pub fn by_name(name: &str) -> Option<Preset> {
        ALL.iter().copied().find(|p| p.name == name)
    }
}

impl AsRef<[u8]> for Preset {
    fn as_ref(&self) -> &[u8] {
        self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oi::packet::TxPacket;

    #[test]
    fn test_lookup() {
        assert_eq!(Preset::by_name("safety"), Some(SAFETY));
        assert_eq!(Preset::by_name("nope"), None);
    }

    #[test]
    fn test_every_preset_is_streamable() {
        let mut pkt = TxPacket::new();
        for preset in ALL {
            pkt.set_stream(preset.ids)
                .unwrap_or_else(|e| panic!("{}: {}", preset.name, e));
        }
    }
}
