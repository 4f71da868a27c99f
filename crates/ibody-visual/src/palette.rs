//! Per-action colours: soft, emotional, readable on black

use serde::{Deserialize, Serialize};

/// 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub const SOFT_BLUE: Rgb = Rgb::new(147, 197, 253);
pub const SOFT_CORAL: Rgb = Rgb::new(252, 165, 165);
pub const SPRING_GREEN: Rgb = Rgb::new(190, 242, 100);
pub const LAVENDER: Rgb = Rgb::new(196, 181, 253);
pub const NEUTRAL_GREY: Rgb = Rgb::new(200, 200, 200);

/// Skeleton colour for an action; grey when no action is active
pub fn action_color(action: u32) -> Rgb {
    match action {
        1 => SOFT_BLUE,
        2 => SOFT_CORAL,
        3 => SPRING_GREEN,
        4 => LAVENDER,
        _ => NEUTRAL_GREY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_palette() {
        assert_eq!(action_color(1), SOFT_BLUE);
        assert_eq!(action_color(4), LAVENDER);
        assert_eq!(action_color(0), NEUTRAL_GREY);
        assert_eq!(action_color(9), NEUTRAL_GREY);
    }
}
