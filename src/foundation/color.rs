/// Opaque black.
pub const BLACK: u32 = 0xFF00_0000;
/// Opaque full-brightness red.
pub const RED: u32 = 0xFFFF_0000;
/// Opaque full-brightness green.
pub const GREEN: u32 = 0xFF00_FF00;
/// Opaque full-brightness blue.
pub const BLUE: u32 = 0xFF00_00FF;
/// Opaque full-brightness white.
pub const WHITE: u32 = 0xFFFF_FFFF;

/// Sum of R+G+B at which brightness limiting becomes a no-op.
pub const MAX_RGB_SUM: u16 = 3 * 255;

/// Default R+G+B ceiling (about 83% of full white) for WS281X strings.
pub const DEFAULT_BRIGHTNESS_CEILING: u16 = 3 * 212;

/// Build an opaque ARGB word from its color components.
pub const fn argb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Red component of an ARGB word.
pub const fn red(color: u32) -> u8 {
    (color >> 16) as u8
}

/// Green component of an ARGB word.
pub const fn green(color: u32) -> u8 {
    (color >> 8) as u8
}

/// Blue component of an ARGB word.
pub const fn blue(color: u32) -> u8 {
    color as u8
}

/// Swap the red and green bytes (for GRB-ordered strings), keeping alpha and blue.
pub const fn swap_rg(color: u32) -> u32 {
    (color & 0xFF00_00FF) | ((color >> 8) & 0x0000_FF00) | ((color << 8) & 0x00FF_0000)
}

/// Brightest of the three color components.
pub fn max_component(color: u32) -> u8 {
    red(color).max(green(color)).max(blue(color))
}

/// Scale a color down so that R+G+B never exceeds `ceiling`.
///
/// Components are scaled by the same `ceiling / sum` factor (truncating), which keeps
/// the hue within integer rounding and guarantees the result stays at or below the
/// ceiling. Alpha passes through untouched.
pub fn limit_brightness(color: u32, ceiling: u16) -> u32 {
    let (r, g, b) = (
        u32::from(red(color)),
        u32::from(green(color)),
        u32::from(blue(color)),
    );
    let sum = r + g + b;
    let ceiling = u32::from(ceiling);
    if sum <= ceiling {
        return color;
    }
    let scale = |c: u32| (c * ceiling / sum) as u8;
    with_rgb(color, scale(r), scale(g), scale(b))
}

/// Multiply each color component by `num / den` (saturating), used for dimmed test patterns.
pub fn dim(color: u32, num: u32, den: u32) -> u32 {
    if den == 0 {
        return color & 0xFF00_0000;
    }
    let f = |c: u8| (u32::from(c) * num / den).min(255) as u8;
    with_rgb(color, f(red(color)), f(green(color)), f(blue(color)))
}

/// Replace the color components of `color`, keeping its alpha byte.
const fn with_rgb(color: u32, r: u8, g: u8, b: u8) -> u32 {
    (color & 0xFF00_0000) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
