use glam::Vec3;

/// A linear RGBA color. Values built from hex or `u8` channels are treated as sRGB and converted.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Color { r, g, b, a: 1.0 }
    }

    /// `0xRRGGBB`, sRGB encoded.
    pub fn from_rgb_hex(hex: u32) -> Self {
        Color::u8_srgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// creates colors from rgb and maps them into linear space
    ///
    /// linear = ((srgb / 255 + 0.055) / 1.055) ^ 2.4
    pub fn u8_srgb(r: u8, g: u8, b: u8) -> Self {
        Color {
            r: color_map_to_linear(r),
            g: color_map_to_linear(g),
            b: color_map_to_linear(b),
            a: 1.0,
        }
    }

    pub const fn alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// linear = ((srgb / 255 + 0.055) / 1.055) ^ 2.4
#[inline]
pub fn color_map_to_linear(u: u8) -> f32 {
    ((u as f32 / 255.0 + 0.055) / 1.055).powf(2.4)
}

impl From<Color> for wgpu::Color {
    fn from(value: Color) -> Self {
        wgpu::Color {
            r: value.r as f64,
            g: value.g as f64,
            b: value.b as f64,
            a: value.a as f64,
        }
    }
}

impl From<Vec3> for Color {
    fn from(value: Vec3) -> Self {
        Color {
            r: value.x,
            g: value.y,
            b: value.z,
            a: 1.0,
        }
    }
}
