#![forbid(unsafe_code)]

//! Geometric primitives.

/// A width/height pair in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    /// Width in logical pixels.
    pub width: u32,
    /// Height in logical pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Area in square pixels.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check if the size has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `other` fits inside `self` on both axes.
    #[inline]
    pub const fn contains(&self, other: Size) -> bool {
        other.width <= self.width && other.height <= self.height
    }

    /// Largest size with aspect `num:den` that fits in `self`, starting from
    /// `preferred_width`.
    ///
    /// The width is capped at `preferred_width` and at `self.width`; if the
    /// resulting height would overflow, the height is pinned to `self.height`
    /// and the width recomputed. Returns an empty size for empty bounds or a
    /// degenerate ratio.
    pub fn fit_ratio(&self, num: u32, den: u32, preferred_width: u32) -> Size {
        if self.is_empty() || num == 0 || den == 0 {
            return Size::default();
        }
        let mut width = u64::from(preferred_width.min(self.width));
        let mut height = (width * u64::from(den) + u64::from(num) / 2) / u64::from(num);
        if height > u64::from(self.height) {
            height = u64::from(self.height);
            width = (height * u64::from(num) + u64::from(den) / 2) / u64::from(den);
        }
        // Rounding can push one axis a pixel past the bound.
        Size::new(
            (width as u32).min(self.width),
            (height as u32).min(self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_prefers_requested_width() {
        let display = Size::new(1920, 1080);
        assert_eq!(display.fit_ratio(16, 9, 360), Size::new(360, 203));
        assert_eq!(display.fit_ratio(4, 3, 360), Size::new(360, 270));
        assert_eq!(display.fit_ratio(1, 1, 360), Size::new(360, 360));
    }

    #[test]
    fn fit_clamps_to_narrow_display() {
        let display = Size::new(200, 1000);
        assert_eq!(display.fit_ratio(16, 9, 360), Size::new(200, 113));
    }

    #[test]
    fn fit_clamps_to_short_display() {
        let display = Size::new(1000, 100);
        let fitted = display.fit_ratio(1, 1, 360);
        assert_eq!(fitted, Size::new(100, 100));
        assert!(display.contains(fitted));
    }

    #[test]
    fn fit_empty_bounds() {
        assert_eq!(Size::new(0, 100).fit_ratio(16, 9, 360), Size::default());
        assert_eq!(Size::new(100, 100).fit_ratio(0, 9, 360), Size::default());
    }

    #[test]
    fn area_and_empty() {
        assert_eq!(Size::new(3, 4).area(), 12);
        assert!(Size::new(0, 4).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }
}
