use crate::filters::FilterKind;

/// Normalized RGB triple, each channel in [0, 1]
pub type Rgb = [f32; 3];

type ColorMatrix = [[f32; 3]; 3];

/// Apply one filter stage to a pixel. `value` is the raw percentage from
/// the filter state; the result is clamped to [0, 1].
#[inline]
pub fn apply_stage(kind: FilterKind, value: f32, rgb: Rgb) -> Rgb {
    // Negative amounts are treated as zero
    let amount = value.max(0.0) / 100.0;

    let out = match kind {
        FilterKind::Brightness => rgb.map(|c| c * amount),
        FilterKind::Contrast => rgb.map(|c| (c - 0.5) * amount + 0.5),
        FilterKind::Saturation => mul(&saturate_matrix(amount), rgb),
        FilterKind::Grayscale => mul(&grayscale_matrix(amount.min(1.0)), rgb),
        FilterKind::Sepia => mul(&sepia_matrix(amount.min(1.0)), rgb),
        FilterKind::Invert => {
            let a = amount.min(1.0);
            rgb.map(|c| a * (1.0 - c) + (1.0 - a) * c)
        }
    };

    out.map(|c| c.clamp(0.0, 1.0))
}

#[inline]
fn mul(m: &ColorMatrix, [r, g, b]: Rgb) -> Rgb {
    [
        m[0][0] * r + m[0][1] * g + m[0][2] * b,
        m[1][0] * r + m[1][1] * g + m[1][2] * b,
        m[2][0] * r + m[2][1] * g + m[2][2] * b,
    ]
}

fn saturate_matrix(s: f32) -> ColorMatrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn grayscale_matrix(amount: f32) -> ColorMatrix {
    let g = 1.0 - amount;
    [
        [0.2126 + 0.7874 * g, 0.7152 - 0.7152 * g, 0.0722 - 0.0722 * g],
        [0.2126 - 0.2126 * g, 0.7152 + 0.2848 * g, 0.0722 - 0.0722 * g],
        [0.2126 - 0.2126 * g, 0.7152 - 0.7152 * g, 0.0722 + 0.9278 * g],
    ]
}

fn sepia_matrix(amount: f32) -> ColorMatrix {
    let g = 1.0 - amount;
    [
        [0.393 + 0.607 * g, 0.769 - 0.769 * g, 0.189 - 0.189 * g],
        [0.349 - 0.349 * g, 0.686 + 0.314 * g, 0.168 - 0.168 * g],
        [0.272 - 0.272 * g, 0.534 - 0.534 * g, 0.131 + 0.869 * g],
    ]
}
