pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const GLYPH_ADVANCE_CELLS: i32 = GLYPH_WIDTH + 1;

const FIRST_GLYPH: u32 = ' ' as u32;
const FALLBACK_GLYPH: char = '?';

// 3x5 bitmaps for ' '..='~'. Rows are packed top to bottom, three bits each,
// most significant bit is the left column.
const GLYPH_BITS: [u16; 95] = [
    0x0000, 0x2482, 0x5a00, 0x5f7d, 0x7ddf, 0x52a5, 0x2aab, 0x2400, //
    0x1491, 0x4494, 0x0aa8, 0x05d0, 0x0014, 0x01c0, 0x0002, 0x12a4, //
    0x7b6f, 0x2c97, 0x73e7, 0x73cf, 0x5bc9, 0x79cf, 0x79ef, 0x7292, //
    0x7bef, 0x7bcf, 0x0410, 0x0414, 0x1511, 0x0e38, 0x4454, 0x72c2, //
    0x7be7, 0x2bed, 0x6bae, 0x7927, 0x6b6e, 0x79a7, 0x79a4, 0x796f, //
    0x5bed, 0x7497, 0x726f, 0x5bad, 0x4927, 0x5fed, 0x5ffd, 0x7b6f, //
    0x6ba4, 0x7b79, 0x6bad, 0x79cf, 0x7492, 0x5b6f, 0x5b6a, 0x5bfd, //
    0x5aad, 0x5a92, 0x72a7, 0x6926, 0x4889, 0x324b, 0x2a00, 0x0007, //
    0x4400, 0x0e7f, 0x49ae, 0x0f27, 0x13ef, 0x0fa7, 0x39a4, 0x0f79, //
    0x49ad, 0x2092, 0x106a, 0x4bad, 0x4927, 0x0ded, 0x0d6d, 0x0f6f, //
    0x0d74, 0x0f79, 0x0d64, 0x0f8f, 0x2e93, 0x0b6f, 0x0b6a, 0x0b7a, //
    0x0a95, 0x0b79, 0x0e57, 0x3593, 0x2492, 0x64d6, 0x0780,
];

pub(crate) fn glyph_bits(ch: char) -> Option<u16> {
    let index = (ch as u32).checked_sub(FIRST_GLYPH)? as usize;
    GLYPH_BITS.get(index).copied()
}

/// Bitmap for `ch`, substituting `?` for anything outside printable ASCII.
pub(crate) fn glyph_or_fallback(ch: char) -> u16 {
    glyph_bits(ch)
        .or_else(|| glyph_bits(FALLBACK_GLYPH))
        .unwrap_or(0)
}

pub(crate) fn glyph_cell_is_set(bits: u16, row: i32, col: i32) -> bool {
    if !(0..GLYPH_HEIGHT).contains(&row) || !(0..GLYPH_WIDTH).contains(&col) {
        return false;
    }
    let shift = (GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH + (GLYPH_WIDTH - 1 - col);
    (bits >> shift) & 1 == 1
}

/// Width of `text` in glyph cells, without trailing spacing.
pub(crate) fn text_width_cells(text: &str) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        0
    } else {
        count * GLYPH_ADVANCE_CELLS - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ch: char) -> Vec<String> {
        let bits = glyph_or_fallback(ch);
        (0..GLYPH_HEIGHT)
            .map(|row| {
                (0..GLYPH_WIDTH)
                    .map(|col| if glyph_cell_is_set(bits, row, col) { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn printable_ascii_is_covered() {
        for code in 32u8..=126u8 {
            assert!(glyph_bits(char::from(code)).is_some(), "missing {code}");
        }
        assert!(glyph_bits('\u{7f}').is_none());
        assert!(glyph_bits('\u{1f603}').is_none());
    }

    #[test]
    fn digit_one_decodes_top_to_bottom() {
        assert_eq!(rows('1'), vec![".#.", "##.", ".#.", ".#.", "###"]);
    }

    #[test]
    fn unknown_characters_draw_question_mark() {
        assert_eq!(rows('\u{e9}'), rows('?'));
    }

    #[test]
    fn width_counts_inner_spacing_only() {
        assert_eq!(text_width_cells(""), 0);
        assert_eq!(text_width_cells("A"), 3);
        assert_eq!(text_width_cells("AB"), 7);
    }
}
