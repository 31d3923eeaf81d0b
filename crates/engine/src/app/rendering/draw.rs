use super::RectPx;
use crate::app::assets::SpriteImage;

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const TEXT_SCALE: i32 = 3;
pub(crate) const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
pub(crate) const TEXT_HEIGHT: i32 = GLYPH_HEIGHT * TEXT_SCALE;

fn write_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }

    frame[byte_offset..end].copy_from_slice(&color);
}

fn blend_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4], alpha: f32) {
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    if byte_offset + 4 > frame.len() {
        return;
    }

    // Source-over with the sprite's own alpha scaled by the draw alpha.
    let src_alpha = (color[3] as f32 / 255.0) * alpha.clamp(0.0, 1.0);
    if src_alpha <= 0.0 {
        return;
    }
    for channel in 0..3 {
        let dst = frame[byte_offset + channel] as f32;
        let src = color[channel] as f32;
        frame[byte_offset + channel] = (src * src_alpha + dst * (1.0 - src_alpha)) as u8;
    }
    frame[byte_offset + 3] = 255;
}

pub(crate) fn clear_frame(frame: &mut [u8], color: [u8; 4]) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

pub(crate) fn draw_filled_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = (x + rect_width).min(width as i32);
    let end_y = (y + rect_height).min(height as i32);
    if end_x <= start_x || end_y <= start_y {
        return;
    }

    let width_usize = width as usize;
    for py in start_y..end_y {
        for px in start_x..end_x {
            write_pixel_rgba(frame, width_usize, px as usize, py as usize, color);
        }
    }
}

pub(crate) fn draw_rect_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    if rect_width <= 1 || rect_height <= 1 {
        return;
    }
    draw_filled_rect(frame, width, height, x, y, rect_width, 1, color);
    draw_filled_rect(frame, width, height, x, y + rect_height - 1, rect_width, 1, color);
    draw_filled_rect(frame, width, height, x, y, 1, rect_height, color);
    draw_filled_rect(frame, width, height, x + rect_width - 1, y, 1, rect_height, color);
}

/// Blits a sub-region of a sprite into a destination rectangle with
/// nearest-neighbor scaling and source-over blending. `src_x`/`src_width`
/// select a spritesheet frame; pass the full width for plain sprites.
pub(crate) fn draw_sprite_region(
    frame: &mut [u8],
    width: u32,
    height: u32,
    sprite: &SpriteImage,
    src_x: u32,
    src_width: u32,
    dest: RectPx,
    alpha: f32,
) {
    if sprite.width == 0 || sprite.height == 0 || src_width == 0 {
        return;
    }
    if dest.width <= 0.0 || dest.height <= 0.0 {
        return;
    }
    // A frame index past the sheet's edge selects nothing.
    if src_x >= sprite.width {
        return;
    }
    let src_width = src_width.min(sprite.width - src_x);

    let dest_left = dest.x.round() as i32;
    let dest_top = dest.y.round() as i32;
    let dest_w = dest.width.round() as i32;
    let dest_h = dest.height.round() as i32;

    let start_x = dest_left.max(0);
    let start_y = dest_top.max(0);
    let end_x = (dest_left + dest_w).min(width as i32);
    let end_y = (dest_top + dest_h).min(height as i32);
    if end_x <= start_x || end_y <= start_y {
        return;
    }

    let width_usize = width as usize;
    for py in start_y..end_y {
        let v = (py - dest_top) as f32 / dest_h as f32;
        let sample_y = ((v * sprite.height as f32) as u32).min(sprite.height - 1);
        for px in start_x..end_x {
            let u = (px - dest_left) as f32 / dest_w as f32;
            let sample_x = src_x + ((u * src_width as f32) as u32).min(src_width - 1);
            let offset = ((sample_y * sprite.width + sample_x) * 4) as usize;
            let Some(texel) = sprite.rgba.get(offset..offset + 4) else {
                continue;
            };
            let color = [texel[0], texel[1], texel[2], texel[3]];
            blend_pixel_rgba(frame, width_usize, px as usize, py as usize, color, alpha);
        }
    }
}

pub(crate) fn draw_sprite(
    frame: &mut [u8],
    width: u32,
    height: u32,
    sprite: &SpriteImage,
    dest: RectPx,
    alpha: f32,
) {
    draw_sprite_region(frame, width, height, sprite, 0, sprite.width, dest, alpha);
}

pub(crate) fn text_width_px(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

pub(crate) fn draw_text(
    frame: &mut [u8],
    width: u32,
    height: u32,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
) {
    for ch in text.chars() {
        draw_glyph(frame, width, height, x, y, glyph_rows(ch), color);
        x += GLYPH_ADVANCE;
    }
}

pub(crate) fn draw_text_centered(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center_x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
) {
    draw_text(frame, width, height, center_x - text_width_px(text) / 2, y, text, color);
}

fn draw_glyph(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rows: [u8; 5],
    color: [u8; 4],
) {
    if width == 0 || height == 0 {
        return;
    }
    let width_i32 = width as i32;
    let height_i32 = height as i32;

    for (row_index, row_bits) in rows.iter().enumerate() {
        let glyph_y = y + row_index as i32 * TEXT_SCALE;
        for col in 0..GLYPH_WIDTH {
            if (row_bits & (1 << (GLYPH_WIDTH - 1 - col))) == 0 {
                continue;
            }
            let glyph_x = x + col * TEXT_SCALE;
            for sy in 0..TEXT_SCALE {
                let pixel_y = glyph_y + sy;
                if pixel_y < 0 || pixel_y >= height_i32 {
                    continue;
                }
                for sx in 0..TEXT_SCALE {
                    let pixel_x = glyph_x + sx;
                    if pixel_x < 0 || pixel_x >= width_i32 {
                        continue;
                    }
                    write_pixel_rgba(
                        frame,
                        width as usize,
                        pixel_x as usize,
                        pixel_y as usize,
                        color,
                    );
                }
            }
        }
    }
}

/// 3x5 bitmap rows for the label character set: uppercase letters, digits and
/// the punctuation the entity panel actually prints. Lowercase folds to
/// uppercase; anything else draws as a blank cell.
fn glyph_rows(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b111, 0b001, 0b001, 0b101, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b101, 0b111, 0b111, 0b111, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        _ => [0; 5],
    }
}
