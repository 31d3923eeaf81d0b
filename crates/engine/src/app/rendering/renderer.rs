use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::animation::{PlayerSprite, SHEET_FRAME_WIDTH};
use crate::app::assets::{AssetCache, AssetKey, ClanVariant, StaticAsset};
use crate::app::effects::{FxPool, SkillId};
use crate::app::sync::{ClanDirectory, ClanRecord};

use super::draw::{
    clear_frame, draw_filled_rect, draw_rect_outline, draw_sprite, draw_sprite_region,
    draw_text_centered, TEXT_HEIGHT,
};
use super::{home_panel_rect, target_panel_rect, RectPx, Viewport};

const CLEAR_COLOR: [u8; 4] = [18, 16, 24, 255];
const LABEL_COLOR: [u8; 4] = [255, 255, 255, 255];
const BAR_BACKGROUND_COLOR: [u8; 4] = [51, 51, 51, 255];
const BAR_OUTLINE_COLOR: [u8; 4] = [0, 0, 0, 255];
const HP_BAR_COLOR: [u8; 4] = [231, 76, 60, 255];
const SHIELD_BAR_COLOR: [u8; 4] = [0, 255, 136, 255];
const HP_BAR_HEIGHT: i32 = 20;
const SHIELD_BAR_HEIGHT: i32 = 15;
const BAR_TOP_GAP: f32 = 15.0;
const SHIELD_BAR_ADVANCE: f32 = 25.0;
const LABEL_BOTTOM_GAP: i32 = 15;
const FORMATION_OVERLAY_SCALE: f32 = 1.5;

/// Read-only borrow of everything one tick draws. The loop assembles it after
/// all simulation steps, so the renderer observes a consistent snapshot.
pub struct FrameView<'a> {
    pub player: &'a PlayerSprite,
    pub directory: &'a ClanDirectory,
    pub fx: &'a FxPool,
    pub assets: &'a AssetCache,
    pub target_hit_flash: bool,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn build_pixels(window: Arc<Window>, width: u32, height: u32) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    /// Draws one frame in layer order: actor, entity panel, projectiles,
    /// decaying effects. Layers whose assets have not landed yet are simply
    /// skipped; the cache fills in on a later tick.
    pub fn render(&mut self, view: &FrameView) -> Result<(), Error> {
        let Viewport { width, height } = self.viewport;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let frame = self.pixels.frame_mut();
        clear_frame(frame, CLEAR_COLOR);

        draw_player(frame, width, height, view);

        if let Some(target) = view.directory.current_target() {
            draw_entity_panel(
                frame,
                width,
                height,
                target,
                target_panel_rect(self.viewport),
                view.assets,
                view.target_hit_flash,
            );
        } else if let Some(home) = view.directory.home_clan() {
            draw_entity_panel(
                frame,
                width,
                height,
                home,
                home_panel_rect(self.viewport),
                view.assets,
                false,
            );
        }

        draw_projectiles(frame, width, height, view);
        draw_effects(frame, width, height, view);

        self.pixels.render()
    }
}

fn draw_player(frame: &mut [u8], width: u32, height: u32, view: &FrameView) {
    let Some(sheet) = view.assets.get(&AssetKey::Static(StaticAsset::PlayerSheet)) else {
        return;
    };
    draw_sprite_region(
        frame,
        width,
        height,
        sheet,
        view.player.sheet_source_x(),
        SHEET_FRAME_WIDTH,
        view.player.rect(),
        1.0,
    );
}

/// One code path for both the selected target and the viewer's home clan,
/// parameterized only by the panel rectangle.
fn draw_entity_panel(
    frame: &mut [u8],
    width: u32,
    height: u32,
    record: &ClanRecord,
    rect: RectPx,
    assets: &AssetCache,
    hit_flash: bool,
) {
    let base = assets.get(&clan_key(record, ClanVariant::Base));
    let hit = assets.get(&clan_key(record, ClanVariant::Hit));
    let image = if hit_flash { hit.or(base) } else { base };
    let Some(image) = image else {
        // Nothing cached yet; skip the whole panel until the load lands.
        return;
    };
    draw_sprite(frame, width, height, image, rect, 1.0);

    if record.formation_level > 0 {
        if let Some(formation) = assets.get(&clan_key(record, ClanVariant::Formation)) {
            draw_sprite(
                frame,
                width,
                height,
                formation,
                formation_overlay_rect(rect),
                1.0,
            );
        }
    }

    let center_x = (rect.x + rect.width / 2.0).round() as i32;
    let label = format!("{} (LV {})", record.name, record.level);
    draw_text_centered(
        frame,
        width,
        height,
        center_x,
        rect.y.round() as i32 - LABEL_BOTTOM_GAP - TEXT_HEIGHT,
        &label,
        LABEL_COLOR,
    );

    let bar_x = rect.x.round() as i32;
    let bar_width = rect.width.round() as i32;
    let mut bar_y = (rect.y + rect.height + BAR_TOP_GAP).round() as i32;

    if record.formation_level > 0 {
        let fraction = bar_fraction(record.formation_shield, record.max_formation_shield);
        draw_bar(
            frame,
            width,
            height,
            bar_x,
            bar_y,
            bar_width,
            SHIELD_BAR_HEIGHT,
            fraction,
            SHIELD_BAR_COLOR,
        );
        let shield_text = format!(
            "LV{}: {}/{}",
            record.formation_level, record.formation_shield, record.max_formation_shield
        );
        draw_text_centered(frame, width, height, center_x, bar_y, &shield_text, LABEL_COLOR);
        bar_y += SHIELD_BAR_ADVANCE as i32;
    }

    let fraction = bar_fraction(record.hp, record.max_hp);
    draw_bar(
        frame,
        width,
        height,
        bar_x,
        bar_y,
        bar_width,
        HP_BAR_HEIGHT,
        fraction,
        HP_BAR_COLOR,
    );
    let hp_text = format!("{} / {}", record.hp, record.max_hp);
    draw_text_centered(frame, width, height, center_x, bar_y + 2, &hp_text, LABEL_COLOR);
}

fn clan_key(record: &ClanRecord, variant: ClanVariant) -> AssetKey {
    AssetKey::Clan {
        clan_id: record.id.clone(),
        variant,
    }
}

/// The formation aura renders 1.5x the panel size, centered over the base
/// image for both the target and the home paths.
pub(crate) fn formation_overlay_rect(rect: RectPx) -> RectPx {
    let overlay_width = rect.width * FORMATION_OVERLAY_SCALE;
    let overlay_height = rect.height * FORMATION_OVERLAY_SCALE;
    RectPx {
        x: rect.x - (overlay_width - rect.width) / 2.0,
        y: rect.y - (overlay_height - rect.height) / 2.0,
        width: overlay_width,
        height: overlay_height,
    }
}

pub(crate) fn bar_fraction(current: i64, max: i64) -> f32 {
    if max <= 0 {
        return 0.0;
    }
    (current as f32 / max as f32).clamp(0.0, 1.0)
}

#[allow(clippy::too_many_arguments)]
fn draw_bar(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    bar_width: i32,
    bar_height: i32,
    fraction: f32,
    fill_color: [u8; 4],
) {
    draw_filled_rect(frame, width, height, x, y, bar_width, bar_height, BAR_BACKGROUND_COLOR);
    let fill_width = (bar_width as f32 * fraction) as i32;
    draw_filled_rect(frame, width, height, x, y, fill_width, bar_height, fill_color);
    draw_rect_outline(frame, width, height, x, y, bar_width, bar_height, BAR_OUTLINE_COLOR);
}

fn draw_projectiles(frame: &mut [u8], width: u32, height: u32, view: &FrameView) {
    for projectile in &view.fx.projectiles {
        let asset = match projectile.skill {
            SkillId::Basic => StaticAsset::Projectile,
            SkillId::FlameBurst => StaticAsset::FlameBurst,
        };
        let Some(sprite) = view.assets.get(&AssetKey::Static(asset)) else {
            continue;
        };
        let dest = RectPx {
            x: projectile.x,
            y: projectile.y,
            width: projectile.width,
            height: projectile.height,
        };
        draw_sprite(frame, width, height, sprite, dest, 1.0);
    }
}

fn draw_effects(frame: &mut [u8], width: u32, height: u32, view: &FrameView) {
    let Some(sprite) = view.assets.get(&AssetKey::Static(StaticAsset::Explosion)) else {
        return;
    };
    for effect in &view.fx.effects {
        let dest = RectPx {
            x: effect.center_x - sprite.width as f32 / 2.0,
            y: effect.center_y - sprite.height as f32 / 2.0,
            width: sprite.width as f32,
            height: sprite.height as f32,
        };
        draw_sprite(frame, width, height, sprite, dest, effect.alpha());
    }
}
