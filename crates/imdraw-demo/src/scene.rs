use std::rc::Rc;

use imdraw_backend::device::{Blend, Device, RenderState};
use imdraw_backend::gui::{ClipRect, DrawCmd, DrawData, DrawList, DrawListBuilder, FontAtlas, FontdueAtlas, Io, pack_rgba};
use imdraw_backend::render::DispatchStats;
use imdraw_backend::store::{BlobStore, StoreError};

const SETTINGS_BLOB: &str = "clear_color";
const MAX_TYPED: usize = 64;

const PANEL: u32 = pack_rgba(0x24, 0x27, 0x2e, 0xf0);
const PANEL_EDGE: u32 = pack_rgba(0x5a, 0x8d, 0xee, 0xff);
const TEXT: u32 = pack_rgba(0xe6, 0xe6, 0xe6, 0xff);
const DIM: u32 = pack_rgba(0x9a, 0x9a, 0xa2, 0xff);
const GLOW: u32 = pack_rgba(0x40, 0x20, 0x08, 0xff);

const CLEAR_PRESETS: [[f32; 3]; 4] = [
    [0.08, 0.09, 0.11],
    [0.20, 0.24, 0.30],
    [0.30, 0.12, 0.14],
    [0.10, 0.22, 0.14],
];

/// Demo UI state carried across frames.
#[derive(Debug)]
pub struct Scene {
    clear: [f32; 3],
    preset: usize,
    typed: String,
    status: String,
    last_stats: DispatchStats,
    frames: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            clear: CLEAR_PRESETS[0],
            preset: 0,
            typed: String::new(),
            status: "F1 color  F2 save  F3 load  F5 lose device".to_string(),
            last_stats: DispatchStats::default(),
            frames: 0,
        }
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b] = self.clear;
        wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: 1.0,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn record_stats(&mut self, stats: DispatchStats) {
        self.last_stats = stats;
    }

    pub fn cycle_clear_color(&mut self) {
        self.preset = (self.preset + 1) % CLEAR_PRESETS.len();
        self.clear = CLEAR_PRESETS[self.preset];
    }

    pub fn save(&mut self, store: &mut dyn BlobStore) {
        let bytes: Vec<u8> = self.clear.iter().flat_map(|c| c.to_le_bytes()).collect();
        self.status = match store.save(SETTINGS_BLOB, &bytes) {
            Ok(()) => "clear color saved".to_string(),
            Err(e) => format!("save failed: {e}"),
        };
    }

    pub fn load(&mut self, store: &dyn BlobStore) {
        self.status = match store.load(SETTINGS_BLOB) {
            Ok(bytes) => match decode_color(&bytes) {
                Some(color) => {
                    self.clear = color;
                    "clear color loaded".to_string()
                }
                None => format!("{SETTINGS_BLOB} is corrupt ({} bytes)", bytes.len()),
            },
            Err(StoreError::NotFound(_)) => "nothing saved yet".to_string(),
            Err(e) => format!("load failed: {e}"),
        };
    }

    /// Builds this frame's draw data. Consumes the characters typed since
    /// the last frame.
    pub fn build(&mut self, io: &Io, fonts: &FontdueAtlas) -> DrawData {
        self.frames += 1;
        for &ch in &io.input_characters {
            match ch {
                '\u{8}' => {
                    self.typed.pop();
                }
                c if !c.is_control() && self.typed.chars().count() < MAX_TYPED => self.typed.push(c),
                _ => {}
            }
        }

        let [w, h] = io.display_size;
        let viewport = ClipRect::new(0.0, 0.0, w, h);
        let line = fonts.line_height().max(1.0);

        let mut b = DrawListBuilder::new(viewport, fonts.white_uv());
        b.push_texture(fonts.tex_id());

        // Status panel.
        let panel = ClipRect::new(16.0, 16.0, 16.0 + 420.0, 16.0 + line * 6.0 + 16.0);
        b.add_rect_filled(panel, PANEL);
        b.add_rect_filled(ClipRect::new(panel.x1, panel.y1, panel.x2, panel.y1 + 2.0), PANEL_EDGE);

        let fps = if io.delta_time > 0.0 { 1.0 / io.delta_time } else { 0.0 };
        let lines = [
            (TEXT, "imdraw backend demo".to_string()),
            (DIM, format!("{w:.0}x{h:.0}  {fps:.0} fps  frame {}", self.frames)),
            (
                DIM,
                format!(
                    "{} draws  {} callbacks  {} triangles",
                    self.last_stats.draw_calls, self.last_stats.callbacks, self.last_stats.triangles
                ),
            ),
            (DIM, format!("mouse {:.0},{:.0}  wheel {:+.0}", io.mouse_pos[0], io.mouse_pos[1], io.mouse_wheel)),
            (TEXT, format!("> {}_", self.typed)),
            (DIM, self.status.clone()),
        ];

        b.push_clip_rect(panel);
        for (i, (col, text)) in lines.iter().enumerate() {
            b.add_text(fonts, [panel.x1 + 10.0, panel.y1 + 8.0 + line * i as f32], *col, text);
        }
        b.pop_clip_rect();

        // Clipped strip: text runs past the scissor rect.
        let strip = ClipRect::new(16.0, panel.y2 + 12.0, 196.0, panel.y2 + 12.0 + line + 8.0);
        b.add_rect_filled(strip, PANEL);
        b.push_clip_rect(ClipRect::new(strip.x1 + 6.0, strip.y1, strip.x2 - 6.0, strip.y2));
        b.add_text(fonts, [strip.x1 + 6.0, strip.y1 + 4.0], TEXT, "scissored text keeps running past the edge");
        b.pop_clip_rect();

        // The callback switches to additive blending for everything after it.
        b.add_callback(Rc::new(|device: &mut dyn Device, _list: &DrawList, _cmd: &DrawCmd| {
            device.set_render_state(RenderState::DestBlend(Blend::One));
        }));
        let glow = ClipRect::new(strip.x2 + 12.0, strip.y1, strip.x2 + 12.0 + 120.0, strip.y2);
        b.add_rect_filled(glow, GLOW);
        b.add_rect_filled(ClipRect::new(glow.x1 + 30.0, glow.y1, glow.x2, glow.y2), GLOW);

        // Cursor marker.
        let [mx, my] = io.mouse_pos;
        if mx >= 0.0 && my >= 0.0 {
            let size = if io.mouse_down[0] { 14.0 } else { 8.0 };
            b.add_rect_filled(ClipRect::new(mx - size, my - size, mx + size, my + size), GLOW);
        }

        DrawData::new(vec![b.finish()])
    }
}

fn decode_color(bytes: &[u8]) -> Option<[f32; 3]> {
    if bytes.len() != 12 {
        return None;
    }
    let mut out = [0.0f32; 3];
    for (c, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *c = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out.iter().all(|c| (0.0..=1.0).contains(c)).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_round_trip_through_bytes() {
        let bytes: Vec<u8> = [0.25f32, 0.5, 1.0].iter().flat_map(|c| c.to_le_bytes()).collect();
        assert_eq!(decode_color(&bytes), Some([0.25, 0.5, 1.0]));
        assert_eq!(decode_color(&bytes[..8]), None);
    }

    #[test]
    fn typed_text_honors_backspace() {
        let mut scene = Scene::new();
        let fonts = FontdueAtlas::white_only();
        let mut io = Io::new();
        io.display_size = [640.0, 480.0];
        io.input_characters = vec!['a', 'b', '\u{8}', 'c'];

        let data = scene.build(&io, &fonts);

        assert_eq!(scene.typed, "ac");
        assert!(data.validate().is_ok());
        assert!(data.lists[0].cmd_buffer.iter().any(|c| c.is_callback()));
    }
}
