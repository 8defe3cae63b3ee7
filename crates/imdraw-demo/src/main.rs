mod runtime;
mod scene;

use imdraw_backend::gui::FontdueAtlas;
use imdraw_backend::logging::{LoggingConfig, init_logging};

const FONT_SIZE_PX: f32 = 18.0;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let fonts = load_fonts();
    runtime::run(runtime::DemoConfig::default(), fonts)
}

fn load_fonts() -> FontdueAtlas {
    let candidates = [
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
        "C:\\Windows\\Fonts\\segoeui.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ];

    for path in candidates {
        let Ok(bytes) = std::fs::read(path) else { continue; };
        match FontdueAtlas::from_font_bytes(&bytes, FONT_SIZE_PX) {
            Ok(atlas) => {
                log::info!("font loaded from {path}");
                return atlas;
            }
            Err(e) => log::warn!("{path}: {e}"),
        }
    }

    log::warn!("no system font found; text will not render");
    FontdueAtlas::white_only()
}
