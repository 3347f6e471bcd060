//! make_post_image 动作：把新闻摘要渲染成竖版 PNG 帖子图
//!
//! 背景色从调色板随机选，字体从配置列表中随机选第一个可加载的，都不可用时用内置的 DejaVu Sans；
//! 版式：标题行、每条要点按平均字宽折行并以空行分隔、末尾署名。返回图片绝对路径。

use std::path::PathBuf;

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::config::RenderSection;
use crate::core::ActionError;
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Action;

const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

#[derive(Deserialize, JsonSchema)]
struct MakePostImageArgs {
    /// 新闻摘要，每行一条要点
    news_summary: String,
}

pub struct MakePostImageAction {
    cfg: RenderSection,
}

impl MakePostImageAction {
    pub fn new(cfg: &RenderSection) -> Self {
        Self { cfg: cfg.clone() }
    }
}

#[async_trait]
impl Action for MakePostImageAction {
    fn name(&self) -> &str {
        "make_post_image"
    }

    fn description(&self) -> &str {
        "Create a post image from the news summary text. Returns the path of the created image."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<MakePostImageArgs>()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ActionError> {
        let args: MakePostImageArgs = parse_args(args)?;
        if args.news_summary.trim().is_empty() {
            return Err(ActionError::invalid_input("news_summary is empty"));
        }
        let cfg = self.cfg.clone();
        // 光栅化是 CPU 密集型，放到阻塞线程池
        let path = tokio::task::spawn_blocking(move || render_post(&cfg, &args.news_summary))
            .await
            .map_err(|e| ActionError::io(format!("render task failed: {e}")))??;
        let path = path.to_string_lossy().into_owned();
        tracing::info!(path = %path, "post image saved");
        Ok(Value::String(path))
    }
}

fn render_post(cfg: &RenderSection, summary: &str) -> Result<PathBuf, ActionError> {
    let mut rng = rand::thread_rng();

    let background = cfg
        .background_colors
        .choose(&mut rng)
        .map(|c| parse_hex_color(c.as_str()))
        .transpose()?
        .unwrap_or(Rgb([255, 255, 255]));
    let text_color = parse_hex_color(&cfg.text_color)?;

    let mut candidates = cfg.font_paths.clone();
    candidates.shuffle(&mut rng);
    let font = load_first_font(&candidates)?;

    let scale = PxScale::from(cfg.font_size);
    let scaled = font.as_scaled(scale);
    let avg_char_width = ('A'..='Z')
        .map(|c| scaled.h_advance(scaled.glyph_id(c)))
        .sum::<f32>()
        / 26.0;
    let max_chars = if avg_char_width > 0.0 {
        ((cfg.max_text_width as f32 / avg_char_width) as usize).max(1)
    } else {
        80
    };
    let line_height = (scaled.height() * cfg.line_spacing).max(1.0);

    let lines = layout_lines(summary, max_chars, &cfg.header, &cfg.footer);

    let mut img = RgbImage::from_pixel(cfg.width, cfg.height, background);
    let mut y = cfg.padding as f32 + line_height;
    for line in &lines {
        draw_line(&mut img, &font, scale, cfg.padding as f32, y, line, text_color);
        y += line_height;
    }

    std::fs::create_dir_all(&cfg.output_dir)?;
    let path = cfg.output_dir.join(&cfg.file_name);
    img.save(&path)
        .map_err(|e| ActionError::io(format!("save {}: {e}", path.display())))?;
    Ok(std::fs::canonicalize(&path).unwrap_or(path))
}

fn load_first_font(paths: &[PathBuf]) -> Result<FontVec, ActionError> {
    for path in paths {
        match std::fs::read(path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => return Ok(font),
                Err(e) => tracing::warn!(path = %path.display(), "invalid font: {}", e),
            },
            Err(e) => tracing::warn!(path = %path.display(), "font not readable: {}", e),
        }
    }
    tracing::warn!("no configured font usable, using bundled font");
    FontVec::try_from_vec(BUNDLED_FONT.to_vec())
        .map_err(|e| ActionError::config_missing(format!("bundled font is invalid: {e}")))
}

/// 组装版式行：标题、空行、折行后的要点（每条后跟空行）、空行、署名
fn layout_lines(summary: &str, max_chars: usize, header: &str, footer: &str) -> Vec<String> {
    let mut lines = vec![header.to_string(), String::new()];
    for point in summary.lines() {
        lines.extend(wrap_words(point, max_chars));
        lines.push(String::new());
    }
    lines.push(String::new());
    lines.push(footer.to_string());
    lines
}

/// 按词折行；超长单词按字符硬切
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn draw_line(
    img: &mut RgbImage,
    font: &FontVec,
    scale: PxScale,
    x: f32,
    baseline: f32,
    text: &str,
    color: Rgb<u8>,
) {
    let scaled = font.as_scaled(scale);
    let mut caret = point(x, baseline);
    let (w, h) = img.dimensions();
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(scale, caret);
        caret.x += scaled.h_advance(id);
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + gx as i64;
            let py = bounds.min.y as i64 + gy as i64;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                return;
            }
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            for i in 0..3 {
                let bg = pixel.0[i] as f32;
                let fg = color.0[i] as f32;
                pixel.0[i] = (bg + (fg - bg) * coverage.clamp(0.0, 1.0)).round() as u8;
            }
        });
    }
}

/// "#RRGGBB" -> Rgb
fn parse_hex_color(s: &str) -> Result<Rgb<u8>, ActionError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ActionError::invalid_input(format!("invalid colour: {s}")));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| ActionError::invalid_input(format!("invalid colour: {s}")))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
