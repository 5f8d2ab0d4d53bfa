// Four-panel PNG overview of one analysed document
use anyhow::{Context, Result};
use indexmap::IndexMap;
use rusttype::{point, Font, Scale};
use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, StrokeDash, Transform};

use crate::config::CHART_SUFFIX;
use crate::types::{DocumentAnalysis, ProtectionDetection};

const WIDTH: u32 = 1600;
const HEIGHT: u32 = 1200;
const TITLE_BAND: f32 = 60.0;
const MARGIN: f32 = 60.0;

pub const TITLE: &str = "Röle Arıza Kaydı Analizi";
const CAUSE_PREVIEW_CHARS: usize = 50;

pub const SIGNAL_SAMPLES: usize = 100;
pub const SIGNAL_SPAN_S: f32 = 2.0;
pub const PICKUP_MARKER_S: f32 = 0.1;
pub const TRIP_MARKER_S: f32 = 0.3;
const SIGNAL_FREQ_HZ: f32 = 50.0;
const SIGNAL_DECAY_S: f32 = 0.5;

type Rgb = (u8, u8, u8);

const SKYBLUE: Rgb = (135, 206, 235);
const ORANGE: Rgb = (255, 165, 0);
const RED: Rgb = (220, 20, 60);
const GRID: Rgb = (220, 220, 220);
const AXIS: Rgb = (60, 60, 60);
const TEXT: Rgb = (20, 20, 20);

/// lightcoral, lightblue, lightgreen, khaki; reused in order past four slices.
pub const PIE_PALETTE: [Rgb; 4] = [
    (240, 128, 128),
    (173, 216, 230),
    (144, 238, 144),
    (240, 230, 140),
];

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Code up to the first `(`, then up to the first `-`.
pub fn code_prefix(code: &str) -> &str {
    let head = code.split('(').next().unwrap_or(code);
    head.split('-').next().unwrap_or(head)
}

pub fn protection_type_counts(detections: &[ProtectionDetection]) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for d in detections {
        *counts.entry(code_prefix(&d.code).to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn status_counts(detections: &[ProtectionDetection]) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for d in detections {
        *counts.entry(d.status.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn pie_color(index: usize) -> Rgb {
    PIE_PALETTE[index % PIE_PALETTE.len()]
}

/// Decaying 50 Hz sine, evenly sampled over [0, 2] s with both ends included.
pub fn signal_samples() -> Vec<(f32, f32)> {
    let step = SIGNAL_SPAN_S / (SIGNAL_SAMPLES - 1) as f32;
    (0..SIGNAL_SAMPLES)
        .map(|i| {
            let t = i as f32 * step;
            let value = (2.0 * PI * SIGNAL_FREQ_HZ * t).sin() * (-t / SIGNAL_DECAY_S).exp();
            (t, value)
        })
        .collect()
}

pub fn truncate_cause(cause: &str) -> String {
    if cause.chars().count() > CAUSE_PREVIEW_CHARS {
        let head: String = cause.chars().take(CAUSE_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        cause.to_string()
    }
}

pub fn summary_lines(doc: &DocumentAnalysis) -> Vec<String> {
    vec![
        "ARIZA ÖZETİ".to_string(),
        "─".repeat(28),
        format!("Cihaz: {}", doc.fault.device_name),
        format!("Zaman: {}", doc.fault.fault_time),
        format!("Neden: {}", truncate_cause(&doc.analysis.probable_cause)),
        String::new(),
        format!("AKTİF KORUMA SAYISI: {}", doc.detections().len()),
        format!("ÖNERİ SAYISI: {}", doc.analysis.recommendations.len()),
        String::new(),
        "DURUM: ANALİZ TAMAMLANDI".to_string(),
    ]
}

/// Configured font first, then well-known system locations.
pub fn load_font(configured: Option<&Path>) -> Option<Font<'static>> {
    let configured = configured.map(Path::to_path_buf);
    let candidates = configured
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in candidates {
        if let Ok(data) = fs::read(&path) {
            if let Some(font) = Font::try_from_vec(data) {
                log::debug!("Chart font: {}", path.display());
                return Some(font);
            }
        }
    }

    log::warn!("No font found, chart labels are skipped");
    None
}

#[derive(Debug, Clone, Copy)]
struct Panel {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl Panel {
    fn grid(col: u32, row: u32) -> Self {
        let w = WIDTH as f32 / 2.0;
        let h = (HEIGHT as f32 - TITLE_BAND) / 2.0;
        Self {
            x: col as f32 * w,
            y: TITLE_BAND + row as f32 * h,
            w,
            h,
        }
    }

    // Plot area inside the margins
    fn inner(&self) -> Self {
        Self {
            x: self.x + MARGIN,
            y: self.y + MARGIN,
            w: self.w - 2.0 * MARGIN,
            h: self.h - 2.0 * MARGIN,
        }
    }
}

struct Canvas<'f> {
    pixmap: Pixmap,
    font: Option<&'f Font<'static>>,
}

impl<'f> Canvas<'f> {
    fn new(font: Option<&'f Font<'static>>) -> Result<Self> {
        let mut pixmap = Pixmap::new(WIDTH, HEIGHT).context("Failed to create pixmap")?;
        pixmap.fill(Color::WHITE);
        Ok(Self { pixmap, font })
    }

    fn paint(rgb: Rgb) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(rgb.0, rgb.1, rgb.2, 255);
        paint.anti_alias = true;
        paint
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgb: Rgb) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            self.pixmap
                .fill_rect(rect, &Self::paint(rgb), Transform::identity(), None);
        }
    }

    fn polyline(&mut self, points: &[(f32, f32)], rgb: Rgb, width: f32, dashed: bool) {
        let mut pb = PathBuilder::new();
        for (i, (x, y)) in points.iter().enumerate() {
            if i == 0 {
                pb.move_to(*x, *y);
            } else {
                pb.line_to(*x, *y);
            }
        }
        let Some(path) = pb.finish() else { return };

        let mut stroke = Stroke {
            width,
            ..Stroke::default()
        };
        if dashed {
            stroke.dash = StrokeDash::new(vec![8.0, 5.0], 0.0);
        }
        self.pixmap
            .stroke_path(&path, &Self::paint(rgb), &stroke, Transform::identity(), None);
    }

    fn wedge(&mut self, cx: f32, cy: f32, r: f32, start: f32, sweep: f32, rgb: Rgb) {
        let steps = ((sweep.abs() / (2.0 * PI)) * 90.0).ceil().max(2.0) as usize;
        let mut pb = PathBuilder::new();
        pb.move_to(cx, cy);
        for i in 0..=steps {
            let a = start + sweep * i as f32 / steps as f32;
            pb.line_to(cx + r * a.cos(), cy + r * a.sin());
        }
        pb.close();
        if let Some(path) = pb.finish() {
            self.pixmap.fill_path(
                &path,
                &Self::paint(rgb),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    /// Draws `text` with its top-left corner at (x, y). No-op without a font.
    fn text(&mut self, text: &str, x: f32, y: f32, size: f32) {
        let Some(font) = self.font else { return };
        let scale = Scale::uniform(size);
        let ascent = font.v_metrics(scale).ascent;
        let width = self.pixmap.width() as i32;
        let height = self.pixmap.height() as i32;
        let data = self.pixmap.data_mut();

        for glyph in font.layout(text, scale, point(x, y + ascent)) {
            let Some(bb) = glyph.pixel_bounding_box() else { continue };
            glyph.draw(|gx, gy, coverage| {
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px < 0 || py < 0 || px >= width || py >= height {
                    return;
                }
                // Background is opaque, so premultiplied equals straight RGBA
                let idx = ((py * width + px) * 4) as usize;
                let keep = 1.0 - coverage;
                for (channel, ink) in [TEXT.0, TEXT.1, TEXT.2].into_iter().enumerate() {
                    let old = data[idx + channel] as f32;
                    data[idx + channel] = (old * keep + ink as f32 * coverage).round() as u8;
                }
            });
        }
    }

    fn axes(&mut self, area: Panel) {
        let bottom = area.y + area.h;
        self.polyline(&[(area.x, area.y), (area.x, bottom), (area.x + area.w, bottom)], AXIS, 1.5, false);
    }
}

fn draw_protection_bars(canvas: &mut Canvas, panel: Panel, counts: &IndexMap<String, usize>) {
    canvas.text("Aktif Koruma Fonksiyonları", panel.x + MARGIN, panel.y + 15.0, 22.0);
    let area = panel.inner();
    canvas.axes(area);

    let max = counts.values().copied().max().unwrap_or(0);
    if max == 0 {
        return;
    }

    let slot = area.w / counts.len() as f32;
    let bar_w = slot * 0.6;
    for (i, (code, count)) in counts.iter().enumerate() {
        let bar_h = area.h * (*count as f32 / max as f32);
        let x = area.x + slot * i as f32 + (slot - bar_w) / 2.0;
        canvas.fill_rect(x, area.y + area.h - bar_h, bar_w, bar_h, SKYBLUE);
        canvas.text(code, x, area.y + area.h + 8.0, 14.0);
        canvas.text(&count.to_string(), x, area.y + area.h - bar_h - 20.0, 14.0);
    }
}

fn draw_status_pie(canvas: &mut Canvas, panel: Panel, counts: &IndexMap<String, usize>) {
    canvas.text("Koruma Durumları Dağılımı", panel.x + MARGIN, panel.y + 15.0, 22.0);
    let total: usize = counts.values().sum();
    if total == 0 {
        return;
    }

    let area = panel.inner();
    let r = area.w.min(area.h) / 2.0 * 0.8;
    let cx = area.x + area.w / 2.0;
    let cy = area.y + area.h / 2.0;

    // Counter-clockwise from twelve o'clock in screen space
    let mut start = -PI / 2.0;
    for (i, (status, count)) in counts.iter().enumerate() {
        let share = *count as f32 / total as f32;
        let sweep = share * 2.0 * PI;
        canvas.wedge(cx, cy, r, start, sweep, pie_color(i));

        let mid = start + sweep / 2.0;
        let label = format!("{} ({:.1}%)", status, share * 100.0);
        canvas.text(&label, cx + (r + 12.0) * mid.cos(), cy + (r + 12.0) * mid.sin() - 8.0, 15.0);
        start += sweep;
    }
}

fn draw_signal(canvas: &mut Canvas, panel: Panel) {
    canvas.text("Arıza Sinyal Simülasyonu", panel.x + MARGIN, panel.y + 15.0, 22.0);
    let area = panel.inner();

    let to_x = |t: f32| area.x + area.w * t / SIGNAL_SPAN_S;
    let to_y = |v: f32| area.y + area.h / 2.0 - v * area.h / 2.0;

    for tenth in 1..10 {
        let y = area.y + area.h * tenth as f32 / 10.0;
        canvas.polyline(&[(area.x, y), (area.x + area.w, y)], GRID, 1.0, false);
    }
    canvas.axes(area);

    let points: Vec<(f32, f32)> = signal_samples()
        .into_iter()
        .map(|(t, v)| (to_x(t), to_y(v)))
        .collect();
    canvas.polyline(&points, RED, 2.0, false);

    for (at, rgb, label) in [(PICKUP_MARKER_S, ORANGE, "Pickup"), (TRIP_MARKER_S, RED, "Trip")] {
        let x = to_x(at);
        canvas.polyline(&[(x, area.y), (x, area.y + area.h)], rgb, 1.5, true);
        canvas.text(label, x + 4.0, area.y + 4.0, 14.0);
    }

    canvas.text("Zaman (s)", area.x + area.w / 2.0 - 30.0, area.y + area.h + 12.0, 15.0);
    canvas.text("Akım (A)", panel.x + 6.0, area.y - 24.0, 15.0);
}

fn draw_summary(canvas: &mut Canvas, panel: Panel, lines: &[String]) {
    let area = panel.inner();
    canvas.fill_rect(area.x, area.y, area.w, area.h, (173, 216, 230));
    for (i, line) in lines.iter().enumerate() {
        canvas.text(line, area.x + 20.0, area.y + 20.0 + i as f32 * 26.0, 18.0);
    }
}

pub fn render_chart(doc: &DocumentAnalysis, font: Option<&Font<'static>>) -> Result<Pixmap> {
    let mut canvas = Canvas::new(font)?;
    canvas.text(TITLE, WIDTH as f32 / 2.0 - 150.0, 16.0, 28.0);

    let detections = doc.detections();
    draw_protection_bars(&mut canvas, Panel::grid(0, 0), &protection_type_counts(detections));
    draw_status_pie(&mut canvas, Panel::grid(1, 0), &status_counts(detections));
    draw_signal(&mut canvas, Panel::grid(0, 1));
    draw_summary(&mut canvas, Panel::grid(1, 1), &summary_lines(doc));

    Ok(canvas.pixmap)
}

pub fn chart_path(output_dir: &Path, doc: &DocumentAnalysis) -> PathBuf {
    output_dir.join(format!("{}{}.png", doc.document_name(), CHART_SUFFIX))
}

/// Renders and writes `<stem>_chart.png` into `output_dir`.
pub fn save_chart(output_dir: &Path, doc: &DocumentAnalysis, font: Option<&Font<'static>>) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let pixmap = render_chart(doc, font)?;
    let path = chart_path(output_dir, doc);
    pixmap
        .save_png(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("Chart saved: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze_raw_text;

    #[test]
    fn test_code_prefix() {
        assert_eq!(code_prefix("67"), "67");
        assert_eq!(code_prefix("47O-"), "47O");
        assert_eq!(code_prefix("67-1"), "67");
        assert_eq!(code_prefix("51(N)-x"), "51");
    }

    #[test]
    fn test_counts_keep_first_seen_order() {
        let doc = analyze_raw_text(Path::new("x.pdf"), "67N ACMA\n27 HAZIR\n67 pick up");
        let types = protection_type_counts(doc.detections());
        let keys: Vec<_> = types.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["67", "67N", "27"]);
        assert_eq!(types["67"], 2);

        let statuses = status_counts(doc.detections());
        let keys: Vec<_> = statuses.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Açma", "Hazır", "Başlama"]);
        assert_eq!(statuses["Açma"], 2);
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(pie_color(0), (240, 128, 128));
        assert_eq!(pie_color(4), pie_color(0));
        assert_eq!(pie_color(5), (173, 216, 230));
    }

    #[test]
    fn test_signal_shape() {
        let samples = signal_samples();
        assert_eq!(samples.len(), SIGNAL_SAMPLES);
        assert_eq!(samples[0], (0.0, 0.0));
        assert!((samples[SIGNAL_SAMPLES - 1].0 - SIGNAL_SPAN_S).abs() < 1e-5);
        assert!(samples.iter().all(|(t, v)| v.abs() <= (-t / SIGNAL_DECAY_S).exp() + 1e-6));
    }

    #[test]
    fn test_cause_truncation_counts_chars() {
        let long = "ş".repeat(60);
        let cut = truncate_cause(&long);
        assert_eq!(cut.chars().count(), CAUSE_PREVIEW_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_cause("kısa"), "kısa");
    }

    #[test]
    fn test_summary_lines() {
        let doc = analyze_raw_text(Path::new("x.pdf"), "H10_FIDER_H\n67 ACMA");
        let lines = summary_lines(&doc);
        assert!(lines.contains(&"Cihaz: H10_FIDER_H".to_string()));
        assert!(lines.contains(&"AKTİF KORUMA SAYISI: 1".to_string()));
        assert!(lines.contains(&"ÖNERİ SAYISI: 3".to_string()));
    }

    #[test]
    fn test_save_chart_without_font() {
        let dir = tempfile::tempdir().unwrap();
        let doc = analyze_raw_text(Path::new("H10.pdf"), "67N ACMA\n27 HAZIR");
        let path = save_chart(dir.path(), &doc, None).unwrap();
        assert_eq!(path, dir.path().join("H10_chart.png"));
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
