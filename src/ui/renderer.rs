/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each level cell is two terminal columns wide. Level rows are drawn top
/// row first, so engine `y` is flipped on the way out.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::app::{App, Phase};
use crate::domain::entity::Position;
use crate::domain::tile::TileKind;
use crate::sim::catalog::Catalog;
use crate::sim::clock::TimeSource;
use crate::sim::engine::Engine;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Camera ──

/// Viewport over the level in text-row space (row 0 = top of the level).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Camera {
    /// Column of the top-left visible cell (negative when centering)
    pub x: i32,
    /// Row of the top-left visible cell
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    /// Dead-zone follow: only scroll once the target gets within 20% of
    /// an edge. Levels smaller than the view are centered.
    pub fn follow(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target_x, self.view_w, world_w);
        self.y = follow_axis(self.y, target_y, self.view_h, world_h);
    }

    /// Snap directly to center on a position (no dead zone).
    pub fn center_on(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target_x, self.view_w, world_w);
        self.y = center_axis(target_y, self.view_h, world_h);
    }
}

fn follow_axis(origin: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    let margin = view as i32 / 5;
    let low = origin + margin;
    let high = origin + view as i32 - margin - 1;
    let origin = if target < low {
        target - margin
    } else if target > high {
        target - view as i32 + margin + 1
    } else {
        origin
    };
    origin.clamp(0, world as i32 - view as i32)
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    (target - view as i32 / 2).clamp(0, world as i32 - view as i32)
}

/// Remaining time as `MMM:SS`.
pub fn format_time(secs: u32) -> String {
    format!("{:03}:{:02}", secs / 60, secs % 60)
}

/// Two-column glyph and colours for a tile, keyed by sprite name.
fn tile_look(kind: TileKind) -> (&'static str, Color, Color) {
    match kind.sprite() {
        Some("wall") => ("██", Color::Rgb { r: 110, g: 110, b: 125 }, Color::Reset),
        Some("dirt") => ("░░", Color::Rgb { r: 150, g: 100, b: 50 }, Color::Rgb { r: 60, g: 40, b: 20 }),
        Some("exit-inactive") => ("▯▯", Color::DarkGrey, Color::Reset),
        Some("exit-active") => ("▮▮", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset),
        Some("grub") => ("§ ", Color::Rgb { r: 180, g: 255, b: 120 }, Color::Reset),
        Some("stone") => ("()", Color::Rgb { r: 200, g: 200, b: 200 }, Color::Reset),
        Some("player-right") => ("☻ ", Color::Rgb { r: 255, g: 220, b: 50 }, Color::Reset),
        Some("fox") => ("ƒ ", Color::Rgb { r: 255, g: 130, b: 40 }, Color::Reset),
        _ => ("  ", Color::White, Color::Reset),
    }
}

// ── Renderer ──

const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    last_phase: Option<Phase>,
    /// Release events enabled via keyboard enhancement.
    key_release: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::default(),
            last_phase: None,
            key_release: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.key_release = true;
        }
        log::debug!("key release events: {}", self.key_release);
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    /// True once `init` has turned on Release reporting.
    pub fn reports_key_release(&self) -> bool {
        self.key_release
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.key_release = false;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back differs from front everywhere.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render<T: TimeSource>(&mut self, app: &App, engine: &Engine<T>, catalog: &Catalog) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        let phase_changed = self.last_phase != Some(app.phase);
        if phase_changed {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.update_camera(engine, phase_changed);
        self.last_phase = Some(app.phase);

        self.front.clear();
        match app.phase {
            Phase::LevelSelect => self.compose_level_select(app, catalog),
            Phase::Playing => {
                self.compose_game(app, engine);
                if app.paused {
                    self.compose_banner(&["PAUSED", "", "Esc/P: Resume   Q: Level select"], Color::Rgb { r: 255, g: 220, b: 50 });
                }
            }
            Phase::Finished(reason) => {
                self.compose_game(app, engine);
                let hint = if reason.is_retryable() { "Enter: Retry   Esc: Level select" } else { "Enter: Next level   Esc: Level select" };
                let color = if reason.is_retryable() { Color::Rgb { r: 255, g: 90, b: 90 } } else { Color::Rgb { r: 80, g: 255, b: 80 } };
                self.compose_banner(&[reason.message(), "", hint], color);
            }
            Phase::Complete => self.compose_complete(catalog),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn update_camera<T: TimeSource>(&mut self, engine: &Engine<T>, snap: bool) {
        let Some(level) = engine.level() else { return };
        let reserved_rows = MAP_ROW + 3;
        self.camera.view_w = (self.term_w / CELL_W).min(level.width()).max(1);
        self.camera.view_h = self.term_h.saturating_sub(reserved_rows).min(level.height()).max(1);

        let Some(focus) = engine.focus_position() else { return };
        let row = level.height() as i32 - 1 - focus.y;
        if snap {
            self.camera.center_on(focus.x, row, level.width(), level.height());
        } else {
            self.camera.follow(focus.x, row, level.width(), level.height());
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game<T: TimeSource>(&mut self, app: &App, engine: &Engine<T>) {
        let Some(level) = engine.level() else { return };
        let hud_bg = Color::Rgb { r: 20, g: 20, b: 60 };

        let hud = format!(
            " {}. {}   Grubs: {}/{}   Time: {} ",
            app.current + 1,
            level.name(),
            engine.collected_count(),
            engine.required_count(),
            format_time(engine.remaining_time()),
        );
        self.front.fill_row(HUD_ROW, hud_bg);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, hud_bg);

        let cam = self.camera.clone();
        let height = level.height() as i32;
        for vy in 0..cam.view_h {
            let row = cam.y + vy as i32;
            let screen_row = MAP_ROW + vy;
            if screen_row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = cam.x + vx as i32;
                let screen_col = vx * CELL_W;
                if screen_col + 1 >= self.front.width { break; }

                let kind = if row < 0 || row >= height || col < 0 || col >= level.width() as i32 {
                    None
                } else {
                    let pos = Position::new(col, height - 1 - row);
                    match engine.entity_at(pos) {
                        Some(e) => Some(e.kind),
                        None => Some(match level.tile_at(pos.x, pos.y) {
                            TileKind::Wall => TileKind::Wall,
                            _ => TileKind::Empty,
                        }),
                    }
                };
                let (glyph, fg, bg) = kind.map_or(("  ", Color::White, Color::Reset), tile_look);
                self.front.put_str(screen_col, screen_row, glyph, fg, bg);
            }
        }

        let status_row = MAP_ROW + cam.view_h + 1;
        if status_row < self.front.height {
            let cue = app.last_cue.map(|c| format!("  ♪ {c}")).unwrap_or_default();
            let help = format!(" Arrows/WASD: Move   Esc/P: Pause   Ctrl+C: Quit{cue}");
            self.front.put_str(0, status_row, &help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_banner(&mut self, lines: &[&str], color: Color) {
        let box_bg = Color::Rgb { r: 40, g: 40, b: 40 };
        let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
        let box_w = inner.min(self.front.width);
        let box_h = lines.len() + 2;
        let view_cols = (self.camera.view_w * CELL_W).max(box_w);
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + self.camera.view_h.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::White, box_bg));
            }
        }
        for (i, line) in lines.iter().enumerate() {
            let pad = (box_w.saturating_sub(line.chars().count())) / 2;
            self.front.put_str(box_x + pad, box_y + 1 + i, line, color, box_bg);
        }
    }

    fn compose_level_select(&mut self, app: &App, catalog: &Catalog) {
        let title = Color::Rgb { r: 255, g: 200, b: 50 };
        let hi = Color::Rgb { r: 80, g: 255, b: 80 };
        let dim = Color::DarkGrey;
        let cursor_bg = Color::Rgb { r: 30, g: 60, b: 30 };

        self.front.put_str(2, 1, "╔══════════════════════════════╗", title, Color::Reset);
        self.front.put_str(2, 2, "║     R O C K F A L L          ║", title, Color::Reset);
        self.front.put_str(2, 3, "╚══════════════════════════════╝", title, Color::Reset);

        let list_top = 5;
        let visible = self.front.height.saturating_sub(list_top + 3).max(1);
        let scroll = app.cursor.saturating_sub(visible - 1);

        for (i, entry) in catalog.entries().iter().enumerate().skip(scroll).take(visible) {
            let row = list_top + i - scroll;
            let label = format!(
                "{:>3}. {:<24} {} grubs  {}",
                i + 1,
                entry.level.name(),
                entry.level.required_collectables(),
                format_time(entry.level.max_time()),
            );
            if i == app.cursor {
                let blink = (app.anim_tick / 20) % 2 == 0;
                for x in 0..(label.chars().count() + 4).min(self.front.width) {
                    self.front.set(x, row, Cell::new(' ', Color::White, cursor_bg));
                }
                self.front.put_str(1, row, if blink { "▸" } else { " " }, hi, cursor_bg);
                self.front.put_str(3, row, &label, hi, cursor_bg);
            } else {
                self.front.put_str(3, row, &label, Color::White, Color::Reset);
            }
        }

        let footer_row = list_top + visible.min(catalog.len()) + 1;
        self.front.put_str(2, footer_row, "Enter: Play   ↑↓: Select   Esc/Q: Quit", dim, Color::Reset);
    }

    fn compose_complete(&mut self, catalog: &Catalog) {
        let gold = Color::Rgb { r: 255, g: 220, b: 50 };
        self.front.put_str(4, 3, "╔══════════════════════════════╗", gold, Color::Reset);
        self.front.put_str(4, 4, "║   ★ ALL LEVELS CLEARED! ★    ║", gold, Color::Reset);
        self.front.put_str(4, 5, "╚══════════════════════════════╝", gold, Color::Reset);
        let levels = format!("{} levels dug through", catalog.len());
        self.front.put_str(6, 7, &levels, Color::White, Color::Reset);
        self.front.put_str(6, 9, "Enter / Esc: Level select", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(view_w: usize, view_h: usize) -> Camera {
        Camera { x: 0, y: 0, view_w, view_h }
    }

    #[test]
    fn small_level_is_centered() {
        let mut cam = camera(20, 10);
        cam.follow(3, 3, 10, 6);
        assert_eq!((cam.x, cam.y), (-5, -2));
    }

    #[test]
    fn dead_zone_holds_until_edge() {
        let mut cam = camera(10, 10);
        // margin 2: target may roam columns 2..=7 without scrolling
        cam.follow(7, 5, 40, 40);
        assert_eq!(cam.x, 0);
        cam.follow(8, 5, 40, 40);
        assert_eq!(cam.x, 1);
    }

    #[test]
    fn camera_clamps_to_world() {
        let mut cam = camera(10, 10);
        cam.follow(39, 39, 40, 40);
        assert_eq!((cam.x, cam.y), (30, 30));
        cam.follow(0, 0, 40, 40);
        assert_eq!((cam.x, cam.y), (0, 0));
    }

    #[test]
    fn center_on_snaps() {
        let mut cam = camera(10, 10);
        cam.center_on(20, 20, 40, 40);
        assert_eq!((cam.x, cam.y), (15, 15));
    }

    #[test]
    fn zero_view_is_ignored() {
        let mut cam = camera(0, 10);
        cam.center_on(20, 20, 40, 40);
        assert_eq!((cam.x, cam.y), (0, 0));
    }

    #[test]
    fn release_reporting_off_until_init() {
        assert!(!Renderer::new().reports_key_release());
    }

    #[test]
    fn time_is_minutes_and_seconds() {
        assert_eq!(format_time(0), "000:00");
        assert_eq!(format_time(90), "001:30");
        assert_eq!(format_time(3600), "060:00");
    }

    #[test]
    fn every_kind_has_a_two_column_look() {
        for kind in TileKind::ALL {
            let (glyph, _, _) = tile_look(kind);
            assert_eq!(glyph.chars().count(), CELL_W, "{kind:?}");
        }
    }

    #[test]
    fn put_str_clips_at_edge() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.put_str(2, 0, "abcd", Color::White, Color::Reset);
        assert_eq!(fb.get(3, 0).ch, 'b');
        assert_eq!(fb.get(5, 0), Cell::BLANK);
    }
}
