//! Terminal rendering of the fleet.
//!
//! Uses Ratatui for drawing. Enable with the `dashboard` feature flag (on by
//! default).
//!
//! Each frame is a header with simulated time and spread, a [`Canvas`] of the
//! scene with every robot labelled by the last digit of its index, and a
//! footer listing each robot's heading octant. Frame rate is capped by
//! sleeping on the renderer's [`Clock`] in `on_step_begin`, which affects
//! wall-clock time only.

use formation_core::{Pose, PoseSet};
use formation_env::{Callback, Clock, HookError, Logs, WallClock};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::canvas::{Canvas, Points},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal, TerminalOptions, Viewport,
};
use std::f64::consts::FRAC_PI_4;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

const HEADINGS: [char; 8] = ['→', '↗', '↑', '↖', '←', '↙', '↓', '↘'];

/// Renderer drawing inline on stdout.
pub type StdoutRenderer = TerminalRenderer<CrosstermBackend<Stdout>>;

/// One frame's worth of text around the canvas.
struct Scene<'a> {
    title: String,
    status: String,
    poses: &'a PoseSet,
}

/// Draws every step as a terminal frame.
pub struct TerminalRenderer<B: Backend> {
    terminal: Terminal<B>,

    /// Half-size of the visible square, in meters
    extent: f64,

    /// Minimum wall-clock time between frames
    frame_interval: Option<Duration>,

    clock: Arc<dyn Clock>,
    last_frame: Option<Duration>,
    frames: usize,
}

impl StdoutRenderer {
    /// Renders in an inline viewport below the cursor, sized to the terminal.
    pub fn stdout(extent: f64) -> io::Result<Self> {
        let (_, rows) = crossterm::terminal::size()?;
        let height = rows.saturating_sub(2).clamp(10, 30);
        let terminal = Terminal::with_options(
            CrosstermBackend::new(io::stdout()),
            TerminalOptions {
                viewport: Viewport::Inline(height),
            },
        )?;
        Ok(Self::new(terminal, extent))
    }
}

impl<B: Backend> TerminalRenderer<B> {
    /// Creates a renderer showing `[-extent, extent]²`, unpaced and timed by
    /// the wall clock.
    pub fn new(terminal: Terminal<B>, extent: f64) -> Self {
        Self {
            terminal,
            extent: if extent.is_finite() && extent > 0.0 { extent } else { 1.0 },
            frame_interval: None,
            clock: WallClock::shared(),
            last_frame: None,
            frames: 0,
        }
    }

    /// Caps the frame rate at `fps`; non-positive values disable pacing.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.frame_interval = if fps.is_finite() && fps > 0.0 {
            Duration::try_from_secs_f64(1.0 / fps).ok()
        } else {
            None
        };
        self
    }

    /// Paces frames with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of frames drawn.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Returns true if a scene position falls inside the canvas bounds.
    pub fn in_view(&self, x: f64, y: f64) -> bool {
        let range = -self.extent..=self.extent;
        range.contains(&x) && range.contains(&y)
    }

    fn draw(&mut self, title: String, status: String, poses: &PoseSet) -> io::Result<()> {
        let hidden = poses.iter().filter(|p| !self.in_view(p.x, p.y)).count();
        let status = if hidden > 0 {
            format!("{}  ({} outside the view)", status, hidden)
        } else {
            status
        };
        let scene = Scene { title, status, poses };
        let extent = self.extent;

        self.terminal.draw(|f| render_scene(f, &scene, extent))?;
        self.frames += 1;
        Ok(())
    }
}

fn render_scene(f: &mut Frame, scene: &Scene, extent: f64) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Canvas
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled("formation", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  |  "),
        Span::styled(scene.title.as_str(), Style::default().fg(Color::Cyan)),
    ]));
    f.render_widget(header, chunks[0]);

    let coords: Vec<(f64, f64)> = scene.poses.iter().map(|p| (p.x, p.y)).collect();
    let canvas = Canvas::default()
        .block(Block::default().title("fleet").borders(Borders::ALL))
        .marker(Marker::Braille)
        .x_bounds([-extent, extent])
        .y_bounds([-extent, extent])
        .paint(|ctx| {
            ctx.draw(&Points {
                coords: &coords,
                color: Color::Yellow,
            });
            for (i, pose) in scene.poses.iter().enumerate() {
                ctx.print(
                    pose.x,
                    pose.y,
                    Span::styled(robot_label(i), Style::default().fg(Color::Green)),
                );
            }
        });
    f.render_widget(canvas, chunks[1]);

    let headings: String = scene.poses.iter().map(heading_glyph).collect();
    let footer = Paragraph::new(format!("{}  {}", headings, scene.status))
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, chunks[2]);
}

fn robot_label(index: usize) -> String {
    (index % 10).to_string()
}

fn heading_glyph(pose: &Pose) -> char {
    let octant = (pose.theta / FRAC_PI_4).round().rem_euclid(8.0) as usize;
    HEADINGS[octant % 8]
}

impl<B: Backend> Callback for TerminalRenderer<B> {
    fn on_sim_begin(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        self.last_frame = None;
        let title = format!("t=0.00s  step 0/{}", logs.n_steps());
        let status = format!("spread={:.3}", logs.initial_poses().spread());
        Ok(self.draw(title, status, logs.initial_poses())?)
    }

    fn on_step_begin(&mut self, _step: usize, _logs: &mut Logs) -> Result<(), HookError> {
        if let Some(interval) = self.frame_interval {
            if let Some(last) = self.last_frame {
                let elapsed = self.clock.now().saturating_sub(last);
                if elapsed < interval {
                    self.clock.sleep(interval - elapsed);
                }
            }
            self.last_frame = Some(self.clock.now());
        }
        Ok(())
    }

    fn on_step_end(&mut self, step: usize, logs: &mut Logs) -> Result<(), HookError> {
        let title = format!(
            "t={:.2}s  step {}/{}",
            (step + 1) as f64 * logs.step_time(),
            step + 1,
            logs.n_steps()
        );
        let status = format!("spread={:.3}", logs.poses().spread());
        Ok(self.draw(title, status, logs.poses())?)
    }

    fn on_sim_end(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        let title = format!("done after {} steps", logs.n_steps());
        let status = format!("final spread={:.4}", logs.poses().spread());
        Ok(self.draw(title, status, logs.poses())?)
    }

    fn name(&self) -> &str {
        "terminal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ManualClock;
    use ratatui::backend::TestBackend;
    use std::f64::consts::PI;

    fn renderer() -> TerminalRenderer<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        TerminalRenderer::new(terminal, 5.0)
    }

    /// Screen contents, one string per row.
    fn rows(r: &TerminalRenderer<TestBackend>) -> Vec<String> {
        let buffer = r.terminal().backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn test_in_view() {
        let r = renderer();
        assert!(r.in_view(0.0, 0.0));
        assert!(r.in_view(-5.0, 5.0));
        assert!(!r.in_view(5.1, 0.0));
        assert!(!r.in_view(0.0, f64::NAN));
    }

    #[test]
    fn test_heading_glyphs() {
        assert_eq!(heading_glyph(&Pose::new(0.0, 0.0, 0.0)), '→');
        assert_eq!(heading_glyph(&Pose::new(0.0, 0.0, PI / 2.0)), '↑');
        assert_eq!(heading_glyph(&Pose::new(0.0, 0.0, PI)), '←');
        assert_eq!(heading_glyph(&Pose::new(0.0, 0.0, -PI / 2.0)), '↓');
        assert_eq!(heading_glyph(&Pose::new(0.0, 0.0, -3.0 * PI / 4.0)), '↙');
    }

    #[test]
    fn test_draws_robots_and_frames() {
        let poses = PoseSet::from_positions(&[(0.0, 0.0), (-4.0, 4.0), (40.0, 0.0)]);
        let mut logs = Logs::new(1, 0.1, poses);
        let mut r = renderer();

        r.on_sim_begin(&mut logs).unwrap();
        assert!(rows(&r)[0].contains("step 0/1"));

        r.on_step_end(0, &mut logs).unwrap();
        assert!(rows(&r)[0].contains("t=0.10s  step 1/1"));

        r.on_sim_end(&mut logs).unwrap();
        assert_eq!(r.frames(), 3);

        let screen = rows(&r);
        assert!(screen[0].contains("done after 1 steps"));

        // Canvas rows sit between the header and the footer
        let canvas = screen[1..screen.len() - 1].concat();
        assert!(canvas.contains('0'));
        assert!(canvas.contains('1'));
        assert!(!canvas.contains('2'));

        let footer = &screen[screen.len() - 1];
        assert!(footer.starts_with("→→→"));
        assert!(footer.contains("(1 outside the view)"));
    }

    #[test]
    fn test_fps_pacing_sleeps_on_clock() {
        let clock = Arc::new(ManualClock::new());
        let mut r = renderer().with_fps(10.0).with_clock(clock.clone());
        let mut logs = Logs::new(3, 0.1, PoseSet::from_positions(&[(0.0, 0.0)]));

        for step in 0..3 {
            r.on_step_begin(step, &mut logs).unwrap();
        }
        // First frame is free, the next two wait a full interval each
        assert_eq!(clock.time_ns(), 200_000_000);
    }

    #[test]
    fn test_no_pacing_without_fps() {
        let clock = Arc::new(ManualClock::new());
        let mut r = renderer().with_fps(0.0).with_clock(clock.clone());
        let mut logs = Logs::new(3, 0.1, PoseSet::from_positions(&[(0.0, 0.0)]));

        for step in 0..3 {
            r.on_step_begin(step, &mut logs).unwrap();
        }
        assert_eq!(clock.time_ns(), 0);
    }
}
