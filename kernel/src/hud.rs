//! Task HUD: the lower-right rectangle listing live tasks.
//!
//! Rendering is idempotent and cheap; `draw` is a no-op unless some
//! task-table mutation marked the HUD dirty since the last draw.

use crate::drivers::vga::{self, Writer, HUD_H, HUD_W, VGA_HEIGHT, VGA_WIDTH};
use crate::task::{TaskView, MAX_TASKS};
use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, Ordering};

static HUD_DIRTY: AtomicBool = AtomicBool::new(false);

const HUD_ROW: usize = VGA_HEIGHT - HUD_H;
const HUD_COL: usize = VGA_WIDTH - HUD_W;

pub fn mark_dirty() {
    HUD_DIRTY.store(true, Ordering::Relaxed);
}

/// Repaint the HUD if a table mutation invalidated it.
pub fn draw() {
    if !HUD_DIRTY.swap(false, Ordering::Relaxed) {
        return;
    }
    let views = crate::task::snapshot();
    vga::with_writer(|w| render(w, &views));
}

/// Paint the full HUD rectangle: a header row, then one row per live
/// task (`#<id> <state-char> <name>`), truncated at the right edge.
pub(crate) fn render(w: &mut Writer, views: &[TaskView]) {
    for row in HUD_ROW..VGA_HEIGHT {
        for col in HUD_COL..VGA_WIDTH {
            w.put_at(row, col, b' ');
        }
    }
    w.write_at(HUD_ROW, HUD_COL, "[tasks]");
    for (i, view) in views.iter().take(HUD_H - 1).enumerate() {
        let mut line: heapless::String<{ HUD_W + MAX_TASKS }> = heapless::String::new();
        let _ = write!(line, "#{} {} {}", view.id, view.state.as_char(), view.name);
        w.write_at(HUD_ROW + 1 + i, HUD_COL, &line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;

    const CELLS: usize = VGA_WIDTH * VGA_HEIGHT;

    fn text_at(w: &Writer, row: usize, col: usize, len: usize) -> heapless::String<32> {
        let mut s = heapless::String::new();
        for i in 0..len {
            let _ = s.push((w.cell_at(row, col + i) & 0xFF) as u8 as char);
        }
        s
    }

    #[test]
    fn render_lists_live_tasks_with_state_chars() {
        let mut cells = [0u16; CELLS];
        let mut w = Writer::backed_by(cells.as_mut_ptr());
        let views = [
            TaskView {
                id: 0,
                state: TaskState::Running,
                name: "shell",
            },
            TaskView {
                id: 1,
                state: TaskState::Ready,
                name: "heartbeat0",
            },
        ];
        render(&mut w, &views);
        assert_eq!(text_at(&w, HUD_ROW, HUD_COL, 7).as_str(), "[tasks]");
        assert_eq!(text_at(&w, HUD_ROW + 1, HUD_COL, 8).as_str(), "#0 * she");
        assert_eq!(
            text_at(&w, HUD_ROW + 2, HUD_COL, 13).as_str(),
            "#1 R heartbea"
        );
    }

    #[test]
    fn render_is_idempotent_and_erases_stale_rows() {
        let mut cells = [0u16; CELLS];
        let mut w = Writer::backed_by(cells.as_mut_ptr());
        let before = [
            TaskView {
                id: 0,
                state: TaskState::Running,
                name: "shell",
            },
            TaskView {
                id: 1,
                state: TaskState::Ready,
                name: "heartbeat0",
            },
        ];
        render(&mut w, &before);
        // Task 1 got killed; a fresh render must not leave its row.
        let after = [before[0]];
        render(&mut w, &after);
        let row = text_at(&w, HUD_ROW + 2, HUD_COL, HUD_W);
        assert!(row.chars().all(|c| c == ' '), "stale HUD row: {row:?}");
        render(&mut w, &after);
        assert_eq!(text_at(&w, HUD_ROW + 1, HUD_COL, 4).as_str(), "#0 *");
    }

    #[test]
    fn render_never_writes_outside_the_hud_rect() {
        let mut cells = [0u16; CELLS];
        let mut w = Writer::backed_by(cells.as_mut_ptr());
        let views = [TaskView {
            id: 7,
            state: TaskState::Ready,
            name: "a-task-with-a-really-long-name",
        }];
        render(&mut w, &views);
        for row in 0..VGA_HEIGHT {
            for col in 0..VGA_WIDTH {
                let inside = row >= HUD_ROW && col >= HUD_COL;
                if !inside {
                    assert_eq!(w.cell_at(row, col), 0, "({row},{col}) touched");
                }
            }
        }
    }
}
