//! Heartbeat tasks: overlay-region producers that prove the scheduler
//! keeps everything live while the shell waits for input.
//!
//! Each heartbeat repaints a single overlay line per loop iteration,
//! at a row derived from its rank among live tasks of the same name,
//! then burns a cooperative delay. Rank is recomputed every redraw,
//! so surviving instances compact after a kill.

use crate::drivers::vga::{self, HB_COL, HB_MAX_LINES};
use crate::task::{self, sched};
use core::fmt::Write as _;

pub const HB0_NAME: &str = "heartbeat0";
pub const HB1_NAME: &str = "heartbeat1";
pub const HB0_ROW_BASE: usize = 0;
pub const HB1_ROW_BASE: usize = HB_MAX_LINES;

/// Delay loop length per heartbeat tick, yielding every `1 << 14`
/// iterations so one tick spans several scheduler rounds.
const DELAY_ITERS: u32 = 1 << 18;
const YIELD_EVERY: u32 = 1 << 14;

pub fn heartbeat0() {
    run(0, HB0_ROW_BASE);
}

pub fn heartbeat1() {
    run(1, HB1_ROW_BASE);
}

/// Overlay row owned by a heartbeat task, given its name and its
/// instance rank. `None` for non-heartbeat names and for instances
/// past the per-kind row bank.
pub fn overlay_row(name: &str, instance_index: usize) -> Option<usize> {
    let base = match name {
        HB0_NAME => HB0_ROW_BASE,
        HB1_NAME => HB1_ROW_BASE,
        _ => return None,
    };
    (instance_index < HB_MAX_LINES).then(|| base + instance_index)
}

fn run(which: usize, row_base: usize) {
    let mut counter: u32 = 0;
    loop {
        if let Some(id) = task::current_id() {
            if let Some(index) = task::instance_index(id) {
                if index < HB_MAX_LINES {
                    draw_line(which, id, counter, row_base + index);
                }
            }
        }
        counter = counter.wrapping_add(1);
        delay();
    }
}

fn draw_line(which: usize, id: usize, counter: u32, row: usize) {
    let mut line: heapless::String<20> = heapless::String::new();
    let _ = write!(line, "HB{} #{} : {}", which, id, counter % 10);
    vga::with_writer(|w| {
        w.overlay_clear_line(row);
        w.write_at(row, HB_COL, &line);
    });
}

fn delay() {
    for i in 0..DELAY_ITERS {
        if i % YIELD_EVERY == 0 {
            sched::yield_now();
        }
        core::hint::spin_loop();
    }
}
