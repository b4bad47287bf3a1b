//! Command shell: cursor-aware line input over the keyboard decoder,
//! and the command dispatch table.
//!
//! The shell owns the scrolling region. It never busy-waits on the
//! keyboard: whenever no key is pending it yields, so the heartbeat
//! tasks keep running while a command is being typed.

use crate::drivers::keyboard::Keyboard;
use crate::drivers::vga::{self, VGA_WIDTH};
use crate::editor::LineEdit;
use crate::task::{self, sched, SpawnError};
use crate::{heartbeat, power, println};

const PROMPT: &str = "> ";
const INPUT_MAX: usize = 128;

/// Entry point of the shell task.
pub fn shell_main() {
    let mut kbd = Keyboard::new();
    let mut line = [0u8; INPUT_MAX];
    loop {
        vga::write(PROMPT);
        let len = read_line(&mut kbd, &mut line);
        let cmd = core::str::from_utf8(&line[..len]).unwrap_or("").trim();
        dispatch(cmd);
        sched::yield_now();
    }
}

/// Cooperatively read one line: poll the keyboard, apply events to
/// the editor, mirror the buffer onto the input row, and yield while
/// no key is pending. Returns the final text length; `buf` holds the
/// NUL-terminated text.
fn read_line(kbd: &mut Keyboard, buf: &mut [u8]) -> usize {
    let (input_row, input_col) = vga::cursor_position();
    let mut edit = LineEdit::new(buf);
    loop {
        let Some(event) = kbd.try_poll() else {
            sched::yield_now();
            continue;
        };
        if edit.apply(event) {
            let len = edit.len();
            vga::set_cursor_position(input_row, input_col + len);
            vga::put(b'\n');
            return len;
        }
        redraw_input(input_row, input_col, &edit);
    }
}

/// Repaint the edited span: the buffer contents, then space padding
/// to erase residue of a previously longer line, then the hardware
/// cursor at the edit cursor.
fn redraw_input(input_row: usize, input_col: usize, edit: &LineEdit) {
    vga::with_writer(|w| {
        for (i, &byte) in edit.text().iter().enumerate() {
            w.put_at(input_row, input_col + i, byte);
        }
        let span = (edit.capacity() - 1).min(VGA_WIDTH.saturating_sub(input_col));
        for i in edit.len()..span {
            w.put_at(input_row, input_col + i, b' ');
        }
    });
    vga::cursor_set(input_row, input_col + edit.cursor());
}

fn dispatch(line: &str) {
    match line {
        "" => {}
        "thanks" => println!("You're welcome!"),
        "exit" => {
            println!("Shutting down...");
            power::shutdown();
        }
        "clear" => {
            vga::clear_text_area();
            vga::overlays_redraw();
        }
        "ps" => ps(),
        "yield" => {
            println!("(yield)");
            sched::yield_now();
        }
        _ => {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some("kill"), arg, rest) => kill_cmd(arg, rest),
                (Some("spawn"), Some(which), None) => spawn_cmd(which),
                _ => {
                    println!("Unknown command: {}", line);
                    println!("Commands: thanks, clear, ps, kill <id>, spawn hb0|hb1, yield, exit");
                }
            }
        }
    }
}

fn ps() {
    for view in task::snapshot() {
        println!("{} {} {}", view.id, view.state.as_char(), view.name);
    }
}

fn kill_cmd(arg: Option<&str>, rest: Option<&str>) {
    let target = match (arg, rest) {
        (Some(arg), None) => parse_task_id(arg),
        _ => None,
    };
    match target.map(task::kill) {
        Some(Ok(())) => println!("Killed task."),
        _ => println!("Usage: kill <id>"),
    }
}

fn spawn_cmd(which: &str) {
    let Some((entry, name, label)) = spawn_target(which) else {
        println!("Usage: spawn hb0|hb1");
        return;
    };
    match task::create(entry, name) {
        Ok(_) => println!("Spawned {}.", label),
        Err(SpawnError::NoFreeSlot) => println!("No free task slots."),
    }
}

fn spawn_target(which: &str) -> Option<(fn(), &'static str, &'static str)> {
    match which {
        "hb0" => Some((heartbeat::heartbeat0, heartbeat::HB0_NAME, "hb0")),
        "hb1" => Some((heartbeat::heartbeat1, heartbeat::HB1_NAME, "hb1")),
        _ => None,
    }
}

fn parse_task_id(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()
}
