//! Cooperative round-robin scheduling.
//!
//! Selection ([`TaskTable::rotate`]) is pure table state so it can be
//! exercised by unit tests; [`schedule`] applies a Switch decision
//! with the real context switch. The table lock is dropped before
//! switching — the raw `saved_sp` locations stay valid because the
//! table is a static and interrupts are disabled.

use super::{TaskState, TaskTable, MAX_TASKS};
use crate::{arch, hud, task};

/// Outcome of one scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// Switch to `next`, saving the outgoing context into
    /// `save_into`'s slot — or discarding it when `save_into` is
    /// `None` (first-ever switch, or a Dead predecessor).
    Switch {
        save_into: Option<usize>,
        next: usize,
    },
    /// The previous task is the only runnable one; it keeps the CPU.
    Stay,
    /// Nothing is runnable at all.
    Idle,
}

impl TaskTable {
    /// Round-robin selection with the state transitions of one
    /// `schedule` call: demote a Running predecessor to Ready, scan
    /// forward from the slot after it, promote the first Ready slot.
    pub(crate) fn rotate(&mut self) -> Decision {
        let prev = self.current;
        if let Some(p) = prev {
            if self.tasks[p].state == TaskState::Running {
                self.tasks[p].state = TaskState::Ready;
            }
        }

        let start = prev.map(|p| p + 1).unwrap_or(0);
        let next = (0..MAX_TASKS)
            .map(|i| (start + i) % MAX_TASKS)
            .find(|&id| self.tasks[id].state == TaskState::Ready);

        match next {
            Some(n) if prev == Some(n) => {
                // The predecessor wrapped around to itself; no switch.
                self.tasks[n].state = TaskState::Running;
                Decision::Stay
            }
            Some(n) => {
                self.tasks[n].state = TaskState::Running;
                self.current = Some(n);
                let save_into = prev.filter(|&p| self.tasks[p].state != TaskState::Dead);
                Decision::Switch { save_into, next: n }
            }
            None => match prev {
                Some(p) if self.tasks[p].state != TaskState::Dead => {
                    self.tasks[p].state = TaskState::Running;
                    Decision::Stay
                }
                _ => Decision::Idle,
            },
        }
    }
}

/// Hand the CPU to the next Ready task, if any. Returns without
/// switching when the caller is the only runnable task, or when
/// nothing is runnable (the top level halts in that case).
pub fn schedule() {
    // Sink for an outgoing context nobody will ever resume: the boot
    // stack on the first switch, or a Dead predecessor's stack.
    let mut discard: usize = 0;

    let (old_sp_slot, new_sp) = {
        let mut table = task::table().lock();
        match table.rotate() {
            Decision::Stay | Decision::Idle => return,
            Decision::Switch { save_into, next } => {
                let old = match save_into {
                    Some(p) => table.saved_sp_slot(p),
                    None => &mut discard as *mut usize,
                };
                (old, table.saved_sp(next))
            }
        }
    };

    hud::draw();

    // SAFETY: `new_sp` is a frame prepared by `create` or saved by a
    // previous switch; `old_sp_slot` points into the static table (or
    // at `discard`, which lives on the abandoned outgoing stack).
    // Interrupts are disabled for the kernel's lifetime.
    unsafe { arch::ctx_switch(old_sp_slot, new_sp) };
}

/// Yielding is exactly one scheduling pass.
pub fn yield_now() {
    schedule();
}
