//! Task table: fixed descriptor slots, per-slot stacks, creation and
//! teardown.
//!
//! Eight slots, each owning a 4 KiB stack for the slot's lifetime.
//! All descriptor state lives in one [`TaskTable`] value behind a
//! `spin::Mutex`; with interrupts disabled and cooperative scheduling
//! the lock is uncontended and guards nothing across a suspension
//! point. Tasks refer to themselves through the `current` index,
//! never through self-pointers.

pub mod sched;

use crate::drivers::vga;
use crate::{heartbeat, hud, serial_println};
use spin::Mutex;

pub const MAX_TASKS: usize = 8;
pub const STACK_SIZE: usize = 4096;

/// Initial eflags for a fresh task: reserved bit 1 set, IF clear.
const INITIAL_FLAGS: usize = 0x2;
/// General-purpose registers saved by the switch (pushad order).
const CONTEXT_WORDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Dead,
    Ready,
    Running,
    /// Reserved for future I/O-wait semantics; nothing transitions
    /// into it today.
    Blocked,
}

impl TaskState {
    pub fn as_char(self) -> char {
        match self {
            TaskState::Ready => 'R',
            TaskState::Running => '*',
            TaskState::Blocked => 'B',
            TaskState::Dead => 'D',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    NoFreeSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillError {
    NoSuchTask,
    NotAlive,
    /// A task cannot kill itself through this path; returning from
    /// its entry function is the self-termination route.
    SelfKill,
}

#[derive(Clone, Copy)]
pub(crate) struct Task {
    pub(crate) state: TaskState,
    /// Stack pointer captured at the last suspension. Meaningful only
    /// for Ready/Running slots that have a prepared or saved frame.
    pub(crate) saved_sp: usize,
    pub(crate) name: &'static str,
    pub(crate) entry: Option<fn()>,
}

impl Task {
    const fn empty() -> Task {
        Task {
            state: TaskState::Dead,
            saved_sp: 0,
            name: "",
            entry: None,
        }
    }
}

/// One task's view of a descriptor, for `ps` and the HUD.
#[derive(Debug, Clone, Copy)]
pub struct TaskView {
    pub id: usize,
    pub state: TaskState,
    pub name: &'static str,
}

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct TaskStack([u8; STACK_SIZE]);

pub struct TaskTable {
    tasks: [Task; MAX_TASKS],
    stacks: [TaskStack; MAX_TASKS],
    current: Option<usize>,
}

impl TaskTable {
    pub const fn new() -> TaskTable {
        TaskTable {
            tasks: [Task::empty(); MAX_TASKS],
            stacks: [TaskStack([0; STACK_SIZE]); MAX_TASKS],
            current: None,
        }
    }

    pub fn reset(&mut self) {
        self.tasks = [Task::empty(); MAX_TASKS];
        self.current = None;
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub(crate) fn state(&self, id: usize) -> Option<TaskState> {
        self.tasks.get(id).map(|t| t.state)
    }

    pub(crate) fn entry(&self, id: usize) -> Option<fn()> {
        self.tasks.get(id).and_then(|t| t.entry)
    }

    pub(crate) fn saved_sp(&self, id: usize) -> usize {
        self.tasks[id].saved_sp
    }

    /// Raw location of a slot's saved stack pointer, for the context
    /// switch. The pointer stays valid across the table unlock: the
    /// table is a static, interrupts are off, and the switch target
    /// cannot reach the table until the switch has completed.
    pub(crate) fn saved_sp_slot(&mut self, id: usize) -> *mut usize {
        &mut self.tasks[id].saved_sp
    }

    /// Claim the lowest Dead slot and prepare its stack so that the
    /// first switch into it lands in the task trampoline.
    pub fn create(&mut self, entry: fn(), name: &'static str) -> Result<usize, SpawnError> {
        let id = self
            .tasks
            .iter()
            .position(|t| t.state == TaskState::Dead)
            .ok_or(SpawnError::NoFreeSlot)?;
        let saved_sp = self.prepare_stack(id);
        let task = &mut self.tasks[id];
        task.state = TaskState::Ready;
        task.saved_sp = saved_sp;
        task.name = name;
        task.entry = Some(entry);
        Ok(id)
    }

    /// Build the initial switch frame at the top of slot `id`'s stack.
    /// Layout must mirror `arch::ctx_switch`'s epilogue exactly:
    /// eight zeroed registers, then eflags, then the trampoline as the
    /// return address.
    fn prepare_stack(&mut self, id: usize) -> usize {
        let base = self.stacks[id].0.as_mut_ptr();
        unsafe {
            let top = base.add(STACK_SIZE) as *mut usize;
            let mut sp = top;
            sp = sp.sub(1);
            sp.write(task_trampoline as usize);
            sp = sp.sub(1);
            sp.write(INITIAL_FLAGS);
            for _ in 0..CONTEXT_WORDS {
                sp = sp.sub(1);
                sp.write(0);
            }
            sp as usize
        }
    }

    /// 0-based rank of `id` among live tasks sharing its name.
    pub fn instance_index(&self, id: usize) -> Option<usize> {
        let task = self.tasks.get(id)?;
        if task.state == TaskState::Dead {
            return None;
        }
        let rank = self.tasks[..id]
            .iter()
            .filter(|t| t.state != TaskState::Dead && t.name == task.name)
            .count();
        Some(rank)
    }

    /// Tear down `id`. Returns the overlay row the victim owned, if
    /// it was a heartbeat, so the caller can clear it.
    pub fn kill(&mut self, id: usize) -> Result<Option<usize>, KillError> {
        if id >= MAX_TASKS {
            return Err(KillError::NoSuchTask);
        }
        if self.tasks[id].state == TaskState::Dead {
            return Err(KillError::NotAlive);
        }
        if self.current == Some(id) {
            return Err(KillError::SelfKill);
        }
        let name = self.tasks[id].name;
        let row = self
            .instance_index(id)
            .and_then(|idx| heartbeat::overlay_row(name, idx));
        self.tasks[id] = Task::empty();
        Ok(row)
    }

    /// Mark the running task Dead and clear its descriptor. `current`
    /// keeps pointing at the slot until the next rotation, which
    /// discards the outgoing context of a Dead predecessor.
    pub(crate) fn retire_current(&mut self) -> Option<&'static str> {
        let id = self.current?;
        let name = self.tasks[id].name;
        self.tasks[id] = Task::empty();
        Some(name)
    }

    pub fn snapshot(&self) -> heapless::Vec<TaskView, MAX_TASKS> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state != TaskState::Dead)
            .map(|(id, t)| TaskView {
                id,
                state: t.state,
                name: t.name,
            })
            .collect()
    }
}

static TASKS: Mutex<TaskTable> = Mutex::new(TaskTable::new());

pub(crate) fn table() -> &'static Mutex<TaskTable> {
    &TASKS
}

pub fn reset() {
    TASKS.lock().reset();
    hud::mark_dirty();
}

pub fn create(entry: fn(), name: &'static str) -> Result<usize, SpawnError> {
    let result = TASKS.lock().create(entry, name);
    if let Ok(id) = result {
        hud::mark_dirty();
        serial_println!("task: created #{} {}", id, name);
    }
    result
}

pub fn kill(id: usize) -> Result<(), KillError> {
    let row = TASKS.lock().kill(id)?;
    if let Some(row) = row {
        vga::overlay_clear_line(row);
    }
    hud::mark_dirty();
    serial_println!("task: killed #{}", id);
    Ok(())
}

pub fn current_id() -> Option<usize> {
    TASKS.lock().current()
}

pub fn instance_index(id: usize) -> Option<usize> {
    TASKS.lock().instance_index(id)
}

pub fn snapshot() -> heapless::Vec<TaskView, MAX_TASKS> {
    TASKS.lock().snapshot()
}

/// Return target of a freshly prepared task stack: runs the entry
/// function exactly once, then retires the slot. A task that returns
/// from its entry must never fall off its stack.
pub(crate) extern "C" fn task_trampoline() -> ! {
    let entry = {
        let table = TASKS.lock();
        table.current().and_then(|id| table.entry(id))
    };
    if let Some(entry) = entry {
        entry();
    }
    task_exit()
}

/// Terminal state for a task whose entry returned: mark the slot Dead
/// and hand the CPU away forever.
pub fn task_exit() -> ! {
    let name = TASKS.lock().retire_current();
    hud::mark_dirty();
    if let Some(name) = name {
        serial_println!("task: {} exited", name);
    }
    loop {
        sched::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() {}

    #[test]
    fn create_claims_lowest_dead_slot_and_fills_descriptor() {
        let mut table = TaskTable::new();
        let id = table.create(noop, "shell").unwrap();
        assert_eq!(id, 0);
        assert_eq!(table.state(0), Some(TaskState::Ready));
        assert_eq!(table.tasks[0].name, "shell");
        assert!(table.tasks[0].entry.is_some());
        assert_eq!(table.create(noop, "other").unwrap(), 1);
    }

    #[test]
    fn create_prepares_frame_matching_switch_epilogue() {
        let mut table = TaskTable::new();
        let id = table.create(noop, "t").unwrap();
        let sp = table.saved_sp(id);
        let top = table.stacks[id].0.as_ptr() as usize + STACK_SIZE;
        // 8 registers + eflags + return address below the stack top.
        let words = CONTEXT_WORDS + 2;
        assert_eq!(sp, top - words * core::mem::size_of::<usize>());
        let frame = sp as *const usize;
        unsafe {
            for i in 0..CONTEXT_WORDS {
                assert_eq!(*frame.add(i), 0, "register word {i}");
            }
            assert_eq!(*frame.add(CONTEXT_WORDS), INITIAL_FLAGS);
            assert_eq!(*frame.add(CONTEXT_WORDS + 1), task_trampoline as usize);
        }
    }

    #[test]
    fn create_fails_when_table_is_full() {
        let mut table = TaskTable::new();
        for _ in 0..MAX_TASKS {
            table.create(noop, "t").unwrap();
        }
        assert_eq!(table.create(noop, "t"), Err(SpawnError::NoFreeSlot));
    }

    #[test]
    fn killed_slot_is_reused_first() {
        let mut table = TaskTable::new();
        for _ in 0..4 {
            table.create(noop, "t").unwrap();
        }
        table.kill(1).unwrap();
        assert_eq!(table.create(noop, "u").unwrap(), 1);
    }

    #[test]
    fn kill_resets_descriptor_to_empty() {
        let mut table = TaskTable::new();
        table.create(noop, "a").unwrap();
        table.create(noop, "b").unwrap();
        table.kill(1).unwrap();
        assert_eq!(table.state(1), Some(TaskState::Dead));
        assert_eq!(table.tasks[1].name, "");
        assert!(table.tasks[1].entry.is_none());
        assert_eq!(table.saved_sp(1), 0);
    }

    #[test]
    fn kill_rejects_invalid_dead_and_self_targets() {
        let mut table = TaskTable::new();
        let id = table.create(noop, "a").unwrap();
        assert_eq!(table.kill(MAX_TASKS), Err(KillError::NoSuchTask));
        assert_eq!(table.kill(id + 1), Err(KillError::NotAlive));
        table.current = Some(id);
        assert_eq!(table.kill(id), Err(KillError::SelfKill));
    }

    #[test]
    fn kill_reports_heartbeat_overlay_row() {
        let mut table = TaskTable::new();
        table.create(noop, "shell").unwrap();
        table.create(noop, heartbeat::HB0_NAME).unwrap();
        table.create(noop, heartbeat::HB0_NAME).unwrap();
        // Second hb0 instance sits on overlay row base + 1.
        assert_eq!(table.kill(2).unwrap(), Some(heartbeat::HB0_ROW_BASE + 1));
        // Non-heartbeat victims own no overlay row.
        assert_eq!(table.kill(0).unwrap(), None);
    }

    #[test]
    fn instance_index_ranks_live_tasks_by_name() {
        let mut table = TaskTable::new();
        table.create(noop, "shell").unwrap(); // 0
        table.create(noop, "hb").unwrap(); // 1
        table.create(noop, "hb").unwrap(); // 2
        table.create(noop, "hb").unwrap(); // 3
        assert_eq!(table.instance_index(1), Some(0));
        assert_eq!(table.instance_index(3), Some(2));
        table.kill(1).unwrap();
        // Indices compact once the earlier instance is gone.
        assert_eq!(table.instance_index(2), Some(0));
        assert_eq!(table.instance_index(3), Some(1));
        assert_eq!(table.instance_index(1), None);
    }

    #[test]
    fn snapshot_lists_only_live_tasks_in_slot_order() {
        let mut table = TaskTable::new();
        table.create(noop, "a").unwrap();
        table.create(noop, "b").unwrap();
        table.create(noop, "c").unwrap();
        table.kill(1).unwrap();
        let views = table.snapshot();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, 0);
        assert_eq!(views[1].id, 2);
        assert_eq!(views[1].name, "c");
    }

    #[test]
    fn retire_current_clears_slot_but_keeps_current_index() {
        let mut table = TaskTable::new();
        let id = table.create(noop, "worker").unwrap();
        table.current = Some(id);
        assert_eq!(table.retire_current(), Some("worker"));
        assert_eq!(table.state(id), Some(TaskState::Dead));
        assert_eq!(table.current(), Some(id));
    }
}
