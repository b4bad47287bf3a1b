//! coracleOS kernel entry point.
//!
//! A Multiboot shim (external to this crate) switches to 32-bit
//! protected mode, sets up a stack and calls `kmain`. From there the
//! kernel brings up its drivers, seeds the task table and hands the
//! CPU to the cooperative scheduler, never to return.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod boot {
    use core::panic::PanicInfo;
    use coracle_os::drivers::vga::{self, Color};
    use coracle_os::task::sched;
    use coracle_os::{arch, drivers, heartbeat, shell, task};
    use coracle_os::{println, serial_println};
    use coracle_os::{OS_NAME, OS_VERSION};

    #[no_mangle]
    pub extern "C" fn kmain() -> ! {
        drivers::serial::init();
        serial_println!("{} {}: serial ready", OS_NAME, OS_VERSION);

        vga::clear_text_area();
        println!("{} {}", OS_NAME, OS_VERSION);
        println!("Cooperative kernel shell; type a command.");
        println!();
        vga::cursor_show();
        let (row, col) = vga::cursor_position();
        vga::cursor_set(row, col);

        task::reset();
        spawn(shell::shell_main, "shell");
        spawn(heartbeat::heartbeat0, heartbeat::HB0_NAME);
        spawn(heartbeat::heartbeat1, heartbeat::HB1_NAME);

        serial_println!("boot: entering scheduler");
        arch::disable_interrupts();
        sched::schedule();

        // Only reachable when no task is runnable.
        serial_println!("boot: no runnable tasks, halting");
        loop {
            arch::halt();
        }
    }

    fn spawn(entry: fn(), name: &'static str) {
        if task::create(entry, name).is_err() {
            serial_println!("boot: no free slot for {}", name);
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        arch::disable_interrupts();
        serial_println!("KERNEL PANIC: {}", info);
        vga::set_color(Color::LightRed, Color::Black);
        vga::write("\n*** KERNEL PANIC ***\n");
        loop {
            arch::halt();
        }
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
