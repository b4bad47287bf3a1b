//! Serial port (COM1) logging for debugging on real hardware and
//! under emulators. Write-only and polled; never blocks for long on
//! a missing device.

use crate::arch;
use core::fmt;
use spin::Mutex;

const SERIAL_PORT: u16 = 0x3F8; // COM1

pub struct SerialPort;

impl SerialPort {
    const fn new() -> Self {
        SerialPort
    }

    fn init(&mut self) {
        // Disable interrupts
        arch::outb(SERIAL_PORT + 1, 0x00);
        // Enable DLAB (set baud rate divisor)
        arch::outb(SERIAL_PORT + 3, 0x80);
        // Set divisor to 3 (38400 baud)
        arch::outb(SERIAL_PORT, 0x03);
        arch::outb(SERIAL_PORT + 1, 0x00);
        // 8 bits, no parity, one stop bit
        arch::outb(SERIAL_PORT + 3, 0x03);
        // Enable FIFO, clear, with 14-byte threshold
        arch::outb(SERIAL_PORT + 2, 0xC7);
        // Mark data terminal ready, request to send
        arch::outb(SERIAL_PORT + 4, 0x0B);
    }

    fn is_transmit_empty(&self) -> bool {
        (arch::inb(SERIAL_PORT + 5) & 0x20) != 0
    }

    fn send_byte(&mut self, byte: u8) {
        // Bounded wait so a missing UART cannot wedge the kernel.
        for _ in 0..10_000 {
            if self.is_transmit_empty() {
                break;
            }
        }
        arch::outb(SERIAL_PORT, byte);
    }

    fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.send_byte(b'\r');
            }
            self.send_byte(byte);
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_str(s);
        Ok(())
    }
}

static SERIAL: Mutex<SerialPort> = Mutex::new(SerialPort::new());

pub fn init() {
    SERIAL.lock().init();
}

pub fn write(s: &str) {
    SERIAL.lock().write_str(s);
}

pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    SERIAL.lock().write_fmt(args).unwrap();
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::drivers::serial::_print(core::format_args!($($arg)*)));
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($fmt:expr) => ($crate::serial_print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::serial_print!(concat!($fmt, "\n"), $($arg)*));
}
