//! PD4990A serial real-time-clock/calendar chip, modeled at the bit-serial
//! protocol level the bus actually sees: a 3-bit command latch, a test-bit
//! output, a data-bit output, and a BCD calendar register file advanced by a
//! 60 Hz retrace tick.
//!
//! Only the commands the Neo Geo BIOS actually issues are implemented:
//! register hold/shift (read the calendar out serially), and the two
//! rollover helpers (day, month) the decoder invokes at day/month boundaries.
//! Unrecognized command codes are no-ops, matching the "log and no-op"
//! policy for unmapped hardware surfaces.

/// BCD calendar register file, in the PD4990A's own field order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calendar {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u8,
    pub weekday: u8,
}

/// Serial command codes (C2 C1 C0), per the PD4990A datasheet.
mod command {
    pub const REGISTER_HOLD: u8 = 0;
    pub const REGISTER_SHIFT: u8 = 1;
    pub const TP_64HZ: u8 = 2;
    pub const TP_256HZ: u8 = 3;
    pub const TIMER_RESET: u8 = 4;
    pub const DAY_ROLLOVER: u8 = 6;
    pub const MONTH_ROLLOVER: u8 = 7;
}

pub struct Pd4990a {
    calendar: Calendar,
    /// Serial output shift register, loaded from `calendar` on a shift
    /// command and consumed one bit per bus poll.
    shift_reg: u64,
    shift_bits_remaining: u8,
    test_bit: bool,
    data_bit: bool,
    /// 60 Hz retrace tick counter, advances `calendar.second` once per 60
    /// ticks (matching the real chip's 1 Hz second increment).
    tick_counter: u8,
}

const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

impl Pd4990a {
    pub fn new() -> Self {
        Self {
            calendar: Calendar::default(),
            shift_reg: 0,
            shift_bits_remaining: 0,
            test_bit: false,
            data_bit: false,
            tick_counter: 0,
        }
    }

    pub fn test_bit(&self) -> bool {
        self.test_bit
    }

    pub fn data_bit(&self) -> bool {
        self.data_bit
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn set_calendar(&mut self, calendar: Calendar) {
        self.calendar = calendar;
    }

    /// `RTCCTRL` write: decode the command bits and clock the serial
    /// interface. `raw` carries the full byte so the shift strobe and data
    /// input bit (used to write the calendar back) are also available.
    pub fn write_command(&mut self, command_bits: u8, raw: u8) {
        match command_bits {
            command::REGISTER_HOLD => {
                self.test_bit = true;
            }
            command::REGISTER_SHIFT => {
                if self.shift_bits_remaining == 0 {
                    self.load_shift_register();
                }
                if self.shift_bits_remaining > 0 {
                    self.data_bit = (self.shift_reg & 1) != 0;
                    self.shift_reg >>= 1;
                    self.shift_bits_remaining -= 1;
                }
                self.test_bit = false;
            }
            command::TP_64HZ | command::TP_256HZ => {
                self.test_bit = (raw & 0x08) != 0;
            }
            command::TIMER_RESET => {
                self.tick_counter = 0;
            }
            command::DAY_ROLLOVER => self.rollover_day(),
            command::MONTH_ROLLOVER => self.rollover_month(),
            _ => {}
        }
    }

    fn load_shift_register(&mut self) {
        let c = self.calendar;
        let mut reg: u64 = 0;
        for (i, &digit) in [
            c.second, c.minute, c.hour, c.day, c.month, c.year, c.weekday,
        ]
        .iter()
        .enumerate()
        {
            reg |= (digit as u64) << (i * 8);
        }
        self.shift_reg = reg;
        self.shift_bits_remaining = 56;
    }

    fn rollover_day(&mut self) {
        let max_day = self.days_in_current_month();
        self.calendar.day = bcd_increment_wrapping(self.calendar.day, max_day);
        self.calendar.weekday = bcd_increment_wrapping(self.calendar.weekday, 7);
        if self.calendar.day == 1 {
            self.rollover_month();
        }
    }

    fn rollover_month(&mut self) {
        self.calendar.month = bcd_increment_wrapping(self.calendar.month, 12);
        if self.calendar.month == 1 {
            self.calendar.year = bcd_increment_wrapping(self.calendar.year, 100);
        }
    }

    fn days_in_current_month(&self) -> u8 {
        let month_idx = (bcd_to_bin(self.calendar.month).saturating_sub(1)).min(11) as usize;
        let mut days = DAYS_IN_MONTH[month_idx];
        if month_idx == 1 && is_leap_year(bcd_to_bin(self.calendar.year)) {
            days = 29;
        }
        days
    }

    /// Advance by one 60 Hz retrace tick.
    pub fn tick_60hz(&mut self) {
        self.tick_counter += 1;
        if self.tick_counter >= 60 {
            self.tick_counter = 0;
            self.increment_second();
        }
    }

    fn increment_second(&mut self) {
        self.calendar.second = bcd_increment_wrapping(self.calendar.second, 60);
        if self.calendar.second == 0 {
            self.calendar.minute = bcd_increment_wrapping(self.calendar.minute, 60);
            if self.calendar.minute == 0 {
                self.calendar.hour = bcd_increment_wrapping(self.calendar.hour, 24);
                if self.calendar.hour == 0 {
                    self.rollover_day();
                }
            }
        }
    }
}

impl Default for Pd4990a {
    fn default() -> Self {
        Self::new()
    }
}

fn bcd_to_bin(bcd: u8) -> u32 {
    (((bcd >> 4) & 0xF) as u32) * 10 + (bcd & 0xF) as u32
}

fn bin_to_bcd(bin: u32) -> u8 {
    (((bin / 10) % 10) as u8) << 4 | ((bin % 10) as u8)
}

/// Increment a BCD counter, wrapping to 1 (day-of-month/weekday-style, base
/// handled by caller) or 0 (second/minute/hour-style) at `limit`.
fn bcd_increment_wrapping(bcd: u8, limit: u8) -> u8 {
    let bin = bcd_to_bin(bcd) + 1;
    let wrapped = if bin > limit as u32 {
        if limit >= 24 { 0 } else { 1 }
    } else {
        bin
    };
    bin_to_bcd(wrapped)
}

fn is_leap_year(year: u32) -> bool {
    year.is_multiple_of(4) && (!year.is_multiple_of(100) || year.is_multiple_of(400))
}
