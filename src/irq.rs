//! CPU-cycle driven IRQ timers.
//!
//! `M2Timer` owns the parts every cycle-clocked timer shares (connection,
//! pending line, frame position) and delegates the counting rule to an
//! `IrqUnit`. Boards pick the unit; the timer decides when the unit sees a
//! clock and what happens to the CPU line when it fires.

use crate::debug_flags;
use crate::host::{Cpu, IrqSource};

/// Counting rule of one timer family.
pub trait IrqUnit {
    /// Hard reset clears the unit's registers; soft reset keeps them.
    fn reset(&mut self, hard: bool);

    /// Advance one tick. Returns true when the counter fires.
    fn clock(&mut self) -> bool;

    /// End of frame.
    fn vsync(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqState {
    Disconnected,
    Counting,
    Pending,
}

/// Timer clocked once per CPU (M2) cycle.
#[derive(Debug, Clone, Default)]
pub struct M2Timer<U> {
    pub unit: U,
    connected: bool,
    pending: bool,
    frame_cycles: u32,
}

impl<U: IrqUnit> M2Timer<U> {
    pub fn new(unit: U) -> Self {
        M2Timer {
            unit,
            connected: false,
            pending: false,
            frame_cycles: 0,
        }
    }

    pub fn reset(&mut self, hard: bool) {
        self.unit.reset(hard);
        if hard {
            self.connected = false;
            self.pending = false;
        }
        self.frame_cycles = 0;
    }

    /// Enable or disable counting from a control value (low four bits).
    ///
    /// Returns true only on the disabled -> enabled edge, so callers can
    /// reload the counter exactly once.
    pub fn connect(&mut self, mode: u8) -> bool {
        let enable = mode & 0xF != 0;
        let edge = enable && !self.connected;
        self.connected = enable;
        if debug_flags::irq() && edge {
            log::debug!("irq: connected (mode {:X})", mode & 0xF);
        }
        edge
    }

    pub fn clock(&mut self, cpu: &mut dyn Cpu) -> bool {
        self.frame_cycles = self.frame_cycles.wrapping_add(1);
        if !self.connected || !self.unit.clock() {
            return false;
        }
        self.pending = true;
        cpu.set_irq(IrqSource::EXTERNAL, true);
        if debug_flags::irq() {
            log::debug!("irq: fired at frame cycle {}", self.frame_cycles);
        }
        true
    }

    /// Acknowledge: drop the line, leave the counter alone.
    pub fn clear_irq(&mut self, cpu: &mut dyn Cpu) {
        if debug_flags::irq() && self.pending {
            log::debug!("irq: acknowledged");
        }
        self.pending = false;
        cpu.set_irq(IrqSource::EXTERNAL, false);
    }

    pub fn vsync(&mut self) {
        self.frame_cycles = 0;
        self.unit.vsync();
    }

    /// Reinstate connection and pending flag from saved state.
    pub fn restore(&mut self, connected: bool, pending: bool) {
        self.connected = connected;
        self.pending = pending;
    }

    /// Drive the CPU line to match the pending flag.
    pub fn sync_line(&self, cpu: &mut dyn Cpu) {
        cpu.set_irq(IrqSource::EXTERNAL, self.pending);
    }

    pub fn state(&self) -> IrqState {
        if self.pending {
            IrqState::Pending
        } else if self.connected {
            IrqState::Counting
        } else {
            IrqState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// CPU cycles since the last `vsync`.
    pub fn frame_cycles(&self) -> u32 {
        self.frame_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingCpu;

    /// Fires every `period` ticks.
    #[derive(Debug, Default)]
    struct Divider {
        period: u8,
        ticks: u8,
        frames: u32,
    }

    impl IrqUnit for Divider {
        fn reset(&mut self, hard: bool) {
            if hard {
                self.ticks = 0;
            }
        }

        fn clock(&mut self) -> bool {
            self.ticks += 1;
            if self.ticks == self.period {
                self.ticks = 0;
                true
            } else {
                false
            }
        }

        fn vsync(&mut self) {
            self.frames += 1;
        }
    }

    fn timer(period: u8) -> M2Timer<Divider> {
        M2Timer::new(Divider {
            period,
            ..Divider::default()
        })
    }

    #[test]
    fn test_disconnected_timer_does_not_count() {
        let mut cpu = RecordingCpu::default();
        let mut t = timer(1);
        assert!(!t.clock(&mut cpu));
        assert_eq!(t.unit.ticks, 0);
        assert_eq!(t.state(), IrqState::Disconnected);
        assert!(cpu.edges.is_empty());
    }

    #[test]
    fn test_connect_reports_rising_edge_only() {
        let mut t = timer(1);
        assert!(!t.connect(0x10));
        assert!(t.connect(0x01));
        assert!(!t.connect(0x0F));
        assert!(!t.connect(0x00));
        assert!(!t.is_connected());
        assert!(t.connect(0x08));
    }

    #[test]
    fn test_fire_asserts_and_clear_deasserts() {
        let mut cpu = RecordingCpu::default();
        let mut t = timer(2);
        t.connect(1);
        assert!(!t.clock(&mut cpu));
        assert!(t.clock(&mut cpu));
        assert_eq!(t.state(), IrqState::Pending);
        assert!(cpu.line());

        t.clear_irq(&mut cpu);
        assert_eq!(t.state(), IrqState::Counting);
        assert!(!cpu.line());
        assert_eq!(
            cpu.edges,
            vec![(IrqSource::EXTERNAL, true), (IrqSource::EXTERNAL, false)]
        );
    }

    #[test]
    fn test_clear_keeps_count() {
        let mut cpu = RecordingCpu::default();
        let mut t = timer(5);
        t.connect(1);
        t.clock(&mut cpu);
        t.clock(&mut cpu);
        t.clear_irq(&mut cpu);
        assert_eq!(t.unit.ticks, 2);
    }

    #[test]
    fn test_soft_reset_preserves_hard_reset_clears() {
        let mut cpu = RecordingCpu::default();
        let mut t = timer(3);
        t.connect(1);
        t.clock(&mut cpu);

        t.reset(false);
        assert!(t.is_connected());
        assert_eq!(t.unit.ticks, 1);

        t.reset(true);
        assert!(!t.is_connected());
        assert!(!t.is_pending());
        assert_eq!(t.unit.ticks, 0);
    }

    #[test]
    fn test_vsync_restarts_frame_position() {
        let mut cpu = RecordingCpu::default();
        let mut t = timer(100);
        for _ in 0..29780 {
            t.clock(&mut cpu);
        }
        assert_eq!(t.frame_cycles(), 29780);
        t.vsync();
        assert_eq!(t.frame_cycles(), 0);
        assert_eq!(t.unit.frames, 1);
    }

    #[test]
    fn test_restore_drives_line() {
        let mut cpu = RecordingCpu::default();
        let mut t = timer(4);
        t.restore(true, true);
        assert_eq!(t.state(), IrqState::Pending);
        assert!(!cpu.line());
        t.sync_line(&mut cpu);
        assert!(cpu.line());
    }
}
