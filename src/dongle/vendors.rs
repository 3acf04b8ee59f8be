//! Transceiver parts supported on NSC boards
//!
//! Each part drives its mode through the controller's IRSL0..IRSL2 pins
//! (bits 0..2 of the channel's IRCFG register):
//!
//! | Part                | IRSL0     | IRSL1      | IRSL2        |
//! |---------------------|-----------|------------|--------------|
//! | HP HSDL-1100        | FIR_SEL   | -          | SD           |
//! | Temic TFDS6000      | -         | mode data  | SD / latch   |
//! | Sharp RY5HD01       | -         | FIR select | -            |
//! | Dell Titan          | rate 0    | rate 1     | shutdown     |
//! | IBM 31T1100         | rate      | shutdown   | latch strobe |

use super::generic::{DongleCaps, GpioStep, IrMode, IrModes, Transceiver};

const ALL_SPEEDS: IrModes = IrModes::SIR
    .union(IrModes::MIR_576)
    .union(IrModes::MIR_1152)
    .union(IrModes::FIR_4M);

// =============================================================================
// Generic SIR
// =============================================================================

/// Plain SIR transceiver with no mode pins
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericSir;

impl Transceiver for GenericSir {
    fn name(&self) -> &'static str {
        "generic SIR"
    }

    fn capabilities(&self) -> DongleCaps {
        DongleCaps::sir_only()
    }

    fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]> {
        match mode {
            IrMode::Sir => Some(&[]),
            _ => None,
        }
    }
}

// =============================================================================
// HP HSDL-1100
// =============================================================================

/// HP HSDL-1100: FIR_SEL level picks the tier, SD shuts down
#[derive(Debug, Clone, Copy, Default)]
pub struct HpHsdl1100;

mod hp {
    use super::GpioStep;

    /// FIR_SEL low
    pub const SIR: &[GpioStep] = &[GpioStep::new(0b000, 0)];
    /// FIR_SEL high; receiver needs 40 µs to retune
    pub const FIR: &[GpioStep] = &[GpioStep::new(0b001, 40)];
    /// SD high
    pub const SHUTDOWN: &[GpioStep] = &[GpioStep::new(0b100, 0)];
}

impl Transceiver for HpHsdl1100 {
    fn name(&self) -> &'static str {
        "HP HSDL-1100"
    }

    fn capabilities(&self) -> DongleCaps {
        DongleCaps {
            modes: ALL_SPEEDS.union(IrModes::LOW_POWER),
            turnaround_usec: 1_000,
            extra_bofs: 0,
        }
    }

    fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]> {
        Some(match mode {
            IrMode::Sir => hp::SIR,
            IrMode::Mir576 | IrMode::Mir1152 | IrMode::Fir4M => hp::FIR,
            IrMode::LowPower => hp::SHUTDOWN,
        })
    }
}

// =============================================================================
// Temic TFDS6000
// =============================================================================

/// Temic TFDS6000: mode is latched on the falling edge of SD
#[derive(Debug, Clone, Copy, Default)]
pub struct TemicTfds6000;

mod temic {
    use super::GpioStep;

    /// SD high with mode data low, then release; 200 µs until the receiver is up
    pub const SIR: &[GpioStep] = &[GpioStep::new(0b100, 2), GpioStep::new(0b000, 200)];
    /// SD high with mode data high, drop SD, then release mode data
    pub const FIR: &[GpioStep] = &[
        GpioStep::new(0b110, 2),
        GpioStep::new(0b010, 2),
        GpioStep::new(0b000, 200),
    ];
    /// SD held high
    pub const SHUTDOWN: &[GpioStep] = &[GpioStep::new(0b100, 0)];
}

impl Transceiver for TemicTfds6000 {
    fn name(&self) -> &'static str {
        "Temic TFDS6000"
    }

    fn capabilities(&self) -> DongleCaps {
        DongleCaps {
            modes: ALL_SPEEDS.union(IrModes::LOW_POWER),
            turnaround_usec: 500,
            extra_bofs: 0,
        }
    }

    fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]> {
        Some(match mode {
            IrMode::Sir => temic::SIR,
            IrMode::Mir576 | IrMode::Mir1152 | IrMode::Fir4M => temic::FIR,
            IrMode::LowPower => temic::SHUTDOWN,
        })
    }
}

// =============================================================================
// Sharp RY5HD01
// =============================================================================

/// Sharp RY5HD01: SIR or 4 Mbps, slow to settle, no shutdown pin
#[derive(Debug, Clone, Copy, Default)]
pub struct SharpRy5hd01;

mod sharp {
    use super::GpioStep;

    /// FIR select low, 1 ms settle
    pub const SIR: &[GpioStep] = &[GpioStep::new(0b000, 1_000)];
    /// FIR select high, 1 ms settle
    pub const FIR: &[GpioStep] = &[GpioStep::new(0b010, 1_000)];
}

impl Transceiver for SharpRy5hd01 {
    fn name(&self) -> &'static str {
        "Sharp RY5HD01"
    }

    fn capabilities(&self) -> DongleCaps {
        DongleCaps {
            modes: IrModes::SIR.union(IrModes::FIR_4M),
            turnaround_usec: 1_000,
            extra_bofs: 1,
        }
    }

    fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]> {
        match mode {
            IrMode::Sir => Some(sharp::SIR),
            IrMode::Fir4M => Some(sharp::FIR),
            IrMode::Mir576 | IrMode::Mir1152 | IrMode::LowPower => None,
        }
    }
}

// =============================================================================
// Dell Titan
// =============================================================================

/// Dell Titan module: two rate pins plus shutdown
#[derive(Debug, Clone, Copy, Default)]
pub struct DellTitan;

mod dell {
    use super::GpioStep;

    /// Rate 00
    pub const SIR: &[GpioStep] = &[GpioStep::new(0b000, 50)];
    /// Rate 01
    pub const MIR: &[GpioStep] = &[GpioStep::new(0b001, 50)];
    /// Rate 11
    pub const FIR: &[GpioStep] = &[GpioStep::new(0b011, 50)];
    /// Shutdown
    pub const SHUTDOWN: &[GpioStep] = &[GpioStep::new(0b100, 0)];
}

impl Transceiver for DellTitan {
    fn name(&self) -> &'static str {
        "Dell Titan"
    }

    fn capabilities(&self) -> DongleCaps {
        DongleCaps {
            modes: ALL_SPEEDS.union(IrModes::LOW_POWER),
            turnaround_usec: 1_000,
            extra_bofs: 0,
        }
    }

    fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]> {
        Some(match mode {
            IrMode::Sir => dell::SIR,
            IrMode::Mir576 | IrMode::Mir1152 => dell::MIR,
            IrMode::Fir4M => dell::FIR,
            IrMode::LowPower => dell::SHUTDOWN,
        })
    }
}

// =============================================================================
// IBM 31T1100
// =============================================================================

/// IBM 31T1100: rate pin sampled on a strobe pulse
#[derive(Debug, Clone, Copy, Default)]
pub struct Ibm31t1100;

mod ibm {
    use super::GpioStep;

    /// Strobe with rate low
    pub const SIR: &[GpioStep] = &[GpioStep::new(0b100, 10), GpioStep::new(0b000, 100)];
    /// Strobe with rate high
    pub const FIR: &[GpioStep] = &[GpioStep::new(0b101, 10), GpioStep::new(0b001, 100)];
    /// Shutdown pin
    pub const SHUTDOWN: &[GpioStep] = &[GpioStep::new(0b010, 0)];
}

impl Transceiver for Ibm31t1100 {
    fn name(&self) -> &'static str {
        "IBM 31T1100"
    }

    fn capabilities(&self) -> DongleCaps {
        DongleCaps {
            modes: ALL_SPEEDS.union(IrModes::LOW_POWER),
            turnaround_usec: 100,
            extra_bofs: 0,
        }
    }

    fn mode_sequence(&self, mode: IrMode) -> Option<&'static [GpioStep]> {
        Some(match mode {
            IrMode::Sir => ibm::SIR,
            IrMode::Mir576 | IrMode::Mir1152 | IrMode::Fir4M => ibm::FIR,
            IrMode::LowPower => ibm::SHUTDOWN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> [&'static dyn Transceiver; 6] {
        [
            &GenericSir,
            &HpHsdl1100,
            &TemicTfds6000,
            &SharpRy5hd01,
            &DellTitan,
            &Ibm31t1100,
        ]
    }

    #[test]
    fn sequences_exist_for_every_advertised_mode() {
        let modes = [
            IrMode::Sir,
            IrMode::Mir576,
            IrMode::Mir1152,
            IrMode::Fir4M,
            IrMode::LowPower,
        ];
        for part in parts() {
            let caps = part.capabilities();
            for mode in modes {
                assert_eq!(
                    caps.modes.contains(mode),
                    part.mode_sequence(mode).is_some(),
                    "{} {mode:?}",
                    part.name()
                );
            }
        }
    }

    #[test]
    fn sequences_only_drive_irsl_pins() {
        for part in parts() {
            for mode in [IrMode::Sir, IrMode::Fir4M, IrMode::LowPower] {
                for step in part.mode_sequence(mode).unwrap_or(&[]) {
                    assert_eq!(step.pins & !0x07, 0, "{}", part.name());
                    assert!(step.settle_us <= 1_000);
                }
            }
        }
    }

    #[test]
    fn sharp_has_no_mir() {
        assert!(SharpRy5hd01.mode_sequence(IrMode::Mir1152).is_none());
        assert!(SharpRy5hd01.mode_sequence(IrMode::Fir4M).is_some());
    }

    #[test]
    fn every_part_does_sir() {
        for part in parts() {
            assert!(part.capabilities().modes.contains(IrMode::Sir));
        }
    }
}
