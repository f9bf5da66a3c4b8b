//! Controller actuation policy (§6), grounded on `controller.c`'s
//! `actuation_logic`/`actuation_commands`.
//!
//! The controller never reasons about routing or the tree; once a
//! collection window closes it turns every sensor's reported value and
//! threshold into a [`CommandType`] plus an updated threshold. Unlike a
//! per-sensor boundary check, §6's rule is genuinely cross-sensor (a
//! `RESET` can be triggered by how far *another* sensor's reading is) and
//! iterates to a fixed point, so [`Policy::decide`] takes every reading
//! at once rather than one at a time. That boundary is kept as a narrow
//! trait so the rule can be swapped or stubbed in tests without touching
//! the routing stack.

use crate::CommandType;

/// `CONTROLLER_MAX_DIFF` in `config.h`: how far apart two sensors'
/// readings may be before the higher one is treated as critical.
pub const MAX_DIFF: u32 = 10_000;

/// `CONTROLLER_MAX_THRESHOLD`: a threshold is never raised past this.
pub const MAX_THRESHOLD: u32 = 50_000;

/// One sensor's reported state as of the collection window closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReading {
    pub value: u32,
    pub threshold: u32,
}

/// The controller's actuation decision for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Actuation {
    pub command: CommandType,
    pub threshold: u32,
}

/// Turns a window's worth of sensor readings into one actuation decision
/// per sensor. `out[i]` is filled in for `readings[i]`; the two slices
/// must be the same length.
pub trait Policy {
    fn decide(&self, readings: &[SensorReading], out: &mut [Actuation]);
}

/// The default boundary policy (§6), run to a fixed point over every
/// reading in the window at once:
///
/// - Any other sensor reporting a value at least [`MAX_DIFF`] below this
///   one, or this sensor's threshold already over [`MAX_THRESHOLD`]:
///   `RESET`, threshold reported back as [`MAX_DIFF`] (the value the
///   sensor re-arms itself to).
/// - Reading over threshold, otherwise: `THRESHOLD`, raising the
///   threshold by the lowest value reported across every sensor in the
///   window.
/// - Reading at or below threshold: no command, threshold unchanged.
///
/// Raising a threshold can push it over [`MAX_THRESHOLD`], which flips
/// that sensor to `RESET` on the next pass; the loop runs until a pass
/// changes nothing. A sensor that has been told `RESET` is terminal for
/// the rest of the window: its own reading is "set local value to 0" per
/// §6, so it never re-enters the comparison on its own updated side and
/// its decision never flips back to `THRESHOLD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryPolicy;

impl Policy for BoundaryPolicy {
    fn decide(&self, readings: &[SensorReading], out: &mut [Actuation]) {
        debug_assert_eq!(readings.len(), out.len());
        let n = readings.len().min(out.len());
        if n == 0 {
            return;
        }

        for (o, r) in out.iter_mut().zip(readings.iter()).take(n) {
            *o = Actuation {
                command: CommandType::None,
                threshold: r.threshold,
            };
        }

        for _ in 0..=n {
            let mut changed = false;
            for i in 0..n {
                if out[i].command == CommandType::Reset {
                    continue;
                }

                let value_i = readings[i].value;
                let threshold_i = out[i].threshold;

                let conflicts =
                    (0..n).any(|j| j != i && value_i >= effective_value(readings, out, j).saturating_add(MAX_DIFF));
                let min_value = (0..n).map(|j| effective_value(readings, out, j)).min().unwrap_or(0);

                let decision = if conflicts || threshold_i > MAX_THRESHOLD {
                    Actuation {
                        command: CommandType::Reset,
                        threshold: MAX_DIFF,
                    }
                } else if value_i > threshold_i {
                    Actuation {
                        command: CommandType::Threshold,
                        threshold: threshold_i.saturating_add(min_value),
                    }
                } else {
                    Actuation {
                        command: CommandType::None,
                        threshold: threshold_i,
                    }
                };

                if decision != out[i] {
                    out[i] = decision;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}

/// A sensor already decided `RESET` reports as having zeroed its own
/// value, per §6; every other sensor's conflict check and the shared
/// `min_j value_j` term see that zero rather than its original reading.
fn effective_value(readings: &[SensorReading], out: &[Actuation], k: usize) -> u32 {
    if out[k].command == CommandType::Reset {
        0
    } else {
        readings[k].value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE_ACTUATION: Actuation = Actuation { command: CommandType::None, threshold: 0 };

    #[test]
    fn reading_within_threshold_is_left_alone() {
        let readings = [SensorReading { value: 100, threshold: 200 }];
        let mut out = [NONE_ACTUATION; 1];
        BoundaryPolicy.decide(&readings, &mut out);
        assert_eq!(out[0].command, CommandType::None);
        assert_eq!(out[0].threshold, 200);
    }

    #[test]
    fn reading_at_threshold_is_left_alone() {
        let readings = [SensorReading { value: 200, threshold: 200 }];
        let mut out = [NONE_ACTUATION; 1];
        BoundaryPolicy.decide(&readings, &mut out);
        assert_eq!(out[0].command, CommandType::None);
    }

    #[test]
    fn lone_reading_over_threshold_raises_it_by_its_own_value() {
        // with no other sensor in the window, min_j value_j is just this
        // sensor's own value.
        let readings = [SensorReading { value: 10_500, threshold: 10_000 }];
        let mut out = [NONE_ACTUATION; 1];
        BoundaryPolicy.decide(&readings, &mut out);
        assert_eq!(out[0].command, CommandType::Threshold);
        assert_eq!(out[0].threshold, 20_500);
    }

    #[test]
    fn threshold_already_over_the_cap_resets_even_without_a_conflict() {
        let readings = [SensorReading { value: 100, threshold: MAX_THRESHOLD + 1 }];
        let mut out = [NONE_ACTUATION; 1];
        BoundaryPolicy.decide(&readings, &mut out);
        assert_eq!(out[0].command, CommandType::Reset);
        assert_eq!(out[0].threshold, MAX_DIFF);
    }

    #[test]
    fn a_sensor_far_above_another_resets_while_the_other_is_merely_raised() {
        let readings = [
            SensorReading { value: 25_000, threshold: 10_000 },
            SensorReading { value: 5_000, threshold: 1_000 },
        ];
        let mut out = [NONE_ACTUATION; 2];
        BoundaryPolicy.decide(&readings, &mut out);
        assert_eq!(out[0].command, CommandType::Reset);
        assert_eq!(out[0].threshold, MAX_DIFF);
        // sensor 1 isn't in conflict and is over its own threshold; it's
        // raised by the lowest value in the window (5_000, its own).
        assert_eq!(out[1].command, CommandType::Threshold);
        assert_eq!(out[1].threshold, 1_000 + 5_000);
    }

    #[test]
    fn raising_a_threshold_past_the_cap_flips_to_reset_on_the_next_pass() {
        // 45_000 + 60_000 would land at 105_000, over MAX_THRESHOLD, so
        // the fixed point settles on RESET instead.
        let readings = [SensorReading { value: 60_000, threshold: 45_000 }];
        let mut out = [NONE_ACTUATION; 1];
        BoundaryPolicy.decide(&readings, &mut out);
        assert_eq!(out[0].command, CommandType::Reset);
        assert_eq!(out[0].threshold, MAX_DIFF);
    }

    #[test]
    fn an_already_reset_sensor_does_not_drag_others_down_with_its_real_value() {
        // sensor 0 resets (far above sensor 1). Once reset its *effective*
        // value is 0, so it can't also push sensor 2 into a conflict it
        // wouldn't otherwise be in.
        let readings = [
            SensorReading { value: 30_000, threshold: 1_000 },
            SensorReading { value: 100, threshold: 50 },
            SensorReading { value: 200, threshold: 50 },
        ];
        let mut out = [NONE_ACTUATION; 3];
        BoundaryPolicy.decide(&readings, &mut out);
        assert_eq!(out[0].command, CommandType::Reset);
        assert_eq!(out[1].command, CommandType::Threshold);
        assert_eq!(out[2].command, CommandType::Threshold);
    }
}
