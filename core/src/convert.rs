//! Conversion of remaining cooldown between traits
//!
//! Every trait has a cycle base: the duration its remaining time is
//! measured against. A swap keeps the *fraction* of the cycle left and
//! re-expresses it against the destination's base. Stacking traits are
//! measured against a fixed scale `C`. Seconds left on that scale are taken
//! off the real charge time to find how far the stack has charged.

use traitwatch_types::{ConversionConfig, StackingParams, TraitDefinition};

use crate::stacking::StackSeed;

/// Remaining time expressed against a cycle base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseRemaining {
    pub remaining_secs: u32,
    pub base_secs: u32,
}

/// Destination state after a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Converted {
    Scalar { remaining_secs: u32 },
    Stacking { seed: StackSeed, params: StackingParams },
}

/// Duration a trait's remaining time is measured against
pub fn cycle_base_secs(def: &TraitDefinition, conv: &ConversionConfig) -> u32 {
    if def.is_stacking() {
        conv.stacking_scale_secs
    } else {
        def.steady_cooldown_secs()
    }
}

/// Real time from empty to full stack, honoring the configured override
pub fn charge_total_ms(params: &StackingParams, conv: &ConversionConfig) -> u64 {
    conv.stacking_charge_secs
        .map_or_else(|| params.full_charge_ms(), |secs| u64::from(secs) * 1000)
}

/// Remaining time of a scalar trait against its own base
pub fn scalar_remaining(remaining_secs: u32, def: &TraitDefinition, conv: &ConversionConfig) -> BaseRemaining {
    BaseRemaining {
        remaining_secs,
        base_secs: cycle_base_secs(def, conv),
    }
}

/// Remaining time of a stacking trait, expressed on the `C` scale
pub fn stacking_remaining(to_full_ms: u64, params: &StackingParams, conv: &ConversionConfig) -> BaseRemaining {
    let total = charge_total_ms(params, conv);
    let fraction = if total == 0 {
        0.0
    } else {
        (to_full_ms as f64 / total as f64).clamp(0.0, 1.0)
    };
    BaseRemaining {
        remaining_secs: (fraction * f64::from(conv.stacking_scale_secs)).round() as u32,
        base_secs: conv.stacking_scale_secs,
    }
}

/// Re-express `source` against `new_base_secs`, rounded to whole seconds
pub fn rescale(source: BaseRemaining, new_base_secs: u32) -> u32 {
    if source.base_secs == 0 {
        return 0;
    }
    let scaled = f64::from(source.remaining_secs) * f64::from(new_base_secs) / f64::from(source.base_secs);
    scaled.round().max(0.0) as u32
}

/// Charge state matching `source` once mapped onto a stacking schedule
pub fn seed_from_scale(source: BaseRemaining, params: &StackingParams, conv: &ConversionConfig) -> StackSeed {
    let scale = conv.stacking_scale_secs;
    let total = charge_total_ms(params, conv);
    if scale == 0 {
        return StackSeed::empty(params);
    }

    let remain_on_scale = u64::from(rescale(source, scale));
    let to_full_ms = if conv.linear_charge_mapping {
        remain_on_scale * total / u64::from(scale)
    } else {
        remain_on_scale * 1000
    };
    let progressed = total.saturating_sub(to_full_ms);
    seed_from_progress(progressed, params)
}

/// Walk the charge schedule (first interval, then steady ones) for
/// `progressed_ms` of charging from empty
fn seed_from_progress(progressed_ms: u64, params: &StackingParams) -> StackSeed {
    if progressed_ms >= params.full_charge_ms() {
        return StackSeed {
            stacks: params.max_stacks,
            partial_progress: 0.0,
            current_interval_ms: params.charge_interval_ms,
        };
    }
    if progressed_ms < params.first_charge_ms {
        return StackSeed {
            stacks: 0,
            partial_progress: fraction_of(progressed_ms, params.first_charge_ms),
            current_interval_ms: params.first_charge_ms,
        };
    }

    let after_first = progressed_ms - params.first_charge_ms;
    let interval = params.charge_interval_ms.max(1);
    let extra = u8::try_from(after_first / interval).unwrap_or(u8::MAX);
    StackSeed {
        stacks: extra.saturating_add(1).min(params.max_stacks),
        partial_progress: fraction_of(after_first % interval, interval),
        current_interval_ms: params.charge_interval_ms,
    }
}

fn fraction_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Convert `source` into the destination trait's terms
pub fn convert_to(source: BaseRemaining, target: &TraitDefinition, conv: &ConversionConfig) -> Converted {
    match target.stacking() {
        Some(params) => Converted::Stacking {
            seed: seed_from_scale(source, &params, conv),
            params,
        },
        None => {
            let remaining = rescale(source, cycle_base_secs(target, conv));
            let remaining_secs = target.cap_secs().map_or(remaining, |cap| remaining.min(cap));
            Converted::Scalar { remaining_secs }
        }
    }
}
