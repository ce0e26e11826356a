//! Optimization lab — scenario parameters and the impact calculator.
//!
//! The calculator is a pure function over three slider inputs. It cannot
//! fail. Callers clamp or validate raw input onto the slider domain first.

use crate::{
    config::SimulatorConfig,
    error::{TowerError, TowerResult},
};
use serde::{Deserialize, Serialize};

pub const DISCOUNT_MIN: u32 = 10;
pub const DISCOUNT_MAX: u32 = 40;
pub const UPLIFT_MIN: f64 = 0.0;
pub const UPLIFT_MAX: f64 = 15.0;
pub const UPLIFT_STEP: f64 = 0.5;

/// The three lab sliders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScenarioParams {
    /// Discount % above which deals route to approval. Whole percent, 10..=40.
    pub discount_threshold: u32,
    /// Renewal price uplift %, 0..=15 in half-point steps.
    pub renewal_uplift: f64,
    /// Day after invoice due date that dunning starts.
    pub dunning_start: i32,
}

impl Default for ScenarioParams {
    /// The lab's initial slider positions.
    fn default() -> Self {
        Self {
            discount_threshold: 20,
            renewal_uplift: 3.0,
            dunning_start: 7,
        }
    }
}

impl ScenarioParams {
    /// Snap raw control input onto the slider domain.
    pub fn clamped(discount_threshold: i64, renewal_uplift: f64, dunning_start: i32) -> Self {
        let discount = discount_threshold.clamp(DISCOUNT_MIN as i64, DISCOUNT_MAX as i64) as u32;
        let uplift = if renewal_uplift.is_finite() {
            let snapped = (renewal_uplift / UPLIFT_STEP).round() * UPLIFT_STEP;
            snapped.clamp(UPLIFT_MIN, UPLIFT_MAX)
        } else {
            UPLIFT_MIN
        };
        Self {
            discount_threshold: discount,
            renewal_uplift: uplift,
            dunning_start,
        }
    }

    /// Reject input that the sliders could never produce.
    pub fn validate(&self) -> TowerResult<()> {
        if !(DISCOUNT_MIN..=DISCOUNT_MAX).contains(&self.discount_threshold) {
            return Err(TowerError::ParameterOutOfRange {
                parameter: "discount_threshold",
                value:     self.discount_threshold as f64,
                min:       DISCOUNT_MIN as f64,
                max:       DISCOUNT_MAX as f64,
            });
        }
        let uplift = self.renewal_uplift;
        if !(UPLIFT_MIN..=UPLIFT_MAX).contains(&uplift) || (uplift / UPLIFT_STEP).fract() != 0.0 {
            return Err(TowerError::ParameterOutOfRange {
                parameter: "renewal_uplift",
                value:     uplift,
                min:       UPLIFT_MIN,
                max:       UPLIFT_MAX,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Projected business impact of one scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImpactResult {
    /// Projected ARR change in dollars.
    pub revenue_delta:    f64,
    /// Change in operations workload, percentage points.
    pub ops_load_delta:   i32,
    pub affected_records: u32,
    pub risk_tier:        RiskTier,
    /// Share of simulated records that still pass, 0..=100.
    pub pass_rate:        f64,
}

impl ImpactResult {
    /// `+$12.3k` / `-$166.0k`. Zero renders with a minus sign, as the lab does.
    pub fn revenue_label(&self) -> String {
        let thousands = self.revenue_delta.abs() / 1000.0;
        if self.revenue_delta > 0.0 {
            format!("+${thousands:.1}k")
        } else {
            format!("-${thousands:.1}k")
        }
    }

    /// `+4%` / `-13%`.
    pub fn ops_load_label(&self) -> String {
        if self.ops_load_delta > 0 {
            format!("+{}%", self.ops_load_delta)
        } else {
            format!("{}%", self.ops_load_delta)
        }
    }
}

/// Compute the impact of `params` with the given coefficients.
pub fn compute_impact_with(params: &ScenarioParams, sim: &SimulatorConfig) -> ImpactResult {
    let discount = params.discount_threshold as i64;
    let baseline = sim.baseline_discount as i64;

    let revenue_delta = (params.renewal_uplift - sim.baseline_uplift) * sim.revenue_per_uplift_point
        + (baseline - discount) as f64 * sim.revenue_per_discount_point;

    let discount_load = if discount < baseline {
        sim.ops_load_loose_discount
    } else {
        sim.ops_load_tight_discount
    };
    let dunning_load = if params.dunning_start < sim.early_dunning_before_day {
        sim.ops_load_early_dunning
    } else {
        sim.ops_load_late_dunning
    };

    // floor(population * (|d - baseline| / 100 + base_pct / 100)), kept in
    // integers so the floor is exact.
    let spread = discount.abs_diff(baseline) as u64;
    let affected_records = (sim.population as u64 * (spread + sim.base_affected_pct as u64) / 100) as u32;

    let risk_tier = if params.discount_threshold > sim.high_risk_above {
        RiskTier::High
    } else if params.discount_threshold > sim.medium_risk_above {
        RiskTier::Medium
    } else {
        RiskTier::Low
    };

    let pass_rate = 100.0 - affected_records as f64 * 100.0 / sim.population as f64;

    ImpactResult {
        revenue_delta,
        ops_load_delta: discount_load + dunning_load,
        affected_records,
        risk_tier,
        pass_rate,
    }
}

/// Compute the impact of `params` with the lab's static coefficients.
pub fn compute_impact(params: &ScenarioParams) -> ImpactResult {
    compute_impact_with(params, &SimulatorConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_snaps_to_slider_domain() {
        let p = ScenarioParams::clamped(55, 7.3, -2);
        assert_eq!(p.discount_threshold, 40);
        assert_eq!(p.renewal_uplift, 7.5);
        assert_eq!(p.dunning_start, -2);

        let p = ScenarioParams::clamped(3, -1.0, 9);
        assert_eq!(p.discount_threshold, 10);
        assert_eq!(p.renewal_uplift, 0.0);

        let p = ScenarioParams::clamped(20, f64::NAN, 9);
        assert_eq!(p.renewal_uplift, 0.0);
    }

    #[test]
    fn validate_rejects_off_step_uplift() {
        let mut p = ScenarioParams::default();
        assert!(p.validate().is_ok());
        p.renewal_uplift = 2.25;
        assert!(matches!(
            p.validate(),
            Err(TowerError::ParameterOutOfRange { parameter: "renewal_uplift", .. })
        ));
        p.renewal_uplift = 2.5;
        p.discount_threshold = 41;
        assert!(p.validate().is_err());
    }

    #[test]
    fn labels_follow_lab_formatting() {
        let r = compute_impact(&ScenarioParams { discount_threshold: 30, renewal_uplift: 5.0, dunning_start: 3 });
        assert_eq!(r.revenue_label(), "-$166.0k");
        assert_eq!(r.ops_load_label(), "+4%");

        let r = compute_impact(&ScenarioParams { discount_threshold: 18, renewal_uplift: 4.5, dunning_start: 9 });
        // (1.5 * 142000) + (2 * 45000) = 303000
        assert_eq!(r.revenue_label(), "+$303.0k");
        assert_eq!(r.ops_load_label(), "+10%");

        let r = compute_impact(&ScenarioParams { discount_threshold: 20, renewal_uplift: 3.0, dunning_start: 7 });
        assert_eq!(r.revenue_label(), "-$0.0k");
        assert_eq!(r.ops_load_label(), "-13%");
    }
}
