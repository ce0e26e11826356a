use super::TowerStore;
use crate::{
    error::TowerResult,
    scenario::{ImpactResult, RiskTier, ScenarioParams},
    types::Tick,
};
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// One recorded lab run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioRunRecord {
    pub tick:   Tick,
    pub params: ScenarioParams,
    pub impact: ImpactResult,
}

fn tier_str(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Low    => "Low",
        RiskTier::Medium => "Medium",
        RiskTier::High   => "High",
    }
}

fn parse_tier(s: &str) -> Option<RiskTier> {
    match s {
        "High"   => Some(RiskTier::High),
        "Medium" => Some(RiskTier::Medium),
        "Low"    => Some(RiskTier::Low),
        _        => None,
    }
}

impl TowerStore {
    // ── Optimization lab ──────────────────────────────────────────

    pub fn insert_scenario_run(
        &self,
        run_id: &str,
        tick: Tick,
        params: &ScenarioParams,
        impact: &ImpactResult,
    ) -> TowerResult<()> {
        self.conn.execute(
            "INSERT INTO scenario_run (
                run_id, tick, discount_threshold, renewal_uplift, dunning_start,
                revenue_delta, ops_load_delta, affected_records, risk_tier, pass_rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                tick as i64,
                params.discount_threshold,
                params.renewal_uplift,
                params.dunning_start,
                impact.revenue_delta,
                impact.ops_load_delta,
                impact.affected_records,
                tier_str(impact.risk_tier),
                impact.pass_rate,
            ],
        )?;
        Ok(())
    }

    /// Recorded lab runs, oldest first.
    pub fn scenario_runs(&self, run_id: &str) -> TowerResult<Vec<ScenarioRunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT tick, discount_threshold, renewal_uplift, dunning_start,
                    revenue_delta, ops_load_delta, affected_records, risk_tier, pass_rate
             FROM scenario_run WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                let params = ScenarioParams {
                    discount_threshold: row.get(1)?,
                    renewal_uplift:     row.get(2)?,
                    dunning_start:      row.get(3)?,
                };
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    params,
                    (
                        row.get::<_, f64>(4)?,
                        row.get::<_, i32>(5)?,
                        row.get::<_, u32>(6)?,
                        row.get::<_, f64>(8)?,
                    ),
                    row.get::<_, String>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(tick, params, (revenue_delta, ops_load_delta, affected_records, pass_rate), tier)| {
                let Some(risk_tier) = parse_tier(&tier) else {
                    log::warn!("store: scenario run at tick {tick} has unknown risk tier '{tier}'");
                    return None;
                };
                Some(ScenarioRunRecord {
                    tick,
                    params,
                    impact: ImpactResult {
                        revenue_delta,
                        ops_load_delta,
                        affected_records,
                        risk_tier,
                        pass_rate,
                    },
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::compute_impact;

    #[test]
    fn unknown_risk_tier_rows_are_skipped() {
        let store = TowerStore::in_memory().unwrap();
        store.migrate().unwrap();
        store.insert_run("tier", "test").unwrap();
        let params = ScenarioParams::default();
        store.insert_scenario_run("tier", 1, &params, &compute_impact(&params)).unwrap();
        store.insert_scenario_run("tier", 2, &params, &compute_impact(&params)).unwrap();
        store
            .conn
            .execute("UPDATE scenario_run SET risk_tier = 'Extreme' WHERE tick = 2", [])
            .unwrap();

        let runs = store.scenario_runs("tier").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].tick, 1);
        assert_eq!(runs[0].impact.risk_tier, RiskTier::Low);
    }
}
