use hn_components::PumpCurve;
use hn_core::units::{m, mm};
use hn_network::{NetworkBuilder, NetworkModel, TankSpec};
use hn_schedule::{
    HydraulicOracle, InfeasibilityClass, NoPressureModel, OptimizerConfig, PressureBound,
    PressureModel, PumpSpec, ScheduleError, ScheduleOptimizer, ScheduleRequest, optimize,
};
use proptest::prelude::*;

/// Two pumps lift from a reservoir into a station feeding junction J, which
/// floats on tank T through a long main.
fn station() -> NetworkModel {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R", 10.0);
    b.add_pump_station("S", 10.0);
    b.add_junction("J", 0.0, 100.0);
    b.add_tank(
        "T",
        30.0,
        TankSpec {
            initial_level_m: 5.0,
            min_level_m: 0.5,
            max_level_m: 8.0,
            diameter_m: 20.0,
        },
    );
    b.add_pump("PA", "R", "S", PumpCurve::single_point(150.0, 40.0));
    b.add_pump("PB", "R", "S", PumpCurve::single_point(120.0, 45.0));
    b.add_pipe("M1", "S", "J", m(100.0), mm(400.0), 120.0, 0.0);
    b.add_pipe("M2", "J", "T", m(1000.0), mm(300.0), 100.0, 0.0);
    b.build().unwrap()
}

fn pumps() -> Vec<PumpSpec> {
    vec![
        PumpSpec::new("PA", 180.0, 0.8, vec![1.0, 1.0, 1.0]),
        PumpSpec::new("PB", 120.0, 0.7, vec![1.0, 0.5, 1.5]),
    ]
}

fn plan_cost(pumps: &[PumpSpec], plan: &[[f64; 2]]) -> f64 {
    plan.iter()
        .enumerate()
        .map(|(t, flows)| {
            flows
                .iter()
                .zip(pumps)
                .map(|(q, p)| q * p.unit_cost[t] / p.efficiency)
                .sum::<f64>()
        })
        .sum()
}

#[test]
fn two_pumps_three_periods_beat_hand_built_plans() {
    let net = station();
    let forecast = [100.0, 150.0, 120.0];
    let pumps = pumps();
    let schedule = optimize(&net, &forecast, &pumps, &[], 3, &OptimizerConfig::default()).unwrap();

    assert_eq!(schedule.horizon, 3);
    assert_eq!(schedule.entries.len(), 6);
    for (t, f) in forecast.iter().enumerate() {
        assert!(schedule.delivered_m3h(t) >= f - 1e-6, "period {t} under-delivers");
        for e in schedule.period(t) {
            let spec = pumps.iter().find(|p| p.id == e.pump).unwrap();
            assert!(e.flow_m3h >= -1e-9 && e.flow_m3h <= spec.capacity_m3h + 1e-9);
        }
    }

    let baselines = [
        // even split
        [[50.0, 50.0], [75.0, 75.0], [60.0, 60.0]],
        // proportional to capacity
        [[60.0, 40.0], [90.0, 60.0], [72.0, 48.0]],
        // the cheaper-on-average pump first
        [[100.0, 0.0], [150.0, 0.0], [120.0, 0.0]],
        // the other pump first
        [[0.0, 100.0], [30.0, 120.0], [0.0, 120.0]],
    ];
    for plan in &baselines {
        let baseline = plan_cost(&pumps, plan);
        assert!(schedule.total_cost <= baseline + 1e-6, "{} > baseline {baseline}", schedule.total_cost);
    }

    // PA is cheaper in periods 0 and 2, PB in period 1.
    let optimum = 100.0 * 1.25 + (120.0 * 0.5 / 0.7 + 30.0 * 1.25) + 120.0 * 1.25;
    assert!((schedule.total_cost - optimum).abs() < 1e-3 * optimum);
    assert!((schedule.flow("PB", 1).unwrap() - 120.0).abs() < 1e-3);
}

#[test]
fn period_costs_add_up() {
    let net = station();
    let schedule = optimize(&net, &[100.0, 150.0, 120.0], &pumps(), &[], 3, &OptimizerConfig::default()).unwrap();
    let sum: f64 = schedule.period_costs.iter().sum();
    assert!((sum - schedule.total_cost).abs() < 1e-9);
    let entries: f64 = schedule.entries.iter().map(|e| e.cost).sum();
    assert!((entries - schedule.total_cost).abs() < 1e-9);
}

#[test]
fn excess_forecast_names_the_period() {
    let net = station();
    let err = optimize(&net, &[100.0, 400.0, 120.0], &pumps(), &[], 3, &OptimizerConfig::default()).unwrap_err();
    let ScheduleError::Infeasible(inf) = err else {
        panic!("expected an infeasible schedule, got {err:?}");
    };
    assert_eq!(inf.period, 1);
    assert_eq!(inf.class, InfeasibilityClass::Demand);
}

#[test]
fn outage_makes_capacity_short() {
    let net = station();
    let mut pumps = pumps();
    pumps[0] = pumps[0].clone().with_availability(vec![1.0, 1.0, 0.0]);
    let err = optimize(&net, &[100.0, 150.0, 150.0], &pumps, &[], 3, &OptimizerConfig::default()).unwrap_err();
    let ScheduleError::Infeasible(inf) = err else {
        panic!("expected an infeasible schedule, got {err:?}");
    };
    assert_eq!(inf.period, 2);
    assert_eq!(inf.class, InfeasibilityClass::Demand);
}

#[test]
fn unknown_pump_is_rejected() {
    let net = station();
    let pumps = vec![PumpSpec::new("M1", 100.0, 0.8, vec![1.0])];
    let err = optimize(&net, &[10.0], &pumps, &[], 1, &OptimizerConfig::default()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidInput { .. }));
}

#[test]
fn horizon_must_match_forecast() {
    let net = station();
    let err = optimize(&net, &[10.0, 10.0], &pumps(), &[], 3, &OptimizerConfig::default()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidInput { .. }));
}

#[test]
fn reoptimize_reuses_unchanged_periods() {
    let mut opt = ScheduleOptimizer::new(OptimizerConfig::default());
    let request = ScheduleRequest::new(vec![100.0, 150.0, 120.0], pumps());
    let first = opt.optimize(&request, &NoPressureModel, None).unwrap();
    assert_eq!(opt.cache_hits(), 0);
    assert_eq!(opt.cached_periods(), 3);

    let again = opt.reoptimize(&request, &NoPressureModel, None).unwrap();
    assert_eq!(opt.cache_hits(), 3);
    assert_eq!(first, again);

    let mut changed = request.clone();
    changed.forecast_m3h[2] = 90.0;
    let third = opt.reoptimize(&changed, &NoPressureModel, None).unwrap();
    assert_eq!(opt.cache_hits(), 2);
    assert_eq!(third.flow("PA", 0), first.flow("PA", 0));
    assert!(third.delivered_m3h(2) >= 90.0 - 1e-6);
}

#[test]
fn oracle_enforces_minimum_pressure() {
    let net = station();
    let config = OptimizerConfig::default();
    let pumps = vec![
        PumpSpec::new("PA", 150.0, 0.8, vec![1.0]),
        PumpSpec::new("PB", 150.0, 0.8, vec![2.0]),
    ];
    let bounds = vec![PressureBound::new("J", 35.5, 80.0)];
    let schedule = optimize(&net, &[100.0], &pumps, &bounds, 1, &config).unwrap();

    // At the forecast alone J sits at the tank head (35 m); the bound needs
    // surplus flow into the tank.
    let delivered = schedule.delivered_m3h(0);
    assert!(delivered > 110.0 && delivered < 300.0 + 1e-6, "delivered {delivered}");
    assert!((schedule.flow("PA", 0).unwrap() - 150.0).abs() < 1e-3);

    let oracle = HydraulicOracle::new(&net, &pumps, bounds, &config).unwrap();
    let flows = [schedule.flow("PA", 0).unwrap(), schedule.flow("PB", 0).unwrap()];
    let p = oracle.predict(0, &flows, 100.0).unwrap();
    assert!(p[0] >= 35.5 - config.pressure_tolerance_m, "pressure {}", p[0]);
}

/// The same two pumps boosting straight into the district, with no tank.
fn booster() -> NetworkModel {
    let mut b = NetworkBuilder::new();
    b.add_reservoir("R", 10.0);
    b.add_junction("J", 0.0, 60.0);
    b.add_junction("K", 0.0, 40.0);
    b.add_pump("PA", "R", "J", PumpCurve::single_point(150.0, 40.0));
    b.add_pump("PB", "R", "J", PumpCurve::single_point(120.0, 45.0));
    b.add_pipe("JK", "J", "K", m(300.0), mm(200.0), 120.0, 0.0);
    b.build().unwrap()
}

#[test]
fn booster_without_storage_schedules_under_pressure_bounds() {
    let net = booster();
    let config = OptimizerConfig::default();
    let pumps = vec![
        PumpSpec::new("PA", 180.0, 0.8, vec![1.0]),
        PumpSpec::new("PB", 120.0, 0.7, vec![1.0]),
    ];
    let bounds = vec![PressureBound::new("K", 5.0, 200.0)];

    let free = optimize(&net, &[100.0], &pumps, &[], 1, &config).unwrap();
    let bounded = optimize(&net, &[100.0], &pumps, &bounds, 1, &config).unwrap();
    assert!((bounded.total_cost - free.total_cost).abs() < 1e-3 * free.total_cost);
    assert!((bounded.total_cost - 125.0).abs() < 1e-3);
    assert!((bounded.flow("PA", 0).unwrap() - 100.0).abs() < 1e-3);

    let oracle = HydraulicOracle::new(&net, &pumps, bounds, &config).unwrap();
    let flows = [bounded.flow("PA", 0).unwrap(), bounded.flow("PB", 0).unwrap()];
    let p = oracle.predict(0, &flows, 100.0).unwrap();
    assert!(p[0] >= 5.0 && p[0] <= 200.0, "pressure {}", p[0]);
}

#[test]
fn booster_bound_above_the_pump_curve_is_a_pressure_infeasibility() {
    let net = booster();
    let pumps = vec![
        PumpSpec::new("PA", 180.0, 0.8, vec![1.0]),
        PumpSpec::new("PB", 120.0, 0.7, vec![1.0]),
    ];
    let bounds = vec![PressureBound::new("K", 150.0, 200.0)];
    let err = optimize(&net, &[100.0], &pumps, &bounds, 1, &OptimizerConfig::default()).unwrap_err();
    let ScheduleError::Infeasible(inf) = err else {
        panic!("expected an infeasible schedule, got {err:?}");
    };
    assert_eq!(inf.period, 0);
    assert_eq!(inf.class, InfeasibilityClass::Pressure);
}

#[test]
fn oracle_linearization_reproduces_its_point() {
    let net = station();
    let config = OptimizerConfig::default();
    let pumps = vec![
        PumpSpec::new("PA", 150.0, 0.8, vec![1.0]),
        PumpSpec::new("PB", 150.0, 0.8, vec![1.0]),
    ];
    let oracle = HydraulicOracle::new(&net, &pumps, vec![PressureBound::new("J", 0.0, 100.0)], &config).unwrap();
    let point = [120.0, 60.0];
    let exact = oracle.predict(0, &point, 100.0).unwrap();
    let lin = oracle.linearize(0, &point, 100.0).unwrap();
    let approx = lin.predict(0, &point, 100.0).unwrap();
    assert!((exact[0] - approx[0]).abs() < 1e-6);
    // More pumping raises J, more demand lowers it.
    assert!(lin.pump_sensitivity()[0][0] > 0.0);
    assert!(lin.demand_sensitivity()[0] < 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn schedules_cover_forecast_and_beat_even_split(
        forecast in prop::collection::vec(0.0f64..300.0, 1..5),
        cost_a in 0.1f64..3.0,
        cost_b in 0.1f64..3.0,
    ) {
        let horizon = forecast.len();
        let pumps = vec![
            PumpSpec::new("PA", 180.0, 0.8, vec![cost_a; horizon]),
            PumpSpec::new("PB", 120.0, 0.7, vec![cost_b; horizon]),
        ];
        let mut opt = ScheduleOptimizer::new(OptimizerConfig::default());
        let schedule = opt
            .optimize(&ScheduleRequest::new(forecast.clone(), pumps.clone()), &NoPressureModel, None)
            .unwrap();
        let mut even = 0.0;
        for (t, f) in forecast.iter().enumerate() {
            prop_assert!(schedule.delivered_m3h(t) >= f - 1e-6 * (1.0 + f));
            even += f * 0.6 * cost_a / 0.8 + f * 0.4 * cost_b / 0.7;
        }
        prop_assert!(schedule.total_cost <= even + 1e-6 * (1.0 + even));
    }
}
