//! Performance benchmarks for the payroll engine.
//!
//! Covers the hot paths of a payroll run:
//! - ISR on one period
//! - IMSS contributions on one period
//! - Net-to-gross solving
//! - One orchestrated run
//! - Batches of 100 and 1000 employees
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::str::FromStr;

use chrono::NaiveDate;
use nomina_engine::calculation::{
    calculate_imss, calculate_isr, solve_net_to_gross, ImssInput, NetToGrossContext, SolverConfig,
};
use nomina_engine::config::ConfigLoader;
use nomina_engine::fixed_point::{Money, Quantity, Rate};
use nomina_engine::models::{
    ContractType, EmployeeProfile, PayrollPeriod, Periodicity, WageFacts,
};
use nomina_engine::orchestration::{ExtraordinaryPayments, PayrollInput, PayrollOrchestrator};

fn load_config() -> ConfigLoader {
    ConfigLoader::load("./config/mx").expect("Failed to load config")
}

fn monthly_period() -> PayrollPeriod {
    PayrollPeriod::new(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        Periodicity::Monthly,
    )
    .unwrap()
}

/// Creates a payroll input for an employee earning `daily` pesos.
fn create_input(index: usize, daily: i64) -> PayrollInput {
    PayrollInput {
        run_id: "bench-2026-01".to_string(),
        employee: EmployeeProfile {
            id: format!("emp_{:05}", index),
            contract_type: ContractType::Indefinite,
            hire_date: NaiveDate::from_ymd_opt(2019, 7, 1).unwrap(),
            wage: WageFacts::statutory_minimum(Money::from_units(daily)),
            border_zone: false,
        },
        period: monthly_period(),
        incidents: vec![],
        overtime_week_to_date: vec![],
        extraordinary: ExtraordinaryPayments::default(),
        concepts: vec![],
    }
}

fn bench_isr(c: &mut Criterion) {
    let config = load_config();
    let fiscal = config.fiscal_year(2026).unwrap();
    let income = Money::from_units(15_000);

    c.bench_function("isr_monthly", |b| {
        b.iter(|| {
            calculate_isr(
                black_box(income),
                &fiscal.isr_monthly,
                Some(&fiscal.subsidy_monthly),
                &fiscal.rounding,
            )
            .unwrap()
        })
    });
}

fn bench_imss(c: &mut Criterion) {
    let config = load_config();
    let fiscal = config.fiscal_year(2026).unwrap();
    let input = ImssInput {
        sbc: Money::from_str("524.6407").unwrap(),
        days: Quantity::from_int(30),
        absence_days: Quantity::ZERO,
        work_risk_premium: Rate::from_raw(543_550),
        minimum_wage_earner: false,
    };

    c.bench_function("imss_monthly", |b| {
        b.iter(|| calculate_imss(black_box(&input), fiscal, 1).unwrap())
    });
}

fn bench_net_to_gross(c: &mut Criterion) {
    let config = load_config();
    let fiscal = config.fiscal_year(2026).unwrap();
    let period = monthly_period();
    let ctx = NetToGrossContext::new(fiscal, &period, Quantity::from_str("1.0493").unwrap(), true, false)
        .unwrap();

    let mut group = c.benchmark_group("net_to_gross");
    for target in [8_000i64, 13_000, 60_000] {
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &target| {
            b.iter(|| {
                solve_net_to_gross(black_box(Money::from_units(target)), &ctx, SolverConfig::default())
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_single_run(c: &mut Criterion) {
    let orchestrator = PayrollOrchestrator::new(load_config());
    let input = create_input(0, 500);

    c.bench_function("orchestrated_run", |b| {
        b.iter(|| orchestrator.run(black_box(&input)))
    });
}

fn bench_batches(c: &mut Criterion) {
    let orchestrator = PayrollOrchestrator::new(load_config());

    let mut group = c.benchmark_group("batch");
    for size in [100usize, 1000] {
        let inputs: Vec<PayrollInput> = (0..size)
            .map(|i| create_input(i, 320 + (i % 50) as i64 * 40))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        if size >= 1000 {
            group.sample_size(10);
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &inputs, |b, inputs| {
            b.iter(|| orchestrator.run_batch(black_box(inputs)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_isr,
    bench_imss,
    bench_net_to_gross,
    bench_single_run,
    bench_batches
);
criterion_main!(benches);
