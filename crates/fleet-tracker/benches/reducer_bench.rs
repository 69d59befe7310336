use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fleet_core::{Position, Report};
use fleet_tracker::{FleetState, IngestionReducer};

fn bench_apply(c: &mut Criterion) {
    let reducer = IngestionReducer::new();
    let reports: Vec<Report> = (0..1000)
        .map(|i| {
            Report::new(
                format!("SD-B{:03}", i % 50),
                Position::new(35.8 + (i as f64) * 1e-4, 31.9),
            )
            .with_altitude(50.0)
        })
        .collect();

    c.bench_function("reducer_apply_1000_reports_50_drones", |b| {
        b.iter(|| {
            let mut state = FleetState::new();
            for report in &reports {
                let _ = reducer.apply(&mut state, black_box(report.clone()));
            }
            state
        })
    });
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
