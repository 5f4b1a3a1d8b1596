//! Tick-loop benchmark: a field of bouncing balls, the workload the
//! runtime is built for.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use cadence_core::{integral, Engine, Entity, Reactor};

const WIDTH: f64 = 40.0;

fn reverse(ball: Entity) -> cadence_core::Result<()> {
    let v = ball.attr_value("vx")?.as_num("vx")?;
    let x = ball.attr("x").expect("x is bound");
    let opposite = if v > 0.0 { x.le(0.0) } else { x.ge(WIDTH) };
    ball.set_attr("vx", -v)?;
    let owner = ball.clone();
    ball.add_reactor(Reactor::new(opposite, move || reverse(owner.clone())));
    Ok(())
}

fn build_engine(balls: usize) -> Engine {
    let mut engine = Engine::new(0.05).expect("valid step size");
    for i in 0..balls {
        let ball = Entity::new();
        let speed = 3.0 + (i % 7) as f64;
        ball.set_attr("vx", speed).expect("wire vx");
        let vx = ball.attr("vx").expect("vx is bound");
        ball.set_attr("x", integral(&vx)).expect("wire x");

        let x = ball.attr("x").expect("x is bound");
        let owner = ball.clone();
        ball.add_reactor(Reactor::new(x.ge(WIDTH), move || reverse(owner.clone())));
        engine.add_entity(ball);
    }
    engine
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for balls in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(balls), &balls, |b, &balls| {
            let mut engine = build_engine(balls);
            b.iter(|| engine.tick().expect("tick"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
