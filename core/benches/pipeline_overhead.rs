use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use orderflow::{ContextData, FlowError, Pipeline, PipelineControl, Registry, SkipCondition};
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Clone, Debug, Default)]
struct BenchContext {
  counter: u64,
  skip_tail: bool,
}

fn step_names(n: usize) -> Vec<&'static str> {
  // Pipeline::new borrows the names; leaking a handful per benchmark is fine.
  (0..n)
    .map(|i| Box::leak(format!("step_{}", i).into_boxed_str()) as &'static str)
    .collect()
}

fn counting_handler() -> orderflow::Handler<BenchContext, FlowError> {
  Box::new(|ctx: ContextData<BenchContext>| {
    Box::pin(async move {
      ctx.write().counter += 1;
      Ok(PipelineControl::Continue)
    })
  })
}

fn build_pipeline(num_steps: usize, with_skip: bool) -> Pipeline<BenchContext, FlowError> {
  let names = step_names(num_steps);
  let defs: Vec<(&str, bool, Option<SkipCondition<BenchContext>>)> = names
    .iter()
    .enumerate()
    .map(|(i, name)| {
      let skip: Option<SkipCondition<BenchContext>> = if with_skip && i % 2 == 1 {
        Some(Arc::new(|ctx: ContextData<BenchContext>| ctx.read().skip_tail))
      } else {
        None
      };
      (*name, false, skip)
    })
    .collect();

  let mut pipeline = Pipeline::<BenchContext, FlowError>::new(&defs);
  for name in names {
    pipeline.on_root(name, counting_handler());
  }
  pipeline
}

fn bench_direct_run(c: &mut Criterion) {
  let mut group = c.benchmark_group("DirectRun");
  let rt = Runtime::new().expect("tokio runtime");

  for num_steps in [1usize, 4, 8] {
    for with_skip in [false, true] {
      let pipeline = Arc::new(build_pipeline(num_steps, with_skip));
      group.throughput(Throughput::Elements(num_steps as u64));
      group.bench_with_input(
        BenchmarkId::new(format!("{}steps_skip_{}", num_steps, with_skip), num_steps),
        &num_steps,
        |b, _| {
          b.to_async(&rt).iter_batched(
            || {
              ContextData::new(BenchContext {
                skip_tail: with_skip,
                ..Default::default()
              })
            },
            |ctx| {
              let p = pipeline.clone();
              async move { p.run(ctx).await.expect("pipeline run") }
            },
            criterion::BatchSize::SmallInput,
          );
        },
      );
    }
  }
  group.finish();
}

fn bench_registry_dispatch(c: &mut Criterion) {
  let rt = Runtime::new().expect("tokio runtime");
  let registry = Arc::new(Registry::<FlowError>::new());
  // Same shape as the webhook flow: four steps.
  registry.register_pipeline(build_pipeline(4, false));

  c.bench_function("RegistryDispatch/4steps", |b| {
    b.to_async(&rt).iter_batched(
      || ContextData::new(BenchContext::default()),
      |ctx| {
        let r = registry.clone();
        async move { r.run(ctx).await.expect("registry run") }
      },
      criterion::BatchSize::SmallInput,
    );
  });
}

criterion_group!(benches, bench_direct_run, bench_registry_dispatch);
criterion_main!(benches);
