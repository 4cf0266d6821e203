#[cfg(feature = "bench_expand")]
use std::time::Instant;
#[cfg(feature = "bench_expand")]
use tessera::TilingContext;

#[cfg(not(feature = "bench_expand"))]
fn main() {
    panic!("expand_bench requires --features bench_expand");
}

// {4,5}: squares, five around each vertex
#[cfg(feature = "bench_expand")]
const HYPERBOLIC_SQUARES: &str = "h2. angleunit(deg) tile(2*acosh(cos(45*deg)/sin(36*deg)), 72, *4) c(0,0,0,0,0)";
#[cfg(feature = "bench_expand")]
const EUCLIDEAN_SQUARES: &str = "e2. angleunit(deg) tile(1,90,1,90,1,90,1,90) c(0,0,0,2,0) c(0,1,0,3,0)";

#[cfg(feature = "bench_expand")]
fn main() {
    use tracing_subscriber::{fmt, EnvFilter};
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))).init();

    let args: Vec<String> = std::env::args().collect();
    let mut radius = 6usize;
    let mut euclid = false;
    for a in &args[1..] {
        if let Some(val) = a.strip_prefix("--radius=") {
            if let Ok(v) = val.parse() {
                radius = v;
            }
        } else if a == "--euclid" {
            euclid = true;
        }
    }

    let mut ctx = TilingContext::default();
    if let Err(e) = ctx.load(if euclid { EUCLIDEAN_SQUARES } else { HYPERBOLIC_SQUARES }) {
        eprintln!("load failed: {e}");
        std::process::exit(1);
    }
    let mut map = match ctx.new_map() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("map failed: {e}");
            std::process::exit(1);
        }
    };
    let t0 = Instant::now();
    let reached = match map.expand(radius) {
        Ok(r) => r.len(),
        Err(e) => {
            eprintln!("expansion failed: {e}");
            std::process::exit(1);
        }
    };
    let ms = t0.elapsed().as_secs_f64() * 1000.0;
    println!(
        "radius={} reached={} nodes={} buckets={} expand_ms={:.3}",
        radius,
        reached,
        map.len(),
        map.bucket_count(),
        ms
    );
}
