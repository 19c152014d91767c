pub mod deps;
pub mod graph;
pub mod isolate;
pub mod load;
pub mod parse;
pub mod platform;
pub mod repo;
pub mod run;
pub mod task;
pub mod tidy;
pub mod trace;
pub mod work;

#[cfg(not(any(windows, target_arch = "wasm32")))]
use jemallocator::Jemalloc;

#[cfg(not(any(windows, target_arch = "wasm32")))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
