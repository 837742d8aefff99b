#![allow(dead_code)]
//! Contains code for handling the Cargo features used to compile this application.
//! Currently, we have:
//! * Global allocator options:
//!   - **std allocator**:                      `RUSTFLAGS="-C target-cpu=native" cargo build --release --features=""`
//!   - **mimalloc**:                           `RUSTFLAGS="-C target-cpu=native" cargo build --release --features="mimalloc_allocator"`
//!   - **jemallocator**:                       `RUSTFLAGS="-C target-cpu=native" cargo build --release --features="jemallocator_allocator"`
//!   - **tcmalloc** *(with system libs)*:      `RUSTFLAGS="-C target-cpu=native" cargo build --release --features="tcmalloc_allocator"`
//!   - **tcmalloc** *(with bundled libs)*:     `RUSTFLAGS="-C target-cpu=native" cargo build --release --features="tcmalloc_allocator_bundled"`
//! * `dox`: compiles the `mod tests` blocks without running them, so `cargo doc` shows them
//! * Please consult `Cargo.toml` to see what are the default `features`
//!
//! # Choosing an allocator
//! Pre-decoding images (`PlayMode::CachedDecoded`) makes every worker allocate one large pixel buffer per image, concurrently,
//! so it is the workload to measure against. Something like:\
//! ``
//! for allocator in tcmalloc_allocator jemallocator_allocator mimalloc_allocator std_allocator; do
//!   RUSTFLAGS="-C target-cpu=native" cargo build --release --features="${allocator}";
//!   /usr/bin/time -v ./target/release/lottie_preloader --quiet console play --mode cached-decoded --time-scale 0 ${ANIMATIONS} 2>&1 | tee /tmp/lottie-preloader-${allocator}.out;
//! done
//! ``
//! then compare the elapsed time & max RSS of each run.

// custom global allocator
#[cfg(feature = "mimalloc_allocator")]
#[global_allocator]
static MI_MALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;
#[cfg(feature = "jemallocator_allocator")]
#[global_allocator]
static JE_MALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;
#[cfg(any(feature = "tcmalloc_allocator", feature = "tcmalloc_allocator_bundled"))]
#[global_allocator]
static TC_MALLOC: tcmalloc::TCMalloc = tcmalloc::TCMalloc;
