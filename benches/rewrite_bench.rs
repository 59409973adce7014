use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use article_viewer::markup::{fill_placeholders, outline, strip_blank_lines};
use article_viewer::{ArticleViewer, HeadlessHost, MemorySource, ResourceRewriter, ViewerConfig};

const FRAGMENTS: &[(&str, &str)] = &[
    ("main", "tests/fixtures/site/articles/涅波絲經.html"),
    ("audio", "tests/fixtures/site/articles/涅波絲經有聲書.html"),
    ("english", "tests/fixtures/site/articles/涅波絲經英文版.html"),
    ("history", "tests/fixtures/site/articles/涅波史記.html"),
];

/// Copies of each fragment concatenated into one body.
const REPEAT: usize = 400;

struct TrackingAllocator;

static CURRENT_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: TrackingAllocator = TrackingAllocator;

fn current_alloc_bytes() -> usize {
    CURRENT_ALLOC_BYTES.load(Ordering::Relaxed)
}

fn reset_peak_alloc_bytes() {
    PEAK_ALLOC_BYTES.store(current_alloc_bytes(), Ordering::Relaxed);
}

fn add_current_alloc_bytes(delta: usize) {
    let current = CURRENT_ALLOC_BYTES.fetch_add(delta, Ordering::Relaxed) + delta;
    PEAK_ALLOC_BYTES.fetch_max(current, Ordering::Relaxed);
}

fn sub_current_alloc_bytes(delta: usize) {
    let _ = CURRENT_ALLOC_BYTES.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(delta))
    });
}

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            add_current_alloc_bytes(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        sub_current_alloc_bytes(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            if new_size >= layout.size() {
                add_current_alloc_bytes(new_size - layout.size());
            } else {
                sub_current_alloc_bytes(layout.size() - new_size);
            }
        }
        new_ptr
    }
}

#[derive(Clone, Debug)]
struct CaseResult {
    fragment: String,
    case: String,
    bytes: usize,
    iterations: usize,
    min_ns: u128,
    median_ns: u128,
    max_ns: u128,
    median_peak_heap_bytes: usize,
}

fn median<T: Copy>(sorted: &[T]) -> T {
    sorted[sorted.len() / 2]
}

fn run_case<F>(
    fragment: &str,
    case: &str,
    bytes: usize,
    warmup_iters: usize,
    measure_iters: usize,
    mut op: F,
) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..warmup_iters {
        black_box(op());
    }

    let mut time_samples = Vec::with_capacity(measure_iters);
    let mut mem_samples = Vec::with_capacity(measure_iters);
    for _ in 0..measure_iters {
        let baseline_alloc = current_alloc_bytes();
        reset_peak_alloc_bytes();
        let start = Instant::now();
        black_box(op());
        time_samples.push(start.elapsed().as_nanos());
        mem_samples.push(
            PEAK_ALLOC_BYTES
                .load(Ordering::Relaxed)
                .saturating_sub(baseline_alloc),
        );
    }

    time_samples.sort_unstable();
    mem_samples.sort_unstable();

    CaseResult {
        fragment: fragment.to_string(),
        case: case.to_string(),
        bytes,
        iterations: measure_iters,
        min_ns: time_samples[0],
        median_ns: median(&time_samples),
        max_ns: time_samples[time_samples.len() - 1],
        median_peak_heap_bytes: median(&mem_samples),
    }
}

fn main() {
    let quick = std::env::args().any(|arg| arg == "--quick");
    let warmup_iters = if quick { 1 } else { 3 };
    let measure_iters = if quick { 5 } else { 25 };

    println!("# article-viewer benchmark");
    println!(
        "# mode={} warmup_iters={} measure_iters={} repeat={}",
        if quick { "quick" } else { "full" },
        warmup_iters,
        measure_iters,
        REPEAT
    );
    println!("fragment,case,bytes,iterations,min_ns,median_ns,max_ns,median_peak_heap_bytes");

    let config = ViewerConfig::default();
    let rewriter = ResourceRewriter::from_config(&config.resources);
    let mut results = Vec::new();

    for (key, path) in FRAGMENTS {
        let single =
            std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path, e));
        let body = single.repeat(REPEAT);
        let bytes = body.len();

        results.push(run_case(key, "rewrite", bytes, warmup_iters, measure_iters, || {
            rewriter.rewrite_counted(&body).1
        }));

        results.push(run_case(key, "strip_blank_lines", bytes, warmup_iters, measure_iters, || {
            strip_blank_lines(&body).len()
        }));

        results.push(run_case(key, "outline", bytes, warmup_iters, measure_iters, || {
            outline(&body, &config.ui.cheer_class).sections
        }));

        results.push(run_case(key, "fill_cheers", bytes, warmup_iters, measure_iters, || {
            fill_placeholders(&body, &config.ui.cheer_class, "<img>").1
        }));

        let request_path = path.trim_start_matches("tests/fixtures/site/").to_string();
        let source = MemorySource::new().with(request_path.clone(), body.clone());
        results.push(run_case(key, "full_load", bytes, warmup_iters, measure_iters, || {
            let mut viewer = ArticleViewer::new(config.clone(), HeadlessHost::new());
            viewer.load_from(&source, &request_path);
            viewer.host().container_html().len()
        }));
    }

    for result in &results {
        println!(
            "{},{},{},{},{},{},{},{}",
            result.fragment,
            result.case,
            result.bytes,
            result.iterations,
            result.min_ns,
            result.median_ns,
            result.max_ns,
            result.median_peak_heap_bytes
        );
    }
}
