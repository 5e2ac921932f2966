//! Integration tests for `alloc_report` with real memory allocations.
//!
//! These tests drive reporting allocators on top of the system heap and check the exact text
//! each report style produces.

use std::alloc::System;
use std::iter;
use std::ptr::NonNull;

use alloc_report::{
    Error, HeapAllocator, OutputSink, RealAllocator, ReportStyle, ReportingAllocator, StringSink,
};

fn reporting<'a>(
    real: &'a HeapAllocator<System>,
    sink: &'a StringSink,
    style: ReportStyle,
) -> ReportingAllocator<'a> {
    ReportingAllocator::builder()
        .real_allocator(real)
        .output_sink(sink)
        .style(style)
        .build()
        .unwrap()
}

fn release_directly(real: &HeapAllocator<System>, memory: NonNull<u8>) {
    // SAFETY: Every caller passes memory allocated from this real allocator and not yet released.
    unsafe {
        real.release(memory);
    }
}

#[test]
fn narrative_no_allocation_results_in_empty_string() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();

    let _allocator = reporting(&real, &sink, ReportStyle::Narrative);

    assert_eq!(sink.contents(), "");
}

#[test]
fn narrative_allocation_leads_to_printout() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Narrative);

    let memory = allocator.allocate(10, "file", 9).unwrap();

    assert_eq!(
        sink.contents(),
        format!("Allocation using malloc of size: 10 pointer: {memory:p} at file:9\n")
    );

    release_directly(&real, memory);
}

#[test]
fn narrative_release_leads_to_printout() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Narrative);

    let memory = real.allocate(10).unwrap();

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(memory, "file", 9);
    }

    assert_eq!(
        sink.contents(),
        format!("Deallocation using free of pointer: {memory:p} at file:9\n")
    );
}

#[test]
fn code_no_allocation_results_in_empty_string() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();

    let _allocator = reporting(&real, &sink, ReportStyle::Code);

    assert_eq!(sink.contents(), "");
}

#[test]
fn code_allocation_creates_malloc_call() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Code);

    let memory = allocator.allocate(10, "file", 9).unwrap();

    assert_eq!(sink.contents(), "\tvoid* file_9 = malloc(10);\n");

    release_directly(&real, memory);
}

#[test]
fn code_release_creates_free_call() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Code);

    let memory = allocator.allocate(10, "file", 9).unwrap();
    sink.reset();

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(memory, "boo", 6);
    }

    assert_eq!(sink.contents(), "\tfree(file_9) /* at: boo:6 */\n");
}

#[test]
fn code_two_allocations_and_two_releases() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Code);

    let first = allocator.allocate(10, "file", 2).unwrap();
    let second = allocator.allocate(10, "boo", 4).unwrap();
    sink.reset();

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(first, "foo", 6);
    }

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(second, "bar", 8);
    }

    let output = sink.contents();
    assert!(output.contains("\tfree(file_2) /* at: foo:6 */\n"));
    assert!(output.contains("\tfree(boo_4) /* at: bar:8 */\n"));
}

#[test]
fn lines_appear_in_call_order() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Code);

    let first = allocator.allocate(1, "a", 1).unwrap();
    let second = allocator.allocate(2, "b", 2).unwrap();

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(second, "c", 3);
    }

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(first, "d", 4);
    }

    assert_eq!(
        sink.contents(),
        "\tvoid* a_1 = malloc(1);\n\
         \tvoid* b_2 = malloc(2);\n\
         \tfree(b_2) /* at: c:3 */\n\
         \tfree(a_1) /* at: d:4 */\n"
    );
}

#[test]
fn narrative_lines_appear_in_call_order() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Narrative);

    let first = allocator.allocate(16, "a", 1).unwrap();
    let second = allocator.allocate(32, "b", 2).unwrap();

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(first, "c", 3);
    }

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(second, "d", 4);
    }

    assert_eq!(
        sink.contents(),
        format!(
            "Allocation using malloc of size: 16 pointer: {first:p} at a:1\n\
             Allocation using malloc of size: 32 pointer: {second:p} at b:2\n\
             Deallocation using free of pointer: {first:p} at c:3\n\
             Deallocation using free of pointer: {second:p} at d:4\n"
        )
    );
}

#[test]
fn independent_allocators_share_nothing() {
    let real = HeapAllocator::system();
    let sink_a = StringSink::new();
    let sink_b = StringSink::new();
    let mut allocator_a = reporting(&real, &sink_a, ReportStyle::Code);
    let mut allocator_b = reporting(&real, &sink_b, ReportStyle::Code);

    let memory_a = allocator_a.allocate(10, "file", 9).unwrap();
    let memory_b = allocator_b.allocate(20, "file", 9).unwrap();

    // Each allocator hands out its own first name for the origin.
    assert_eq!(sink_a.contents(), "\tvoid* file_9 = malloc(10);\n");
    assert_eq!(sink_b.contents(), "\tvoid* file_9 = malloc(20);\n");

    // A pointer from the other allocator is unknown here.
    // SAFETY: memory_b was allocated from the same real allocator.
    unsafe {
        allocator_a.release(memory_b, "x", 1);
    }

    assert!(sink_a.contents().ends_with("of untracked pointer at: x:1 */\n"));
    assert_eq!(sink_b.contents(), "\tvoid* file_9 = malloc(20);\n");
    assert_eq!(allocator_a.counts().untracked_releases(), 1);
    assert_eq!(allocator_b.counts().untracked_releases(), 0);

    release_directly(&real, memory_a);
}

#[test]
fn repeated_origin_is_disambiguated() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Code);

    let memories: Vec<_> = iter::repeat_with(|| allocator.allocate(8, "loop", 5).unwrap())
        .take(3)
        .collect();

    for memory in memories {
        // SAFETY: Allocated above from the same real allocator, released once.
        unsafe {
            allocator.release(memory, "loop", 9);
        }
    }

    assert_eq!(
        sink.contents(),
        "\tvoid* loop_5 = malloc(8);\n\
         \tvoid* loop_5_2 = malloc(8);\n\
         \tvoid* loop_5_3 = malloc(8);\n\
         \tfree(loop_5) /* at: loop:9 */\n\
         \tfree(loop_5_2) /* at: loop:9 */\n\
         \tfree(loop_5_3) /* at: loop:9 */\n"
    );
}

#[test]
fn rust_source_files_become_valid_identifiers() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Code);

    let expected_line = line!() + 1;
    let memory = allocator.allocate_here(4).unwrap();

    assert_eq!(
        sink.contents(),
        format!("\tvoid* integration_tests_rs_{expected_line} = malloc(4);\n")
    );

    release_directly(&real, memory);
}

#[test]
fn failed_allocation_reports_nothing() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Narrative);

    let result = allocator.allocate(usize::MAX, "file", 9);

    assert!(matches!(result, Err(Error::OutOfMemory { size: usize::MAX })));
    assert_eq!(sink.contents(), "");
    assert_eq!(allocator.counts().allocations(), 0);
}

#[test]
fn recycled_address_gets_fresh_identifier() {
    let real = HeapAllocator::system();
    let sink = StringSink::new();
    let mut allocator = reporting(&real, &sink, ReportStyle::Code);

    let memory = allocator.allocate(10, "file", 9).unwrap();

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(memory, "boo", 6);
    }

    // The real allocator may hand the same address out again; the reporting allocator must
    // give it a fresh name rather than resurrecting the released one.
    let recycled = allocator.allocate(10, "file", 9).unwrap();

    // SAFETY: Allocated above from the same real allocator.
    unsafe {
        allocator.release(recycled, "boo", 7);
    }

    assert_eq!(
        sink.contents(),
        "\tvoid* file_9 = malloc(10);\n\
         \tfree(file_9) /* at: boo:6 */\n\
         \tvoid* file_9_2 = malloc(10);\n\
         \tfree(file_9_2) /* at: boo:7 */\n"
    );
}
