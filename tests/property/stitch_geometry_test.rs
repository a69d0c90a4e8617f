//! Property-based tests for the stitching geometry.
//!
//! These tests verify that plans are sized from the scroll range, that slice
//! crops never read past a frame or write past the canvas, and that a run over
//! a well-behaved page fills the canvas with contiguous content.

use pagesnap::services::stitching_engine::{
    plan, scroll_target_for, slice_geometry, StitchProgress, MAX_CANVAS_SIDE,
};
use pagesnap::types::stitch::{StitchConfig, StitchRequest, Termination};
use proptest::prelude::*;

fn arb_dpr() -> impl Strategy<Value = f64> {
    prop_oneof![Just(1.0), Just(1.25), Just(1.5), Just(2.0), Just(3.0)]
}

/// Requests whose canvas always fits under the side limit.
fn arb_request() -> impl Strategy<Value = StitchRequest> {
    (0u32..5000, 0u32..8000, 100u32..1500, arb_dpr(), 100u32..2000).prop_map(
        |(start, len, vh, dpr, width)| StitchRequest {
            start_offset: start as f64,
            end_offset: (start + len) as f64,
            viewport_height: vh as f64,
            device_pixel_ratio: dpr,
            document_width: width as f64,
        },
    )
}

// **Property 1: Plan sizing**
//
// *For any* valid range, the capture height is the range plus one viewport,
// the canvas matches it in device pixels and the slice budget covers it.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn plan_is_sized_from_the_range(request in arb_request()) {
        let config = StitchConfig::default();
        let plan = plan(&request, &config).expect("plan should succeed for a valid range");

        let expected = request.end_offset - request.start_offset + request.viewport_height;
        prop_assert_eq!(plan.capture_height, expected);
        prop_assert_eq!(plan.canvas_height, (expected * request.device_pixel_ratio).round() as u32);
        prop_assert!(plan.canvas_width <= MAX_CANVAS_SIDE && plan.canvas_height <= MAX_CANVAS_SIDE);
        prop_assert!(plan.effective_advance >= config.min_advance_px);
        prop_assert!(plan.estimated_slice_count >= 1 + config.slice_margin);
        prop_assert!(
            plan.effective_advance * (plan.estimated_slice_count - config.slice_margin) as f64
                >= plan.capture_height
        );
    }

    #[test]
    fn oversized_canvas_is_rejected(len in 33_000u32..60_000, vh in 100u32..1000) {
        let request = StitchRequest {
            start_offset: 0.0,
            end_offset: len as f64,
            viewport_height: vh as f64,
            device_pixel_ratio: 1.0,
            document_width: 800.0,
        };
        prop_assert!(plan(&request, &StitchConfig::default()).is_err());
    }

    #[test]
    fn reversed_range_is_rejected(start in 1u32..5000, back in 1u32..5000) {
        let request = StitchRequest {
            start_offset: start as f64,
            end_offset: start as f64 - back as f64,
            viewport_height: 800.0,
            device_pixel_ratio: 1.0,
            document_width: 800.0,
        };
        prop_assert!(plan(&request, &StitchConfig::default()).is_err());
    }
}

// **Property 2: Scroll targets stay inside the range**
//
// *For any* slice after the first, the target never precedes the start
// offset and never passes the uncomposited position.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn scroll_target_is_bounded(
        index in 1u32..50,
        start in 0u32..5000,
        advanced in 0u32..10_000,
        overlap in 0u32..400,
    ) {
        let current = (start + advanced) as f64;
        let target = scroll_target_for(index, current, start as f64, overlap as f64);
        prop_assert!(target >= start as f64);
        prop_assert!(target <= current);
        prop_assert_eq!(scroll_target_for(0, current, start as f64, overlap as f64), current);
    }
}

// **Property 3: Slice crops stay in bounds**
//
// *For any* frame position and canvas fill, the rows drawn fit in what is
// left of both the frame and the canvas.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn slice_geometry_stays_in_bounds(
        request in arb_request(),
        progress in 0.0f64..1.0,
        back in 0u32..1200,
        fill in 0.0f64..=1.0,
    ) {
        let plan = plan(&request, &StitchConfig::default()).expect("valid plan");
        let current = request.start_offset + (request.end_offset - request.start_offset) * progress;
        let actual = current - back as f64;
        let bitmap = (request.viewport_height * plan.device_pixel_ratio).round() as u32;
        let composed = (plan.canvas_height as f64 * fill).floor() as u32;

        let g = slice_geometry(&plan, current, current, actual, bitmap, composed);

        prop_assert!(composed + g.physical_draw_height <= plan.canvas_height);
        prop_assert!(g.physical_draw_height as f64 <= (g.draw_height * plan.device_pixel_ratio).max(0.0).floor());
        if g.source_y <= bitmap {
            prop_assert!(g.physical_draw_height <= bitmap - g.source_y);
        } else {
            prop_assert_eq!(g.physical_draw_height, 0);
        }
    }
}

// **Property 4: A run over a static page fills the canvas**
//
// *For any* range on a page tall enough to hold it, driving the loop with a
// page that clamps scrolling to its end composes contiguous content until
// the canvas is filled, within the slice budget.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn run_fills_canvas_contiguously(
        start in 0u32..3000,
        len in 10u32..6000,
        vh in 300u32..1200,
        extra in 0u32..2000,
        dpr in prop_oneof![Just(1.0f64), Just(2.0f64)],
    ) {
        let config = StitchConfig::default();
        let request = StitchRequest {
            start_offset: start as f64,
            end_offset: (start + len) as f64,
            viewport_height: vh as f64,
            device_pixel_ratio: dpr,
            document_width: 640.0,
        };
        let plan = plan(&request, &config).expect("valid plan");
        let max_scroll = (start + len + extra) as f64;
        let bitmap = (vh as f64 * dpr) as u32;

        let mut progress = StitchProgress::new(request.start_offset);
        let mut termination = None;
        for index in 0..plan.estimated_slice_count {
            let target = scroll_target_for(index, progress.current_y, request.start_offset, plan.overlap_px);
            let actual = target.min(max_scroll);
            let g = slice_geometry(&plan, progress.current_y, target, actual, bitmap, progress.composed);

            if g.physical_draw_height > 0 {
                let first_row = actual + g.source_y as f64 / dpr;
                prop_assert!((first_row - progress.current_y).abs() < 1e-9);
            }
            termination = progress.record(&g, bitmap, &plan, &config);
            if termination.is_some() {
                break;
            }
        }

        prop_assert_eq!(termination, Some(Termination::Filled));
        prop_assert!(progress.composed <= plan.canvas_height);
        prop_assert!(progress.composed as f64 + config.completion_tolerance_px >= plan.canvas_height as f64);
        prop_assert!(progress.slices <= plan.estimated_slice_count);
    }
}
