//! Cross-checks between the host structs, the bundled shaders and the
//! host-side repro references. None of these need a GPU.

use gpu_repro::layout::codec::{decode_slice, encode_slice, read_field_f32s, read_field_u32};
use gpu_repro::layout::occlusion::CombineVisibilityResultOptions;
use gpu_repro::layout::{occlusion, stencil_clear, texture_to_buffer, GpuLayout, LayoutError};
use gpu_repro::repro::occlusion::{
    combine_visibility_results, expected_outcomes, on_screen_triangle, COMBINE_OPTIONS, ITERATIONS,
};
use gpu_repro::repro::stencil_clear::full_screen_quad;
use gpu_repro::repro::texture_to_buffer::{
    check_contents, simulate_copy, TextureToBufferOptions, FORMATS,
};
use gpu_repro::shaders::{self, reflect, Repro};

#[test]
fn host_sizes_match_the_contract() {
    assert_eq!(occlusion::Vertex::size(), 32);
    assert_eq!(stencil_clear::Vertex::size(), 8);
    assert_eq!(texture_to_buffer::Vertex::size(), 16);
    assert_eq!(CombineVisibilityResultOptions::size(), 8);

    assert_eq!(occlusion::Vertex::field("color").map(|f| f.offset), Some(0));
    assert_eq!(occlusion::Vertex::field("pos").map(|f| f.offset), Some(16));
    assert_eq!(
        CombineVisibilityResultOptions::field("num_offsets").map(|f| f.offset),
        Some(4)
    );
}

#[test]
fn every_host_table_is_contiguous() {
    occlusion::Vertex::check_host().unwrap();
    CombineVisibilityResultOptions::check_host().unwrap();
    stencil_clear::Vertex::check_host().unwrap();
    texture_to_buffer::Vertex::check_host().unwrap();
}

#[test]
fn every_shader_agrees_with_its_host_structs() {
    for repro in Repro::all() {
        shaders::verify_repro(repro).unwrap();
    }
}

#[test]
fn vertex_struct_is_not_interchangeable_between_repros() {
    let module = shaders::parse(Repro::StencilClear).unwrap();
    let err = reflect::verify::<texture_to_buffer::Vertex>(&module).unwrap_err();
    assert!(matches!(
        err,
        LayoutError::SizeMismatch { .. } | LayoutError::FieldFormat { .. }
    ));
}

#[test]
fn occlusion_vertices_survive_a_byte_round_trip() {
    let triangle = on_screen_triangle();
    let bytes = encode_slice(&triangle);
    assert_eq!(bytes.len(), 3 * 32);
    assert_eq!(decode_slice::<occlusion::Vertex>(&bytes).unwrap(), triangle);
    assert_eq!(
        read_field_f32s::<occlusion::Vertex>(&bytes, 2, "pos").unwrap(),
        vec![-1.0, 2.0, 0.5, 1.0]
    );
}

#[test]
fn options_bytes_read_back_by_field() {
    let bytes = encode_slice(&[COMBINE_OPTIONS]);
    assert_eq!(
        read_field_u32::<CombineVisibilityResultOptions>(&bytes, 0, "start_offset").unwrap(),
        0
    );
    assert_eq!(
        read_field_u32::<CombineVisibilityResultOptions>(&bytes, 0, "num_offsets").unwrap(),
        2
    );
}

#[test]
fn quad_encodes_to_tightly_packed_pairs() {
    let bytes = encode_slice(&full_screen_quad());
    assert_eq!(bytes.len(), 6 * 8);
    assert_eq!(
        read_field_f32s::<stencil_clear::Vertex>(&bytes, 5, "pos").unwrap(),
        vec![1.0, 1.0]
    );
}

#[test]
fn occlusion_reference_agrees_with_schedule() {
    let outcomes = expected_outcomes(ITERATIONS);
    assert!(outcomes.iter().all(|o| o.is_ok()));
    // iteration 1: one on-screen draw in slot 0
    assert_eq!(
        combine_visibility_results(&COMBINE_OPTIONS, &[0, 1], 0, false).unwrap(),
        1
    );
}

#[test]
fn conforming_copy_passes_for_every_format() {
    let options = TextureToBufferOptions {
        width: 16,
        height: 4,
        depth: 2,
        buffer_size: 0,
        destination_offset: 256,
        formats: Vec::new(),
    };
    for info in FORMATS {
        let layout = options.layout(info);
        let size = layout.end_offset() as usize + 64;
        let buffer = simulate_copy(&layout, 0x10, size).unwrap();
        assert!(
            check_contents(&layout, 0x10, &buffer).is_ok(),
            "{} failed",
            info.name
        );
    }
}
