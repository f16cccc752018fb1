//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use flowmesh::types::VERTEX_STRIDE;
use flowmesh::Mesh;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f32, b: f32, epsilon: f32) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert the buffers have the ribbon layout: whole vertices, whole quads,
/// and every index in range
pub fn assert_mesh_well_formed(mesh: &Mesh) {
    assert_eq!(mesh.vertex_data.len() % VERTEX_STRIDE, 0);
    let vertices = mesh.vertex_count();
    assert_eq!(vertices % 4, 0, "vertex count {} is not a multiple of 4", vertices);
    assert_eq!(mesh.index_data.len(), vertices / 4 * 6);
    assert!(mesh.index_data.iter().all(|&i| (i as usize) < vertices));
}
