//! Vertex type and the shared unit quad

use bytemuck::{Pod, Zeroable};

/// Quad vertex with position, color and texture coordinates
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub const fn new(position: [f32; 3], color: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            color,
            tex_coords,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Unit quad centred on the origin, corners at +-0.5
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([0.5, 0.5, 0.0], colors::RED, [1.0, 1.0]),    // top right
    Vertex::new([0.5, -0.5, 0.0], colors::GREEN, [1.0, 0.0]), // bottom right
    Vertex::new([-0.5, -0.5, 0.0], colors::BLUE, [0.0, 0.0]), // bottom left
    Vertex::new([-0.5, 0.5, 0.0], colors::YELLOW, [0.0, 1.0]), // top left
];

/// Two triangles sharing the bottom-right/top-left diagonal
pub const QUAD_INDICES: [u16; 6] = [0, 1, 3, 1, 2, 3];

/// Corner colors of the unit quad
pub mod colors {
    pub const RED: [f32; 3] = [1.0, 0.0, 0.0];
    pub const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
    pub const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
    pub const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        let desc = Vertex::desc();
        assert_eq!(desc.array_stride, 32);
        let offsets: Vec<u64> = desc.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
    }

    #[test]
    fn test_quad_indices_cover_all_corners() {
        for corner in 0..QUAD_VERTICES.len() as u16 {
            assert!(QUAD_INDICES.contains(&corner));
        }
        assert!(QUAD_INDICES.iter().all(|&i| (i as usize) < QUAD_VERTICES.len()));
    }

    #[test]
    fn test_quad_is_unit_sized() {
        for v in QUAD_VERTICES {
            assert_eq!(v.position[0].abs(), 0.5);
            assert_eq!(v.position[1].abs(), 0.5);
            // Texture coordinates run 0..1 across the quad
            assert_eq!(v.tex_coords[0], v.position[0] + 0.5);
            assert_eq!(v.tex_coords[1], v.position[1] + 0.5);
        }
    }
}
