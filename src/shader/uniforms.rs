//! Named uniforms
//!
//! Each `var<uniform>` buffer of a program gets a CPU staging copy. Setting a
//! uniform writes into that copy at the member's offset; the renderer uploads a
//! snapshot per draw. Values stick until overwritten.

use glam::{Mat4, Vec2, Vec3, Vec4};
use naga::{ScalarKind, TypeInner, VectorSize};

/// Host-visible type of a uniform member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// Declared, but not settable through [`UniformValue`] (arrays, nested structs, ...)
    Opaque,
}

impl UniformKind {
    pub(crate) fn of(inner: &TypeInner) -> Self {
        match *inner {
            TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
                ScalarKind::Float => UniformKind::Float,
                ScalarKind::Sint => UniformKind::Int,
                ScalarKind::Uint => UniformKind::Uint,
                _ => UniformKind::Opaque,
            },
            TypeInner::Vector { size, scalar }
                if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
            {
                match size {
                    VectorSize::Bi => UniformKind::Vec2,
                    VectorSize::Tri => UniformKind::Vec3,
                    VectorSize::Quad => UniformKind::Vec4,
                }
            }
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                scalar,
            } if scalar.kind == ScalarKind::Float && scalar.width == 4 => UniformKind::Mat4,
            _ => UniformKind::Opaque,
        }
    }
}

/// A named member of a uniform buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    /// Byte offset inside the buffer
    pub offset: u32,
    pub kind: UniformKind,
}

/// Byte layout of one uniform buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    /// Buffer size in bytes, a multiple of 16
    pub size: u32,
    pub fields: Vec<UniformField>,
}

impl UniformLayout {
    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A value for [`UniformStorage::set`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::Uint(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Writes `value` as a member of type `kind`, or returns false if it doesn't fit.
///
/// Bools go into integer members as 1/0. Integers cross signedness only when
/// the value is representable on both sides.
fn encode(value: UniformValue, kind: UniformKind, write: &mut dyn FnMut(&[u8])) -> bool {
    match (value, kind) {
        (UniformValue::Bool(b), UniformKind::Int) => write(bytemuck::bytes_of(&(b as i32))),
        (UniformValue::Bool(b), UniformKind::Uint) => write(bytemuck::bytes_of(&(b as u32))),
        (UniformValue::Int(i), UniformKind::Int) => write(bytemuck::bytes_of(&i)),
        (UniformValue::Int(i), UniformKind::Uint) if i >= 0 => {
            write(bytemuck::bytes_of(&(i as u32)))
        }
        (UniformValue::Uint(u), UniformKind::Uint) => write(bytemuck::bytes_of(&u)),
        (UniformValue::Uint(u), UniformKind::Int) if u <= i32::MAX as u32 => {
            write(bytemuck::bytes_of(&(u as i32)))
        }
        (UniformValue::Float(f), UniformKind::Float) => write(bytemuck::bytes_of(&f)),
        (UniformValue::Vec2(v), UniformKind::Vec2) => write(bytemuck::bytes_of(&v)),
        (UniformValue::Vec3(v), UniformKind::Vec3) => write(bytemuck::bytes_of(&v)),
        (UniformValue::Vec4(v), UniformKind::Vec4) => write(bytemuck::bytes_of(&v)),
        (UniformValue::Mat4(m), UniformKind::Mat4) => write(bytemuck::bytes_of(&m)),
        _ => return false,
    }
    true
}

/// Staging memory for one uniform buffer
#[derive(Debug, Clone)]
pub struct UniformBlock {
    pub binding: u32,
    pub layout: UniformLayout,
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn new(binding: u32, layout: UniformLayout) -> Self {
        let data = vec![0; layout.size as usize];
        Self {
            binding,
            layout,
            data,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// All uniform buffers of a program, addressed by member name
#[derive(Debug, Clone, Default)]
pub struct UniformStorage {
    blocks: Vec<UniformBlock>,
}

impl UniformStorage {
    pub fn new(blocks: Vec<UniformBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[UniformBlock] {
        &self.blocks
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.iter().any(|b| b.layout.field(name).is_some())
    }

    /// Write a uniform by name.
    ///
    /// An unknown name is not an error and does nothing. Returns whether
    /// anything was written.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        let value = value.into();
        let Some(block) = self.blocks.iter_mut().find(|b| b.layout.field(name).is_some()) else {
            return false;
        };
        let Some(field) = block.layout.field(name).cloned() else {
            return false;
        };

        let data = &mut block.data;
        let mut in_bounds = true;
        let written = encode(value, field.kind, &mut |bytes| {
            let start = field.offset as usize;
            match data.get_mut(start..start + bytes.len()) {
                Some(slot) => slot.copy_from_slice(bytes),
                None => in_bounds = false,
            }
        });

        if !written {
            log::debug!("uniform `{name}` is {:?}; ignoring {value:?}", field.kind);
        }
        written && in_bounds
    }

    /// Raw bytes of a member, for inspection
    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        self.blocks.iter().find_map(|block| {
            let field = block.layout.field(name)?;
            let start = field.offset as usize;
            let len = match field.kind {
                UniformKind::Float | UniformKind::Int | UniformKind::Uint => 4,
                UniformKind::Vec2 => 8,
                UniformKind::Vec3 => 12,
                UniformKind::Vec4 => 16,
                UniformKind::Mat4 => 64,
                UniformKind::Opaque => 0,
            };
            block.data.get(start..start + len)
        })
    }
}
