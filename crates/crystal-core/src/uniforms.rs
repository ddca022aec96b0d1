//! Per-crystal shader parameters and the sink that receives them.

use bytemuck::{Pod, Zeroable};

/// Uniform block written to every crystal once per frame. Layout matches a
/// WGSL struct of 16 `f32`s (64 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CrystalUniforms {
    pub time: f32,
    pub pulse: f32,
    pub amplitude: f32,
    pub emissive: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub hover: f32,
    pub focus: f32,
    pub scale: f32,
    pub sharpness: f32,
    pub _pad: f32,
    pub color: [f32; 4],
}

/// Render-backend handle for one crystal's mesh and material.
pub trait ShaderUniformSink {
    fn write_uniforms(&mut self, uniforms: &CrystalUniforms);
    fn set_scale(&mut self, factor: f32);
    /// Bounding-sphere radius at scale 1, used for picking and culling.
    fn bounding_radius(&self) -> f32;
}

/// Sink that just keeps the last values. Used by headless drivers and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessMesh {
    pub radius: f32,
    pub scale: f32,
    pub uniforms: CrystalUniforms,
    pub writes: u64,
}

impl HeadlessMesh {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            scale: 1.0,
            uniforms: CrystalUniforms::default(),
            writes: 0,
        }
    }
}

impl ShaderUniformSink for HeadlessMesh {
    fn write_uniforms(&mut self, uniforms: &CrystalUniforms) {
        self.uniforms = *uniforms;
        self.writes += 1;
    }

    fn set_scale(&mut self, factor: f32) {
        self.scale = factor;
    }

    fn bounding_radius(&self) -> f32 {
        self.radius
    }
}
