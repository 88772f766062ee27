pub mod camera;
pub mod engine;
pub mod gpu_context;
pub mod mesh_pipeline;
pub mod renderer;
pub mod vertex;

pub use camera::{Camera3D, CameraUniform};
pub use engine::EngineContext;
pub use gpu_context::GpuContext;
pub use mesh_pipeline::{LightUniform, MeshPipeline};
pub use renderer::{RenderStats, SceneRenderer};
pub use vertex::MeshVertex;
