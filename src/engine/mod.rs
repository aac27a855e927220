pub mod binding;
pub mod camera;
pub mod model;
pub mod shader;
pub mod texture;
pub mod window;
