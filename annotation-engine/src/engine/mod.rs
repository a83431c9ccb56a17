pub mod assets;
pub mod camera;
pub mod core;
pub mod loading;
pub mod picking;
pub mod registry;
pub mod scene;
