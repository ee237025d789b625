//! Asset loading/parsers (meshes, shaders).
//! Mesh: fixed-header OBJ records into owned vertex/face lists.
//! Shader: whole-file source text with stage and language attached.

pub mod mesh;
pub mod obj;
pub mod shader;
