//! Command-line configuration.
//!
//! Flags are `--key=value` (or bare `--flag`). Unknown values fall back to the
//! default with a warning; unknown flags are ignored.

use std::path::PathBuf;

use asset::obj::{FaceRule, ObjOptions};
use platform::WindowConfig;
use renderer::{DrawMode, ShaderFailurePolicy};

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub backends: wgpu::Backends,
    pub window: WindowConfig,
    pub mesh_path: PathBuf,
    pub obj: ObjOptions,
    pub draw_mode: DrawMode,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub builtin_shaders: bool,
    pub shader_policy: ShaderFailurePolicy,
    /// Degrees per frame.
    pub spin_step: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            window: WindowConfig::default(),
            mesh_path: PathBuf::from("teapot.obj"),
            obj: ObjOptions::default(),
            draw_mode: DrawMode::default(),
            vertex_shader: PathBuf::from("vertex_shader.glsl"),
            fragment_shader: PathBuf::from("fragment_shader.glsl"),
            builtin_shaders: false,
            shader_policy: ShaderFailurePolicy::default(),
            spin_step: 1.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cfg = Config::default();
        let mut width: Option<u32> = None;
        let mut height: Option<u32> = None;

        for arg in args {
            let arg = arg.as_ref();
            let (key, val) = match arg.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (arg, None),
            };

            match (key, val) {
                ("--gpu-backend", Some(v)) => cfg.backends = parse_backend(v),
                ("--size", Some(v)) => {
                    if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                        if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                            width = Some(pw);
                            height = Some(ph);
                        }
                    }
                }
                ("--width", Some(v)) => width = v.parse().ok().or(width),
                ("--height", Some(v)) => height = v.parse().ok().or(height),
                ("--title", Some(v)) => cfg.window.title = v.to_string(),
                ("--mesh", Some(v)) => cfg.mesh_path = PathBuf::from(v),
                ("--vs", Some(v)) => cfg.vertex_shader = PathBuf::from(v),
                ("--fs", Some(v)) => cfg.fragment_shader = PathBuf::from(v),
                ("--builtin-shaders", None) => cfg.builtin_shaders = true,
                ("--strict-shaders", None) => cfg.shader_policy = ShaderFailurePolicy::Abort,
                ("--draw", Some(v)) => match v.parse::<DrawMode>() {
                    Ok(mode) => cfg.draw_mode = mode,
                    Err(e) => log::warn!("{e}, using {:?}", cfg.draw_mode),
                },
                ("--face-rule", Some(v)) => cfg.obj.face_rule = parse_face_rule(v),
                ("--header-lines", Some(v)) => match v.parse::<usize>() {
                    Ok(n) => cfg.obj.header_lines = n,
                    Err(_) => log::warn!("Invalid header line count '{v}', keeping default"),
                },
                ("--spin-step", Some(v)) => match v.parse::<f32>() {
                    Ok(step) if step.is_finite() => cfg.spin_step = step,
                    _ => log::warn!("Invalid spin step '{v}', keeping default"),
                },
                _ => log::debug!("Ignoring argument '{arg}'"),
            }
        }

        cfg.window.width = width.unwrap_or(cfg.window.width).max(1);
        cfg.window.height = height.unwrap_or(cfg.window.height).max(1);
        cfg
    }
}

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_face_rule(val: &str) -> FaceRule {
    match val.to_ascii_lowercase().as_str() {
        "any" => FaceRule::AnyNonVertex,
        "f" | "explicit" => FaceRule::Explicit,
        other => {
            log::warn!("Unknown face rule '{}', using any-non-vertex.", other);
            FaceRule::AnyNonVertex
        }
    }
}
