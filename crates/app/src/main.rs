//! Entry point for meshview.

mod config;

use anyhow::Result;
use asset::{
    mesh::MeshData,
    obj,
    shader::{ShaderLanguage, ShaderSource, ShaderStage},
};
use corelib::spin::Spin;
use platform::ViewerSetup;
use renderer::{GeometryData, ProgramSources, RendererInit, ShaderFailurePolicy};

use crate::config::Config;

fn load_mesh(cfg: &Config) -> MeshData {
    match obj::load_obj_from_path(&cfg.mesh_path, cfg.obj) {
        Ok(mesh) => mesh,
        Err(e) => {
            log::warn!("{e:#}");
            MeshData::default()
        }
    }
}

fn load_shader(cfg: &Config, stage: ShaderStage) -> Result<ShaderSource> {
    if cfg.builtin_shaders {
        return Ok(ShaderSource::builtin(stage));
    }
    let path = match stage {
        ShaderStage::Vertex => &cfg.vertex_shader,
        ShaderStage::Fragment => &cfg.fragment_shader,
    };
    match ShaderSource::load(stage, path) {
        Ok(src) => Ok(src),
        // An unreadable file compiles as empty source and fails like any other bad shader.
        Err(e) if cfg.shader_policy == ShaderFailurePolicy::Continue => {
            log::error!("{e:#}");
            Ok(ShaderSource::new(
                stage,
                ShaderLanguage::from_path(path),
                path.display().to_string(),
                "",
            ))
        }
        Err(e) => Err(e),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::from_env();
    log::info!(
        "Starting meshview. Backend: {:?}, mesh={}, draw={:?}, window_size={}x{}",
        cfg.backends,
        cfg.mesh_path.display(),
        cfg.draw_mode,
        cfg.window.width,
        cfg.window.height
    );

    let mesh = load_mesh(&cfg);
    let geometry = GeometryData::prepare(&mesh, cfg.draw_mode);
    let sources = ProgramSources {
        vertex: load_shader(&cfg, ShaderStage::Vertex)?,
        fragment: load_shader(&cfg, ShaderStage::Fragment)?,
    };

    platform::run_viewer(ViewerSetup {
        window: cfg.window.clone(),
        renderer: RendererInit {
            backends: cfg.backends,
            shader_policy: cfg.shader_policy,
        },
        sources,
        geometry,
        spin: Spin::new(cfg.spin_step)?,
    })?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
