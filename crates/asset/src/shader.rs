//! Shader source text loading. Compilation happens in the renderer.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};

/// Pipeline stage a shader source is written for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderLanguage {
    Glsl,
    Wgsl,
}

impl ShaderLanguage {
    /// `.wgsl` selects WGSL; everything else is treated as GLSL.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wgsl") => ShaderLanguage::Wgsl,
            _ => ShaderLanguage::Glsl,
        }
    }
}

/// Shader text plus what is needed to compile it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub language: ShaderLanguage,
    /// Human-readable origin, used in labels and diagnostics.
    pub label: String,
    pub text: String,
}

const BUILTIN_VERTEX: &str = "\
#version 450

layout(location = 0) in vec3 position;

layout(set = 0, binding = 0) uniform Transforms {
    mat4 model;
    mat4 view;
    mat4 projection;
} u;

void main() {
    gl_Position = u.projection * u.view * u.model * vec4(position, 1.0);
}
";

const BUILTIN_FRAGMENT: &str = "\
#version 450

layout(location = 0) out vec4 color;

void main() {
    color = vec4(1.0, 1.0, 0.0, 1.0);
}
";

impl ShaderSource {
    pub fn new(
        stage: ShaderStage,
        language: ShaderLanguage,
        label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            language,
            label: label.into(),
            text: text.into(),
        }
    }

    /// Read the whole file as shader text.
    pub fn load(stage: ShaderStage, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} shader: {}", stage, path.display()))?;
        log::debug!("Read {} shader {} ({} bytes)", stage, path.display(), text.len());
        Ok(Self::new(
            stage,
            ShaderLanguage::from_path(path),
            path.display().to_string(),
            text,
        ))
    }

    /// Embedded GLSL pair: MVP-transformed positions, flat yellow output.
    pub fn builtin(stage: ShaderStage) -> Self {
        let (label, text) = match stage {
            ShaderStage::Vertex => ("builtin vertex", BUILTIN_VERTEX),
            ShaderStage::Fragment => ("builtin fragment", BUILTIN_FRAGMENT),
        };
        Self::new(stage, ShaderLanguage::Glsl, label, text)
    }

    /// Entry point name the compiled module exposes for this stage.
    pub fn entry_point(&self) -> &'static str {
        match (self.language, self.stage) {
            (ShaderLanguage::Glsl, _) => "main",
            (ShaderLanguage::Wgsl, ShaderStage::Vertex) => "vs_main",
            (ShaderLanguage::Wgsl, ShaderStage::Fragment) => "fs_main",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_follows_extension() {
        assert_eq!(
            ShaderLanguage::from_path(Path::new("shaders/basic.wgsl")),
            ShaderLanguage::Wgsl
        );
        assert_eq!(
            ShaderLanguage::from_path(Path::new("vertex_shader.glsl")),
            ShaderLanguage::Glsl
        );
        assert_eq!(
            ShaderLanguage::from_path(Path::new("frag")),
            ShaderLanguage::Glsl
        );
    }

    #[test]
    fn load_reads_whole_file() {
        let path = std::env::temp_dir()
            .join(format!("meshview-shader-{}.wgsl", std::process::id()));
        fs::write(&path, "@vertex fn vs_main() {}\n// tail\n").expect("write temp shader");

        let src = ShaderSource::load(ShaderStage::Vertex, &path).expect("load shader");
        let _ = fs::remove_file(&path);

        assert_eq!(src.language, ShaderLanguage::Wgsl);
        assert!(src.text.ends_with("// tail\n"));
        assert_eq!(src.entry_point(), "vs_main");
    }

    #[test]
    fn missing_file_names_the_stage() {
        let err = ShaderSource::load(ShaderStage::Fragment, "no/such/fragment_shader.glsl")
            .expect_err("missing shader");
        assert!(err.to_string().contains("fragment shader"));
    }

    #[test]
    fn builtins_are_glsl_with_main() {
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let src = ShaderSource::builtin(stage);
            assert_eq!(src.stage, stage);
            assert_eq!(src.entry_point(), "main");
            assert!(src.text.starts_with("#version 450"));
        }
    }
}
