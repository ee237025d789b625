//! Shader compilation and program linking with explicit failure reporting.
//!
//! Compile and link run inside validation error scopes so driver diagnostics
//! come back as values. What happens next is decided by [`ShaderFailurePolicy`]:
//! keep going with a program that draws nothing, or abort startup.

use std::borrow::Cow;

use asset::shader::{ShaderLanguage, ShaderSource, ShaderStage};
use thiserror::Error;
use wgpu::{
    BlendState, ColorTargetState, ColorWrites, Device, ErrorFilter, FragmentState,
    PipelineLayout, RenderPipeline, RenderPipelineDescriptor, ShaderModule,
    ShaderModuleDescriptor, TextureFormat, VertexState, naga,
};

use crate::geometry::Vertex;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Failed to compile {stage} shader '{label}':\n{log}")]
    Compile {
        stage: ShaderStage,
        label: String,
        log: String,
    },
    #[error("Program '{label}' has no {stage} shader attached")]
    MissingStage { label: String, stage: ShaderStage },
    #[error("Failed to link program '{label}':\n{log}")]
    Link { label: String, log: String },
}

/// What to do when a shader fails to compile or a program fails to link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShaderFailurePolicy {
    /// Log the diagnostic and keep the broken program; it draws nothing.
    #[default]
    Continue,
    /// Return the failure to the caller.
    Abort,
}

impl ShaderFailurePolicy {
    pub fn resolve(self, failure: ShaderError) -> Result<(), ShaderError> {
        match self {
            ShaderFailurePolicy::Continue => {
                log::error!("{failure}");
                Ok(())
            }
            ShaderFailurePolicy::Abort => Err(failure),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileStatus {
    Compiled,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgramStatus {
    Linked,
    Failed(String),
}

/// A shader module for one stage, possibly broken.
#[derive(Debug)]
pub struct CompiledShader {
    pub module: ShaderModule,
    pub stage: ShaderStage,
    pub label: String,
    pub entry_point: &'static str,
    pub status: CompileStatus,
}

impl CompiledShader {
    pub fn is_compiled(&self) -> bool {
        self.status == CompileStatus::Compiled
    }
}

/// Compile `source` for its stage.
///
/// GLSL is parsed up front with naga so a syntax error becomes a diagnostic
/// instead of a panic inside wgpu. A module that failed to parse is replaced by
/// an empty one; linking against it then fails as well.
pub async fn compile(
    device: &Device,
    source: &ShaderSource,
    policy: ShaderFailurePolicy,
) -> Result<CompiledShader, ShaderError> {
    let (wgpu_source, parse_failure) = match source.language {
        ShaderLanguage::Wgsl => (
            wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.text.as_str())),
            None,
        ),
        ShaderLanguage::Glsl => match parse_glsl(source) {
            Ok(module) => (wgpu::ShaderSource::Naga(Cow::Owned(module)), None),
            Err(log) => (wgpu::ShaderSource::Wgsl(Cow::Borrowed("")), Some(log)),
        },
    };

    device.push_error_scope(ErrorFilter::Validation);
    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(&source.label),
        source: wgpu_source,
    });
    let scope_error = device.pop_error_scope().await;

    let status = match (parse_failure, scope_error) {
        (Some(log), _) => CompileStatus::Failed(log),
        (None, Some(err)) => CompileStatus::Failed(err.to_string()),
        (None, None) => CompileStatus::Compiled,
    };

    match &status {
        CompileStatus::Compiled => {
            log::debug!("Compiled {} shader '{}'", source.stage, source.label);
        }
        CompileStatus::Failed(log) => policy.resolve(ShaderError::Compile {
            stage: source.stage,
            label: source.label.clone(),
            log: log.clone(),
        })?,
    }

    Ok(CompiledShader {
        module,
        stage: source.stage,
        label: source.label.clone(),
        entry_point: source.entry_point(),
        status,
    })
}

fn parse_glsl(source: &ShaderSource) -> Result<naga::Module, String> {
    let stage = match source.stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let options = naga::front::glsl::Options::from(stage);
    naga::front::glsl::Frontend::default()
        .parse(&options, &source.text)
        .map_err(|err| err.emit_to_string(&source.text))
}

/// Shader stages collected for one render pipeline.
pub struct ProgramBuilder {
    label: String,
    vertex: Option<CompiledShader>,
    fragment: Option<CompiledShader>,
}

impl ProgramBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            vertex: None,
            fragment: None,
        }
    }

    /// Attach a shader to its stage slot, replacing any previous one.
    /// Broken shaders are attached too.
    pub fn attach(mut self, shader: CompiledShader) -> Self {
        match shader.stage {
            ShaderStage::Vertex => self.vertex = Some(shader),
            ShaderStage::Fragment => self.fragment = Some(shader),
        }
        self
    }

    /// Link into a render pipeline and validate it.
    pub async fn link(
        self,
        device: &Device,
        layout: &PipelineLayout,
        target_format: TextureFormat,
        policy: ShaderFailurePolicy,
    ) -> Result<Program, ShaderError> {
        let vertex = self.vertex.ok_or_else(|| ShaderError::MissingStage {
            label: self.label.clone(),
            stage: ShaderStage::Vertex,
        })?;
        let fragment = self.fragment.ok_or_else(|| ShaderError::MissingStage {
            label: self.label.clone(),
            stage: ShaderStage::Fragment,
        })?;

        device.push_error_scope(ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&self.label),
            layout: Some(layout),
            vertex: VertexState {
                module: &vertex.module,
                entry_point: Some(vertex.entry_point),
                buffers: &[Vertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &fragment.module,
                entry_point: Some(fragment.entry_point),
                targets: &[Some(ColorTargetState {
                    format: target_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        let scope_error = device.pop_error_scope().await;

        let status = match scope_error {
            None if vertex.is_compiled() && fragment.is_compiled() => ProgramStatus::Linked,
            None => ProgramStatus::Failed("attached shaders did not compile".to_string()),
            Some(err) => ProgramStatus::Failed(err.to_string()),
        };

        match &status {
            ProgramStatus::Linked => log::info!("Linked program '{}'", self.label),
            ProgramStatus::Failed(log) => policy.resolve(ShaderError::Link {
                label: self.label.clone(),
                log: log.clone(),
            })?,
        }

        Ok(Program {
            label: self.label,
            pipeline,
            status,
        })
    }
}

/// Linked render pipeline. A failed program is kept but never drawn with.
pub struct Program {
    pub label: String,
    pub pipeline: RenderPipeline,
    pub status: ProgramStatus,
}

impl Program {
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.status == ProgramStatus::Linked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_failure() -> ShaderError {
        ShaderError::Compile {
            stage: ShaderStage::Vertex,
            label: "vertex_shader.glsl".into(),
            log: "0:3: unexpected token".into(),
        }
    }

    #[test]
    fn continue_policy_swallows_failures() {
        assert!(ShaderFailurePolicy::Continue.resolve(compile_failure()).is_ok());
    }

    #[test]
    fn abort_policy_returns_the_failure() {
        let err = ShaderFailurePolicy::Abort
            .resolve(compile_failure())
            .expect_err("abort");
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to compile vertex shader"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn default_policy_is_non_fatal() {
        assert_eq!(ShaderFailurePolicy::default(), ShaderFailurePolicy::Continue);
    }

    #[test]
    fn builtin_glsl_parses() {
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let src = ShaderSource::builtin(stage);
            let module = parse_glsl(&src).expect("builtin shader parses");
            assert!(module.entry_points.iter().any(|ep| ep.name == "main"));
        }
    }

    #[test]
    fn broken_glsl_yields_diagnostic() {
        let src = ShaderSource::new(
            ShaderStage::Fragment,
            ShaderLanguage::Glsl,
            "broken",
            "#version 450\nvoid main() { color = ; }\n",
        );
        let log = parse_glsl(&src).expect_err("syntax error");
        assert!(!log.is_empty());
    }
}
