//! Sequential, fail-fast rendering of template jobs

use std::io::{self, Write};
use std::path::PathBuf;

use envtemplar_core::{CoreError, RenderContext, TemplateJob, fs};

use crate::engine::{self, Delimiters, EngineConfig, EngineKind, RenderOptions};
use crate::error::Result;

/// Renders jobs one at a time, in order, stopping at the first failure
///
/// Destinations written before a failure are left in place.
#[derive(Debug, Clone)]
pub struct BatchDriver {
    kind: EngineKind,
    delimiters: Delimiters,
    options: RenderOptions,
}

impl BatchDriver {
    /// Fails with a configuration error when `engine_name` is unknown
    pub fn new(engine_name: &str, delimiters: Delimiters, options: RenderOptions) -> Result<Self> {
        Ok(Self::with_kind(
            EngineKind::from_name(engine_name)?,
            delimiters,
            options,
        ))
    }

    pub fn with_kind(kind: EngineKind, delimiters: Delimiters, options: RenderOptions) -> Self {
        Self {
            kind,
            delimiters,
            options,
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Render every job against a fresh snapshot of the process environment
    pub fn render_all(&self, jobs: &[TemplateJob]) -> Result<()> {
        self.run(jobs, RenderContext::capture, &mut io::stdout().lock())
    }

    /// Render every job against `ctx`
    pub fn render_all_with(&self, jobs: &[TemplateJob], ctx: &RenderContext) -> Result<()> {
        self.run(jobs, || ctx.clone(), &mut io::stdout().lock())
    }

    /// Read and render one job without writing the destination
    pub fn render_job(&self, job: &TemplateJob, ctx: &RenderContext) -> Result<String> {
        let source = fs::read_source(job.source())?;
        let config = EngineConfig {
            template_source: source,
            template_name: job.template_name(),
            delimiters: self.delimiters.clone(),
        };
        engine::render(self.kind, config, ctx, self.options)
    }

    fn run<F, W>(&self, jobs: &[TemplateJob], mut context: F, debug_out: &mut W) -> Result<()>
    where
        F: FnMut() -> RenderContext,
        W: Write,
    {
        tracing::info!(jobs = jobs.len(), engine = %self.kind, "rendering templates");

        for (index, job) in jobs.iter().enumerate() {
            let ctx = context();
            let rendered = self.render_job(job, &ctx)?;

            if self.options.debug_templates {
                print_debug(debug_out, &rendered)?;
            }

            fs::write_output(job.destination(), &rendered)?;
            tracing::debug!(
                index,
                source = %job.source().display(),
                destination = %job.destination().display(),
                bytes = rendered.len(),
                "rendered template"
            );
        }

        tracing::info!(jobs = jobs.len(), "all templates rendered");
        Ok(())
    }
}

/// Rendered text followed by the `\x00\n` separator
fn print_debug<W: Write>(out: &mut W, rendered: &str) -> Result<()> {
    out.write_all(rendered.as_bytes())
        .and_then(|()| out.write_all(b"\x00\n"))
        .and_then(|()| out.flush())
        .map_err(|source| CoreError::Write {
            path: PathBuf::from("<stdout>"),
            source,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn ctx() -> RenderContext {
        [("GOENVTEMPLATOR_DEFINED_VAR", "foo")].into_iter().collect()
    }

    fn job(dir: &TempDir, name: &str, contents: Option<&str>) -> TemplateJob {
        let source = dir.path().join(format!("{name}.tmpl"));
        if let Some(contents) = contents {
            stdfs::write(&source, contents).unwrap();
        }
        TemplateJob::new(source, dir.path().join(format!("{name}.out"))).unwrap()
    }

    fn driver(options: RenderOptions) -> BatchDriver {
        BatchDriver::new("text/template", Delimiters::default(), options).unwrap()
    }

    #[test]
    fn test_renders_jobs_in_order() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![
            job(&dir, "a", Some(r#"A={{ env "GOENVTEMPLATOR_DEFINED_VAR" }}"#)),
            job(&dir, "b", Some("B=static\n")),
        ];

        driver(RenderOptions::default())
            .render_all_with(&jobs, &ctx())
            .unwrap();

        assert_eq!(stdfs::read_to_string(jobs[0].destination()).unwrap(), "A=foo");
        assert_eq!(stdfs::read_to_string(jobs[1].destination()).unwrap(), "B=static\n");
    }

    #[test]
    fn test_overwrites_existing_destination() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![job(&dir, "a", Some("new"))];
        stdfs::write(jobs[0].destination(), "old contents that are longer").unwrap();

        driver(RenderOptions::default())
            .render_all_with(&jobs, &ctx())
            .unwrap();
        assert_eq!(stdfs::read_to_string(jobs[0].destination()).unwrap(), "new");
    }

    #[test]
    fn test_fails_fast_without_rollback() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![
            job(&dir, "first", Some("ok")),
            job(&dir, "second", Some("{{ .Missing }}")),
            job(&dir, "third", Some("never")),
        ];

        let err = driver(RenderOptions::default())
            .render_all_with(&jobs, &ctx())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UndefinedReference);
        assert_eq!(err.as_template().unwrap().template_name, "second.tmpl");
        assert!(jobs[0].destination().exists());
        assert!(!jobs[1].destination().exists());
        assert!(!jobs[2].destination().exists());
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![job(&dir, "absent", None)];

        let err = driver(RenderOptions::default())
            .render_all_with(&jobs, &ctx())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_unknown_engine_is_rejected_up_front() {
        let err = BatchDriver::new("handlebars", Delimiters::default(), RenderOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_debug_templates_prints_separator() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![job(&dir, "a", Some("one")), job(&dir, "b", Some("two"))];
        let options = RenderOptions {
            debug_templates: true,
            ..RenderOptions::default()
        };

        let mut out = Vec::new();
        driver(options).run(&jobs, ctx, &mut out).unwrap();
        assert_eq!(out, b"one\x00\ntwo\x00\n");
    }

    #[test]
    fn test_context_is_taken_per_job() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![
            job(&dir, "a", Some(r#"{{ env "N" }}"#)),
            job(&dir, "b", Some(r#"{{ env "N" }}"#)),
        ];

        let mut calls = 0;
        let next = || {
            calls += 1;
            [("N", calls.to_string())].into_iter().collect::<RenderContext>()
        };
        driver(RenderOptions::default())
            .run(&jobs, next, &mut io::sink())
            .unwrap();

        assert_eq!(stdfs::read_to_string(jobs[0].destination()).unwrap(), "1");
        assert_eq!(stdfs::read_to_string(jobs[1].destination()).unwrap(), "2");
    }

    #[test]
    fn test_pongo_batch_uses_custom_context() {
        let dir = TempDir::new().unwrap();
        let jobs = vec![job(&dir, "a", Some("{{ GOENVTEMPLATOR_DEFINED_VAR }}-{{ UNSET }}"))];

        BatchDriver::new("pongo", Delimiters::new("[[", "]]"), RenderOptions::default())
            .unwrap()
            .render_all_with(&jobs, &ctx())
            .unwrap();
        assert_eq!(stdfs::read_to_string(jobs[0].destination()).unwrap(), "foo-");
    }
}
