//! Template engine based on MiniJinja

use minijinja::Environment;
use std::collections::BTreeMap;
use tracing::debug;

use chartwright_core::{ConfigTree, LoadedChart, TemplateContext};

use crate::error::{EngineError, Result, TemplateError};
use crate::filters;
use crate::functions;

/// Every rendered template of a chart
#[derive(Debug, Default)]
pub struct RenderResult {
    /// Rendered text keyed by document name, `<chart>/templates/<path>` or
    /// `<chart>/charts/<subchart>/templates/<path>`
    pub documents: BTreeMap<String, String>,
}

impl RenderResult {
    /// Remove a document, returning its text
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.documents.remove(name)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { strict_mode: true }
    }

    /// Fail on undefined variables
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    pub fn build(self) -> Engine {
        Engine::new(self.strict_mode)
    }
}

/// The template engine
pub struct Engine {
    strict_mode: bool,
}

impl Engine {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Engine configured from the chart's `engine` settings
    pub fn for_chart(chart: &LoadedChart) -> Self {
        Self::new(chart.metadata.engine.strict)
    }

    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        env.set_undefined_behavior(if self.strict_mode {
            minijinja::UndefinedBehavior::Strict
        } else {
            minijinja::UndefinedBehavior::Lenient
        });
        // Manifests are whitespace sensitive; keep the final newline.
        env.set_keep_trailing_newline(true);

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("required", filters::required);
        env.add_filter("empty", filters::empty);
        env.add_filter("haskey", filters::haskey);
        env.add_filter("merge", filters::merge);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trunc", filters::trunc);
        env.add_filter("trimprefix", filters::trimprefix);
        env.add_filter("trimsuffix", filters::trimsuffix);

        env.add_function("fail", functions::fail);
        env.add_function("dict", functions::dict);
        env.add_function("list", functions::list);
        env.add_function("get", functions::get);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);
        env.add_function("tostring", functions::tostring);
        env.add_function("toint", functions::toint);
        env.add_function("printf", functions::printf);

        env
    }

    /// Render a single template string
    pub fn render_string(
        &self,
        template: &str,
        context: &TemplateContext,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.create_environment();
        let template_error =
            |e| TemplateError::from_minijinja(e, template_name, template, Some(&context.values));

        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(template_error)?;
        let tmpl = env.get_template(template_name).map_err(template_error)?;

        tmpl.render(render_context(context))
            .map_err(|e| EngineError::Template(template_error(e)))
    }

    /// Render every template of a chart and of its enabled subcharts,
    /// partials and notes included
    ///
    /// Templates are registered under their path relative to `templates/`
    /// so they can `{% import %}` or `{% include %}` each other. Each
    /// subchart gets its own environment, its own strictness setting and the
    /// values scoped to it. The first failure aborts rendering.
    pub fn render_chart(&self, chart: &LoadedChart, context: &TemplateContext) -> Result<RenderResult> {
        let mut result = RenderResult::default();
        self.render_into(chart, context, &mut result)?;
        Ok(result)
    }

    fn render_into(
        &self,
        chart: &LoadedChart,
        context: &TemplateContext,
        result: &mut RenderResult,
    ) -> Result<()> {
        let values = ConfigTree::from_json(&context.values);
        for subchart in chart.enabled_subcharts(&values) {
            let scoped =
                ConfigTree::for_subchart(subchart.default_values()?, &values, subchart.name());
            debug!(
                subchart = %subchart.document_prefix,
                keys = scoped.len(),
                "rendering subchart"
            );
            let sub_context = context.for_subchart(&scoped, &subchart.metadata);
            Engine::for_chart(subchart).render_into(subchart, &sub_context, result)?;
        }

        self.render_templates(chart, context, result)
    }

    fn render_templates(
        &self,
        chart: &LoadedChart,
        context: &TemplateContext,
        result: &mut RenderResult,
    ) -> Result<()> {
        let files = chart.template_files()?;
        let mut env = self.create_environment();
        let mut sources = Vec::with_capacity(files.len());

        for file in &files {
            let relative = relative_name(&chart.templates_dir, file);
            let document = chart.document_name(file);
            let content = std::fs::read_to_string(file).map_err(|source| EngineError::Read {
                name: document.clone(),
                source,
            })?;

            env.add_template_owned(relative.clone(), content.clone())
                .map_err(|e| {
                    TemplateError::from_minijinja(e, &document, &content, Some(&context.values))
                })?;
            sources.push((relative, document, content));
        }

        let base_path = chart.base_path();

        for (relative, document, content) in &sources {
            let template_error =
                |e| TemplateError::from_minijinja(e, document, content, Some(&context.values));

            let tmpl = env.get_template(relative).map_err(template_error)?;
            let ctx = context.clone().with_template(document, &base_path);
            let rendered = tmpl.render(render_context(&ctx)).map_err(template_error)?;

            debug!(template = %document, bytes = rendered.len(), "rendered template");
            result.documents.insert(document.clone(), rendered);
        }

        Ok(())
    }
}

fn render_context(context: &TemplateContext) -> minijinja::Value {
    minijinja::context! {
        values => &context.values,
        release => &context.release,
        chart => &context.chart,
        capabilities => &context.capabilities,
        template => &context.template,
    }
}

/// Path of `file` relative to `root`, with `/` separators
fn relative_name(root: &std::path::Path, file: &std::path::Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
