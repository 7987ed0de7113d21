/// Calico manifest generation
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::config::SubstitutionContext;

/// Replaced by the resolved home directory
pub const HOME_PLACEHOLDER: &str = "$HOME";

/// Replaced by the cluster CIDR
pub const CLUSTER_PLACEHOLDER: &str = "$CLUSTER";

/// Output file name to template body
const MANIFEST_TEMPLATES: &[(&str, &str)] = &[(
    "calico.yaml",
    include_str!("templates/calico.yaml"),
)];

/// Registered manifest templates
pub fn templates() -> &'static [(&'static str, &'static str)] {
    MANIFEST_TEMPLATES
}

/// Substitute the placeholders in a template.
///
/// `$HOME` is replaced before `$CLUSTER`.
pub fn render(template: &str, context: &SubstitutionContext) -> String {
    debug!(
        "Substituting {} home and {} cluster placeholders",
        template.matches(HOME_PLACEHOLDER).count(),
        template.matches(CLUSTER_PLACEHOLDER).count()
    );

    template
        .replace(HOME_PLACEHOLDER, &context.home_dir)
        .replace(CLUSTER_PLACEHOLDER, &context.cluster_cidr)
}

/// A manifest written to disk
#[derive(Debug, Clone)]
pub struct GeneratedManifest {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Writes every registered template after substitution
pub struct ManifestGenerator {
    context: SubstitutionContext,
    output_dir: PathBuf,
}

impl ManifestGenerator {
    /// Create a new manifest generator
    pub fn new(context: SubstitutionContext, output_dir: PathBuf) -> Self {
        Self {
            context,
            output_dir,
        }
    }

    /// Generate all manifests, reporting progress to `progress`
    pub async fn generate<W: Write>(&self, progress: &mut W) -> Result<Vec<GeneratedManifest>> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create output directory {}",
                    self.output_dir.display()
                )
            })?;

        let mut generated = Vec::with_capacity(MANIFEST_TEMPLATES.len());

        for (filename, template) in templates() {
            write!(progress, "Generating {} ... ", filename)?;
            progress.flush()?;

            let path = self.output_dir.join(filename);
            let content = render(template, &self.context);

            tokio::fs::write(&path, &content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            debug!("Wrote {} bytes to {}", content.len(), path.display());
            writeln!(progress, "done.")?;

            generated.push(GeneratedManifest {
                path,
                bytes: content.len(),
            });
        }

        Ok(generated)
    }
}
