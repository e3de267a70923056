use std::path::{Path, PathBuf};

use listcast_core::export::{export_file_name, render_ready, ExportFormat};

use crate::error::WorkflowResult;
use crate::session::PublishingSession;

impl PublishingSession {
    /// Render every ready draft of the selected property.
    pub async fn export_ready(&self, format: ExportFormat) -> WorkflowResult<String> {
        let state = self.inner.state.read().await;
        state.require_property()?;
        Ok(render_ready(state.store.iter(), format)?)
    }

    /// Write the ready drafts to a timestamped file in `dir`, creating the
    /// directory if needed. Returns the file path.
    pub async fn export_ready_to(&self, dir: &Path, format: ExportFormat) -> WorkflowResult<PathBuf> {
        let (property_id, contents) = {
            let state = self.inner.state.read().await;
            let property_id = state.require_property()?;
            let contents = render_ready(state.store.iter(), format)?;
            (property_id, contents)
        };

        let path = dir.join(export_file_name(&property_id, format, Self::now()));
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, contents).await?;
        tracing::info!(path = %path.display(), "Ready drafts exported");
        Ok(path)
    }
}
