//! Session ownership: one controller, one crop selector per side, one result set.

use crate::application::compare::{TaskController, TaskEvent, TaskHandle};
use crate::application::crop::{CropAction, CropSelector};
use crate::application::results::ResultView;
use crate::domain::{
    ColumnSelection, CompareError, CompareParams, CropState, DocumentFile, DocumentSide,
    SideParams,
};
use crate::infra::app_config::AppConfig;
use crate::infra::render::PageRasterizer;
use crate::infra::service::ComparisonService;
use std::sync::Arc;
use tokio::sync::mpsc;

struct SideSession {
    crop: CropSelector,
    columns: ColumnSelection,
}

pub struct SessionState {
    config: AppConfig,
    controller: TaskController,
    events: mpsc::UnboundedReceiver<TaskEvent>,
    left: SideSession,
    right: SideSession,
    active: Option<TaskHandle>,
    results: Option<ResultView>,
}

impl SessionState {
    pub fn new(
        config: AppConfig,
        service: Arc<dyn ComparisonService>,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Self {
        let (controller, events) = TaskController::new(service, config.poll_interval());
        let side = || SideSession {
            crop: CropSelector::new(Arc::clone(&rasterizer), config.preview_scale)
                .with_crop(CropState::uniform(config.default_crop_depth)),
            columns: ColumnSelection::default(),
        };
        Self {
            left: side(),
            right: side(),
            config,
            controller,
            events,
            active: None,
            results: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn controller(&self) -> &TaskController {
        &self.controller
    }

    fn side_mut(&mut self, side: DocumentSide) -> &mut SideSession {
        match side {
            DocumentSide::Left => &mut self.left,
            DocumentSide::Right => &mut self.right,
        }
    }

    pub fn crop(&self, side: DocumentSide) -> &CropSelector {
        match side {
            DocumentSide::Left => &self.left.crop,
            DocumentSide::Right => &self.right.crop,
        }
    }

    pub fn crop_mut(&mut self, side: DocumentSide) -> &mut CropSelector {
        &mut self.side_mut(side).crop
    }

    pub fn set_columns(&mut self, side: DocumentSide, columns: ColumnSelection) {
        self.side_mut(side).columns = columns;
    }

    /// Request built from the configured preset and the current crop and
    /// column selections.
    pub fn build_params(&self, left: DocumentFile, right: DocumentFile) -> CompareParams {
        let preset = self.config.comparison_preset();
        let side = |file, session: &SideSession| {
            SideParams::new(file, &preset)
                .with_crop(session.crop.current_crop_state())
                .with_columns(session.columns.clone())
        };
        CompareParams::new(side(left, &self.left), side(right, &self.right), &preset)
            .with_mode(self.config.submission_mode)
    }

    /// Submit a comparison. The previous result set is discarded and the
    /// crop selections return to their defaults.
    pub async fn submit(&mut self, params: CompareParams) -> Result<TaskHandle, CompareError> {
        let handle = self.controller.submit(params).await?;
        self.results = None;
        self.active = Some(handle.clone());
        let default_crop = CropState::uniform(self.config.default_crop_depth);
        for side in [DocumentSide::Left, DocumentSide::Right] {
            let crop = self.crop_mut(side);
            crop.close();
            crop.dispatch(CropAction::Restore(default_crop));
        }
        Ok(handle)
    }

    pub async fn next_event(&mut self) -> Option<TaskEvent> {
        self.events.recv().await
    }

    /// Fold a controller event into the session. A completion moves the rows
    /// into a fresh [`ResultView`].
    pub fn apply_event(&mut self, event: &TaskEvent) -> Result<(), CompareError> {
        let Some(handle) = &self.active else {
            return Ok(());
        };
        if event.job_id() != handle.job_id() {
            log::debug!("Ignoring event for stale job {}", event.job_id());
            return Ok(());
        }
        match event {
            TaskEvent::Completed { .. } => {
                let rows = self.controller.fetch_result(handle)?;
                self.active = None;
                self.results = Some(ResultView::new(rows));
            }
            TaskEvent::Failed { .. } | TaskEvent::Cancelled { .. } => {
                self.active = None;
            }
            TaskEvent::Submitted { .. } | TaskEvent::Progress { .. } => {}
        }
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.controller.cancel();
        self.active = None;
    }

    pub fn active(&self) -> Option<&TaskHandle> {
        self.active.as_ref()
    }

    pub fn results(&self) -> Option<&ResultView> {
        self.results.as_ref()
    }

    pub fn results_mut(&mut self) -> Option<&mut ResultView> {
        self.results.as_mut()
    }

    /// Drop the result set, e.g. when its view is closed.
    pub fn close_results(&mut self) {
        self.results = None;
    }
}
