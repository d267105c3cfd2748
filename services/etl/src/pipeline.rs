//! Transform pipeline and run orchestration.
//!
//! One category flows through normalize -> reconcile -> coerce -> project ->
//! null canonicalization. Categories run one after another; a failing
//! category is recorded and excluded without touching frames already
//! transformed.

use crate::coerce::coerce_frame;
use crate::error::{EtlError, Result};
use crate::frame::Frame;
use crate::normalize::normalize_frame_columns;
use crate::nulls::canonicalize_nulls;
use crate::project::project;
use crate::reconcile::Reconciler;
use crate::report::{build_reports, Reports};
use crate::schema::CategorySchema;
use chrono::NaiveDate;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Transform one raw extract into the category's canonical frame.
pub fn transform_category(
    mut raw: Frame,
    schema: &CategorySchema,
    reconciler: &Reconciler,
) -> Result<Frame> {
    raw.check_shape().map_err(|reason| EtlError::MalformedSource {
        category: schema.category.clone(),
        reason,
    })?;

    normalize_frame_columns(&mut raw);
    reconciler.apply(&mut raw);
    coerce_frame(&mut raw, schema);
    let mut frame = project(&raw, schema)?;
    let nulls = canonicalize_nulls(&mut frame);

    info!(
        category = %schema.category,
        rows = frame.height(),
        nulls,
        "sanitized category data"
    );
    Ok(frame)
}

/// A category left out of the run and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Omitted {
    pub category: String,
    pub cause: String,
}

/// Frames accumulated across categories, in processing order.
#[derive(Debug, Default)]
pub struct CategoryFrames {
    frames: Vec<(String, Frame)>,
    omitted: Vec<Omitted>,
}

impl CategoryFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one category.
    pub fn record(&mut self, category: &str, outcome: Result<Frame>) {
        match outcome {
            Ok(frame) => self.frames.push((category.to_string(), frame)),
            Err(e) => {
                error!(category, kind = ?e.kind(), error = %e, "category excluded from run");
                self.omitted.push(Omitted {
                    category: category.to_string(),
                    cause: e.to_string(),
                });
            }
        }
    }

    pub fn get(&self, category: &str) -> Option<&Frame> {
        self.frames
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, f)| f)
    }

    pub fn categories(&self) -> Vec<String> {
        self.frames.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn omitted(&self) -> &[Omitted] {
        &self.omitted
    }

    /// Cross-category fact frame over the shared columns.
    /// `None` when no category succeeded.
    pub fn combined(&self) -> Option<Frame> {
        if self.frames.is_empty() {
            return None;
        }
        let frames: Vec<&Frame> = self.frames.iter().map(|(_, f)| f).collect();
        Some(Frame::concat_inner(&frames))
    }
}

/// Everything a run produced, ready for loading.
#[derive(Debug)]
pub struct RunOutput {
    pub main: Frame,
    pub reports: Reports,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub transformed: Vec<String>,
    pub omitted: Vec<Omitted>,
    pub fecha_carga: NaiveDate,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            transformed = ?self.transformed,
            fecha_carga = %self.fecha_carga,
            "run summary"
        );
        for o in &self.omitted {
            warn!(run_id = %self.run_id, category = %o.category, cause = %o.cause, "omitted category");
        }
    }
}

/// Build the combined fact frame and the reports from accumulated frames.
/// Report failures are fatal for the whole run.
pub fn finish_run(
    run_id: Uuid,
    frames: &CategoryFrames,
    cinema_category: &str,
    fecha_carga: NaiveDate,
) -> Result<RunOutput> {
    let main = frames.combined();
    let reports = build_reports(main.as_ref(), frames.get(cinema_category), fecha_carga)?;

    let summary = RunSummary {
        run_id,
        transformed: frames.categories(),
        omitted: frames.omitted().to_vec(),
        fecha_carga,
    };
    Ok(RunOutput {
        main: main.unwrap_or_default(),
        reports,
        summary,
    })
}
