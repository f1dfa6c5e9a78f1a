// Checks run over the merged project model

mod annotation_usage;
mod range;

pub use annotation_usage::AnnotationUsageDetector;
pub use range::RangeDetector;

use crate::analysis::{Finding, IssueId};
use crate::model::ProjectModel;

/// A check over the whole project
pub trait Detector {
    /// Which issue the findings of this detector belong to
    fn issue(&self) -> IssueId;

    /// Run the detector on the model and return found issues
    fn detect(&self, model: &ProjectModel) -> Vec<Finding>;
}
