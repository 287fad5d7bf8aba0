use std::sync::Arc;

use sqlbench_core::bench::EvaluatorFactory;
use sqlbench_core::evaluator::Evaluator;
use sqlbench_core::model::EvaluationType;

mod hybrid;
mod subjective;

pub mod objective;

pub use objective::deep_equal;

pub fn evaluator_for(kind: EvaluationType) -> Arc<dyn Evaluator> {
    match kind {
        EvaluationType::Objective => Arc::new(objective::ObjectiveEvaluator),
        EvaluationType::Hybrid => Arc::new(hybrid::HybridEvaluator),
        EvaluationType::Subjective => Arc::new(subjective::SubjectiveEvaluator),
    }
}

pub fn default_evaluators() -> EvaluatorFactory {
    Arc::new(evaluator_for)
}
