// Processor Registry - job type -> Processor

use crate::domain::JobType;
use crate::error::{AppError, Result};
use crate::port::Processor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lookup table built once at startup and then shared read-only
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<JobType, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `job_type` to `processor`, returning the processor it replaced
    pub fn register(
        &mut self,
        job_type: JobType,
        processor: Arc<dyn Processor>,
    ) -> Option<Arc<dyn Processor>> {
        debug!(job_type = %job_type, processor = processor.name(), "Registering processor");
        let previous = self.processors.insert(job_type.clone(), processor);
        if let Some(prev) = &previous {
            warn!(
                job_type = %job_type,
                replaced = prev.name(),
                "Processor registration replaced an existing processor"
            );
        }
        previous
    }

    /// Like `register`, but a second binding for the same type is an error
    pub fn register_unique(
        &mut self,
        job_type: JobType,
        processor: Arc<dyn Processor>,
    ) -> Result<()> {
        if let Some(existing) = self.processors.get(&job_type) {
            return Err(AppError::Conflict(format!(
                "Processor '{}' already registered for job type '{}'",
                existing.name(),
                job_type
            )));
        }
        self.register(job_type, processor);
        Ok(())
    }

    pub fn get_processor(&self, job_type: &JobType) -> Option<Arc<dyn Processor>> {
        self.processors.get(job_type).cloned()
    }

    /// Diagnostic listing, sorted
    pub fn registered_job_types(&self) -> Vec<JobType> {
        let mut types: Vec<JobType> = self.processors.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}
